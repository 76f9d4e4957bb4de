//! Bottom-up constant folding over the parsed tree.

use crate::ast::Expr;
use crate::interpret;
use crate::Environment;

/// Fold every subtree that depends on no variables.
///
/// Operators are always pure; calls fold only when the resolved entry is
/// idempotent, so a volatile function like `random` is re-invoked on every
/// evaluation even with constant arguments. The folded tree is behaviorally
/// equivalent to the input on every environment.
pub fn optimize(expr: Expr) -> Expr {
    match expr {
        Expr::Constant(_) | Expr::Variable(_) => expr,
        Expr::Unary { op, expr } => {
            let expr = Box::new(optimize(*expr));
            try_fold(Expr::Unary { op, expr })
        }
        Expr::Binary { op, left, right } => {
            let left = Box::new(optimize(*left));
            let right = Box::new(optimize(*right));
            try_fold(Expr::Binary { op, left, right })
        }
        Expr::Call { func, args } => {
            let args = args.into_iter().map(optimize).collect();
            try_fold(Expr::Call { func, args })
        }
    }
}

fn is_constant(expr: &Expr) -> bool {
    matches!(expr, Expr::Constant(_))
}

fn try_fold(node: Expr) -> Expr {
    let foldable = match &node {
        Expr::Unary { expr, .. } => is_constant(expr),
        Expr::Binary { left, right, .. } => is_constant(left) && is_constant(right),
        Expr::Call { func, args } => func.is_idempotent() && args.iter().all(is_constant),
        Expr::Constant(_) | Expr::Variable(_) => false,
    };
    if !foldable {
        return node;
    }
    // Folding must not raise. Constant-only subtrees cannot fail with the
    // current operator set; if that ever changes, keep the original tree.
    match interpret::evaluate(&node, &Environment::new()) {
        Ok(value) => Expr::Constant(value),
        Err(_) => node,
    }
}
