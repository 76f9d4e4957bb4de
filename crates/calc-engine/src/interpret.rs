//! Tree-walking executor.
//!
//! Also used by the optimizer to fold constant subtrees and by the engine
//! when [`ExecutionMode::Interpreted`](crate::ExecutionMode) is selected.

use smallvec::SmallVec;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::EvalError;
use crate::Environment;

/// Evaluate a parsed formula against a variable environment.
pub fn evaluate(expr: &Expr, env: &Environment) -> Result<f64, EvalError> {
    match expr {
        Expr::Constant(value) => Ok(*value),
        Expr::Variable(name) => env
            .get(name.as_ref())
            .copied()
            .ok_or_else(|| EvalError::UnboundVariable(name.to_string())),
        Expr::Unary {
            op: UnaryOp::Neg,
            expr,
        } => Ok(-evaluate(expr, env)?),
        Expr::Binary { op, left, right } => {
            let left = evaluate(left, env)?;
            let right = evaluate(right, env)?;
            Ok(apply_binary(*op, left, right))
        }
        Expr::Call { func, args } => {
            let mut values: SmallVec<[f64; 4]> = SmallVec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arg, env)?);
            }
            Ok(func.invoke(&values))
        }
    }
}

/// IEEE-754 binary64 arithmetic. `Mod` keeps the dividend's sign; `Pow`
/// defers to the host libm.
pub(crate) fn apply_binary(op: BinaryOp, left: f64, right: f64) -> f64 {
    match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div => left / right,
        BinaryOp::Mod => left % right,
        BinaryOp::Pow => left.powf(right),
    }
}
