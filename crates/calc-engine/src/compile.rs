//! Closure-tree executor.
//!
//! Each AST node is staged into an already-resolved closure at build time:
//! constants are captured by value, operators become direct arithmetic, and
//! calls capture their registry entry by `Arc`, so evaluation never walks
//! the tree variant dispatch and never touches a registry or name table.
//! The contract is observational equivalence with the interpreter.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::EvalError;
use crate::Environment;

type Thunk = Box<dyn Fn(&Environment) -> Result<f64, EvalError> + Send + Sync>;

/// A reusable, thread-safe callable built from a formula.
///
/// Cloning shares the underlying closure; a `Formula` holds no mutable
/// state and may be invoked concurrently from any number of threads.
#[derive(Clone)]
pub struct Formula {
    inner: Arc<dyn Fn(&Environment) -> Result<f64, EvalError> + Send + Sync>,
}

impl Formula {
    pub(crate) fn from_fn(
        f: impl Fn(&Environment) -> Result<f64, EvalError> + Send + Sync + 'static,
    ) -> Self {
        Self { inner: Arc::new(f) }
    }

    /// Evaluate against a variable environment (lowercase names).
    pub fn evaluate(&self, env: &Environment) -> Result<f64, EvalError> {
        (self.inner)(env)
    }

    /// Whether two handles share the same underlying callable.
    pub fn ptr_eq(&self, other: &Formula) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formula").finish_non_exhaustive()
    }
}

/// Compile a parsed formula into a [`Formula`].
pub fn compile(expr: &Expr) -> Formula {
    let root = compile_node(expr);
    Formula::from_fn(move |env| root(env))
}

fn compile_node(expr: &Expr) -> Thunk {
    match expr {
        Expr::Constant(value) => {
            let value = *value;
            Box::new(move |_| Ok(value))
        }
        Expr::Variable(name) => {
            let name = Arc::clone(name);
            Box::new(move |env| {
                env.get(name.as_ref())
                    .copied()
                    .ok_or_else(|| EvalError::UnboundVariable(name.to_string()))
            })
        }
        Expr::Unary {
            op: UnaryOp::Neg,
            expr,
        } => {
            let child = compile_node(expr);
            Box::new(move |env| Ok(-child(env)?))
        }
        Expr::Binary { op, left, right } => {
            let left = compile_node(left);
            let right = compile_node(right);
            match op {
                BinaryOp::Add => Box::new(move |env| Ok(left(env)? + right(env)?)),
                BinaryOp::Sub => Box::new(move |env| Ok(left(env)? - right(env)?)),
                BinaryOp::Mul => Box::new(move |env| Ok(left(env)? * right(env)?)),
                BinaryOp::Div => Box::new(move |env| Ok(left(env)? / right(env)?)),
                BinaryOp::Mod => Box::new(move |env| Ok(left(env)? % right(env)?)),
                BinaryOp::Pow => Box::new(move |env| Ok(left(env)?.powf(right(env)?))),
            }
        }
        Expr::Call { func, args } => {
            let thunks: Vec<Thunk> = args.iter().map(compile_node).collect();
            let func = Arc::clone(func);
            Box::new(move |env| {
                let mut values: SmallVec<[f64; 4]> = SmallVec::with_capacity(thunks.len());
                for thunk in &thunks {
                    values.push(thunk(env)?);
                }
                Ok(func.invoke(&values))
            })
        }
    }
}
