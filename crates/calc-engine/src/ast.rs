use std::fmt;
use std::sync::Arc;

use crate::functions::FunctionInfo;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
            BinaryOp::Mod => '%',
            BinaryOp::Pow => '^',
        }
    }
}

/// A parsed formula. Every node is real-valued (`f64`).
///
/// `Call` holds the resolved registry entry by stable reference: neither
/// executor performs a registry lookup after parse, and a built callable
/// keeps invoking the entry it was resolved against even if the registry is
/// later mutated.
#[derive(Clone, Debug)]
pub enum Expr {
    Constant(f64),
    /// A free variable, lowercase-normalized.
    Variable(Arc<str>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        func: Arc<FunctionInfo>,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Visit every free variable in the tree, in evaluation order.
    pub fn for_each_variable(&self, f: &mut impl FnMut(&Arc<str>)) {
        match self {
            Expr::Constant(_) => {}
            Expr::Variable(name) => f(name),
            Expr::Unary { expr, .. } => expr.for_each_variable(f),
            Expr::Binary { left, right, .. } => {
                left.for_each_variable(f);
                right.for_each_variable(f);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.for_each_variable(f);
                }
            }
        }
    }

    /// Precedence level: looser binds lower. The ordering mirrors the
    /// parser's binding powers, so unary minus sits between `* / %` and
    /// `^`; a `Unary` in the left slot of a `Pow` therefore always prints
    /// parenthesized, keeping `(-2)^2` distinct from `-2^2` on reparse.
    /// Leaves and calls never need parentheses around themselves.
    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary { op, .. } => match op {
                BinaryOp::Add | BinaryOp::Sub => 1,
                BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 2,
                BinaryOp::Pow => 4,
            },
            Expr::Unary { .. } => 3,
            Expr::Constant(_) | Expr::Variable(_) | Expr::Call { .. } => 5,
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, min_prec: u8) -> fmt::Result {
        let prec = self.precedence();
        let parens = prec < min_prec;
        if parens {
            write!(f, "(")?;
        }
        match self {
            Expr::Constant(value) => write!(f, "{value}")?,
            Expr::Variable(name) => write!(f, "{name}")?,
            Expr::Unary {
                op: UnaryOp::Neg,
                expr,
            } => {
                write!(f, "-")?;
                expr.write(f, prec)?;
            }
            Expr::Binary { op, left, right } => {
                // `^` is right-associative; everything else is left-associative.
                let (left_min, right_min) = if *op == BinaryOp::Pow {
                    (prec + 1, prec)
                } else {
                    (prec, prec + 1)
                };
                left.write(f, left_min)?;
                write!(f, " {} ", op.symbol())?;
                right.write(f, right_min)?;
            }
            Expr::Call { func, args } => {
                write!(f, "{}(", func.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    arg.write(f, 0)?;
                }
                write!(f, ")")?;
            }
        }
        if parens {
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Canonical (en-US) rendering with minimal parentheses.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, 0)
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Expr::Constant(a), Expr::Constant(b)) => a == b,
            (Expr::Variable(a), Expr::Variable(b)) => a == b,
            (
                Expr::Unary { op: a, expr: x },
                Expr::Unary { op: b, expr: y },
            ) => a == b && x == y,
            (
                Expr::Binary {
                    op: a,
                    left: al,
                    right: ar,
                },
                Expr::Binary {
                    op: b,
                    left: bl,
                    right: br,
                },
            ) => a == b && al == bl && ar == br,
            // Calls compare by resolved entry identity, not by name: two
            // trees built against different registrations are not equal.
            (
                Expr::Call { func: a, args: x },
                Expr::Call { func: b, args: y },
            ) => Arc::ptr_eq(a, b) && x == y,
            _ => false,
        }
    }
}
