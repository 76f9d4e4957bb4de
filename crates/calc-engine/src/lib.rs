#![forbid(unsafe_code)]

//! Textual math formulas compiled into reusable, thread-safe evaluators.
//!
//! A formula like `"2*sin(x+pi)/max(a,b)"` is lexed with locale-aware
//! numeric literals, parsed into an operation tree with function resolution
//! and arity checking, constant-folded, and turned into a callable by one of
//! two executors: a tree-walking interpreter or a closure-tree compiler.
//! Built callables are cached per formula text with single-flight builds.
//!
//! ```
//! use calc_engine::Engine;
//!
//! let engine = Engine::new();
//! assert_eq!(engine.calculate("2+3*4").unwrap(), 14.0);
//!
//! let mut vars = calc_engine::Environment::new();
//! vars.insert("x".to_string(), 3.0);
//! assert_eq!(engine.calculate_with("x*x + 2*x + 1", &vars).unwrap(), 16.0);
//! ```

pub mod cache;
pub mod compile;
pub mod error;
pub mod functions;
pub mod interpret;
pub mod locale;
pub mod optimizer;
pub mod parser;

mod ast;
mod builder;
mod constants;
mod engine;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use builder::{BoundFormula, FormulaBuilder};
pub use cache::FormulaCache;
pub use compile::{compile, Formula};
pub use constants::{ConstantInfo, ConstantRegistry};
pub use engine::{Engine, EngineOptions, ExecutionMode};
pub use error::{EngineError, EvalError, NameKind, ParseError, Span};
pub use functions::{
    Arity, FunctionInfo, FunctionRegistry, IntoFunction, Volatility, MAX_FIXED_ARITY,
    VARIADIC_MIN_ARGS,
};
pub use interpret::evaluate;
pub use locale::LocaleConfig;
pub use optimizer::optimize;
pub use parser::{lex, parse_formula, Token, TokenKind};

/// Per-evaluation mapping from lowercase names to values.
pub type Environment = std::collections::HashMap<String, f64>;
