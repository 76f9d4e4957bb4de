use std::fmt;

use thiserror::Error;

/// Byte range of a lexeme in the source formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Lexical or structural error produced by the lexer or the parser.
///
/// The span points at the offending lexeme in the original formula text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at byte {}", .span.start)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// Runtime error raised while evaluating a built formula.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("variable '{0}' is not defined")]
    UnboundVariable(String),
    /// A bound formula was invoked with the wrong number of positional values.
    #[error("expected {expected} values, got {got}")]
    ArgumentCount { expected: usize, got: usize },
}

/// Which registry a name belongs to, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Function,
    Constant,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameKind::Function => write!(f, "function"),
            NameKind::Constant => write!(f, "constant"),
        }
    }
}

/// Top-level error surfaced by the [`Engine`](crate::Engine) facade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("formula text must not be empty")]
    EmptyFormula,
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("cannot overwrite non-overwritable {kind} '{name}'")]
    Registration { kind: NameKind, name: String },
    #[error("variable '{name}' collides with a registered {kind}")]
    VariableName { kind: NameKind, name: String },
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error("unknown execution mode '{0}'")]
    Config(String),
}
