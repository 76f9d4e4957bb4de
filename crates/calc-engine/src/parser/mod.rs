//! Formula lexer and parser.

use std::sync::Arc;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::constants::ConstantRegistry;
use crate::error::{ParseError, Span};
use crate::functions::{Arity, FunctionRegistry, VARIADIC_MIN_ARGS};
use crate::locale::LocaleConfig;

/// Nesting limit shared by grouping, calls and operators.
///
/// Prevents pathological formulas from overflowing the Rust stack during
/// parsing or evaluation.
const MAX_NESTED_EXPRS: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Digit run; carries its parsed value (widened, possibly with loss).
    Integer(f64),
    /// Digits, decimal separator, digits, optional exponent.
    Float(f64),
    /// Lowercased identifier.
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
    ArgSep,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Tokenize a formula using the locale's decimal and argument separators.
///
/// The lexer does not validate token order; structural errors are the
/// parser's responsibility. The returned stream always ends with
/// [`TokenKind::Eof`].
pub fn lex(formula: &str, locale: &LocaleConfig) -> Result<Vec<Token>, ParseError> {
    Lexer::new(formula, *locale).lex()
}

struct Lexer<'a> {
    src: &'a str,
    chars: std::str::Chars<'a>,
    idx: usize,
    locale: LocaleConfig,
    tokens: Vec<Token>,
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_cont(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str, locale: LocaleConfig) -> Self {
        Self {
            src,
            chars: src.chars(),
            idx: 0,
            locale,
            tokens: Vec::new(),
        }
    }

    fn lex(mut self) -> Result<Vec<Token>, ParseError> {
        while let Some(ch) = self.peek_char() {
            let start = self.idx;
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.bump();
                }
                '0'..='9' => self.lex_number()?,
                c if is_ident_start(c) => {
                    let ident = self.take_while(is_ident_cont).to_ascii_lowercase();
                    self.push(TokenKind::Ident(ident), start);
                }
                '+' => self.op(TokenKind::Plus),
                '-' => self.op(TokenKind::Minus),
                '*' => self.op(TokenKind::Star),
                '/' => self.op(TokenKind::Slash),
                '%' => self.op(TokenKind::Percent),
                '^' => self.op(TokenKind::Caret),
                '(' => self.op(TokenKind::LParen),
                ')' => self.op(TokenKind::RParen),
                c if c == self.locale.arg_separator => self.op(TokenKind::ArgSep),
                other => {
                    return Err(ParseError::new(
                        format!("unexpected character '{other}'"),
                        Span::new(start, start + other.len_utf8()),
                    ));
                }
            }
        }
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::new(self.idx, self.idx),
        });
        Ok(self.tokens)
    }

    fn lex_number(&mut self) -> Result<(), ParseError> {
        let start = self.idx;
        let mut text = String::new();
        self.take_digits(&mut text);

        // A digit run is an integer unless the decimal separator follows
        // with more digits after it.
        let is_float = self.peek_char() == Some(self.locale.decimal_separator)
            && self.peek_second().is_some_and(|c| c.is_ascii_digit());
        if is_float {
            self.bump();
            text.push('.');
            self.take_digits(&mut text);

            if matches!(self.peek_char(), Some('e' | 'E')) {
                let save_idx = self.idx;
                let save_chars = self.chars.clone();
                self.bump();
                let mut exponent = String::from("e");
                if let Some(sign @ ('+' | '-')) = self.peek_char() {
                    self.bump();
                    exponent.push(sign);
                }
                let mut digits = String::new();
                self.take_digits(&mut digits);
                if digits.is_empty() {
                    // The 'e' starts an identifier, not an exponent.
                    self.idx = save_idx;
                    self.chars = save_chars;
                } else {
                    exponent.push_str(&digits);
                    text.push_str(&exponent);
                }
            }
        }

        let span = Span::new(start, self.idx);
        let value: f64 = text
            .parse()
            .map_err(|_| ParseError::new(format!("invalid numeric literal '{text}'"), span))?;
        let kind = if is_float {
            TokenKind::Float(value)
        } else {
            TokenKind::Integer(value)
        };
        self.tokens.push(Token { kind, span });
        Ok(())
    }

    fn take_digits(&mut self, out: &mut String) {
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() {
                self.bump();
                out.push(ch);
            } else {
                break;
            }
        }
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> &'a str {
        let start = self.idx;
        while let Some(ch) = self.peek_char() {
            if keep(ch) {
                self.bump();
            } else {
                break;
            }
        }
        &self.src[start..self.idx]
    }

    fn op(&mut self, kind: TokenKind) {
        let start = self.idx;
        self.bump();
        self.push(kind, start);
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start, self.idx),
        });
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.chars.clone().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        self.idx += ch.len_utf8();
        Some(ch)
    }
}

/// Parse a formula into an [`Expr`] against the given registries.
///
/// Function names are resolved and arity-checked here; identifiers that
/// match a registered constant are inlined as [`Expr::Constant`] so the
/// optimizer can fold expressions over them.
pub fn parse_formula(
    formula: &str,
    locale: &LocaleConfig,
    functions: &FunctionRegistry,
    constants: &ConstantRegistry,
) -> Result<Expr, ParseError> {
    let tokens = lex(formula, locale)?;
    let mut parser = Parser {
        src: formula,
        tokens,
        pos: 0,
        depth: 0,
        functions,
        constants,
    };
    let expr = parser.parse_expression(0)?;
    let trailing = parser.next();
    if trailing.kind != TokenKind::Eof {
        return Err(parser.unexpected(&trailing));
    }
    Ok(expr)
}

/// Binding power of the unary minus operand: tighter than `* / %`, looser
/// than `^`, so `-2^2` parses as `-(2^2)` and `-2*3` as `(-2)*3`.
const UNARY_RHS_BP: u8 = 8;

fn infix_binding_power(op: BinaryOp) -> (u8, u8) {
    match op {
        BinaryOp::Add | BinaryOp::Sub => (5, 6),
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => (7, 8),
        // right associative
        BinaryOp::Pow => (9, 9),
    }
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    functions: &'a FunctionRegistry,
    constants: &'a ConstantRegistry,
}

impl<'a> Parser<'a> {
    fn parse_expression(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        if self.depth >= MAX_NESTED_EXPRS {
            return Err(ParseError::new(
                format!("expression nesting exceeds the {MAX_NESTED_EXPRS}-level limit"),
                self.current_span(),
            ));
        }
        self.depth += 1;
        let result = self.parse_expression_inner(min_bp);
        self.depth -= 1;
        result
    }

    fn parse_expression_inner(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                TokenKind::Caret => BinaryOp::Pow,
                _ => break,
            };
            let (l_bp, r_bp) = infix_binding_power(op);
            if l_bp < min_bp {
                break;
            }
            self.next(); // consume operator
            let rhs = self.parse_expression(r_bp)?;
            lhs = Expr::Binary {
                op,
                left: Box::new(lhs),
                right: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let token = self.next();
        match token.kind {
            TokenKind::Integer(value) | TokenKind::Float(value) => Ok(Expr::Constant(value)),
            TokenKind::Minus => {
                let expr = self.parse_expression(UNARY_RHS_BP)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(expr),
                })
            }
            TokenKind::LParen => {
                let expr = self.parse_expression(0)?;
                let close = self.next();
                if close.kind != TokenKind::RParen {
                    return Err(ParseError::new("expected ')'", close.span));
                }
                Ok(expr)
            }
            TokenKind::Ident(name) => {
                if *self.peek_kind() == TokenKind::LParen {
                    self.parse_call(&name, token.span)
                } else if let Some(constant) = self.constants.lookup(&name) {
                    Ok(Expr::Constant(constant.value()))
                } else {
                    Ok(Expr::Variable(Arc::from(name)))
                }
            }
            TokenKind::Eof => Err(ParseError::new("unexpected end of formula", token.span)),
            _ => Err(self.unexpected(&token)),
        }
    }

    fn parse_call(&mut self, name: &str, name_span: Span) -> Result<Expr, ParseError> {
        let open = self.next(); // '('
        let mut args = Vec::new();
        if *self.peek_kind() != TokenKind::RParen {
            loop {
                args.push(self.parse_expression(0)?);
                match self.peek_kind() {
                    TokenKind::ArgSep => {
                        self.next();
                    }
                    TokenKind::RParen => break,
                    TokenKind::Eof => {
                        return Err(ParseError::new(
                            format!("unclosed call to function '{name}'"),
                            open.span,
                        ));
                    }
                    _ => {
                        let token = self.next();
                        return Err(self.unexpected(&token));
                    }
                }
            }
        }
        self.next(); // ')'

        let Some(func) = self.functions.lookup(name) else {
            return Err(ParseError::new(
                format!("unknown function '{name}'"),
                name_span,
            ));
        };
        if !func.arity().accepts(args.len()) {
            let message = match func.arity() {
                Arity::Fixed(expected) => format!(
                    "function '{name}' expects {expected} arguments, got {}",
                    args.len()
                ),
                Arity::Variadic => format!(
                    "function '{name}' expects at least {VARIADIC_MIN_ARGS} argument, got {}",
                    args.len()
                ),
            };
            return Err(ParseError::new(message, name_span));
        }
        Ok(Expr::Call {
            func: Arc::clone(func),
            args,
        })
    }

    fn unexpected(&self, token: &Token) -> ParseError {
        let text = &self.src[token.span.start..token.span.end];
        ParseError::new(format!("unexpected token '{text}'"), token.span)
    }

    fn next(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants;
    use crate::functions;

    fn registries() -> (FunctionRegistry, ConstantRegistry) {
        let mut funcs = FunctionRegistry::default();
        functions::register_defaults(&mut funcs);
        let mut consts = ConstantRegistry::default();
        constants::register_defaults(&mut consts);
        (funcs, consts)
    }

    fn parse(formula: &str) -> Result<Expr, ParseError> {
        let (funcs, consts) = registries();
        parse_formula(formula, &LocaleConfig::en_us(), &funcs, &consts)
    }

    #[test]
    fn lexes_numbers_identifiers_and_operators() {
        let tokens = lex("2.5e2 + foo_1*BAR", &LocaleConfig::en_us()).unwrap();
        let kinds: Vec<TokenKind> = tokens.into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Float(250.0),
                TokenKind::Plus,
                TokenKind::Ident("foo_1".to_string()),
                TokenKind::Star,
                TokenKind::Ident("bar".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn integer_is_not_split_by_foreign_decimal_separator() {
        // In en-US `,` is the argument separator, so `1,5` is two integers.
        let tokens = lex("1,5", &LocaleConfig::en_us()).unwrap();
        let kinds: Vec<TokenKind> = tokens.into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Integer(1.0),
                TokenKind::ArgSep,
                TokenKind::Integer(5.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn de_de_lexes_comma_decimals() {
        let tokens = lex("1,5", &LocaleConfig::de_de()).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Float(1.5));
    }

    #[test]
    fn exponent_without_digits_rolls_back_to_identifier() {
        let tokens = lex("1.5ex", &LocaleConfig::en_us()).unwrap();
        let kinds: Vec<TokenKind> = tokens.into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Float(1.5),
                TokenKind::Ident("ex".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unknown_character_reports_position() {
        let err = lex("1 + $x", &LocaleConfig::en_us()).unwrap_err();
        assert_eq!(err.span, Span::new(4, 5));
        assert!(err.message.contains('$'));
    }

    #[test]
    fn power_is_right_associative() {
        let expr = parse("2^3^2").unwrap();
        assert_eq!(expr.to_string(), "2 ^ 3 ^ 2");
        match expr {
            Expr::Binary {
                op: BinaryOp::Pow,
                right,
                ..
            } => assert!(matches!(
                *right,
                Expr::Binary {
                    op: BinaryOp::Pow,
                    ..
                }
            )),
            other => panic!("expected power node, got {other:?}"),
        }
    }

    #[test]
    fn unary_minus_binds_looser_than_power() {
        let expr = parse("-2^2").unwrap();
        assert!(matches!(
            expr,
            Expr::Unary {
                op: UnaryOp::Neg,
                ..
            }
        ));
        assert_eq!(expr.to_string(), "-2 ^ 2");
    }

    #[test]
    fn negated_power_base_displays_parenthesized() {
        let expr = parse("(-2)^2").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::Pow, .. }));
        assert_eq!(expr.to_string(), "(-2) ^ 2");
    }

    #[test]
    fn display_round_trips_through_the_parser() {
        // Call nodes compare by resolved entry identity, so both parses must
        // resolve against the same registries.
        let (funcs, consts) = registries();
        let locale = LocaleConfig::en_us();
        let parse = |formula: &str| parse_formula(formula, &locale, &funcs, &consts).unwrap();

        for formula in [
            "(-2)^2",
            "-2^2",
            "(2^3)^2",
            "2^3^2",
            "2^-1",
            "-(x*y)",
            "x*-y",
            "-x + y",
            "(1+2)*3",
            "10-2-3",
            "10-(2-3)",
            "--x",
            "max(x+1, ifless(x,y,1,0))",
        ] {
            let expr = parse(formula);
            let reparsed = parse(&expr.to_string());
            assert_eq!(reparsed, expr, "{formula} -> {expr}");
        }
    }

    #[test]
    fn unary_minus_binds_tighter_than_multiplication() {
        let expr = parse("-2*3").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn constants_are_inlined_at_parse_time() {
        assert_eq!(parse("pi").unwrap(), Expr::Constant(std::f64::consts::PI));
        assert!(matches!(parse("x").unwrap(), Expr::Variable(_)));
    }

    #[test]
    fn call_arity_is_validated() {
        let err = parse("max(1)").unwrap_err();
        assert!(err.message.contains("expects 2 arguments, got 1"));

        let err = parse("sin(1,2)").unwrap_err();
        assert!(err.message.contains("expects 1 arguments, got 2"));

        let err = parse("avg()").unwrap_err();
        assert!(err.message.contains("at least 1 argument"));
    }

    #[test]
    fn unknown_function_is_rejected() {
        let err = parse("frobnicate(1)").unwrap_err();
        assert!(err.message.contains("unknown function 'frobnicate'"));
        assert_eq!(err.span.start, 0);
    }

    #[test]
    fn structural_errors_carry_spans() {
        // trailing operator
        let err = parse("1+").unwrap_err();
        assert_eq!(err.message, "unexpected end of formula");

        // empty sub-expression
        let err = parse("()").unwrap_err();
        assert!(err.message.contains("unexpected token ')'"));

        // unmatched brackets
        let err = parse("(1+2").unwrap_err();
        assert_eq!(err.message, "expected ')'");
        let err = parse("1+2)").unwrap_err();
        assert!(err.message.contains("unexpected token ')'"));
    }

    #[test]
    fn nesting_guard_rejects_pathological_formulas() {
        let formula = format!("{}1{}", "(".repeat(80), ")".repeat(80));
        let err = parse(&formula).unwrap_err();
        assert!(err.message.contains("nesting"));
    }
}
