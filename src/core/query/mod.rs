//! Query language.
//!
//! A small boolean language over secret attributes, used by permission
//! rules, template rules and the `--query` flags:
//!
//! ```text
//! tags.env == "prod" && !(uri ~ "^legacy/")
//! ```
//!
//! Identifiers are `uri` and `tags.<name>`. Anything else, like a tag the
//! secret does not carry, evaluates to the empty string.

mod ast;
mod lexer;
mod parser;
mod predicate;

use thiserror::Error;

pub use ast::{Ast, Comparison, Operand, Operator};
pub use lexer::{Lexer, Token, TokenKind};
pub use predicate::{Context, Predicate};

/// Malformed query text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("syntax error at {line}:{column}: {message}")]
pub struct SyntaxError {
    line: usize,
    column: usize,
    message: String,
}

impl SyntaxError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }

    /// 1-based line of the offending token.
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based column of the offending token.
    pub fn column(&self) -> usize {
        self.column
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Parse query text into an evaluable predicate.
///
/// # Errors
///
/// Returns `SyntaxError` for malformed text, operands of the wrong kind or an
/// invalid regular expression.
pub fn parse(text: &str) -> Result<Predicate, SyntaxError> {
    let ast = parser::Parser::new(text).parse()?;
    Predicate::compile(ast)
}

/// Parse an optional query, defaulting to [`Predicate::TRUE`].
pub fn parse_or_true(text: Option<&str>) -> Result<Predicate, SyntaxError> {
    match text {
        Some(text) if !text.trim().is_empty() => parse(text),
        _ => Ok(Predicate::TRUE),
    }
}
