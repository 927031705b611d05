//! Recursive-descent query parser.
//!
//! Grammar:
//!
//! ```text
//! expression := term {'||' term}
//! term       := factor {'&&' factor}
//! factor     := boolean | comparison | '!' factor | '(' expression ')'
//! comparison := identifier ('=='|'!='|'~'|'!~') string
//! ```

use super::ast::{Ast, Comparison, Operand, Operator};
use super::lexer::{Lexer, Token, TokenKind};
use super::SyntaxError;

/// Deepest run of nested `(` and `!` accepted.
pub(crate) const MAX_NESTING: usize = 256;

/// Parser with one token of lookahead.
pub(crate) struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            depth: 0,
        }
    }

    /// Parse a whole query; trailing input is an error.
    pub(crate) fn parse(mut self) -> Result<Ast, SyntaxError> {
        let ast = self.expression()?;
        match self.current.kind {
            TokenKind::Eof => Ok(ast),
            _ => Err(self.unexpected()),
        }
    }

    fn advance(&mut self) -> Token {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.current, next)
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(self.current.line, self.current.column, message)
    }

    fn unexpected(&self) -> SyntaxError {
        match self.current.kind {
            TokenKind::Error => self.error(self.current.value.clone()),
            TokenKind::Eof => self.error("unexpected end of input"),
            TokenKind::RightParen => self.error("unexpected right parenthesis"),
            _ => self.error(format!("unexpected '{}'", self.current.value)),
        }
    }

    /// Run `f` one nesting level deeper. Past the limit, fails at the
    /// opening token.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("query nested too deeply"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn expression(&mut self) -> Result<Ast, SyntaxError> {
        let mut items = vec![self.term()?];
        while self.current.kind == TokenKind::Or {
            self.advance();
            items.push(self.term()?);
        }
        Ok(chain(items, Ast::Or))
    }

    fn term(&mut self) -> Result<Ast, SyntaxError> {
        let mut items = vec![self.factor()?];
        while self.current.kind == TokenKind::And {
            self.advance();
            items.push(self.factor()?);
        }
        Ok(chain(items, Ast::And))
    }

    fn factor(&mut self) -> Result<Ast, SyntaxError> {
        match self.current.kind {
            TokenKind::Boolean => {
                let token = self.advance();
                Ok(Ast::Boolean(token.value == "true"))
            }
            TokenKind::Identifier => self.comparison(),
            TokenKind::Not => {
                let inner = self.nested(|p| {
                    p.advance();
                    p.factor()
                })?;
                Ok(Ast::Not(Box::new(inner)))
            }
            TokenKind::LeftParen => {
                let inner = self.nested(|p| {
                    p.advance();
                    p.expression()
                })?;
                if self.current.kind != TokenKind::RightParen {
                    return Err(match self.current.kind {
                        TokenKind::Error => self.unexpected(),
                        _ => self.error("missing right parenthesis"),
                    });
                }
                self.advance();
                Ok(inner)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn comparison(&mut self) -> Result<Ast, SyntaxError> {
        let identifier = self.advance();

        let operator = match self.current.kind {
            TokenKind::Equal => Operator::Equal,
            TokenKind::NotEqual => Operator::NotEqual,
            TokenKind::Matches => Operator::Matches,
            TokenKind::NotMatches => Operator::NotMatches,
            TokenKind::Error => return Err(self.unexpected()),
            _ => return Err(self.error("comparison operator expected")),
        };
        let operator_token = self.advance();

        if self.current.kind != TokenKind::String {
            return Err(match self.current.kind {
                TokenKind::Error => self.unexpected(),
                _ => self.error("string value expected"),
            });
        }
        let value = self.advance();

        Ok(Ast::Comparison(Comparison {
            operator,
            left: Operand::Identifier(identifier.value),
            right: Operand::String(value.value),
            line: operator_token.line,
            column: operator_token.column,
        }))
    }
}

/// A single operand stands alone; longer chains become one n-ary node.
fn chain(mut items: Vec<Ast>, node: fn(Vec<Ast>) -> Ast) -> Ast {
    if items.len() == 1 {
        if let Some(only) = items.pop() {
            return only;
        }
    }
    node(items)
}
