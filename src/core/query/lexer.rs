//! Query tokenizer.
//!
//! A pull-based cursor over the query text. The parser asks for one token at
//! a time with [`Lexer::next_token`]; positions are 1-based and point at the
//! first character of each token.

use std::fmt;

/// Token classes produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Lexing failed; the token value carries the message.
    Error,
    Eof,
    Identifier,
    String,
    Boolean,
    And,
    Or,
    Not,
    LeftParen,
    RightParen,
    Equal,
    NotEqual,
    Matches,
    NotMatches,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Eof => "end of input",
            Self::Identifier => "identifier",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::And => "'&&'",
            Self::Or => "'||'",
            Self::Not => "'!'",
            Self::LeftParen => "'('",
            Self::RightParen => "')'",
            Self::Equal => "'=='",
            Self::NotEqual => "'!='",
            Self::Matches => "'~'",
            Self::NotMatches => "'!~'",
        };
        f.write_str(name)
    }
}

/// A scanned token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Lexeme; unquoted contents for strings, the message for errors.
    pub value: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    fn new(kind: TokenKind, value: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            line,
            column,
        }
    }
}

/// Scan state over a query string.
#[derive(Debug)]
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
            finished: false,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(is_whitespace) {
            self.bump();
        }
    }

    /// Scan the next token.
    ///
    /// Once `Eof` has been returned every further call returns `Eof` again.
    pub fn next_token(&mut self) -> Token {
        use TokenKind::*;

        self.skip_whitespace();
        let (line, column) = (self.line, self.column);
        let start = self.pos;

        let Some(c) = self.bump() else {
            return Token::new(Eof, "", line, column);
        };

        match c {
            '(' => Token::new(LeftParen, "(", line, column),
            ')' => Token::new(RightParen, ")", line, column),
            '~' => Token::new(Matches, "~", line, column),
            '!' if self.eat('=') => Token::new(NotEqual, "!=", line, column),
            '!' if self.eat('~') => Token::new(NotMatches, "!~", line, column),
            '!' => Token::new(Not, "!", line, column),
            '&' if self.eat('&') => Token::new(And, "&&", line, column),
            '|' if self.eat('|') => Token::new(Or, "||", line, column),
            '=' if self.eat('=') => Token::new(Equal, "==", line, column),
            '&' | '|' | '=' => Token::new(
                Error,
                format!("unexpected '{c}', did you mean '{c}{c}'?"),
                line,
                column,
            ),
            '\'' | '"' => self.quoted(c, line, column),
            c if is_word(c) => {
                while self.peek().is_some_and(is_word) {
                    self.bump();
                }
                let word = &self.input[start..self.pos];
                let kind = match word {
                    "true" | "false" => Boolean,
                    _ => Identifier,
                };
                Token::new(kind, word, line, column)
            }
            other => Token::new(
                Error,
                format!("unexpected character '{other}'"),
                line,
                column,
            ),
        }
    }

    fn quoted(&mut self, quote: char, line: usize, column: usize) -> Token {
        let start = self.pos;
        loop {
            match self.bump() {
                Some(c) if c == quote => {
                    let end = self.pos - quote.len_utf8();
                    return Token::new(TokenKind::String, &self.input[start..end], line, column);
                }
                Some(_) => {}
                None => {
                    return Token::new(TokenKind::Error, "unterminated string", line, column);
                }
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    /// Yields tokens up to and including the first `Eof` or `Error`.
    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if matches!(token.kind, TokenKind::Eof | TokenKind::Error) {
            self.finished = true;
        }
        Some(token)
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn is_word(c: char) -> bool {
    c == '_' || c == '.' || c.is_alphanumeric()
}
