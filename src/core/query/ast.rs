//! Query syntax tree.

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    Matches,
    NotMatches,
}

/// Either side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Identifier(String),
    String(String),
}

/// `left <operator> right`, with the operator's position for error reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub operator: Operator,
    pub left: Operand,
    pub right: Operand,
    pub line: usize,
    pub column: usize,
}

/// Parsed query, before compilation into a [`Predicate`](super::Predicate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ast {
    Boolean(bool),
    /// Two or more operands of a `||` chain.
    Or(Vec<Ast>),
    /// Two or more operands of a `&&` chain.
    And(Vec<Ast>),
    Not(Box<Ast>),
    Comparison(Comparison),
}
