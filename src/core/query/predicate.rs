//! Compiled query predicates.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use regex::Regex;

use super::ast::{Ast, Comparison, Operand, Operator};
use super::SyntaxError;

/// Source of identifier values for predicate evaluation.
///
/// Unknown identifiers must resolve to the empty string.
pub trait Context {
    fn get(&self, identifier: &str) -> &str;
}

impl Context for BTreeMap<String, String> {
    fn get(&self, identifier: &str) -> &str {
        BTreeMap::get(self, identifier).map_or("", String::as_str)
    }
}

impl Context for HashMap<String, String> {
    fn get(&self, identifier: &str) -> &str {
        HashMap::get(self, identifier).map_or("", String::as_str)
    }
}

/// A boolean predicate over a [`Context`].
///
/// Immutable once built; safe to evaluate concurrently.
#[derive(Debug, Clone)]
pub enum Predicate {
    Literal(bool),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Equals { identifier: String, value: String },
    Matches { identifier: String, regex: Regex },
}

impl Predicate {
    /// Matches everything.
    pub const TRUE: Predicate = Predicate::Literal(true);
    /// Matches nothing.
    pub const FALSE: Predicate = Predicate::Literal(false);

    /// Evaluate left to right, short-circuiting `And`/`Or`.
    pub fn eval(&self, context: &dyn Context) -> bool {
        match self {
            Self::Literal(value) => *value,
            Self::And(items) => items.iter().all(|item| item.eval(context)),
            Self::Or(items) => items.iter().any(|item| item.eval(context)),
            Self::Not(item) => !item.eval(context),
            Self::Equals { identifier, value } => context.get(identifier) == value,
            Self::Matches { identifier, regex } => regex.is_match(context.get(identifier)),
        }
    }

    /// Compile a syntax tree. Regexes are built here, once.
    pub fn compile(ast: Ast) -> Result<Self, SyntaxError> {
        match ast {
            Ast::Boolean(value) => Ok(Self::Literal(value)),
            Ast::And(items) => Ok(Self::And(flatten(items, |p| match p {
                Self::And(nested) => Ok(nested),
                other => Err(other),
            })?)),
            Ast::Or(items) => Ok(Self::Or(flatten(items, |p| match p {
                Self::Or(nested) => Ok(nested),
                other => Err(other),
            })?)),
            Ast::Not(inner) => Ok(Self::Not(Box::new(Self::compile(*inner)?))),
            Ast::Comparison(comparison) => Self::comparison(comparison),
        }
    }

    fn comparison(comparison: Comparison) -> Result<Self, SyntaxError> {
        let Comparison {
            operator,
            left,
            right,
            line,
            column,
        } = comparison;

        let (Operand::Identifier(identifier), Operand::String(value)) = (left, right) else {
            return Err(SyntaxError::new(line, column, "invalid comparison"));
        };

        let predicate = match operator {
            Operator::Equal | Operator::NotEqual => Self::Equals { identifier, value },
            Operator::Matches | Operator::NotMatches => {
                let regex = Regex::new(&value).map_err(|e| {
                    SyntaxError::new(line, column, format!("invalid regex '{value}': {e}"))
                })?;
                Self::Matches { identifier, regex }
            }
        };

        Ok(match operator {
            Operator::NotEqual | Operator::NotMatches => Self::Not(Box::new(predicate)),
            Operator::Equal | Operator::Matches => predicate,
        })
    }
}

/// Compile the operands of one `&&`/`||` chain, splicing in nested chains of
/// the same kind.
fn flatten(
    items: Vec<Ast>,
    split: impl Fn(Predicate) -> Result<Vec<Predicate>, Predicate>,
) -> Result<Vec<Predicate>, SyntaxError> {
    let mut flat = Vec::with_capacity(items.len());
    for item in items {
        match split(Predicate::compile(item)?) {
            Ok(nested) => flat.extend(nested),
            Err(single) => flat.push(single),
        }
    }
    Ok(flat)
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[Predicate], sep: &str) -> fmt::Result {
            f.write_str("(")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{item}")?;
            }
            f.write_str(")")
        }

        match self {
            Self::Literal(value) => write!(f, "{value}"),
            Self::And(items) => join(f, items, " && "),
            Self::Or(items) => join(f, items, " || "),
            Self::Not(item) => write!(f, "!{item}"),
            Self::Equals { identifier, value } => write!(f, "({identifier} == {value:?})"),
            Self::Matches { identifier, regex } => {
                write!(f, "({identifier} ~ {:?})", regex.as_str())
            }
        }
    }
}
