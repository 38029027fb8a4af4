//! A small sandboxed arithmetic language for right-hand sides of ODEs.
//!
//! Expressions are parsed once with a pest grammar into a [`Node`] tree and
//! evaluated against a [`Scope`] that binds variable names to values. Only
//! arithmetic, the named constants `pi` and `e` and the functions listed in
//! [`Function`] are available.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod functions;
mod node;
mod parser;

pub use functions::Function;
pub use node::{Node, Operator, constant};
pub use parser::Rule;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ExpressionErrors {
    #[error("pest parsing pairs were empty: {0}")]
    EmptyPairs(String),
    #[error("function not found: {0}")]
    FunctionNotFound(String),
    #[error("invalid number: {0}")]
    InvalidNumber(String),
    #[error("incorrect number of args to function '{function}'. expected {expected}, got {got}")]
    NumberOfArgs {
        function: String,
        expected: usize,
        got: usize,
    },
    #[error("{0}")]
    Syntax(Box<pest::error::Error<Rule>>),
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),
    #[error("unexpected rule: {0:?}")]
    UnexpectedRule(Rule),
}

/// Resolves variable names during evaluation.
pub trait Scope {
    fn value(&self, name: &str) -> Option<f64>;
}

impl Scope for HashMap<String, f64> {
    fn value(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl Scope for [(&str, f64)] {
    fn value(&self, name: &str) -> Option<f64> {
        self.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }
}

impl<const N: usize> Scope for [(&str, f64); N] {
    fn value(&self, name: &str) -> Option<f64> {
        self.as_slice().value(name)
    }
}

impl<S: Scope + ?Sized> Scope for &S {
    fn value(&self, name: &str) -> Option<f64> {
        (**self).value(name)
    }
}

/// A parsed expression together with the text it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Expression {
    source: String,
    root: Node,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, ExpressionErrors> {
        let root = parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn eval<S: Scope + ?Sized>(&self, scope: &S) -> Result<f64, ExpressionErrors> {
        self.root.eval(scope)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Identifiers referenced by the expression, including constants.
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.root.collect_variables(&mut names);
        names
    }
}

impl FromStr for Expression {
    type Err = ExpressionErrors;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Expression {
    type Error = ExpressionErrors;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        let root = parser::parse(&value)?;
        Ok(Self {
            source: value,
            root,
        })
    }
}

impl From<Expression> for String {
    fn from(value: Expression) -> Self {
        value.source
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}
