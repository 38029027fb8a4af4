use std::collections::BTreeSet;

use crate::{ExpressionErrors, Function, Scope};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl Operator {
    fn apply(&self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::Add => lhs + rhs,
            Self::Sub => lhs - rhs,
            Self::Mul => lhs * rhs,
            Self::Div => lhs / rhs,
            Self::Pow => lhs.powf(rhs),
        }
    }
}

/// Parsed expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Number(f64),
    Variable(String),
    Negate(Box<Node>),
    Binary {
        op: Operator,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Call {
        function: Function,
        args: Vec<Node>,
    },
}

impl Node {
    pub fn eval<S: Scope + ?Sized>(&self, scope: &S) -> Result<f64, ExpressionErrors> {
        match self {
            Node::Number(value) => Ok(*value),
            Node::Variable(name) => scope
                .value(name)
                .or_else(|| constant(name))
                .ok_or_else(|| ExpressionErrors::UndefinedVariable(name.clone())),
            Node::Negate(operand) => Ok(-operand.eval(scope)?),
            Node::Binary { op, lhs, rhs } => Ok(op.apply(lhs.eval(scope)?, rhs.eval(scope)?)),
            Node::Call { function, args } => {
                let values = args
                    .iter()
                    .map(|arg| arg.eval(scope))
                    .collect::<Result<Vec<f64>, _>>()?;
                Ok(function.apply(&values))
            }
        }
    }

    pub(crate) fn collect_variables<'a>(&'a self, names: &mut BTreeSet<&'a str>) {
        match self {
            Node::Number(_) => {}
            Node::Variable(name) => {
                names.insert(name.as_str());
            }
            Node::Negate(operand) => operand.collect_variables(names),
            Node::Binary { lhs, rhs, .. } => {
                lhs.collect_variables(names);
                rhs.collect_variables(names);
            }
            Node::Call { args, .. } => {
                for arg in args {
                    arg.collect_variables(names);
                }
            }
        }
    }
}

/// Named constants, visible only when the scope does not shadow them.
pub fn constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        _ => None,
    }
}
