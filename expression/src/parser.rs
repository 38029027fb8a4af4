use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest_derive::Parser;

use crate::{
    ExpressionErrors, Function,
    node::{Node, Operator},
};

#[derive(Parser)]
#[grammar = "expression.pest"]
pub struct ExpressionParser;

pub(crate) fn parse(source: &str) -> Result<Node, ExpressionErrors> {
    let mut pairs = ExpressionParser::parse(Rule::equation, source)
        .map_err(|e| ExpressionErrors::Syntax(Box::new(e)))?;
    let expr = next_pair(&mut pairs, "equation")?;
    parse_expr(expr)
}

fn next_pair<'i>(
    pairs: &mut Pairs<'i, Rule>,
    context: &str,
) -> Result<Pair<'i, Rule>, ExpressionErrors> {
    pairs
        .next()
        .ok_or_else(|| ExpressionErrors::EmptyPairs(context.to_string()))
}

fn parse_expr(pair: Pair<Rule>) -> Result<Node, ExpressionErrors> {
    match pair.as_rule() {
        Rule::expr => {
            let inner_pair = next_pair(&mut pair.into_inner(), "expr")?;
            parse_expr(inner_pair)
        }
        Rule::additive | Rule::multiplicative => {
            let mut inner_pairs = pair.into_inner();
            let mut node = parse_expr(next_pair(&mut inner_pairs, "operand")?)?;

            while let (Some(op_pair), Some(right_pair)) = (inner_pairs.next(), inner_pairs.next()) {
                let op = match op_pair.as_rule() {
                    Rule::add => Operator::Add,
                    Rule::sub => Operator::Sub,
                    Rule::mul => Operator::Mul,
                    Rule::div => Operator::Div,
                    rule => return Err(ExpressionErrors::UnexpectedRule(rule)),
                };
                node = Node::Binary {
                    op,
                    lhs: Box::new(node),
                    rhs: Box::new(parse_expr(right_pair)?),
                };
            }
            Ok(node)
        }
        Rule::prefix => {
            let mut negations = 0;
            let mut operand = None;
            for inner in pair.into_inner() {
                match inner.as_rule() {
                    Rule::neg => negations += 1,
                    _ => operand = Some(parse_expr(inner)?),
                }
            }
            let mut node = operand.ok_or_else(|| ExpressionErrors::EmptyPairs("prefix".into()))?;
            for _ in 0..negations {
                node = Node::Negate(Box::new(node));
            }
            Ok(node)
        }
        Rule::exponential => {
            let mut inner_pairs = pair.into_inner();
            let base = parse_expr(next_pair(&mut inner_pairs, "exponential")?)?;
            match (inner_pairs.next(), inner_pairs.next()) {
                (Some(_pow), Some(exponent)) => Ok(Node::Binary {
                    op: Operator::Pow,
                    lhs: Box::new(base),
                    rhs: Box::new(parse_expr(exponent)?),
                }),
                _ => Ok(base),
            }
        }
        Rule::number => pair
            .as_str()
            .parse::<f64>()
            .map(Node::Number)
            .map_err(|_| ExpressionErrors::InvalidNumber(pair.as_str().to_string())),
        Rule::identifier => Ok(Node::Variable(pair.as_str().to_string())),
        Rule::function_call => {
            let mut inner_pairs = pair.into_inner();
            let name = next_pair(&mut inner_pairs, "function_call")?.as_str();
            let function = Function::from_name(name)
                .ok_or_else(|| ExpressionErrors::FunctionNotFound(name.to_string()))?;

            let args = match inner_pairs.next() {
                Some(arguments) => arguments
                    .into_inner()
                    .map(parse_expr)
                    .collect::<Result<Vec<_>, _>>()?,
                None => Vec::new(),
            };
            if args.len() != function.arity() {
                return Err(ExpressionErrors::NumberOfArgs {
                    function: name.to_string(),
                    expected: function.arity(),
                    got: args.len(),
                });
            }
            Ok(Node::Call { function, args })
        }
        rule => Err(ExpressionErrors::UnexpectedRule(rule)),
    }
}
