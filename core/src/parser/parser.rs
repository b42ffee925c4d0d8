use lazy_static::lazy_static;
use pest::Parser;
use pest::error::ErrorVariant;
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;

use crate::parser::ast::{Condition, DistributeTarget, Expr, Program, Statement, StatementKind};
use crate::parser::error::convert_pest_error;
use crate::parser::{BinaryOp, ComparisonOp, DistributeMethod, ReduceOp, Span, SyntaxError};

/// Default limit on how deeply expressions may nest.
pub const DEFAULT_MAX_DEPTH: usize = 500;

lazy_static! {
    // Note: precedence is defined lowest to highest.
    static ref PRATT_PARSER: PrattParser<Rule> = PrattParser::new()
        .op(
            Op::infix(Rule::add, Assoc::Left) |
            Op::infix(Rule::sub, Assoc::Left)
        )                                               // `+`, `-`
        .op(
            Op::infix(Rule::mul, Assoc::Left) |
            Op::infix(Rule::div, Assoc::Left)
        )                                               // `*`, `/`
        .op(Op::infix(Rule::pow, Assoc::Right))          // `^` (right-assoc)
        ;
}

#[derive(Parser)]
#[grammar = "parser/plastics.pest"]
pub struct ScriptParser;

type PestError = pest::error::Error<Rule>;

/// Parse a policy script into a syntax tree.
pub fn parse(source: &str) -> Result<Program, SyntaxError> {
    parse_with_max_depth(source, DEFAULT_MAX_DEPTH)
}

/// Parse a policy script, rejecting expressions nested deeper than `max_depth`.
pub fn parse_with_max_depth(source: &str, max_depth: usize) -> Result<Program, SyntaxError> {
    let mut pairs = ScriptParser::parse(Rule::program, source).map_err(convert_pest_error)?;
    let program = pairs.next().ok_or_else(|| {
        SyntaxError::new(1, 1, Span::new(0, 0), "expected statement".to_string())
    })?;

    let walker = Walker { max_depth };
    let mut statements = Vec::new();
    for pair in program.into_inner() {
        if pair.as_rule() == Rule::EOI {
            break;
        }
        statements.push(walker.statement(pair).map_err(convert_pest_error)?);
    }
    Ok(Program { statements })
}

fn custom_error(message: impl Into<String>, span: pest::Span<'_>) -> PestError {
    PestError::new_from_span(
        ErrorVariant::CustomError {
            message: message.into(),
        },
        span,
    )
}

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_var
            | Rule::kw_limit
            | Rule::kw_to
            | Rule::kw_distribute
            | Rule::kw_across
            | Rule::kw_by
            | Rule::kw_lifecycle
            | Rule::kw_of
            | Rule::kw_change
            | Rule::kw_over
            | Rule::kw_draw
            | Rule::kw_uniformly
            | Rule::kw_normally
            | Rule::kw_from
            | Rule::kw_mean
            | Rule::kw_std
            | Rule::kw_repeats
            | Rule::kw_inspect
            | Rule::kw_if
            | Rule::kw_else
    )
}

/// Inner pairs of a rule with keyword tokens filtered out.
struct Children<'i> {
    span: pest::Span<'i>,
    pairs: std::vec::IntoIter<Pair<'i, Rule>>,
}

impl<'i> Children<'i> {
    fn of(pair: Pair<'i, Rule>) -> Self {
        let span = pair.as_span();
        let pairs: Vec<_> = pair
            .into_inner()
            .filter(|p| !is_keyword(p.as_rule()))
            .collect();
        Self {
            span,
            pairs: pairs.into_iter(),
        }
    }

    fn next(&mut self) -> Result<Pair<'i, Rule>, PestError> {
        self.pairs
            .next()
            .ok_or_else(|| custom_error("missing expected pair in rule", self.span))
    }

    fn peek_rule(&self) -> Option<Rule> {
        self.pairs.as_slice().first().map(|p| p.as_rule())
    }
}

struct Walker {
    max_depth: usize,
}

impl Walker {
    fn statement(&self, pair: Pair<Rule>) -> Result<Statement, PestError> {
        let span = pair.as_span();
        let rule = pair.as_rule();
        let mut children = Children::of(pair);

        let kind = match rule {
            Rule::definition => StatementKind::Definition {
                name: children.next()?.as_str().to_string(),
                value: self.expression(children.next()?, 0)?,
            },
            Rule::assignment => StatementKind::Assignment {
                target: children.next()?.as_str().to_string(),
                value: self.expression(children.next()?, 0)?,
            },
            Rule::limit => {
                let target = children.next()?.as_str().to_string();
                let mut lower = None;
                let mut upper = None;
                while let Some(rule) = children.peek_rule() {
                    let bound = children.next()?;
                    let value = Some(self.expression(Children::of(bound).next()?, 0)?);
                    match rule {
                        Rule::lower_bound => lower = value,
                        Rule::upper_bound => upper = value,
                        other => unreachable!("Unexpected rule in limit: {:?}", other),
                    }
                }
                StatementKind::Limit {
                    target,
                    lower,
                    upper,
                }
            }
            Rule::distribute => {
                let value = self.expression(children.next()?, 0)?;
                let mut targets = Vec::new();
                let method = loop {
                    let pair = children.next()?;
                    match pair.as_rule() {
                        Rule::target => targets.push(self.target(pair)?),
                        Rule::proportionally => break DistributeMethod::Proportional,
                        Rule::linearly => break DistributeMethod::Linear,
                        other => unreachable!("Unexpected rule in distribute: {:?}", other),
                    }
                };
                StatementKind::Distribute {
                    value,
                    targets,
                    method,
                }
            }
            Rule::change => StatementKind::Change {
                target: children.next()?.as_str().to_string(),
                delta: self.expression(children.next()?, 0)?,
                start: self.expression(children.next()?, 0)?,
                end: self.expression(children.next()?, 0)?,
            },
            Rule::inspect => {
                let expression = children.next()?;
                StatementKind::Inspect {
                    source: compact_source(expression.as_str()),
                    value: self.expression(expression, 0)?,
                }
            }
            other => unreachable!("Unknown statement: {:?}", other),
        };

        Ok(Statement {
            kind,
            span: span.into(),
        })
    }

    fn target(&self, pair: Pair<Rule>) -> Result<DistributeTarget, PestError> {
        let mut children = Children::of(pair);
        let identifier = children.next()?.as_str().to_string();
        let weight = match children.peek_rule() {
            Some(Rule::weight) => {
                let weight = children.next()?;
                Some(self.expression(Children::of(weight).next()?, 0)?)
            }
            _ => None,
        };
        Ok(DistributeTarget { identifier, weight })
    }

    fn expression(&self, pair: Pair<Rule>, depth: usize) -> Result<Expr, PestError> {
        if depth > self.max_depth {
            return Err(custom_error(
                format!(
                    "Expression nesting depth exceeds maximum of {} levels",
                    self.max_depth
                ),
                pair.as_span(),
            ));
        }

        match pair.as_rule() {
            Rule::expression => {
                let mut children = Children::of(pair);
                let value = self.expression(children.next()?, depth + 1)?;
                match children.peek_rule() {
                    Some(Rule::conditional) => {
                        let mut conditional = Children::of(children.next()?);
                        let cond = self.condition(conditional.next()?, depth + 1)?;
                        let else_branch = self.expression(conditional.next()?, depth + 1)?;
                        Ok(Expr::Conditional {
                            cond: Box::new(cond),
                            then_branch: Box::new(value),
                            else_branch: Box::new(else_branch),
                        })
                    }
                    _ => Ok(value),
                }
            }

            Rule::arithmetic => PRATT_PARSER
                .map_primary(|primary| self.expression(primary, depth + 1))
                .map_infix(|lhs, op, rhs| {
                    let op = match op.as_rule() {
                        Rule::add => BinaryOp::Add,
                        Rule::sub => BinaryOp::Sub,
                        Rule::mul => BinaryOp::Mul,
                        Rule::div => BinaryOp::Div,
                        Rule::pow => BinaryOp::Pow,
                        _ => unreachable!("Unknown binary operator: {:?}", op.as_rule()),
                    };
                    Ok(Expr::Binary {
                        op,
                        left: Box::new(lhs?),
                        right: Box::new(rhs?),
                    })
                })
                .parse(pair.into_inner()),

            Rule::number => {
                // Sign and digits are separate tokens and may have whitespace between them.
                let text: String = pair.as_str().split_whitespace().collect();
                text.parse::<f64>()
                    .map(Expr::Number)
                    .map_err(|e| custom_error(format!("invalid number: {}", e), pair.as_span()))
            }

            Rule::identifier => Ok(Expr::Ident(pair.as_str().to_string())),

            Rule::grouped => self.expression(Children::of(pair).next()?, depth + 1),

            Rule::lifecycle => Ok(Expr::Lifecycle(
                Children::of(pair)
                    .pairs
                    .map(|p| p.as_str().to_string())
                    .collect(),
            )),

            Rule::draw_uniform => {
                let mut children = Children::of(pair);
                Ok(Expr::DrawUniform {
                    low: Box::new(self.expression(children.next()?, depth + 1)?),
                    high: Box::new(self.expression(children.next()?, depth + 1)?),
                })
            }

            Rule::draw_normal => {
                let mut children = Children::of(pair);
                Ok(Expr::DrawNormal {
                    mean: Box::new(self.expression(children.next()?, depth + 1)?),
                    std_dev: Box::new(self.expression(children.next()?, depth + 1)?),
                })
            }

            Rule::repeat => {
                let mut children = Children::of(pair);
                let op = match children.next()?.as_rule() {
                    Rule::reduce_sum => ReduceOp::Sum,
                    Rule::reduce_product => ReduceOp::Product,
                    Rule::reduce_average => ReduceOp::Average,
                    other => unreachable!("Unknown reducer: {:?}", other),
                };
                Ok(Expr::Repeat {
                    op,
                    count: Box::new(self.expression(children.next()?, depth + 1)?),
                    body: Box::new(self.expression(children.next()?, depth + 1)?),
                })
            }

            other => Err(custom_error(
                format!("unexpected rule in expression: {:?}", other),
                pair.as_span(),
            )),
        }
    }

    fn condition(&self, pair: Pair<Rule>, depth: usize) -> Result<Condition, PestError> {
        let mut children = Children::of(pair);
        let left = self.expression(children.next()?, depth + 1)?;
        let op = match children.next()?.as_rule() {
            Rule::eq => ComparisonOp::Eq,
            Rule::neq => ComparisonOp::Neq,
            Rule::lt => ComparisonOp::Lt,
            Rule::gt => ComparisonOp::Gt,
            Rule::lte => ComparisonOp::Lte,
            Rule::gte => ComparisonOp::Gte,
            other => unreachable!("Unknown comparison operator: {:?}", other),
        };
        let right = self.expression(children.next()?, depth + 1)?;
        Ok(Condition { op, left, right })
    }
}

/// Source text of an expression with comments and whitespace removed,
/// so `a  +   2` and `a+2` get the same inspect label.
fn compact_source(text: &str) -> String {
    text.lines()
        .map(|line| {
            let end = [line.find("//"), line.find('#')]
                .into_iter()
                .flatten()
                .min()
                .unwrap_or(line.len());
            &line[..end]
        })
        .flat_map(str::chars)
        .filter(|c| !c.is_whitespace())
        .collect()
}
