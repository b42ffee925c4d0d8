//! Compiled instructions and their interpreter.
//!
//! Expressions only read the [`State`]; statements write to it. Every
//! identifier is resolved to a [`Path`] at compile time.

use rand::{Rng, RngCore};
use rand_distr::{Distribution, Normal};
use tracing::trace;

use crate::errors::RuntimeError;
use crate::parser::{BinaryOp, ComparisonOp, DistributeMethod, ReduceOp};
use crate::state::{InspectRecord, Path, State};

/// Changes smaller than this are not distributed.
const DISTRIBUTE_EPSILON: f64 = 1e-7;

/// A compiled script: statements run in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub(crate) statements: Vec<Statement>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Run every statement against `state`, stopping at the first failure.
    pub fn run(&self, state: &mut State, rng: &mut dyn RngCore) -> Result<(), RuntimeError> {
        for statement in &self.statements {
            statement.run(state, rng)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Statement {
    Define {
        name: String,
        value: Expression,
    },
    Assign {
        target: Path,
        value: Expression,
    },
    Limit {
        target: Path,
        lower: Option<Expression>,
        upper: Option<Expression>,
    },
    Distribute {
        value: Expression,
        targets: Vec<(Path, Option<Expression>)>,
        method: DistributeMethod,
    },
    Change {
        target: Path,
        delta: Expression,
        start: Expression,
        end: Expression,
    },
    Inspect {
        name: String,
        value: Expression,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expression {
    Number(f64),
    Read(Path),
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Conditional {
        cond: Box<Comparison>,
        then_branch: Box<Expression>,
        else_branch: Box<Expression>,
    },
    Lifecycle(Lifecycle),
    DrawUniform {
        low: Box<Expression>,
        high: Box<Expression>,
    },
    DrawNormal {
        mean: Box<Expression>,
        std_dev: Box<Expression>,
    },
    Repeat {
        op: ReduceOp,
        count: Box<Expression>,
        body: Box<Expression>,
        /// Largest count accepted at runtime.
        max: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Comparison {
    pub op: ComparisonOp,
    pub left: Expression,
    pub right: Expression,
}

/// A `lifecycle of [...]` query, classified when the program is built.
///
/// Mixed and unknown lists still compile; they fail when evaluated.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Lifecycle {
    /// All paths are end-of-life attributes, which share one lifetime input.
    EndOfLife(Path),
    /// Pairs of (ledger path, lifetime input path).
    Consumption(Vec<(Path, Path)>),
    Mixed,
    Unknown(String),
}

impl Statement {
    fn run(&self, state: &mut State, rng: &mut dyn RngCore) -> Result<(), RuntimeError> {
        match self {
            Statement::Define { name, value } => {
                let value = value.eval(state, rng)?;
                state.define_local(name, value)
            }

            Statement::Assign { target, value } => {
                let value = value.eval(state, rng)?;
                state.set(target, value)
            }

            Statement::Limit {
                target,
                lower,
                upper,
            } => {
                let lower = lower.as_ref().map(|e| e.eval(state, rng)).transpose()?;
                let upper = upper.as_ref().map(|e| e.eval(state, rng)).transpose()?;
                let current = state.get(target)?;
                let limited = match (lower, upper) {
                    (_, Some(upper)) if current > upper => upper,
                    (Some(lower), _) if current < lower => lower,
                    _ => current,
                };
                state.set(target, limited)
            }

            Statement::Distribute {
                value,
                targets,
                method,
            } => {
                let amount = value.eval(state, rng)?;
                if amount.abs() < DISTRIBUTE_EPSILON {
                    return Ok(());
                }

                let mut before = Vec::with_capacity(targets.len());
                let mut weights = Vec::with_capacity(targets.len());
                for (path, weight) in targets {
                    let current = state.get(path)?;
                    before.push(current);
                    weights.push(match weight {
                        Some(weight) => weight.eval(state, rng)?,
                        None => current,
                    });
                }

                let total: f64 = weights.iter().sum();
                let count = targets.len() as f64;
                for (i, (path, _)) in targets.iter().enumerate() {
                    if before[i] == 0.0 {
                        continue;
                    }
                    let share = match method {
                        DistributeMethod::Proportional if total != 0.0 => weights[i] / total,
                        _ => 1.0 / count,
                    };
                    state.set(path, before[i] + amount * share)?;
                }
                Ok(())
            }

            Statement::Change {
                target,
                delta,
                start,
                end,
            } => {
                let delta = delta.eval(state, rng)?;
                let start = start.eval(state, rng)?;
                let end = end.eval(state, rng)?;
                if !(start < end) {
                    return Err(RuntimeError::InvalidYearRange { start, end });
                }
                let year = f64::from(state.year()?);
                let slope = delta / (end - start);
                let effective_year = year.min(end);
                let current = state.get(target)?;
                state.set(target, current + slope * (effective_year - start))
            }

            Statement::Inspect { name, value } => {
                let value = value.eval(state, rng)?;
                trace!(name = %name, value, "inspect");
                state.inspect.push(InspectRecord {
                    name: name.clone(),
                    value,
                });
                Ok(())
            }
        }
    }
}

impl Expression {
    pub(crate) fn eval(&self, state: &State, rng: &mut dyn RngCore) -> Result<f64, RuntimeError> {
        match self {
            Expression::Number(value) => Ok(*value),

            Expression::Read(path) => state.get(path),

            Expression::Binary { op, left, right } => {
                let left = left.eval(state, rng)?;
                let right = right.eval(state, rng)?;
                Ok(op.apply(left, right))
            }

            Expression::Conditional {
                cond,
                then_branch,
                else_branch,
            } => {
                let left = cond.left.eval(state, rng)?;
                let right = cond.right.eval(state, rng)?;
                if cond.op.apply(left, right) {
                    then_branch.eval(state, rng)
                } else {
                    else_branch.eval(state, rng)
                }
            }

            Expression::Lifecycle(lifecycle) => lifecycle.eval(state),

            Expression::DrawUniform { low, high } => {
                let low = low.eval(state, rng)?;
                let high = high.eval(state, rng)?;
                // gen_range panics on a range whose width overflows.
                if !(low <= high && (high - low).is_finite()) {
                    return Err(RuntimeError::InvalidDistribution {
                        message: format!("cannot draw uniformly from {} to {}", low, high),
                    });
                }
                Ok(rng.gen_range(low..=high))
            }

            Expression::DrawNormal { mean, std_dev } => {
                let mean = mean.eval(state, rng)?;
                let std_dev = std_dev.eval(state, rng)?;
                if !(std_dev.is_finite() && std_dev >= 0.0) {
                    return Err(RuntimeError::InvalidDistribution {
                        message: format!("standard deviation must be non-negative, got {}", std_dev),
                    });
                }
                let normal = Normal::new(mean, std_dev).map_err(|e| {
                    RuntimeError::InvalidDistribution {
                        message: e.to_string(),
                    }
                })?;
                Ok(normal.sample(rng))
            }

            Expression::Repeat {
                op,
                count,
                body,
                max,
            } => {
                let count = count.eval(state, rng)?;
                if !(count >= 1.0 && count.trunc() <= *max as f64) {
                    return Err(RuntimeError::InvalidRepeatCount { count, max: *max });
                }
                let repeats = count.trunc() as usize;
                let mut acc = match op {
                    ReduceOp::Product => 1.0,
                    ReduceOp::Sum | ReduceOp::Average => 0.0,
                };
                for _ in 0..repeats {
                    let value = body.eval(state, rng)?;
                    match op {
                        ReduceOp::Product => acc *= value,
                        ReduceOp::Sum | ReduceOp::Average => acc += value,
                    }
                }
                if *op == ReduceOp::Average {
                    acc /= repeats as f64;
                }
                Ok(acc)
            }
        }
    }
}

impl Lifecycle {
    fn eval(&self, state: &State) -> Result<f64, RuntimeError> {
        match self {
            Lifecycle::EndOfLife(delay) => state.get(delay),
            Lifecycle::Consumption(pairs) => {
                let mut weighted = 0.0;
                let mut total = 0.0;
                let mut lifetimes = 0.0;
                for (ledger, lifetime) in pairs {
                    let magnitude = state.get(ledger)?;
                    let years = state.get(lifetime)?;
                    weighted += years * magnitude;
                    total += magnitude;
                    lifetimes += years;
                }
                if total == 0.0 {
                    Ok(lifetimes / pairs.len() as f64)
                } else {
                    Ok(weighted / total)
                }
            }
            Lifecycle::Mixed => Err(RuntimeError::MixedLifecycle),
            Lifecycle::Unknown(path) => Err(RuntimeError::UnknownLifecycle { path: path.clone() }),
        }
    }
}
