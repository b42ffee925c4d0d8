// Common syntax structures shared by the syntax tree and the compiled program.

use core::ops::Range;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span(pub Range<usize>);

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self(start..end)
    }
}

impl From<pest::Span<'_>> for Span {
    fn from(s: pest::Span<'_>) -> Self {
        Self(s.start()..s.end())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            BinaryOp::Add => left + right,
            BinaryOp::Sub => left - right,
            BinaryOp::Mul => left * right,
            BinaryOp::Div => left / right, // IEEE 754: division by zero yields inf/nan
            BinaryOp::Pow => left.powf(right),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum ComparisonOp {
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl ComparisonOp {
    pub fn apply(self, left: f64, right: f64) -> bool {
        match self {
            ComparisonOp::Eq => left == right,
            ComparisonOp::Neq => left != right,
            ComparisonOp::Lt => left < right,
            ComparisonOp::Gt => left > right,
            ComparisonOp::Lte => left <= right,
            ComparisonOp::Gte => left >= right,
        }
    }
}

/// How the samples of a `sum|product|average N repeats of EXPR` are combined.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum ReduceOp {
    Sum,
    Product,
    Average,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum DistributeMethod {
    /// Split in proportion to each target's weight.
    Proportional,
    /// Split equally across all targets.
    Linear,
}
