use serde::Serialize;

use crate::parser::{BinaryOp, ComparisonOp, DistributeMethod, ReduceOp, Span};

/// A parsed script: statements in source order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StatementKind {
    /// `var NAME = EXPR;`
    Definition { name: String, value: Expr },
    /// `PATH = EXPR;`
    Assignment { target: String, value: Expr },
    /// `limit PATH to [LOW, HIGH];` where either bound may be omitted.
    Limit {
        target: String,
        lower: Option<Expr>,
        upper: Option<Expr>,
    },
    /// `distribute EXPR across [ID (by W)?, ...] proportionally|linearly;`
    Distribute {
        value: Expr,
        targets: Vec<DistributeTarget>,
        method: DistributeMethod,
    },
    /// `change PATH by DELTA over START to END;`
    Change {
        target: String,
        delta: Expr,
        start: Expr,
        end: Expr,
    },
    /// `inspect EXPR;` keeps the source text of the expression as its label.
    Inspect { source: String, value: Expr },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributeTarget {
    pub identifier: String,
    pub weight: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Number(f64),
    Ident(String),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `then_branch if cond else else_branch`
    Conditional {
        cond: Box<Condition>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Lifecycle(Vec<String>),
    DrawUniform {
        low: Box<Expr>,
        high: Box<Expr>,
    },
    DrawNormal {
        mean: Box<Expr>,
        std_dev: Box<Expr>,
    },
    Repeat {
        op: ReduceOp,
        count: Box<Expr>,
        body: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    pub op: ComparisonOp,
    pub left: Expr,
    pub right: Expr,
}
