//! Lowering from the syntax tree to instructions.

use crate::catalog::{AttributeFamily, RECYCLING_DELAY_INPUT, lifetime_input};
use crate::compiler::instruction::{Comparison, Expression, Lifecycle, Program, Statement};
use crate::errors::CompileError;
use crate::parser::Span;
use crate::parser::ast::{self, Expr, StatementKind};
use crate::state::{Path, Section};

/// Lower a parsed script. All structural errors are collected, not only the first.
pub(crate) fn lower(
    program: &ast::Program,
    max_repeats: usize,
) -> Result<Program, Vec<CompileError>> {
    let mut lowering = Lowering {
        errors: Vec::new(),
        max_repeats,
    };
    let statements: Vec<Statement> = program
        .statements
        .iter()
        .map(|statement| lowering.statement(statement))
        .collect();

    if lowering.errors.is_empty() {
        Ok(Program { statements })
    } else {
        Err(lowering.errors)
    }
}

struct Lowering {
    errors: Vec<CompileError>,
    max_repeats: usize,
}

impl Lowering {
    fn statement(&mut self, statement: &ast::Statement) -> Statement {
        let span = &statement.span;
        match &statement.kind {
            StatementKind::Definition { name, value } => {
                if name.contains('.') {
                    self.errors.push(CompileError::DottedDefinition {
                        name: name.clone(),
                        span: span.clone(),
                    });
                }
                Statement::Define {
                    name: name.clone(),
                    value: self.expression(value, span),
                }
            }
            StatementKind::Assignment { target, value } => Statement::Assign {
                target: Path::parse(target),
                value: self.expression(value, span),
            },
            StatementKind::Limit {
                target,
                lower,
                upper,
            } => Statement::Limit {
                target: Path::parse(target),
                lower: lower.as_ref().map(|e| self.expression(e, span)),
                upper: upper.as_ref().map(|e| self.expression(e, span)),
            },
            StatementKind::Distribute {
                value,
                targets,
                method,
            } => Statement::Distribute {
                value: self.expression(value, span),
                targets: targets
                    .iter()
                    .map(|t| {
                        (
                            Path::parse(&t.identifier),
                            t.weight.as_ref().map(|w| self.expression(w, span)),
                        )
                    })
                    .collect(),
                method: *method,
            },
            StatementKind::Change {
                target,
                delta,
                start,
                end,
            } => Statement::Change {
                target: Path::parse(target),
                delta: self.expression(delta, span),
                start: self.expression(start, span),
                end: self.expression(end, span),
            },
            StatementKind::Inspect { source, value } => Statement::Inspect {
                name: source.clone(),
                value: self.expression(value, span),
            },
        }
    }

    fn expression(&mut self, expr: &Expr, span: &Span) -> Expression {
        match expr {
            Expr::Number(value) => Expression::Number(*value),
            Expr::Ident(name) => Expression::Read(Path::parse(name)),
            Expr::Binary { op, left, right } => Expression::Binary {
                op: *op,
                left: Box::new(self.expression(left, span)),
                right: Box::new(self.expression(right, span)),
            },
            Expr::Conditional {
                cond,
                then_branch,
                else_branch,
            } => Expression::Conditional {
                cond: Box::new(Comparison {
                    op: cond.op,
                    left: self.expression(&cond.left, span),
                    right: self.expression(&cond.right, span),
                }),
                then_branch: Box::new(self.expression(then_branch, span)),
                else_branch: Box::new(self.expression(else_branch, span)),
            },
            Expr::Lifecycle(paths) => Expression::Lifecycle(self.lifecycle(paths, span)),
            Expr::DrawUniform { low, high } => Expression::DrawUniform {
                low: Box::new(self.expression(low, span)),
                high: Box::new(self.expression(high, span)),
            },
            Expr::DrawNormal { mean, std_dev } => Expression::DrawNormal {
                mean: Box::new(self.expression(mean, span)),
                std_dev: Box::new(self.expression(std_dev, span)),
            },
            Expr::Repeat { op, count, body } => Expression::Repeat {
                op: *op,
                count: Box::new(self.expression(count, span)),
                body: Box::new(self.expression(body, span)),
                max: self.max_repeats,
            },
        }
    }

    fn lifecycle(&mut self, raw_paths: &[String], span: &Span) -> Lifecycle {
        let paths: Vec<Path> = raw_paths.iter().map(|p| Path::parse(p)).collect();

        for path in &paths {
            if path.section() != Some(Section::Out) {
                self.errors.push(CompileError::LifecycleOutsideOut {
                    path: path.to_string(),
                    span: span.clone(),
                });
            }
        }

        let mut end_of_life = false;
        let mut consumption = false;
        for path in &paths {
            match AttributeFamily::of(path.last()) {
                Some(AttributeFamily::EndOfLife) => end_of_life = true,
                Some(AttributeFamily::Consumption) => consumption = true,
                _ => return Lifecycle::Unknown(path.to_string()),
            }
        }

        match (end_of_life, consumption) {
            (true, true) => Lifecycle::Mixed,
            (true, false) => {
                Lifecycle::EndOfLife(Path::parse(&format!("in.{}", RECYCLING_DELAY_INPUT)))
            }
            _ => Lifecycle::Consumption(
                paths
                    .into_iter()
                    .map(|path| {
                        let lifetime = Path::parse(&format!("in.{}", lifetime_input(path.last())));
                        (path, lifetime)
                    })
                    .collect(),
            ),
        }
    }
}
