//! Parse front end for policy scripts.
//!
//! The compiler never calls the pest parser directly; it is handed a
//! [`FrontEnd`] so that alternative front ends (or test doubles) can be
//! substituted.

pub mod ast;
pub mod error;
pub mod parser;
mod syntax;

pub use error::SyntaxError;
pub use parser::{DEFAULT_MAX_DEPTH, Rule, ScriptParser, parse, parse_with_max_depth};
pub use syntax::{BinaryOp, ComparisonOp, DistributeMethod, ReduceOp, Span};

/// Turns script text into a syntax tree or a list of syntax errors.
pub trait FrontEnd: Send + Sync {
    fn parse(&self, source: &str) -> Result<ast::Program, Vec<SyntaxError>>;
}

/// The pest grammar front end.
#[derive(Debug, Clone)]
pub struct PestFrontEnd {
    max_depth: usize,
}

impl PestFrontEnd {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl Default for PestFrontEnd {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl FrontEnd for PestFrontEnd {
    fn parse(&self, source: &str) -> Result<ast::Program, Vec<SyntaxError>> {
        parse_with_max_depth(source, self.max_depth).map_err(|e| vec![e])
    }
}
