//! Compiler from policy scripts to runnable programs.
//!
//! The compiler asks its [`FrontEnd`] for a syntax tree, then lowers the tree
//! to an instruction [`Program`]. Compilation never touches a
//! [`State`](crate::state::State): checks that depend on state contents
//! (identifier existence, duplicate locals, lifecycle families, year ranges)
//! happen when the program runs.
//!
//! ## Example
//!
//! ```
//! use plastics_core::{Compiler, State};
//! use rand::SeedableRng;
//!
//! let compiler = Compiler::default();
//! let result = compiler.compile("out.test = (in.test + 1) * 2;");
//! let program = result.program.unwrap();
//!
//! let mut state = State::new();
//! state.inputs.insert("test".to_string(), 4.0);
//! let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(0);
//! program.run(&mut state, &mut rng).unwrap();
//! assert_eq!(state.out["test"], plastics_core::LedgerEntry::Value(10.0));
//! ```

mod instruction;
mod lower;


use std::sync::Arc;

use tracing::debug;

use crate::errors::Error;
use crate::options::{CompilationOptions, DEFAULT_MAX_REPEATS};
use crate::parser::{FrontEnd, PestFrontEnd, ast};

pub use instruction::Program;

/// Outcome of compiling one script.
///
/// `program` is `None` when there were errors or when the script is blank.
#[derive(Debug, Clone)]
pub struct CompileResult {
    pub program: Option<Arc<Program>>,
    pub errors: Vec<Error>,
}

impl CompileResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Error messages in the form shown next to a lever's editor.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }
}

pub struct Compiler {
    front_end: Arc<dyn FrontEnd>,
    max_repeats: usize,
}

impl Compiler {
    pub fn new(front_end: Arc<dyn FrontEnd>) -> Self {
        Self {
            front_end,
            max_repeats: DEFAULT_MAX_REPEATS,
        }
    }

    pub fn with_options(options: &CompilationOptions) -> Self {
        Self {
            front_end: Arc::new(PestFrontEnd::new(options.max_depth)),
            max_repeats: options.max_repeats,
        }
    }

    /// Parse and lower a script.
    ///
    /// Syntax errors stop compilation before lowering starts.
    pub fn compile(&self, source: &str) -> CompileResult {
        if source.trim().is_empty() {
            return CompileResult {
                program: None,
                errors: Vec::new(),
            };
        }

        let tree = match self.front_end.parse(source) {
            Ok(tree) => tree,
            Err(errors) => {
                debug!(errors = errors.len(), "Script has syntax errors");
                return CompileResult {
                    program: None,
                    errors: errors.into_iter().map(Error::from).collect(),
                };
            }
        };

        match self.compile_tree(&tree) {
            // Only comments: nothing to apply.
            Ok(program) if program.is_empty() => CompileResult {
                program: None,
                errors: Vec::new(),
            },
            Ok(program) => {
                debug!(statements = program.len(), "Compiled script");
                CompileResult {
                    program: Some(Arc::new(program)),
                    errors: Vec::new(),
                }
            }
            Err(errors) => {
                debug!(errors = errors.len(), "Script has compile errors");
                CompileResult {
                    program: None,
                    errors,
                }
            }
        }
    }

    /// Lower an already parsed script.
    pub fn compile_tree(&self, tree: &ast::Program) -> Result<Program, Vec<Error>> {
        lower::lower(tree, self.max_repeats).map_err(|errors| errors.into_iter().map(Error::from).collect())
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(Arc::new(PestFrontEnd::default()))
    }
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler").finish_non_exhaustive()
    }
}
