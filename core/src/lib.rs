//! Policy scripting language and projection engine for regional plastics
//! flows.
//!
//! A lever is a named policy variable bound to a short script. Scripts are
//! parsed by the [`parser`], lowered by the [`compiler`] into a [`Program`],
//! and run against a [`State`] once per projected year by the
//! [`BatchEngine`].

pub mod aggregate;
pub mod baseline;
pub mod catalog;
pub mod compiler;
pub mod engine;
pub mod errors;
pub mod frames;
pub mod levers;
pub mod options;
pub mod parser;
pub mod state;
pub mod worker;

pub use baseline::{Baseline, BaselineRecord, BaselineSource};
pub use compiler::{CompileResult, Compiler, Program};
pub use engine::{BatchEngine, RunFailure, RunRequest};
pub use errors::{CompileError, Diagnostic, Error, ErrorKind, RuntimeError, Severity};
pub use frames::{FrameBuilder, FrameError, ProjectionSet};
pub use levers::{CompiledLever, LeverDefinition, LeverRegistry, LeverStatus};
pub use options::{
    CheckOptions, CompilationOptions, DEFAULT_MAX_REPEATS, EngineOptions, Randomness,
};
pub use parser::{FrontEnd, PestFrontEnd, Span, SyntaxError};
pub use state::{Attributes, InspectRecord, LedgerEntry, Path, State};
pub use worker::{RunResponse, Worker, WorkerClient, WorkerError};
