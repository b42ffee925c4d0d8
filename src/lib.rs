//! Plastics - policy levers and projections for regional plastics flows
//!
//! # Overview
//!
//! Each policy lever is a short script in a small purpose-built language.
//! Scripts read and adjust a per-year ledger of plastics quantities:
//!
//! ```text
//! var goal = in.recyclingTarget / 100;
//! distribute out.china.eolLandfillMT * goal
//!     across [out.china.eolRecyclingMT] linearly;
//! ```
//!
//! A projection runs every enabled lever, in priority order, over each
//! projected year of the baseline data.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use plastics::{
//!     Baseline, BaselineRecord, BatchEngine, EngineOptions, LeverDefinition, LeverRegistry,
//!     Randomness, RunRequest,
//! };
//!
//! let baseline = Baseline::from_records((2020..=2030).map(|year| BaselineRecord {
//!     year,
//!     region: "china".to_string(),
//!     attributes: [("eolRecyclingMT".to_string(), 10.0)].into_iter().collect(),
//! }));
//!
//! let mut levers = LeverRegistry::default();
//! levers.register(LeverDefinition {
//!     variable: "recyclingBoost".to_string(),
//!     priority: 1,
//!     units: "MT".to_string(),
//!     script: "out.china.eolRecyclingMT = out.china.eolRecyclingMT + in.recyclingBoost;"
//!         .to_string(),
//!     default_value: 5.0,
//! });
//!
//! let engine = BatchEngine::new(
//!     Arc::new(baseline),
//!     EngineOptions { parallel: false, randomness: Randomness::Seeded(0) },
//! );
//! let projection = engine
//!     .run(&RunRequest {
//!         request_index: 0,
//!         historical_years: 2020..=2020,
//!         projection_years: 2021..=2030,
//!         levers: levers.ordered(),
//!         inputs: levers.inputs(),
//!     })
//!     .unwrap();
//!
//! let frame = projection.get(2030).unwrap();
//! assert_eq!(frame.region("global").unwrap()["eolRecyclingMT"], 15.0);
//! ```

// Re-export public API from plastics_core
pub use plastics_core::{
    Attributes, Baseline, BaselineRecord, BaselineSource, BatchEngine, CheckOptions,
    CompilationOptions, CompileError, CompileResult, CompiledLever, Compiler, Diagnostic,
    EngineOptions, Error, ErrorKind, FrameBuilder, FrameError, FrontEnd, InspectRecord,
    LedgerEntry, LeverDefinition, LeverRegistry, LeverStatus, Path, PestFrontEnd, Program,
    ProjectionSet, Randomness, RunFailure, RunRequest, RunResponse, RuntimeError, Severity, Span,
    State, SyntaxError, Worker, WorkerClient, WorkerError,
};

pub use plastics_core::{aggregate, catalog, levers};

pub mod error_renderer;

pub use error_renderer::{render_error, render_error_to, render_error_to_string_no_color};
