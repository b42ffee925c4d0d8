//! Policy levers: named variables bound to a script and a priority.
//!
//! The [`LeverRegistry`] owns one compiled program per lever and recompiles
//! only when the script text changes. It hands the batch engine an ordered
//! list of [`CompiledLever`]s and can check a single lever interactively
//! without touching any other lever.

mod debounce;
mod registry;

#[cfg(test)]
mod registry_test;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compiler::Program;
use crate::state::InspectRecord;

pub use debounce::{Debouncer, Trigger};
pub use registry::LeverRegistry;

/// A lever as supplied by the lever configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeverDefinition {
    pub variable: String,
    /// Levers run in ascending priority; ties keep declaration order.
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub units: String,
    pub script: String,
    /// Value used until the caller sets one.
    #[serde(default)]
    pub default_value: f64,
}

/// A lever ready to run: everything the engine needs, with no link back to
/// the registry.
#[derive(Debug, Clone)]
pub struct CompiledLever {
    pub variable: String,
    pub priority: i32,
    pub program: Arc<Program>,
}

/// Result of checking one lever against a state.
#[derive(Debug, Clone, PartialEq)]
pub enum LeverStatus {
    /// The script is blank; there is nothing to run.
    Blank,
    /// The script did not compile.
    Invalid { errors: Vec<String> },
    /// The program failed at runtime.
    Failed { message: String },
    Ok { inspect: Vec<InspectRecord> },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeverError {
    #[error("Unknown lever: {variable}")]
    Unknown { variable: String },
}
