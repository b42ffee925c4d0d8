//! Configuration options for compilation, batch runs and interactive checks.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::parser::DEFAULT_MAX_DEPTH;

/// Default cap on `repeats of` counts.
pub const DEFAULT_MAX_REPEATS: usize = 10_000;

/// Configuration options for compilation.
///
/// # Example
///
/// ```
/// use plastics_core::CompilationOptions;
///
/// let options = CompilationOptions {
///     max_depth: 100,
///     max_repeats: 1_000,
/// };
/// assert_eq!(options.max_depth, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationOptions {
    /// Maximum expression nesting depth accepted by the parser.
    ///
    /// Default: 500
    pub max_depth: usize,

    /// Largest count a `repeats of` expression may evaluate to.
    ///
    /// Default: 10000
    pub max_repeats: usize,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_repeats: DEFAULT_MAX_REPEATS,
        }
    }
}

/// Where the random numbers behind `draw` expressions come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Randomness {
    /// Seed every run from the operating system.
    Entropy,
    /// Derive one stream per simulation year from a fixed seed, so that
    /// output does not depend on how years are scheduled across threads.
    Seeded(u64),
}

/// Configuration options for batch runs.
///
/// # Example
///
/// ```
/// use plastics_core::{EngineOptions, Randomness};
///
/// let options = EngineOptions {
///     parallel: false,
///     randomness: Randomness::Seeded(7),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Build projected years on the rayon thread pool.
    ///
    /// Default: true
    pub parallel: bool,

    /// Default: `Randomness::Entropy`
    pub randomness: Randomness,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            randomness: Randomness::Entropy,
        }
    }
}

/// Debounce windows for interactive lever checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOptions {
    /// Delay after a lever value changes.
    ///
    /// Default: 50ms
    pub value_delay: Duration,

    /// Delay after a script edit.
    ///
    /// Default: 500ms
    pub script_delay: Duration,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            value_delay: Duration::from_millis(50),
            script_delay: Duration::from_millis(500),
        }
    }
}
