//! Batch execution: a full projection set for one lever configuration.
//!
//! Historical years are copied from the baseline. Projected years run every
//! lever in order. Each year is independent of the others, so projected
//! years can be built in parallel; the levers within one year always run
//! sequentially. Any lever failure aborts the whole run.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregate::with_global_rollup;
use crate::baseline::BaselineSource;
use crate::errors::RuntimeError;
use crate::frames::{FrameBuilder, FrameError, ProjectionSet};
use crate::levers::CompiledLever;
use crate::options::{EngineOptions, Randomness};
use crate::state::State;

/// Upper bound on worker threads for parallel runs.
const MAX_THREADS: usize = 5;

/// One full-run request.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Correlates the response with the request that produced it.
    pub request_index: u64,
    pub historical_years: RangeInclusive<i32>,
    pub projection_years: RangeInclusive<i32>,
    /// Levers in application order.
    pub levers: Vec<CompiledLever>,
    /// Lever values published under `in`.
    pub inputs: BTreeMap<String, f64>,
}

/// Why a run produced no projection set.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Run {request_index} failed in {year} ({}): {source}", .lever.as_deref().unwrap_or("baseline"))]
pub struct RunFailure {
    pub request_index: u64,
    pub year: i32,
    pub lever: Option<String>,
    #[source]
    pub source: RuntimeError,
}

impl RunFailure {
    fn new(request_index: u64, error: FrameError) -> Self {
        Self {
            request_index,
            year: error.year,
            lever: error.lever,
            source: error.source,
        }
    }
}

pub struct BatchEngine {
    baseline: Arc<dyn BaselineSource>,
    options: EngineOptions,
    pool: Option<rayon::ThreadPool>,
}

impl BatchEngine {
    pub fn new(baseline: Arc<dyn BaselineSource>, options: EngineOptions) -> Self {
        let pool = if options.parallel {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(default_thread_count())
                .thread_name(|i| format!("plastics-year-{i}"))
                .build()
            {
                Ok(pool) => Some(pool),
                Err(err) => {
                    warn!(error = %err, "Could not build thread pool; running years sequentially");
                    None
                }
            }
        } else {
            None
        };
        Self {
            baseline,
            options,
            pool,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Build every frame of `request`, or report the first failure.
    ///
    /// When several projected years fail, the earliest year is reported.
    pub fn run(&self, request: &RunRequest) -> Result<ProjectionSet, RunFailure> {
        let started = Instant::now();
        info!(
            request_index = request.request_index,
            historical = ?request.historical_years,
            projected = ?request.projection_years,
            levers = request.levers.len(),
            "Starting batch run"
        );

        let builder = FrameBuilder::new(&*self.baseline, &request.inputs, &request.levers);
        let fail = |error| RunFailure::new(request.request_index, error);

        let mut projection = ProjectionSet::new();
        for year in request.historical_years.clone() {
            let frame = builder.build_historical(year).map_err(fail)?;
            projection.insert(year, with_global_rollup(&frame));
        }

        let years: Vec<i32> = request.projection_years.clone().collect();
        let frames: Vec<Result<State, FrameError>> = match &self.pool {
            Some(pool) => pool.install(|| {
                years
                    .par_iter()
                    .map(|&year| self.project(&builder, year))
                    .collect()
            }),
            None => {
                let mut frames = Vec::with_capacity(years.len());
                for &year in &years {
                    let frame = self.project(&builder, year);
                    let failed = frame.is_err();
                    frames.push(frame);
                    if failed {
                        break;
                    }
                }
                frames
            }
        };

        // `frames` is in year order, so the first error is the earliest year.
        for (year, frame) in years.into_iter().zip(frames) {
            projection.insert(year, frame.map_err(fail)?);
        }

        info!(
            request_index = request.request_index,
            frames = projection.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Finished batch run"
        );
        Ok(projection)
    }

    fn project(&self, builder: &FrameBuilder<'_>, year: i32) -> Result<State, FrameError> {
        let mut rng = self.rng_for(year);
        let frame = builder.build_projected(year, &mut rng)?;
        debug!(year, "Projected year");
        Ok(with_global_rollup(&frame))
    }

    fn rng_for(&self, year: i32) -> ChaCha8Rng {
        match self.options.randomness {
            Randomness::Seeded(seed) => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(year as u64);
                rng
            }
            Randomness::Entropy => ChaCha8Rng::from_entropy(),
        }
    }
}

impl std::fmt::Debug for BatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchEngine")
            .field("options", &self.options)
            .field("parallel", &self.pool.is_some())
            .finish_non_exhaustive()
    }
}

/// One thread per core, leaving one core free, and never more than five.
pub fn default_thread_count() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    cores.saturating_sub(1).clamp(1, MAX_THREADS)
}
