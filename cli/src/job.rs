//! Batch jobs read from disk: a JSON job description plus a baseline CSV.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use miette::Diagnostic;
use plastics::{
    Baseline, BaselineRecord, BatchEngine, EngineOptions, LeverDefinition, LeverRegistry,
    ProjectionSet, Randomness, RunFailure, RunRequest,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, Diagnostic)]
pub enum JobError {
    #[error("Could not read {}", .path.display())]
    #[diagnostic(code(job::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid job file")]
    #[diagnostic(code(job::json))]
    Json(#[from] serde_json::Error),

    #[error("Invalid baseline CSV")]
    #[diagnostic(code(job::csv))]
    Csv(#[from] csv::Error),

    #[error("Baseline has no {0} column")]
    #[diagnostic(
        code(job::missing_column),
        help("The first two columns must be year and region")
    )]
    MissingColumn(&'static str),

    #[error("Baseline line {line}: {column} value {value:?} is not a number")]
    #[diagnostic(code(job::bad_value))]
    BadValue {
        line: u64,
        column: String,
        value: String,
    },

    #[error("Job sets a value for unknown lever {0}")]
    #[diagnostic(code(job::unknown_lever))]
    UnknownLever(String),

    #[error("Lever {variable} does not compile: {}", .errors.join("; "))]
    #[diagnostic(
        code(job::invalid_lever),
        help("Run `plastics check` on the script for details")
    )]
    InvalidLever {
        variable: String,
        errors: Vec<String>,
    },

    #[error(transparent)]
    #[diagnostic(code(job::run))]
    Run(#[from] RunFailure),
}

/// A job as written in its JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Baseline CSV, relative to the job file.
    pub baseline: PathBuf,
    pub levers: Vec<LeverDefinition>,
    /// Lever values overriding the defaults.
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
    /// Levers that publish their value but are not applied.
    #[serde(default)]
    pub disabled: Vec<String>,
    pub historical_years: [i32; 2],
    pub projection_years: [i32; 2],
    #[serde(default)]
    pub seed: Option<u64>,
    /// Fill projected years missing from the baseline with a linear trend.
    #[serde(default)]
    pub trend: bool,
    /// Turn projected consumption and end-of-life values into per-region
    /// shares of their group.
    #[serde(default)]
    pub normalize_shares: bool,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_parallel() -> bool {
    true
}

impl Job {
    pub fn load(path: &Path) -> Result<Self, JobError> {
        let text = read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

fn read_to_string(path: &Path) -> Result<String, JobError> {
    let mut text = String::new();
    File::open(path)
        .and_then(|mut file| file.read_to_string(&mut text))
        .map_err(|source| JobError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(text)
}

/// Parse a baseline CSV: `year,region,<attribute>...` with one row per year
/// and region. Empty attribute cells are skipped.
pub fn read_baseline(reader: impl Read) -> Result<Baseline, JobError> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = csv.headers()?.clone();
    if headers.get(0) != Some("year") {
        return Err(JobError::MissingColumn("year"));
    }
    if headers.get(1) != Some("region") {
        return Err(JobError::MissingColumn("region"));
    }

    let mut baseline = Baseline::new();
    let mut rows = 0;
    for row in csv.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let bad_value = |column: &str, value: &str| JobError::BadValue {
            line,
            column: column.to_string(),
            value: value.to_string(),
        };

        let year_text = row.get(0).unwrap_or_default();
        let year = year_text
            .parse::<i32>()
            .map_err(|_| bad_value("year", year_text))?;
        let region = row.get(1).unwrap_or_default().to_string();

        let mut attributes = BTreeMap::new();
        for (column, text) in headers.iter().zip(row.iter()).skip(2) {
            if text.is_empty() {
                continue;
            }
            let value = text.parse::<f64>().map_err(|_| bad_value(column, text))?;
            attributes.insert(column.to_string(), value);
        }
        baseline.insert(BaselineRecord {
            year,
            region,
            attributes,
        });
        rows += 1;
    }
    debug!(rows, "Read baseline");
    Ok(baseline)
}

/// Load the baseline a job refers to, resolved against `base_dir`.
pub fn load_baseline(job: &Job, base_dir: &Path) -> Result<Baseline, JobError> {
    let path = base_dir.join(&job.baseline);
    let file = File::open(&path).map_err(|source| JobError::Io {
        path: path.clone(),
        source,
    })?;
    let mut baseline = read_baseline(file)?;
    let projected = job.projection_years[0]..=job.projection_years[1];
    if job.trend {
        baseline = baseline.with_trend(projected.clone());
    }
    if job.normalize_shares {
        baseline = baseline.with_normalized_shares(projected);
    }
    Ok(baseline)
}

/// Register the job's levers and apply its values and disabled list.
pub fn registry(job: &Job) -> Result<LeverRegistry, JobError> {
    let mut registry = LeverRegistry::default();
    for definition in &job.levers {
        let result = registry.register(definition.clone());
        if !result.is_ok() {
            return Err(JobError::InvalidLever {
                variable: definition.variable.clone(),
                errors: result.error_messages(),
            });
        }
    }
    for (variable, value) in &job.values {
        registry
            .set_value(variable, *value)
            .map_err(|_| JobError::UnknownLever(variable.clone()))?;
    }
    for variable in &job.disabled {
        registry
            .set_enabled(variable, false)
            .map_err(|_| JobError::UnknownLever(variable.clone()))?;
    }
    Ok(registry)
}

/// Run a job whose file lives in `base_dir`.
pub fn run(job: &Job, base_dir: &Path) -> Result<ProjectionSet, JobError> {
    let baseline = load_baseline(job, base_dir)?;
    let registry = registry(job)?;
    let randomness = match job.seed {
        Some(seed) => Randomness::Seeded(seed),
        None => Randomness::Entropy,
    };
    info!(levers = registry.len(), ?randomness, "Running job");

    let engine = BatchEngine::new(
        Arc::new(baseline),
        EngineOptions {
            parallel: job.parallel,
            randomness,
        },
    );
    let projection = engine.run(&RunRequest {
        request_index: 0,
        historical_years: job.historical_years[0]..=job.historical_years[1],
        projection_years: job.projection_years[0]..=job.projection_years[1],
        levers: registry.ordered(),
        inputs: registry.inputs(),
    })?;
    Ok(projection)
}
