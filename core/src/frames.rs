//! Year frames: one fully populated [`State`] per simulation year.

use std::collections::BTreeMap;

use rand::RngCore;
use serde::Serialize;
use thiserror::Error;
use tracing::trace;

use crate::baseline::BaselineSource;
use crate::errors::RuntimeError;
use crate::levers::CompiledLever;
use crate::state::State;

/// A failure while building the frame for one year.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{year} ({}): {source}", .lever.as_deref().unwrap_or("baseline"))]
pub struct FrameError {
    pub year: i32,
    /// The lever whose program failed, or `None` when the baseline failed.
    pub lever: Option<String>,
    #[source]
    pub source: RuntimeError,
}

/// Builds year frames from baseline data, lever values and lever programs.
pub struct FrameBuilder<'a> {
    baseline: &'a dyn BaselineSource,
    inputs: &'a BTreeMap<String, f64>,
    levers: &'a [CompiledLever],
}

impl<'a> FrameBuilder<'a> {
    /// `levers` must already be in application order.
    pub fn new(
        baseline: &'a dyn BaselineSource,
        inputs: &'a BTreeMap<String, f64>,
        levers: &'a [CompiledLever],
    ) -> Self {
        Self {
            baseline,
            inputs,
            levers,
        }
    }

    /// The baseline ledger for `year` with no levers applied.
    pub fn build_historical(&self, year: i32) -> Result<State, FrameError> {
        let regions = self.baseline.regions(year).ok_or(FrameError {
            year,
            lever: None,
            source: RuntimeError::MissingBaseline { year },
        })?;

        let mut state = State::for_year(year);
        state.inputs = self.inputs.clone();
        for (region, attributes) in regions {
            state.set_region(region, attributes.clone());
        }
        Ok(state)
    }

    /// The baseline ledger for `year` after every lever has run, in order.
    ///
    /// `local` and `inspect` are cleared before each lever.
    pub fn build_projected(&self, year: i32, rng: &mut dyn RngCore) -> Result<State, FrameError> {
        let mut state = self.build_historical(year)?;
        for lever in self.levers {
            state.reset_scratch();
            trace!(year, lever = %lever.variable, priority = lever.priority, "Applying lever");
            lever
                .program
                .run(&mut state, rng)
                .map_err(|source| FrameError {
                    year,
                    lever: Some(lever.variable.clone()),
                    source,
                })?;
        }
        Ok(state)
    }
}

/// Year frames in ascending year order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProjectionSet {
    frames: BTreeMap<i32, State>,
}

impl ProjectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, year: i32, frame: State) {
        self.frames.insert(year, frame);
    }

    pub fn get(&self, year: i32) -> Option<&State> {
        self.frames.get(&year)
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.frames.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &State)> {
        self.frames.iter().map(|(year, frame)| (*year, frame))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FromIterator<(i32, State)> for ProjectionSet {
    fn from_iter<I: IntoIterator<Item = (i32, State)>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::{Baseline, BaselineRecord};
    use crate::compiler::Compiler;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn baseline() -> Baseline {
        Baseline::from_records([BaselineRecord {
            year: 2030,
            region: "china".to_string(),
            attributes: [("eolRecyclingMT".to_string(), 10.0)].into_iter().collect(),
        }])
    }

    fn lever(variable: &str, script: &str) -> CompiledLever {
        CompiledLever {
            variable: variable.to_string(),
            priority: 0,
            program: Compiler::default()
                .compile(script)
                .program
                .expect("program"),
        }
    }

    #[test]
    fn test_historical_frame_copies_baseline() {
        let baseline = baseline();
        let inputs = [("rate".to_string(), 3.0)].into_iter().collect();
        let levers = [lever("rate", "out.china.eolRecyclingMT = 0;")];
        let builder = FrameBuilder::new(&baseline, &inputs, &levers);

        let frame = builder.build_historical(2030).unwrap();
        assert_eq!(frame.region("china").unwrap()["eolRecyclingMT"], 10.0);
        assert_eq!(frame.inputs["rate"], 3.0);
        assert_eq!(frame.year(), Ok(2030));
        assert!(frame.local.is_empty());
    }

    #[test]
    fn test_projected_frame_applies_levers_in_order() {
        let baseline = baseline();
        let inputs = BTreeMap::new();
        let levers = [
            lever("double", "out.china.eolRecyclingMT = out.china.eolRecyclingMT * 2;"),
            lever("add", "var x = 1; out.china.eolRecyclingMT = out.china.eolRecyclingMT + x;"),
            lever("again", "var x = 5; inspect x;"),
        ];
        let builder = FrameBuilder::new(&baseline, &inputs, &levers);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let frame = builder.build_projected(2030, &mut rng).unwrap();
        assert_eq!(frame.region("china").unwrap()["eolRecyclingMT"], 21.0);
        // Only the last lever's scratch data survives.
        assert_eq!(frame.local.get("x"), Some(&5.0));
        assert_eq!(frame.inspect.len(), 1);
    }

    #[test]
    fn test_missing_baseline_is_an_error() {
        let baseline = baseline();
        let inputs = BTreeMap::new();
        let builder = FrameBuilder::new(&baseline, &inputs, &[]);
        assert_eq!(
            builder.build_historical(2031),
            Err(FrameError {
                year: 2031,
                lever: None,
                source: RuntimeError::MissingBaseline { year: 2031 },
            })
        );
    }

    #[test]
    fn test_lever_failure_names_lever() {
        let baseline = baseline();
        let inputs = BTreeMap::new();
        let levers = [lever("broken", "var a = in.nothing;")];
        let builder = FrameBuilder::new(&baseline, &inputs, &levers);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let err = builder.build_projected(2030, &mut rng).unwrap_err();
        assert_eq!(err.lever.as_deref(), Some("broken"));
        assert_eq!(err.to_string(), "2030 (broken): Could not find nothing (in.nothing)");
    }
}
