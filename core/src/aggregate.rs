//! Derived views over year frames.
//!
//! Everything here is a pure function: inputs are borrowed and never
//! modified, results are new values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::baseline::RegionTable;
use crate::catalog::{GLOBAL_REGION, is_rollup_excluded};
use crate::frames::ProjectionSet;
use crate::state::{Attributes, State};

/// Per-year region tables, as produced by the derived views.
pub type LedgerSeries = BTreeMap<i32, RegionTable>;

/// Sum every attribute across all regions except `global`.
///
/// Attributes missing from a region count as zero. Net-trade attributes are
/// present in the result but always zero.
pub fn global_rollup(state: &State) -> Attributes {
    let mut totals = Attributes::new();
    for (region, attributes) in state.regions() {
        if region == GLOBAL_REGION {
            continue;
        }
        for (attribute, value) in attributes {
            let total = totals.entry(attribute.clone()).or_insert(0.0);
            if !is_rollup_excluded(attribute) {
                *total += value;
            }
        }
    }
    totals
}

/// A copy of `state` whose `global` region holds the rollup of the others.
pub fn with_global_rollup(state: &State) -> State {
    let mut rolled = state.clone();
    rolled.set_region(GLOBAL_REGION, global_rollup(state));
    rolled
}

/// The region tables of every frame.
pub fn ledger_series(projection: &ProjectionSet) -> LedgerSeries {
    projection
        .iter()
        .map(|(year, frame)| (year, region_table(frame)))
        .collect()
}

/// Subtract `reference` from `projection`, per year, region and attribute.
///
/// The result covers the years and regions of `projection`. Values missing
/// from the reference are taken as zero.
pub fn relative_to(projection: &ProjectionSet, reference: &ProjectionSet) -> LedgerSeries {
    projection
        .iter()
        .map(|(year, frame)| {
            let base = reference.get(year);
            let table = frame
                .regions()
                .map(|(region, attributes)| {
                    let base_region = base.and_then(|b| b.region(region));
                    let delta = attributes
                        .iter()
                        .map(|(attribute, value)| {
                            let before = base_region
                                .and_then(|r| r.get(attribute))
                                .copied()
                                .unwrap_or(0.0);
                            (attribute.clone(), value - before)
                        })
                        .collect();
                    (region.clone(), delta)
                })
                .collect();
            (year, table)
        })
        .collect()
}

/// Running totals per region and attribute over ascending years.
pub fn cumulative(series: &LedgerSeries) -> LedgerSeries {
    let mut running: RegionTable = RegionTable::new();
    series
        .iter()
        .map(|(year, table)| {
            for (region, attributes) in table {
                let sums = running.entry(region.clone()).or_default();
                for (attribute, value) in attributes {
                    *sums.entry(attribute.clone()).or_insert(0.0) += value;
                }
            }
            (*year, running.clone())
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareScale {
    Fraction,
    Percent,
}

/// Each attribute of `group` divided by the group total within its region.
///
/// Regions whose group total is zero report zero shares.
pub fn share_of_region(table: &RegionTable, group: &[&str], scale: ShareScale) -> RegionTable {
    let factor = match scale {
        ShareScale::Fraction => 1.0,
        ShareScale::Percent => 100.0,
    };
    table
        .iter()
        .map(|(region, attributes)| {
            let value = |attribute: &str| attributes.get(attribute).copied().unwrap_or(0.0);
            let total: f64 = group.iter().map(|a| value(*a)).sum();
            let shares = group
                .iter()
                .map(|attribute| {
                    let share = if total == 0.0 {
                        0.0
                    } else {
                        value(*attribute) / total * factor
                    };
                    (attribute.to_string(), share)
                })
                .collect();
            (region.clone(), shares)
        })
        .collect()
}

fn region_table(state: &State) -> RegionTable {
    state
        .regions()
        .map(|(region, attributes)| (region.clone(), attributes.clone()))
        .collect()
}
