//! Baseline ledger data, indexed by year.
//!
//! The plain [`Baseline`] only answers for years it was given; asking for any
//! other year is an error in the frame builder. [`Baseline::with_trend`]
//! produces a new baseline that also covers projected years by fitting a
//! straight line through each region's attribute history.
//! [`Baseline::with_normalized_shares`] then turns projected consumption and
//! end-of-life values into per-region shares.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{CONSUMPTION_ATTRS, EOL_ATTRS};
use crate::state::Attributes;

/// One region's ledger values for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineRecord {
    pub year: i32,
    pub region: String,
    #[serde(flatten)]
    pub attributes: Attributes,
}

/// Region name to attributes.
pub type RegionTable = BTreeMap<String, Attributes>;

/// Supplies read-only baseline data to the frame builder.
pub trait BaselineSource: Send + Sync {
    /// Every region's attributes for `year`, or `None` if there is no data.
    fn regions(&self, year: i32) -> Option<&RegionTable>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Baseline {
    years: BTreeMap<i32, RegionTable>,
}

impl Baseline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index records by year. A later record for the same year and region
    /// replaces the earlier one's attributes key by key.
    pub fn from_records(records: impl IntoIterator<Item = BaselineRecord>) -> Self {
        let mut baseline = Self::new();
        for record in records {
            baseline.insert(record);
        }
        baseline
    }

    pub fn insert(&mut self, record: BaselineRecord) {
        self.years
            .entry(record.year)
            .or_default()
            .entry(record.region)
            .or_default()
            .extend(record.attributes);
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.keys().copied()
    }

    pub fn contains_year(&self, year: i32) -> bool {
        self.years.contains_key(&year)
    }

    /// A copy of this baseline with every year of `years` that has no data
    /// filled from a least-squares line per region and attribute.
    ///
    /// A series with a single observation is held constant.
    pub fn with_trend(&self, years: RangeInclusive<i32>) -> Baseline {
        let mut series: BTreeMap<(&str, &str), Vec<(f64, f64)>> = BTreeMap::new();
        for (year, regions) in &self.years {
            for (region, attributes) in regions {
                for (attribute, value) in attributes {
                    series
                        .entry((region.as_str(), attribute.as_str()))
                        .or_default()
                        .push((f64::from(*year), *value));
                }
            }
        }

        let lines: Vec<((&str, &str), Line)> = series
            .into_iter()
            .map(|(key, points)| (key, Line::fit(&points)))
            .collect();

        let mut extended = self.clone();
        let mut filled = 0;
        for year in years {
            if extended.contains_year(year) {
                continue;
            }
            let table = extended.years.entry(year).or_default();
            for ((region, attribute), line) in &lines {
                table
                    .entry(region.to_string())
                    .or_default()
                    .insert(attribute.to_string(), line.at(f64::from(year)));
            }
            filled += 1;
        }
        debug!(filled, series = lines.len(), "Extended baseline with trend");
        extended
    }

    /// A copy of this baseline where, for every year of `years` it has data
    /// for, each region's consumption attributes are divided by their total,
    /// and likewise its end-of-life attributes.
    ///
    /// Only attributes present in the region count toward a total. A group
    /// whose total is zero or not finite is left as it is.
    pub fn with_normalized_shares(&self, years: RangeInclusive<i32>) -> Baseline {
        let mut normalized = self.clone();
        if years.is_empty() {
            return normalized;
        }
        let mut rescaled = 0;
        for (_, regions) in normalized.years.range_mut(years) {
            for attributes in regions.values_mut() {
                for group in [&CONSUMPTION_ATTRS[..], &EOL_ATTRS[..]] {
                    if rescale_group(attributes, group) {
                        rescaled += 1;
                    }
                }
            }
        }
        debug!(rescaled, "Normalized baseline shares");
        normalized
    }
}

fn rescale_group(attributes: &mut Attributes, group: &[&str]) -> bool {
    let total: f64 = group.iter().filter_map(|name| attributes.get(*name)).sum();
    if total == 0.0 || !total.is_finite() {
        return false;
    }
    for name in group {
        if let Some(value) = attributes.get_mut(*name) {
            *value /= total;
        }
    }
    true
}

impl BaselineSource for Baseline {
    fn regions(&self, year: i32) -> Option<&RegionTable> {
        self.years.get(&year)
    }
}

/// `y = intercept + slope * x`
#[derive(Debug, Clone, Copy, PartialEq)]
struct Line {
    intercept: f64,
    slope: f64,
}

impl Line {
    fn fit(points: &[(f64, f64)]) -> Line {
        let n = points.len() as f64;
        let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
        let sxx: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
        let sxy: f64 = points
            .iter()
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .sum();
        let slope = if sxx == 0.0 { 0.0 } else { sxy / sxx };
        Line {
            intercept: mean_y - slope * mean_x,
            slope,
        }
    }

    fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}
