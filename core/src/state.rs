//! The simulation state that compiled programs read and mutate.
//!
//! A [`State`] has five sections:
//!
//! - `local`: scratch variables declared with `var`, cleared before each lever.
//! - `out`: the quantity ledger, region name to attribute name to number.
//! - `in`: lever values keyed by variable name.
//! - `meta`: contextual scalars such as the simulation year.
//! - `inspect`: values recorded by `inspect` statements, cleared before each lever.
//!
//! Scripts reach into the state through dotted identifiers. [`Path`] is the
//! only place that understands that addressing scheme: a bare name means
//! `local.<name>`, everything else starts with a section name.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::RuntimeError;

/// Attribute name to quantity, for one region.
pub type Attributes = BTreeMap<String, f64>;

/// An entry of the `out` ledger.
///
/// Regions hold attribute maps. Scripts may also store plain numbers
/// directly under `out` (for example `out.test = 1;`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LedgerEntry {
    Value(f64),
    Region(Attributes),
}

pub type Ledger = BTreeMap<String, LedgerEntry>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectRecord {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub local: BTreeMap<String, f64>,
    pub out: Ledger,
    #[serde(rename = "in")]
    pub inputs: BTreeMap<String, f64>,
    pub meta: BTreeMap<String, f64>,
    pub inspect: Vec<InspectRecord>,
}

const YEAR_KEY: &str = "year";

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_year(year: i32) -> Self {
        let mut state = Self::default();
        state.set_year(year);
        state
    }

    pub fn year(&self) -> Result<i32, RuntimeError> {
        self.meta
            .get(YEAR_KEY)
            .map(|y| *y as i32)
            .ok_or(RuntimeError::MissingYear)
    }

    pub fn set_year(&mut self, year: i32) {
        self.meta.insert(YEAR_KEY.to_string(), f64::from(year));
    }

    /// Clear the per-lever scratch sections.
    pub fn reset_scratch(&mut self) {
        self.local.clear();
        self.inspect.clear();
    }

    pub fn region(&self, name: &str) -> Option<&Attributes> {
        match self.out.get(name) {
            Some(LedgerEntry::Region(attributes)) => Some(attributes),
            _ => None,
        }
    }

    /// Regions of the ledger, in name order. Plain numbers are skipped.
    pub fn regions(&self) -> impl Iterator<Item = (&String, &Attributes)> {
        self.out.iter().filter_map(|(name, entry)| match entry {
            LedgerEntry::Region(attributes) => Some((name, attributes)),
            LedgerEntry::Value(_) => None,
        })
    }

    /// Set `out.<region>.<attribute>`, creating the region if needed.
    pub fn set_attribute(&mut self, region: &str, attribute: &str, value: f64) {
        let entry = self
            .out
            .entry(region.to_string())
            .or_insert_with(|| LedgerEntry::Region(Attributes::new()));
        if let LedgerEntry::Value(_) = entry {
            *entry = LedgerEntry::Region(Attributes::new());
        }
        if let LedgerEntry::Region(attributes) = entry {
            attributes.insert(attribute.to_string(), value);
        }
    }

    /// Replace a whole region of the ledger.
    pub fn set_region(&mut self, region: &str, attributes: Attributes) {
        self.out
            .insert(region.to_string(), LedgerEntry::Region(attributes));
    }

    /// Declare a scratch variable. Each name may be declared once per lever.
    pub fn define_local(&mut self, name: &str, value: f64) -> Result<(), RuntimeError> {
        if self.local.contains_key(name) {
            return Err(RuntimeError::DuplicateLocal {
                name: name.to_string(),
            });
        }
        self.local.insert(name.to_string(), value);
        Ok(())
    }

    /// Read the number at `path`. Every segment must exist.
    pub fn get(&self, path: &Path) -> Result<f64, RuntimeError> {
        let rest = &path.segments;
        match path.section {
            None => Err(path.not_found(0)),
            Some(Section::Out) => match self.out.get(&rest[0]) {
                None => Err(path.not_found(1)),
                Some(LedgerEntry::Value(value)) if rest.len() == 1 => Ok(*value),
                Some(LedgerEntry::Value(_)) => Err(path.not_found(2)),
                Some(LedgerEntry::Region(_)) if rest.len() == 1 => Err(path.not_a_number()),
                Some(LedgerEntry::Region(attributes)) => match attributes.get(&rest[1]) {
                    Some(value) if rest.len() == 2 => Ok(*value),
                    Some(_) => Err(path.not_found(3)),
                    None => Err(path.not_found(2)),
                },
            },
            Some(section) => match self.flat(section).and_then(|map| map.get(&rest[0])) {
                Some(value) if rest.len() == 1 => Ok(*value),
                Some(_) => Err(path.not_found(2)),
                None => Err(path.not_found(1)),
            },
        }
    }

    /// Write the number at `path`. Every segment but the last must exist.
    pub fn set(&mut self, path: &Path, value: f64) -> Result<(), RuntimeError> {
        let rest = &path.segments;
        match path.section {
            None => Err(path.not_found(0)),
            Some(Section::Out) => {
                if rest.len() == 1 {
                    self.out.insert(rest[0].clone(), LedgerEntry::Value(value));
                    return Ok(());
                }
                match self.out.get_mut(&rest[0]) {
                    None => Err(path.not_found(1)),
                    Some(LedgerEntry::Region(attributes)) if rest.len() == 2 => {
                        attributes.insert(rest[1].clone(), value);
                        Ok(())
                    }
                    Some(LedgerEntry::Region(attributes)) if attributes.contains_key(&rest[1]) => {
                        Err(path.not_found(3))
                    }
                    Some(_) => Err(path.not_found(2)),
                }
            }
            Some(section) => {
                if rest.len() > 1 {
                    let exists = self.flat(section).is_some_and(|m| m.contains_key(&rest[0]));
                    return Err(path.not_found(if exists { 2 } else { 1 }));
                }
                match self.flat_mut(section) {
                    Some(map) => {
                        map.insert(rest[0].clone(), value);
                        Ok(())
                    }
                    None => Err(path.not_found(0)),
                }
            }
        }
    }

    fn flat(&self, section: Section) -> Option<&BTreeMap<String, f64>> {
        match section {
            Section::Local => Some(&self.local),
            Section::In => Some(&self.inputs),
            Section::Meta => Some(&self.meta),
            Section::Out => None,
        }
    }

    fn flat_mut(&mut self, section: Section) -> Option<&mut BTreeMap<String, f64>> {
        match section {
            Section::Local => Some(&mut self.local),
            Section::In => Some(&mut self.inputs),
            Section::Meta => Some(&mut self.meta),
            Section::Out => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Section {
    Local,
    Out,
    In,
    Meta,
}

impl Section {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "local" => Some(Section::Local),
            "out" => Some(Section::Out),
            "in" => Some(Section::In),
            "meta" => Some(Section::Meta),
            _ => None,
        }
    }
}

/// A resolved identifier.
///
/// Parsing happens once at compile time so that running a program never
/// re-splits identifier strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Path {
    raw: String,
    /// `None` when the first segment names no section; reads and writes fail.
    section: Option<Section>,
    /// Segments after the section name. Never empty.
    segments: Vec<String>,
    /// The first segment as written, for error messages.
    head: String,
}

impl Path {
    pub fn parse(raw: &str) -> Self {
        let parts: Vec<&str> = raw.split('.').collect();
        if parts.len() == 1 {
            return Self {
                raw: raw.to_string(),
                section: Some(Section::Local),
                segments: vec![raw.to_string()],
                head: raw.to_string(),
            };
        }
        Self {
            raw: raw.to_string(),
            section: Section::from_name(parts[0]),
            segments: parts[1..].iter().map(|s| s.to_string()).collect(),
            head: parts[0].to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn section(&self) -> Option<Section> {
        self.section
    }

    /// The final segment, for example the attribute of `out.china.eolRecyclingMT`.
    pub fn last(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or(&self.raw)
    }

    /// Region of an `out.<region>.<attribute>` path.
    pub fn region(&self) -> Option<&str> {
        match (self.section, self.segments.as_slice()) {
            (Some(Section::Out), [region, _]) => Some(region),
            _ => None,
        }
    }

    /// Error naming the segment at `index`, where 0 is the section name.
    fn not_found(&self, index: usize) -> RuntimeError {
        let segment = if index == 0 {
            self.head.clone()
        } else {
            self.segments
                .get(index - 1)
                .cloned()
                .unwrap_or_else(|| self.raw.clone())
        };
        RuntimeError::IdentifierNotFound {
            segment,
            path: self.raw.clone(),
        }
    }

    fn not_a_number(&self) -> RuntimeError {
        RuntimeError::NotANumber {
            path: self.raw.clone(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> State {
        let mut state = State::for_year(2030);
        state.set_attribute("china", "eolRecyclingMT", 12.0);
        state.inputs.insert("test".to_string(), 5.0);
        state.local.insert("inner".to_string(), 50.0);
        state
    }

    #[test]
    fn test_bare_name_is_local() {
        let state = sample();
        assert_eq!(state.get(&Path::parse("inner")), Ok(50.0));
        assert_eq!(state.get(&Path::parse("local.inner")), Ok(50.0));
    }

    #[test]
    fn test_read_sections() {
        let state = sample();
        assert_eq!(state.get(&Path::parse("in.test")), Ok(5.0));
        assert_eq!(state.get(&Path::parse("meta.year")), Ok(2030.0));
        assert_eq!(state.get(&Path::parse("out.china.eolRecyclingMT")), Ok(12.0));
    }

    #[test]
    fn test_read_names_missing_segment() {
        let state = sample();
        assert_eq!(
            state.get(&Path::parse("out.india.eolRecyclingMT")),
            Err(RuntimeError::IdentifierNotFound {
                segment: "india".to_string(),
                path: "out.india.eolRecyclingMT".to_string(),
            })
        );
        assert_eq!(
            state.get(&Path::parse("out.china.eolLandfillMT")),
            Err(RuntimeError::IdentifierNotFound {
                segment: "eolLandfillMT".to_string(),
                path: "out.china.eolLandfillMT".to_string(),
            })
        );
        assert_eq!(
            state.get(&Path::parse("nowhere.x")),
            Err(RuntimeError::IdentifierNotFound {
                segment: "nowhere".to_string(),
                path: "nowhere.x".to_string(),
            })
        );
        assert!(matches!(
            state.get(&Path::parse("missing")),
            Err(RuntimeError::IdentifierNotFound { .. })
        ));
    }

    #[test]
    fn test_region_is_not_a_number() {
        let state = sample();
        assert_eq!(
            state.get(&Path::parse("out.china")),
            Err(RuntimeError::NotANumber {
                path: "out.china".to_string()
            })
        );
    }

    #[test]
    fn test_write_requires_intermediate_segments() {
        let mut state = sample();
        assert!(state.set(&Path::parse("out.china.eolLandfillMT"), 3.0).is_ok());
        assert_eq!(state.get(&Path::parse("out.china.eolLandfillMT")), Ok(3.0));

        let err = state
            .set(&Path::parse("out.india.eolLandfillMT"), 3.0)
            .unwrap_err();
        assert_eq!(
            err,
            RuntimeError::IdentifierNotFound {
                segment: "india".to_string(),
                path: "out.india.eolLandfillMT".to_string(),
            }
        );
        assert!(state.region("india").is_none());
    }

    #[test]
    fn test_write_scalar_under_out() {
        let mut state = State::new();
        state.set(&Path::parse("out.test"), 7.5).unwrap();
        assert_eq!(state.get(&Path::parse("out.test")), Ok(7.5));
        assert_eq!(state.regions().count(), 0);
    }

    #[test]
    fn test_define_local_twice_fails() {
        let mut state = State::new();
        state.define_local("a", 1.0).unwrap();
        assert_eq!(
            state.define_local("a", 2.0),
            Err(RuntimeError::DuplicateLocal {
                name: "a".to_string()
            })
        );
    }

    #[test]
    fn test_reset_scratch_keeps_ledger() {
        let mut state = sample();
        state.inspect.push(InspectRecord {
            name: "x".to_string(),
            value: 1.0,
        });
        state.reset_scratch();
        assert!(state.local.is_empty());
        assert!(state.inspect.is_empty());
        assert_eq!(state.region("china").map(|r| r.len()), Some(1));
        assert_eq!(state.year(), Ok(2030));
    }

    #[test]
    fn test_serializes_input_section_as_in() {
        let state = sample();
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["in"]["test"], 5.0);
        assert_eq!(json["out"]["china"]["eolRecyclingMT"], 12.0);
    }
}
