//! Domain types shared by every fleetsync crate.
//!
//! A [`PipelineRecord`] is one entry of the remote catalog; a [`WorkingSet`]
//! is the ordered, deduplicated selection of records a run will process.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::blacklist::Blacklist;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed pipeline (repository) name, e.g. `rnaseq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineName(pub String);

impl PipelineName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name after the last `/`, for catalogs that list `org/name` entries.
    pub fn short_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for PipelineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PipelineName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PipelineName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// PipelineRecord
// ---------------------------------------------------------------------------

/// One pipeline from the remote catalog.
///
/// `metadata` holds every catalog field other than `name`, untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRecord {
    pub name: PipelineName,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl PipelineRecord {
    /// A record with no metadata.
    pub fn named(name: impl Into<PipelineName>) -> Self {
        Self {
            name: name.into(),
            metadata: Map::new(),
        }
    }

    /// Coerce a raw catalog entry into a record.
    ///
    /// Returns `None` when the entry is not an object or has no string `name`.
    pub fn from_catalog_entry(entry: Value) -> Option<Self> {
        let Value::Object(mut fields) = entry else {
            return None;
        };
        let name = match fields.remove("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name,
            _ => return None,
        };
        Some(Self {
            name: PipelineName(name),
            metadata: fields,
        })
    }
}

// ---------------------------------------------------------------------------
// WorkingSet
// ---------------------------------------------------------------------------

/// The ordered set of pipelines a run processes.
///
/// Built once by [`WorkingSet::build`]; immutable afterwards. Catalog order is
/// preserved and the first occurrence of a duplicated name wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkingSet {
    records: Vec<PipelineRecord>,
}

impl WorkingSet {
    /// Select the records a run should process.
    ///
    /// With `explicit_name`, every record whose name contains it is kept and
    /// the blacklist is ignored. Otherwise every record not on the blacklist
    /// is kept.
    pub fn build(
        records: impl IntoIterator<Item = PipelineRecord>,
        blacklist: &Blacklist,
        explicit_name: Option<&str>,
    ) -> Self {
        let mut seen = HashSet::new();
        let records = records
            .into_iter()
            .filter(|record| match explicit_name {
                Some(pattern) => record.name.as_str().contains(pattern),
                None => !blacklist.contains(&record.name),
            })
            .filter(|record| seen.insert(record.name.clone()))
            .collect();
        Self { records }
    }

    pub fn records(&self) -> &[PipelineRecord] {
        &self.records
    }

    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PipelineRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a WorkingSet {
    type Item = &'a PipelineRecord;
    type IntoIter = std::slice::Iter<'a, PipelineRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
