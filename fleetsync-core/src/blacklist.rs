//! Exclusion list and working-set filtering.
//!
//! The blacklist file is a JSON document:
//!
//! ```text
//! { "pipelines": ["chipseq", "deprecated-thing"] }
//! ```
//!
//! A blacklist that cannot be read or parsed is fatal: proceeding with an
//! empty exclusion set would re-sync intentionally excluded repositories.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::types::{PipelineName, PipelineRecord, WorkingSet};

#[derive(Debug, Deserialize)]
struct BlacklistFile {
    pipelines: Vec<String>,
}

/// Set of pipeline names excluded from a full run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blacklist {
    names: BTreeSet<PipelineName>,
}

impl Blacklist {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PipelineName>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Load `{"pipelines": [...]}` from `path`.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::BlacklistRead {
            path: path.to_path_buf(),
            source,
        })?;
        let file: BlacklistFile =
            serde_json::from_str(&contents).map_err(|source| ConfigError::BlacklistParse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(file.pipelines))
    }

    /// Load from `path` when one is configured; an unset path means no exclusions.
    pub fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_at(path),
            None => Ok(Self::default()),
        }
    }

    pub fn contains(&self, name: &PipelineName) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Build the working set for a run. See [`WorkingSet::build`].
pub fn filter(
    records: impl IntoIterator<Item = PipelineRecord>,
    blacklist: &Blacklist,
    explicit_name: Option<&str>,
) -> WorkingSet {
    WorkingSet::build(records, blacklist, explicit_name)
}
