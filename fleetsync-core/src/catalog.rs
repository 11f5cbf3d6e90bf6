//! Remote pipeline catalog client.
//!
//! The catalog endpoint serves a JSON document with a `remote_workflows`
//! array of `{name, ...}` objects. Fetching is a soft operation: any failure
//! is logged and yields an empty catalog so the run proceeds with nothing to
//! do instead of crashing.

use std::time::Duration;

use serde_json::Value;

use crate::error::FetchError;
use crate::types::PipelineRecord;

/// Anything that can produce the current pipeline catalog.
pub trait CatalogSource {
    /// Fetch the catalog. Failures degrade to an empty vector.
    fn fetch(&self) -> Vec<PipelineRecord>;
}

/// Catalog served over HTTP(S).
pub struct HttpCatalog {
    url: String,
    agent: ureq::Agent,
}

impl HttpCatalog {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("fleetsync/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            url: url.into(),
            agent,
        }
    }

    /// Fetch and decode, surfacing the failure instead of logging it.
    pub fn try_fetch(&self) -> Result<Vec<PipelineRecord>, FetchError> {
        let response = self.agent.get(&self.url).call().map_err(|e| FetchError::Http {
            url: self.url.clone(),
            message: e.to_string(),
        })?;
        let document: Value = response.into_json().map_err(|source| FetchError::Decode {
            url: self.url.clone(),
            source,
        })?;
        parse_catalog(&self.url, document)
    }
}

impl CatalogSource for HttpCatalog {
    fn fetch(&self) -> Vec<PipelineRecord> {
        match self.try_fetch() {
            Ok(records) => {
                tracing::info!("catalog: {} pipelines from {}", records.len(), self.url);
                records
            }
            Err(e) => {
                tracing::warn!("{e}; continuing with an empty catalog");
                Vec::new()
            }
        }
    }
}

/// Decode a catalog document, dropping entries that have no usable name.
pub fn parse_catalog(url: &str, document: Value) -> Result<Vec<PipelineRecord>, FetchError> {
    let Value::Object(mut fields) = document else {
        return Err(FetchError::MissingWorkflows { url: url.to_string() });
    };
    let Some(Value::Array(entries)) = fields.remove("remote_workflows") else {
        return Err(FetchError::MissingWorkflows { url: url.to_string() });
    };

    let mut records = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match PipelineRecord::from_catalog_entry(entry) {
            Some(record) => records.push(record),
            None => tracing::warn!("catalog entry #{index} has no name; skipping"),
        }
    }
    Ok(records)
}
