//! Template context — serializable rendering payload built from a
//! [`PipelineRecord`] and the release being propagated.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use fleetsync_core::PipelineRecord;

use crate::error::RenderError;

/// Rendering payload exposed to every template file.
///
/// Templates address it as `{{ pipeline.name }}`, `{{ release_tag }}`,
/// `{{ pipeline.metadata.description }}` and so on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateContext {
    pub pipeline: PipelineCtx,
    /// Template release being propagated.
    pub release_tag: String,
    pub meta: MetaCtx,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineCtx {
    pub name: String,
    pub short_name: String,
    /// Catalog fields other than `name`, as fetched.
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaCtx {
    pub fleetsync_version: String,
}

impl TemplateContext {
    pub fn new(record: &PipelineRecord, release_tag: &str) -> Self {
        Self {
            pipeline: PipelineCtx {
                name: record.name.0.clone(),
                short_name: record.name.short_name().to_string(),
                metadata: record.metadata.clone(),
            },
            release_tag: release_tag.to_string(),
            meta: MetaCtx {
                fleetsync_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    pub(crate) fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        let value = serde_json::to_value(self)?;
        Ok(tera::Context::from_value(value)?)
    }
}
