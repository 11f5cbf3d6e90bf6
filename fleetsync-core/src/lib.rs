//! fleetsync core library — domain types, run configuration, blacklist
//! filtering and the pipeline catalog client.
//!
//! - [`types`] — [`PipelineName`], [`PipelineRecord`], [`WorkingSet`]
//! - [`error`] — [`ConfigError`] (fatal) and [`FetchError`] (soft)
//! - [`config`] — YAML settings file + environment credentials
//! - [`blacklist`] — exclusion list loading and working-set filtering
//! - [`catalog`] — remote catalog fetch

pub mod blacklist;
pub mod catalog;
pub mod config;
pub mod error;
pub mod types;

pub use blacklist::Blacklist;
pub use catalog::{CatalogSource, HttpCatalog};
pub use config::{Credentials, Settings};
pub use error::{ConfigError, FetchError};
pub use types::{PipelineName, PipelineRecord, WorkingSet};
