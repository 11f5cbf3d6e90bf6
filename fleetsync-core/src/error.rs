//! Error types for fleetsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Run-level configuration failures. Any of these aborts the run before a
/// single repository is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("required environment variable {var} is not set")]
    MissingEnv { var: &'static str },

    /// A required setting is absent from both the config file and the CLI.
    #[error("missing required setting `{0}` (set it in the config file or pass it as a flag)")]
    MissingSetting(&'static str),

    /// The blacklist file could not be read.
    #[error("cannot read blacklist at {path}: {source}")]
    BlacklistRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blacklist file is not a `{"pipelines": [...]}` document.
    #[error("failed to parse blacklist at {path}: {source}")]
    BlacklistParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The settings file could not be read.
    #[error("cannot read config file at {path}: {source}")]
    SettingsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on the settings file.
    #[error("failed to parse config file at {path}: {source}")]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Catalog fetch failures. Never fatal: the catalog client logs these and
/// degrades to an empty catalog.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level or non-2xx failure talking to the catalog endpoint.
    #[error("catalog request to {url} failed: {message}")]
    Http { url: String, message: String },

    /// The response body was not the expected JSON document.
    #[error("malformed catalog from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// The document parsed but had no `remote_workflows` array.
    #[error("catalog from {url} has no `remote_workflows` array")]
    MissingWorkflows { url: String },
}
