//! Error types for fleetsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use fleetsync_renderer::RenderError;

/// Failure while updating one repository's tracking branch.
///
/// Never escapes the coordinator: it is recorded as a failed sync and gates
/// off publishing for that repository only.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the template engine.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `git` could not be started at all.
    #[error("failed to run git: {0}")]
    GitUnavailable(#[source] std::io::Error),

    /// A git command exited non-zero.
    #[error("`git {command}` failed: {stderr}")]
    Git { command: String, stderr: String },

    /// The tracking branch does not exist on the remote.
    #[error("remote {remote} has no branch `{branch}`")]
    MissingBranch { branch: String, remote: String },

    /// The syncer implementation panicked.
    #[error("sync panicked: {0}")]
    Panicked(String),
}

/// Failure talking to the pull-request API before any HTTP status was received.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
