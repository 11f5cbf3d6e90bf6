//! Template Syncer — brings one repository's tracking branch up to date with
//! the canonical template and pushes it.
//!
//! ## `GitTemplateSyncer` sequence
//!
//! 1. Clone the remote into a fresh temporary directory.
//! 2. Check out the tracking branch (`origin/<branch>`), or point `HEAD` at
//!    an unborn branch of that name when `create_missing_branch` is set, so
//!    the first commit is a root commit.
//! 3. Apply the template via the configured [`TemplateMerger`].
//! 4. Stage everything; commit when anything changed.
//! 5. Push the tracking branch.
//!
//! The clone is deleted when the call returns, whatever the outcome.

use std::path::PathBuf;

use serde::Serialize;

use fleetsync_core::PipelineRecord;

use crate::error::{io_err, SyncError};
use crate::git::Git;
use crate::merge::TemplateMerger;

/// Inputs for syncing one repository.
#[derive(Debug, Clone, Copy)]
pub struct SyncRequest<'a> {
    pub record: &'a PipelineRecord,
    pub tracking_branch: &'a str,
    /// Clone URL; may embed credentials.
    pub remote_url: &'a str,
    pub release_tag: &'a str,
}

/// What a successful sync left on the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncDetails {
    /// Tip of the tracking branch after the push.
    pub head: String,
    /// Whether a new commit was created.
    pub committed: bool,
    pub files_changed: usize,
}

/// Updates one repository's tracking branch.
pub trait TemplateSyncer: Send + Sync {
    fn sync(&self, request: &SyncRequest<'_>) -> Result<SyncDetails, SyncError>;
}

/// Knobs for [`GitTemplateSyncer`].
#[derive(Debug, Clone)]
pub struct GitSyncOptions {
    /// Parent directory for per-repository clones; the system temp dir if unset.
    pub workdir: Option<PathBuf>,
    pub author_name: String,
    pub author_email: String,
    pub create_missing_branch: bool,
}

/// [`TemplateSyncer`] driving the `git` executable.
pub struct GitTemplateSyncer<M> {
    merger: M,
    options: GitSyncOptions,
}

impl<M: TemplateMerger> GitTemplateSyncer<M> {
    pub fn new(merger: M, options: GitSyncOptions) -> Self {
        Self { merger, options }
    }

    fn scratch_dir(&self, short_name: &str) -> Result<tempfile::TempDir, SyncError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(short_name).suffix(".fleetsync");
        match &self.options.workdir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
                builder.tempdir_in(dir).map_err(|e| io_err(dir, e))
            }
            None => builder.tempdir().map_err(|e| io_err(std::env::temp_dir(), e)),
        }
    }

    fn checkout_tracking_branch(&self, repo: &Git, request: &SyncRequest<'_>) -> Result<(), SyncError> {
        let branch = request.tracking_branch;
        if repo.has_remote_branch(branch)? {
            let upstream = format!("origin/{branch}");
            repo.run(&["checkout", "--quiet", "-B", branch, &upstream])?;
            return Ok(());
        }
        if !self.options.create_missing_branch {
            return Err(SyncError::MissingBranch {
                branch: branch.to_string(),
                remote: crate::git::strip_userinfo(request.remote_url),
            });
        }
        tracing::info!("{}: creating missing branch `{branch}`", request.record.name);
        let head = format!("refs/heads/{branch}");
        repo.run(&["symbolic-ref", "HEAD", &head])?;
        Ok(())
    }

    fn commit(&self, repo: &Git, request: &SyncRequest<'_>) -> Result<(), SyncError> {
        let name = format!("user.name={}", self.options.author_name);
        let email = format!("user.email={}", self.options.author_email);
        let message = format!("Template update for release {}", request.release_tag);
        repo.run(&["-c", &name, "-c", &email, "commit", "--quiet", "-m", &message])?;
        Ok(())
    }
}

impl<M: TemplateMerger> TemplateSyncer for GitTemplateSyncer<M> {
    fn sync(&self, request: &SyncRequest<'_>) -> Result<SyncDetails, SyncError> {
        let short_name = request.record.name.short_name();
        let scratch = self.scratch_dir(short_name)?;

        Git::at(scratch.path()).run(&["clone", "--quiet", request.remote_url, short_name])?;
        let repo = Git::at(scratch.path().join(short_name));

        self.checkout_tracking_branch(&repo, request)?;

        let summary = self.merger.merge(request.record, request.release_tag, repo.dir())?;
        repo.run(&["add", "--all"])?;

        let committed = repo.has_staged_changes()?;
        if committed {
            self.commit(&repo, request)?;
        } else {
            tracing::info!("{}: template already up to date", request.record.name);
        }

        repo.run(&["push", "--quiet", "origin", request.tracking_branch])?;
        let head = repo.run(&["rev-parse", "HEAD"])?;

        Ok(SyncDetails {
            head,
            committed,
            files_changed: summary.changed(),
        })
    }
}
