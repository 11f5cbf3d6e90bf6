//! # fleetsync-sync
//!
//! Fan-out template synchronization and pull-request orchestration.
//!
//! Call [`pipeline::run`] to execute a whole run (credentials → blacklist →
//! catalog → coordinator), or drive a [`RunCoordinator`] directly over a
//! prepared [`fleetsync_core::WorkingSet`].

pub mod coordinator;
pub mod error;
pub mod git;
pub mod merge;
pub mod outcome;
pub mod pipeline;
pub mod publisher;
pub mod syncer;
pub mod writer;

pub use coordinator::{RunContext, RunCoordinator};
pub use error::{PublishError, SyncError};
pub use merge::{MergeSummary, RenderedTemplate, TemplateMerger};
pub use outcome::{PublishOutcome, RepoOutcome, RepoState, RunReport, SyncFailure, SyncOutcome, SyncedBranch};
pub use publisher::{ApiResponse, GithubApi, PullRequest, PullRequestApi, PullRequestPublisher};
pub use syncer::{GitSyncOptions, GitTemplateSyncer, SyncDetails, SyncRequest, TemplateSyncer};
pub use writer::WriteResult;
