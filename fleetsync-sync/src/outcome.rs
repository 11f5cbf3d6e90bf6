//! Per-repository outcomes and the aggregated run report.
//!
//! Each repository moves through `PENDING → SYNCED | SYNC_FAILED`, then
//! `SYNCED → PUBLISHED | PUBLISH_FAILED`. [`RepoState`] holds the terminal
//! state; a publish outcome only exists inside the two post-sync variants.

use chrono::{DateTime, Utc};
use serde::Serialize;

use fleetsync_core::PipelineName;

use crate::syncer::SyncDetails;

// ---------------------------------------------------------------------------
// SyncedBranch
// ---------------------------------------------------------------------------

/// Proof that a repository's tracking branch was synced and pushed.
///
/// Only the coordinator can mint one, and the publisher only accepts one, so a
/// pull request can never be opened for a repository whose sync failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedBranch {
    pipeline: PipelineName,
    branch: String,
    details: SyncDetails,
}

impl SyncedBranch {
    pub(crate) fn new(pipeline: PipelineName, branch: &str, details: SyncDetails) -> Self {
        Self {
            pipeline,
            branch: branch.to_string(),
            details,
        }
    }

    pub fn pipeline(&self) -> &PipelineName {
        &self.pipeline
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn details(&self) -> &SyncDetails {
        &self.details
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of the sync stage for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub pipeline: PipelineName,
    pub succeeded: bool,
    pub error: Option<String>,
}

/// Result of the publish stage for one repository.
///
/// `status_code` is `None` when no HTTP response was received; `body` then
/// holds the transport error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    pub pipeline: PipelineName,
    pub status_code: Option<u16>,
    pub succeeded: bool,
    pub body: Option<String>,
}

/// Terminal state of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RepoState {
    SyncFailed { cause: String },
    Published {
        sync: SyncDetails,
        publish: PublishOutcome,
    },
    PublishFailed {
        sync: SyncDetails,
        publish: PublishOutcome,
    },
}

/// Everything a run recorded for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoOutcome {
    pub pipeline: PipelineName,
    #[serde(flatten)]
    pub state: RepoState,
}

impl RepoOutcome {
    pub(crate) fn sync_failed(pipeline: PipelineName, cause: String) -> Self {
        Self {
            pipeline,
            state: RepoState::SyncFailed { cause },
        }
    }

    pub(crate) fn published(synced: SyncedBranch, publish: PublishOutcome) -> Self {
        let sync = synced.details().clone();
        let state = if publish.succeeded {
            RepoState::Published { sync, publish }
        } else {
            RepoState::PublishFailed { sync, publish }
        };
        Self {
            pipeline: synced.pipeline,
            state,
        }
    }

    pub fn sync_outcome(&self) -> SyncOutcome {
        let error = match &self.state {
            RepoState::SyncFailed { cause } => Some(cause.clone()),
            _ => None,
        };
        SyncOutcome {
            pipeline: self.pipeline.clone(),
            succeeded: error.is_none(),
            error,
        }
    }

    pub fn publish_outcome(&self) -> Option<&PublishOutcome> {
        match &self.state {
            RepoState::SyncFailed { .. } => None,
            RepoState::Published { publish, .. } | RepoState::PublishFailed { publish, .. } => Some(publish),
        }
    }

    /// What the sync pushed; `None` when the sync failed.
    pub fn sync_details(&self) -> Option<&SyncDetails> {
        match &self.state {
            RepoState::SyncFailed { .. } => None,
            RepoState::Published { sync, .. } | RepoState::PublishFailed { sync, .. } => Some(sync),
        }
    }
}

// ---------------------------------------------------------------------------
// RunReport
// ---------------------------------------------------------------------------

/// A failed sync, as listed in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub pipeline: PipelineName,
    pub cause: String,
}

/// Aggregated outcome of one run, in catalog order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<RepoOutcome>,
    pub sync_failures: Vec<SyncFailure>,
    pub publish_failures: Vec<PublishOutcome>,
}

impl RunReport {
    /// Fold ordered outcomes into a report.
    pub fn from_outcomes(
        outcomes: Vec<RepoOutcome>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let (sync_failures, publish_failures) = outcomes.iter().fold(
            (Vec::new(), Vec::new()),
            |(mut syncs, mut publishes), outcome| {
                match &outcome.state {
                    RepoState::SyncFailed { cause } => syncs.push(SyncFailure {
                        pipeline: outcome.pipeline.clone(),
                        cause: cause.clone(),
                    }),
                    RepoState::PublishFailed { publish, .. } => publishes.push(publish.clone()),
                    RepoState::Published { .. } => {}
                }
                (syncs, publishes)
            },
        );
        Self {
            started_at,
            finished_at,
            outcomes,
            sync_failures,
            publish_failures,
        }
    }

    pub fn published(&self) -> impl Iterator<Item = &PipelineName> {
        self.outcomes.iter().filter_map(|o| match &o.state {
            RepoState::Published { .. } => Some(&o.pipeline),
            _ => None,
        })
    }

    pub fn sync_outcomes(&self) -> Vec<SyncOutcome> {
        self.outcomes.iter().map(RepoOutcome::sync_outcome).collect()
    }

    pub fn publish_outcomes(&self) -> Vec<&PublishOutcome> {
        self.outcomes.iter().filter_map(RepoOutcome::publish_outcome).collect()
    }

    pub fn has_failures(&self) -> bool {
        !self.sync_failures.is_empty() || !self.publish_failures.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.sync_failures.len() + self.publish_failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
