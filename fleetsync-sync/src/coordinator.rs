//! Run Coordinator — drives sync → gate → publish for every repository of a
//! working set and folds the results into a [`RunReport`].
//!
//! The coordinator is the outermost failure boundary: it never returns an
//! error and never panics because of a collaborator. With `jobs > 1` the
//! repositories are spread over a bounded pool of scoped threads; outcomes are
//! re-sorted into catalog order before the report is built.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;

use chrono::Utc;

use fleetsync_core::config::RepoLocator;
use fleetsync_core::{Credentials, PipelineRecord, WorkingSet};

use crate::error::SyncError;
use crate::outcome::{PublishOutcome, RepoOutcome, RunReport, SyncedBranch};
use crate::publisher::{PullRequestApi, PullRequestPublisher};
use crate::syncer::{SyncRequest, TemplateSyncer};

/// Run-wide, read-only inputs.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    pub credentials: &'a Credentials,
    pub locator: &'a RepoLocator,
    /// Identity embedded in https clone URLs.
    pub bot_user: &'a str,
    pub tracking_branch: &'a str,
    pub base_branch: &'a str,
    pub jobs: usize,
}

/// Processes a working set.
pub struct RunCoordinator<'a> {
    syncer: &'a dyn TemplateSyncer,
    publisher: PullRequestPublisher<'a>,
    ctx: RunContext<'a>,
}

impl<'a> RunCoordinator<'a> {
    pub fn new(syncer: &'a dyn TemplateSyncer, api: &'a dyn PullRequestApi, ctx: RunContext<'a>) -> Self {
        Self {
            syncer,
            publisher: PullRequestPublisher::new(api),
            ctx,
        }
    }

    /// Process every repository and report in catalog order.
    pub fn run(&self, working_set: &WorkingSet) -> RunReport {
        let started_at = Utc::now();
        let workers = self.ctx.jobs.max(1).min(working_set.len());
        tracing::info!(
            "processing {} repositories with {} worker(s)",
            working_set.len(),
            workers.max(1)
        );

        let outcomes: Vec<RepoOutcome> = if workers <= 1 {
            working_set.iter().map(|record| self.process(record)).collect()
        } else {
            self.run_pool(working_set, workers)
        };
        debug_assert_eq!(outcomes.len(), working_set.len());

        RunReport::from_outcomes(outcomes, started_at, Utc::now())
    }

    fn run_pool(&self, working_set: &WorkingSet, workers: usize) -> Vec<RepoOutcome> {
        let records = working_set.records();
        let next = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel::<(usize, RepoOutcome)>();

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let next = &next;
                scope.spawn(move || loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(record) = records.get(index) else {
                        break;
                    };
                    if tx.send((index, self.process(record))).is_err() {
                        break;
                    }
                });
            }
        });
        drop(tx);

        let mut indexed: Vec<_> = rx.into_iter().collect();
        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, outcome)| outcome).collect()
    }

    /// One repository, start to terminal state.
    fn process(&self, record: &PipelineRecord) -> RepoOutcome {
        let synced = match self.sync(record) {
            Ok(synced) => synced,
            Err(e) => {
                let cause = self.ctx.credentials.redact(&e.to_string());
                tracing::warn!("{}: sync failed: {cause}", record.name);
                return RepoOutcome::sync_failed(record.name.clone(), cause);
            }
        };

        let publish = self.publish(&synced);
        RepoOutcome::published(synced, publish)
    }

    fn sync(&self, record: &PipelineRecord) -> Result<SyncedBranch, SyncError> {
        let ctx = &self.ctx;
        let remote_url = ctx
            .locator
            .remote_url(&record.name, ctx.bot_user, ctx.credentials);
        tracing::info!(
            "{}: syncing `{}` from {}",
            record.name,
            ctx.tracking_branch,
            ctx.locator.display_remote(&record.name)
        );

        let request = SyncRequest {
            record,
            tracking_branch: ctx.tracking_branch,
            remote_url: &remote_url,
            release_tag: &ctx.credentials.release_tag,
        };
        let details = catch_unwind(AssertUnwindSafe(|| self.syncer.sync(&request)))
            .map_err(|panic| SyncError::Panicked(panic_message(panic)))??;

        tracing::info!(
            "{}: pushed `{}` at {} ({} file(s) changed)",
            record.name,
            ctx.tracking_branch,
            details.head,
            details.files_changed
        );
        Ok(SyncedBranch::new(record.name.clone(), ctx.tracking_branch, details))
    }

    fn publish(&self, synced: &SyncedBranch) -> PublishOutcome {
        let ctx = &self.ctx;
        let attempt = catch_unwind(AssertUnwindSafe(|| {
            self.publisher.publish(
                synced,
                &ctx.credentials.token,
                ctx.base_branch,
                &ctx.credentials.release_tag,
            )
        }));
        match attempt {
            Ok(mut outcome) => {
                outcome.body = outcome.body.map(|body| ctx.credentials.redact(&body));
                outcome
            }
            Err(panic) => PublishOutcome {
                pipeline: synced.pipeline().clone(),
                status_code: None,
                succeeded: false,
                body: Some(format!("publish panicked: {}", panic_message(panic))),
            },
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::time::Duration;

    use fleetsync_core::{Blacklist, PipelineName};

    use crate::error::PublishError;
    use crate::outcome::RepoState;
    use crate::publisher::{ApiResponse, PullRequest};
    use crate::syncer::SyncDetails;

    /// Syncer that fails (or panics) for selected names and records every call.
    #[derive(Default)]
    struct FakeSyncer {
        failing: HashSet<String>,
        panicking: HashSet<String>,
        delays: HashMap<String, Duration>,
        calls: Mutex<Vec<String>>,
    }

    impl TemplateSyncer for FakeSyncer {
        fn sync(&self, request: &SyncRequest<'_>) -> Result<SyncDetails, SyncError> {
            let name = request.record.name.0.clone();
            self.calls.lock().unwrap().push(name.clone());
            if let Some(delay) = self.delays.get(&name) {
                std::thread::sleep(*delay);
            }
            if self.panicking.contains(&name) {
                panic!("merge exploded for {name}");
            }
            if self.failing.contains(&name) {
                return Err(SyncError::Git {
                    command: "push --quiet origin TEMPLATE".into(),
                    stderr: format!("authentication failed for {}", request.remote_url),
                });
            }
            Ok(SyncDetails {
                head: format!("{name}-head"),
                committed: true,
                files_changed: 1,
            })
        }
    }

    /// API answering with a fixed status per name (201 by default).
    #[derive(Default)]
    struct FakeApi {
        statuses: Vec<(String, u16)>,
        unreachable: HashSet<String>,
        calls: Mutex<Vec<(String, PullRequest)>>,
    }

    impl PullRequestApi for FakeApi {
        fn create_pull(
            &self,
            pipeline: &PipelineName,
            _token: &str,
            request: &PullRequest,
        ) -> Result<ApiResponse, PublishError> {
            self.calls
                .lock()
                .unwrap()
                .push((pipeline.0.clone(), request.clone()));
            if self.unreachable.contains(&pipeline.0) {
                return Err(PublishError::Transport {
                    url: "https://api.example/pulls".into(),
                    message: "connection refused".into(),
                });
            }
            let status = self
                .statuses
                .iter()
                .find(|(name, _)| name == &pipeline.0)
                .map(|(_, status)| *status)
                .unwrap_or(201);
            Ok(ApiResponse {
                status,
                body: format!("{{\"status\": {status}}}"),
            })
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            release_tag: "2.1.0".into(),
            token: "s3cret".into(),
        }
    }

    fn locator() -> RepoLocator {
        RepoLocator {
            org: "example".into(),
            git_base: "https://github.com".into(),
            api_base: "https://api.github.com".into(),
        }
    }

    fn working_set(names: &[&str]) -> WorkingSet {
        WorkingSet::build(
            names.iter().map(|n| PipelineRecord::named(*n)),
            &Blacklist::default(),
            None,
        )
    }

    fn run_with(
        syncer: &FakeSyncer,
        api: &FakeApi,
        names: &[&str],
        jobs: usize,
    ) -> RunReport {
        let creds = credentials();
        let locator = locator();
        let ctx = RunContext {
            credentials: &creds,
            locator: &locator,
            bot_user: "bot",
            tracking_branch: "TEMPLATE",
            base_branch: "dev",
            jobs,
        };
        RunCoordinator::new(syncer, api, ctx).run(&working_set(names))
    }

    #[test]
    fn failed_sync_never_reaches_publisher() {
        let syncer = FakeSyncer {
            failing: HashSet::from(["chipseq".to_string()]),
            ..FakeSyncer::default()
        };
        let api = FakeApi::default();
        let report = run_with(&syncer, &api, &["rnaseq", "chipseq", "rnafusion"], 1);

        let published: Vec<_> = api.calls.lock().unwrap().iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(published, vec!["rnaseq", "rnafusion"]);

        assert_eq!(report.sync_failures.len(), 1);
        assert_eq!(report.sync_failures[0].pipeline.as_str(), "chipseq");
        assert!(report
            .publish_outcomes()
            .iter()
            .all(|p| p.pipeline.as_str() != "chipseq"));
    }

    #[test]
    fn sync_failure_cause_is_redacted() {
        let syncer = FakeSyncer {
            failing: HashSet::from(["rnaseq".to_string()]),
            ..FakeSyncer::default()
        };
        let report = run_with(&syncer, &FakeApi::default(), &["rnaseq"], 1);
        let cause = &report.sync_failures[0].cause;
        assert!(cause.contains("authentication failed"));
        assert!(!cause.contains("s3cret"), "token leaked into report: {cause}");
    }

    #[test]
    fn panicking_syncer_is_isolated() {
        let syncer = FakeSyncer {
            panicking: HashSet::from(["rnaseq".to_string()]),
            ..FakeSyncer::default()
        };
        let api = FakeApi::default();
        let report = run_with(&syncer, &api, &["rnaseq", "sarek"], 1);

        assert_eq!(report.sync_failures.len(), 1);
        assert!(report.sync_failures[0].cause.contains("merge exploded for rnaseq"));
        assert_eq!(report.published().count(), 1);
        assert_eq!(api.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn rejected_pull_request_is_recorded_with_status_and_body() {
        let syncer = FakeSyncer::default();
        let api = FakeApi {
            statuses: vec![("rnaseq".into(), 422)],
            ..FakeApi::default()
        };
        let report = run_with(&syncer, &api, &["rnaseq"], 1);

        assert!(report.sync_failures.is_empty());
        assert_eq!(report.publish_failures.len(), 1);
        let failure = &report.publish_failures[0];
        assert_eq!(failure.status_code, Some(422));
        assert!(!failure.succeeded);
        assert_eq!(failure.body.as_deref(), Some("{\"status\": 422}"));
    }

    #[test]
    fn transport_error_is_a_publish_failure_without_status() {
        let api = FakeApi {
            unreachable: HashSet::from(["rnaseq".to_string()]),
            ..FakeApi::default()
        };
        let report = run_with(&FakeSyncer::default(), &api, &["rnaseq"], 1);
        let failure = &report.publish_failures[0];
        assert_eq!(failure.status_code, None);
        assert!(failure.body.as_deref().unwrap().contains("connection refused"));
    }

    #[test]
    fn pull_request_uses_tracking_and_base_branches() {
        let api = FakeApi::default();
        run_with(&FakeSyncer::default(), &api, &["rnaseq"], 1);
        let calls = api.calls.lock().unwrap();
        let (_, request) = &calls[0];
        assert_eq!(request.head, "TEMPLATE");
        assert_eq!(request.base, "dev");
        assert!(request.title.contains("2.1.0"));
    }

    #[test]
    fn empty_working_set_makes_no_calls() {
        let syncer = FakeSyncer::default();
        let api = FakeApi::default();
        let report = run_with(&syncer, &api, &[], 4);
        assert!(report.is_empty());
        assert!(!report.has_failures());
        assert!(syncer.calls.lock().unwrap().is_empty());
        assert!(api.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn pooled_run_reports_in_catalog_order_when_completion_is_reversed() {
        let names = ["a", "b", "c", "d", "e", "f"];
        // Earlier repositories finish last.
        let delays = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.to_string(), Duration::from_millis(((names.len() - i) * 40) as u64)))
            .collect();
        let syncer = FakeSyncer {
            failing: HashSet::from(["b".to_string(), "e".to_string()]),
            delays,
            ..FakeSyncer::default()
        };
        let api = FakeApi {
            statuses: vec![("a".into(), 422), ("f".into(), 422)],
            ..FakeApi::default()
        };
        let report = run_with(&syncer, &api, &names, names.len());

        let started = syncer.calls.lock().unwrap().len();
        assert_eq!(started, names.len());

        let order: Vec<_> = report.outcomes.iter().map(|o| o.pipeline.as_str()).collect();
        assert_eq!(order, names);
        let sync_failed: Vec<_> = report.sync_failures.iter().map(|f| f.pipeline.as_str()).collect();
        assert_eq!(sync_failed, vec!["b", "e"]);
        let publish_failed: Vec<_> = report
            .publish_failures
            .iter()
            .map(|f| f.pipeline.as_str())
            .collect();
        assert_eq!(publish_failed, vec!["a", "f"]);

        let completion: Vec<_> = api.calls.lock().unwrap().iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(
            completion.first().map(String::as_str),
            Some("f"),
            "the last repository should finish first: {completion:?}"
        );
    }

    /// Every failure pattern over six repositories, sequential and pooled:
    /// one sync outcome per repository, and a publish outcome iff the sync
    /// succeeded, reported in catalog order.
    #[test]
    fn gate_holds_for_every_failure_pattern() {
        let names = ["a", "b", "c", "d", "e", "f"];
        for mask in 0u32..(1 << names.len()) {
            for jobs in [1, 3] {
                let failing: HashSet<String> = names
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, n)| n.to_string())
                    .collect();
                let rejected: Vec<(String, u16)> = names
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| (mask >> 1) & (1 << i) != 0)
                    .map(|(_, n)| (n.to_string(), 422))
                    .collect();
                let syncer = FakeSyncer {
                    failing: failing.clone(),
                    ..FakeSyncer::default()
                };
                let api = FakeApi {
                    statuses: rejected,
                    ..FakeApi::default()
                };
                let report = run_with(&syncer, &api, &names, jobs);

                let order: Vec<_> = report.outcomes.iter().map(|o| o.pipeline.0.clone()).collect();
                assert_eq!(order, names, "mask {mask:#b} jobs {jobs}: catalog order");

                let sync_outcomes = report.sync_outcomes();
                assert_eq!(sync_outcomes.len(), names.len());
                for (outcome, sync) in report.outcomes.iter().zip(&sync_outcomes) {
                    let should_fail = failing.contains(&outcome.pipeline.0);
                    assert_eq!(sync.succeeded, !should_fail, "mask {mask:#b}: {}", outcome.pipeline);
                    assert_eq!(
                        outcome.publish_outcome().is_some(),
                        sync.succeeded,
                        "mask {mask:#b}: publish iff synced for {}",
                        outcome.pipeline
                    );
                    if should_fail {
                        assert!(matches!(outcome.state, RepoState::SyncFailed { .. }));
                    }
                }

                let mut published: Vec<_> =
                    api.calls.lock().unwrap().iter().map(|(n, _)| n.clone()).collect();
                published.sort();
                let mut expected: Vec<_> = names
                    .iter()
                    .filter(|n| !failing.contains(**n))
                    .map(|n| n.to_string())
                    .collect();
                expected.sort();
                assert_eq!(published, expected, "mask {mask:#b} jobs {jobs}");
            }
        }
    }
}
