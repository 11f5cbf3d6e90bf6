//! Pull Request Publisher — opens `tracking branch → base branch` pull
//! requests through the hosting service's REST API.
//!
//! A `201 Created` response is the only success. Any other status is a
//! failure carrying the status and response body; transport errors are
//! failures without a status. Nothing here returns an error to the caller.

use std::time::Duration;

use base64::Engine as _;
use serde::Serialize;

use fleetsync_core::config::RepoLocator;
use fleetsync_core::PipelineName;

use crate::error::PublishError;
use crate::outcome::{PublishOutcome, SyncedBranch};

const STATUS_CREATED: u16 = 201;

/// JSON body of a pull-request creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
}

impl PullRequest {
    pub fn for_release(head: &str, base: &str, release_tag: &str) -> Self {
        Self {
            title: format!("Template update for release {release_tag}"),
            body: format!(
                "A new release of the pipeline template ({release_tag}) is available.\n\n\
                 This pull request merges the `{head}` branch, which tracks the template, \
                 into `{base}`. Please resolve any merge conflicts on this branch and \
                 review the changes before merging."
            ),
            head: head.to_string(),
            base: base.to_string(),
        }
    }
}

/// Raw HTTP result of a creation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Write side of the hosting service.
pub trait PullRequestApi: Send + Sync {
    fn create_pull(
        &self,
        pipeline: &PipelineName,
        token: &str,
        request: &PullRequest,
    ) -> Result<ApiResponse, PublishError>;
}

/// GitHub-compatible REST client (`POST /repos/<org>/<repo>/pulls`, Basic auth).
pub struct GithubApi {
    locator: RepoLocator,
    user: String,
    agent: ureq::Agent,
}

impl GithubApi {
    pub fn new(locator: RepoLocator, user: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("fleetsync/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            locator,
            user: user.into(),
            agent,
        }
    }

    fn basic_auth(&self, token: &str) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", self.user, token));
        format!("Basic {encoded}")
    }
}

impl PullRequestApi for GithubApi {
    fn create_pull(
        &self,
        pipeline: &PipelineName,
        token: &str,
        request: &PullRequest,
    ) -> Result<ApiResponse, PublishError> {
        let url = self.locator.pulls_url(pipeline);
        let result = self
            .agent
            .post(&url)
            .set("Authorization", &self.basic_auth(token))
            .set("Accept", "application/vnd.github+json")
            .send_json(request);

        match result {
            Ok(response) => Ok(ApiResponse {
                status: response.status(),
                body: response.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Status(status, response)) => Ok(ApiResponse {
                status,
                body: response.into_string().unwrap_or_default(),
            }),
            Err(e) => Err(PublishError::Transport {
                url,
                message: e.to_string(),
            }),
        }
    }
}

/// Turns API calls into [`PublishOutcome`]s.
#[derive(Clone, Copy)]
pub struct PullRequestPublisher<'a> {
    api: &'a dyn PullRequestApi,
}

impl<'a> PullRequestPublisher<'a> {
    pub fn new(api: &'a dyn PullRequestApi) -> Self {
        Self { api }
    }

    /// Open a pull request from the synced tracking branch into `base_branch`.
    pub fn publish(
        &self,
        synced: &SyncedBranch,
        token: &str,
        base_branch: &str,
        release_tag: &str,
    ) -> PublishOutcome {
        let pipeline = synced.pipeline().clone();
        let request = PullRequest::for_release(synced.branch(), base_branch, release_tag);

        match self.api.create_pull(&pipeline, token, &request) {
            Ok(ApiResponse { status, body }) => {
                let succeeded = status == STATUS_CREATED;
                if succeeded {
                    tracing::info!("{pipeline}: pull request opened ({} → {base_branch})", synced.branch());
                } else {
                    tracing::warn!("{pipeline}: pull request rejected with status {status}");
                }
                PublishOutcome {
                    pipeline,
                    status_code: Some(status),
                    succeeded,
                    body: Some(body),
                }
            }
            Err(e) => {
                tracing::warn!("{pipeline}: {e}");
                PublishOutcome {
                    pipeline,
                    status_code: None,
                    succeeded: false,
                    body: Some(e.to_string()),
                }
            }
        }
    }
}
