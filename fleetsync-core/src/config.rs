//! Run configuration: an optional YAML settings file plus credentials read
//! from the environment.
//!
//! # Precedence
//!
//! CLI flags > settings file > built-in defaults. The binary expresses its
//! flags as a second [`Settings`] value and calls [`Settings::merge`].
//!
//! # Settings file
//!
//! ```text
//! catalog_url: https://pipelines.example.org/pipelines.json
//! org: example-pipelines
//! template_dir: ./template
//! blacklist: ./blacklist.json
//! base_branch: dev
//! jobs: 4
//! ```
//!
//! Credentials ([`Credentials`]) never come from the file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;
use crate::types::PipelineName;

pub const DEFAULT_CONFIG_FILE: &str = "fleetsync.yaml";
pub const DEFAULT_TEMPLATE_BRANCH: &str = "TEMPLATE";
pub const DEFAULT_BASE_BRANCH: &str = "dev";
pub const DEFAULT_HOST: &str = "github.com";
pub const DEFAULT_BOT_USER: &str = "fleetsync-bot";
pub const DEFAULT_AUTHOR_EMAIL: &str = "fleetsync-bot@users.noreply.github.com";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

pub const RELEASE_TAG_ENV: &str = "FLEETSYNC_RELEASE_TAG";
pub const BOT_TOKEN_ENV: &str = "FLEETSYNC_BOT_TOKEN";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Every tunable of a run. All fields are optional so that file values and
/// CLI overrides can be layered with [`Settings::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub catalog_url: Option<String>,
    pub blacklist: Option<PathBuf>,
    pub org: Option<String>,
    /// Git host, e.g. `github.com`. The API defaults to `https://api.<host>`.
    pub host: Option<String>,
    pub api_base: Option<String>,
    /// Base for clone URLs; defaults to `https://<host>`. May be a local
    /// directory of bare repositories.
    pub git_base: Option<String>,
    pub template_dir: Option<PathBuf>,
    pub template_branch: Option<String>,
    pub base_branch: Option<String>,
    pub bot_user: Option<String>,
    pub commit_author_name: Option<String>,
    pub commit_author_email: Option<String>,
    pub create_missing_branch: Option<bool>,
    pub jobs: Option<usize>,
    pub workdir: Option<PathBuf>,
    pub http_timeout_secs: Option<u64>,
}

impl Settings {
    /// Parse a settings file. Relative `blacklist`, `template_dir` and
    /// `workdir` paths are taken relative to the file's directory.
    pub fn load_at(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::SettingsRead {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::SettingsParse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(match path.parent() {
            Some(base) => settings.relative_to(base),
            None => settings,
        })
    }

    fn relative_to(self, base: &Path) -> Settings {
        let anchor = |p: Option<PathBuf>| p.map(|p| if p.is_relative() { base.join(p) } else { p });
        Settings {
            blacklist: anchor(self.blacklist),
            template_dir: anchor(self.template_dir),
            workdir: anchor(self.workdir),
            ..self
        }
    }

    /// Load an explicitly requested file, or `fleetsync.yaml` in `cwd` when it
    /// exists. An explicit path that is missing is an error; a missing default
    /// file is not.
    pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_at(path);
        }
        let default = cwd.join(DEFAULT_CONFIG_FILE);
        if default.is_file() {
            tracing::debug!("using settings from {}", default.display());
            Self::load_at(&default)
        } else {
            Ok(Self::default())
        }
    }

    /// Layer `overrides` on top of `self`; any value set in `overrides` wins.
    pub fn merge(self, overrides: Settings) -> Settings {
        Settings {
            catalog_url: overrides.catalog_url.or(self.catalog_url),
            blacklist: overrides.blacklist.or(self.blacklist),
            org: overrides.org.or(self.org),
            host: overrides.host.or(self.host),
            api_base: overrides.api_base.or(self.api_base),
            git_base: overrides.git_base.or(self.git_base),
            template_dir: overrides.template_dir.or(self.template_dir),
            template_branch: overrides.template_branch.or(self.template_branch),
            base_branch: overrides.base_branch.or(self.base_branch),
            bot_user: overrides.bot_user.or(self.bot_user),
            commit_author_name: overrides.commit_author_name.or(self.commit_author_name),
            commit_author_email: overrides.commit_author_email.or(self.commit_author_email),
            create_missing_branch: overrides.create_missing_branch.or(self.create_missing_branch),
            jobs: overrides.jobs.or(self.jobs),
            workdir: overrides.workdir.or(self.workdir),
            http_timeout_secs: overrides.http_timeout_secs.or(self.http_timeout_secs),
        }
    }

    pub fn catalog_url(&self) -> Result<&str, ConfigError> {
        self.catalog_url
            .as_deref()
            .ok_or(ConfigError::MissingSetting("catalog_url"))
    }

    pub fn org(&self) -> Result<&str, ConfigError> {
        self.org.as_deref().ok_or(ConfigError::MissingSetting("org"))
    }

    pub fn template_dir(&self) -> Result<&Path, ConfigError> {
        self.template_dir
            .as_deref()
            .ok_or(ConfigError::MissingSetting("template_dir"))
    }

    pub fn template_branch(&self) -> &str {
        self.template_branch.as_deref().unwrap_or(DEFAULT_TEMPLATE_BRANCH)
    }

    pub fn base_branch(&self) -> &str {
        self.base_branch.as_deref().unwrap_or(DEFAULT_BASE_BRANCH)
    }

    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn api_base(&self) -> String {
        match &self.api_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://api.{}", self.host()),
        }
    }

    pub fn git_base(&self) -> String {
        match &self.git_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}", self.host()),
        }
    }

    pub fn bot_user(&self) -> &str {
        self.bot_user.as_deref().unwrap_or(DEFAULT_BOT_USER)
    }

    pub fn commit_author_name(&self) -> &str {
        self.commit_author_name.as_deref().unwrap_or_else(|| self.bot_user())
    }

    pub fn commit_author_email(&self) -> &str {
        self.commit_author_email.as_deref().unwrap_or(DEFAULT_AUTHOR_EMAIL)
    }

    pub fn create_missing_branch(&self) -> bool {
        self.create_missing_branch.unwrap_or(false)
    }

    /// Worker count, never below one.
    pub fn jobs(&self) -> usize {
        self.jobs.unwrap_or(1).max(1)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    /// Where each repository lives, for this run's org and hosts.
    pub fn locator(&self) -> Result<RepoLocator, ConfigError> {
        Ok(RepoLocator {
            org: self.org()?.to_string(),
            git_base: self.git_base(),
            api_base: self.api_base(),
        })
    }
}

// ---------------------------------------------------------------------------
// RepoLocator
// ---------------------------------------------------------------------------

/// Maps a pipeline name to its clone URL and pull-request endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLocator {
    pub org: String,
    pub git_base: String,
    pub api_base: String,
}

impl RepoLocator {
    /// Clone URL without credentials; safe to log.
    pub fn display_remote(&self, pipeline: &PipelineName) -> String {
        format!("{}/{}/{}.git", self.git_base, self.org, pipeline.short_name())
    }

    /// Clone URL with percent-encoded `user:token@` injected for https
    /// remotes. Non-https bases (local paths, `file://`) are returned unchanged.
    pub fn remote_url(&self, pipeline: &PipelineName, user: &str, credentials: &Credentials) -> String {
        let display_url = self.display_remote(pipeline);
        if !self.git_base.starts_with("https://") {
            return display_url;
        }
        let mut url = match Url::parse(&display_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("cannot add credentials to {}: {}", display_url, e);
                return display_url;
            }
        };
        if url.set_username(user).is_err() || url.set_password(Some(&credentials.token)).is_err() {
            tracing::warn!("cannot add credentials to {}", display_url);
            return display_url;
        }
        url.into()
    }

    /// `POST` target for opening a pull request.
    pub fn pulls_url(&self, pipeline: &PipelineName) -> String {
        format!(
            "{}/repos/{}/{}/pulls",
            self.api_base,
            self.org,
            pipeline.short_name()
        )
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Run-level secrets, read once before any repository is processed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub release_tag: String,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("release_tag", &self.release_tag)
            .field("token", &"***")
            .finish()
    }
}

impl Credentials {
    /// Read `FLEETSYNC_RELEASE_TAG` and `FLEETSYNC_BOT_TOKEN` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read credentials through `lookup`; unset or blank values are errors.
    /// The release tag is checked first.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |var: &'static str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingEnv { var })
        };
        Ok(Self {
            release_tag: required(RELEASE_TAG_ENV)?,
            token: required(BOT_TOKEN_ENV)?,
        })
    }

    /// Replace every occurrence of the token in `text`, raw or as it
    /// appears percent-encoded in a clone URL.
    pub fn redact(&self, text: &str) -> String {
        if self.token.is_empty() {
            return text.to_string();
        }
        let mut redacted = text.replace(&self.token, "***");
        if let Some(encoded) = encoded_userinfo(&self.token) {
            if encoded != self.token {
                redacted = redacted.replace(&encoded, "***");
            }
        }
        redacted
    }
}

/// `value` as the `url` crate encodes it in the password position.
fn encoded_userinfo(value: &str) -> Option<String> {
    let mut url = Url::parse("https://host.invalid/").ok()?;
    url.set_password(Some(value)).ok()?;
    url.password().map(str::to_string)
}
