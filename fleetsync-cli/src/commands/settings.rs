//! Flags shared by every subcommand that touches the catalog.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use fleetsync_core::Settings;

/// Settings overrides; each flag wins over the settings file.
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// Settings file (defaults to `./fleetsync.yaml` when present).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// URL of the pipeline catalog JSON.
    #[arg(long)]
    pub catalog_url: Option<String>,

    /// JSON file listing pipelines to skip.
    #[arg(long, value_name = "FILE")]
    pub blacklist: Option<PathBuf>,

    /// Organisation owning the pipeline repositories.
    #[arg(long)]
    pub org: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub api_base: Option<String>,

    /// Base for clone URLs; may be a local directory of bare repositories.
    #[arg(long)]
    pub git_base: Option<String>,

    /// Directory holding the canonical template.
    #[arg(long, value_name = "DIR")]
    pub template_dir: Option<PathBuf>,

    /// Branch receiving the template (default `TEMPLATE`).
    #[arg(long)]
    pub template_branch: Option<String>,

    /// Branch pull requests target (default `dev`).
    #[arg(long)]
    pub base_branch: Option<String>,

    #[arg(long)]
    pub bot_user: Option<String>,

    /// Repositories processed concurrently.
    #[arg(long, short = 'j')]
    pub jobs: Option<usize>,

    /// Parent directory for temporary clones.
    #[arg(long, value_name = "DIR")]
    pub workdir: Option<PathBuf>,

    /// Create the template branch when a repository lacks it.
    #[arg(long)]
    pub create_missing_branch: bool,

    /// Treat a missing template branch as a sync failure, whatever the settings file says.
    #[arg(long, conflicts_with = "create_missing_branch")]
    pub no_create_missing_branch: bool,

    #[arg(long, value_name = "SECS")]
    pub http_timeout_secs: Option<u64>,
}

impl SettingsArgs {
    /// Settings file layered under the flags given on the command line.
    pub fn resolve(&self) -> Result<Settings> {
        let cwd = std::env::current_dir().context("could not determine working directory")?;
        let file = Settings::discover(self.config.as_deref(), &cwd)
            .context("failed to load settings")?;
        Ok(file.merge(self.overrides()))
    }

    fn create_missing_branch_override(&self) -> Option<bool> {
        match (self.create_missing_branch, self.no_create_missing_branch) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    fn overrides(&self) -> Settings {
        Settings {
            catalog_url: self.catalog_url.clone(),
            blacklist: self.blacklist.clone(),
            org: self.org.clone(),
            host: self.host.clone(),
            api_base: self.api_base.clone(),
            git_base: self.git_base.clone(),
            template_dir: self.template_dir.clone(),
            template_branch: self.template_branch.clone(),
            base_branch: self.base_branch.clone(),
            bot_user: self.bot_user.clone(),
            create_missing_branch: self.create_missing_branch_override(),
            jobs: self.jobs,
            workdir: self.workdir.clone(),
            http_timeout_secs: self.http_timeout_secs,
            ..Settings::default()
        }
    }
}
