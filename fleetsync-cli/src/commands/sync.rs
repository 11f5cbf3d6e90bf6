//! `fleetsync sync` — update every repository's template branch and open
//! pull requests.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use fleetsync_core::HttpCatalog;
use fleetsync_sync::{
    pipeline::{self, Collaborators, RunPlan},
    GitSyncOptions, GitTemplateSyncer, GithubApi, RenderedTemplate, RepoState, RunReport,
};

use super::settings::SettingsArgs;

/// Longest response body shown in the table; the JSON report keeps it whole.
const BODY_PREVIEW: usize = 72;

/// Arguments for `fleetsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Only process pipelines whose name contains this text (ignores the blacklist).
    pub pipeline: Option<String>,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Exit non-zero when any repository failed to sync or publish.
    #[arg(long)]
    pub fail_on_error: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let settings = self.settings.resolve()?;

        let catalog = HttpCatalog::new(settings.catalog_url()?, settings.http_timeout());
        let template_dir = settings.template_dir()?;
        let merger = RenderedTemplate::from_dir(template_dir)
            .with_context(|| format!("failed to load template from {}", template_dir.display()))?;
        let syncer = GitTemplateSyncer::new(
            merger,
            GitSyncOptions {
                workdir: settings.workdir.clone(),
                author_name: settings.commit_author_name().to_string(),
                author_email: settings.commit_author_email().to_string(),
                create_missing_branch: settings.create_missing_branch(),
            },
        );
        let api = GithubApi::new(settings.locator()?, settings.bot_user(), settings.http_timeout());

        let plan = RunPlan {
            settings,
            explicit_name: self.pipeline,
        };
        let report = pipeline::run(
            &plan,
            |var| std::env::var(var).ok(),
            Collaborators {
                catalog: &catalog,
                syncer: &syncer,
                api: &api,
            },
        )
        .context("sync aborted before any repository was touched")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize run report")?
            );
        } else {
            print_report(&report);
        }

        if self.fail_on_error && report.has_failures() {
            bail!("{} repositories failed", report.failure_count());
        }
        Ok(())
    }
}

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "PIPELINE")]
    pipeline: String,
    #[tabled(rename = "HEAD")]
    head: String,
    #[tabled(rename = "PULL REQUEST")]
    publish: String,
    #[tabled(rename = "DETAIL")]
    detail: String,
}

fn print_report(report: &RunReport) {
    if report.is_empty() {
        println!("No pipelines selected; nothing to do.");
        return;
    }

    let elapsed = report.finished_at - report.started_at;
    println!(
        "fleetsync v{} | {} repositories | {} published | {} failed | {:.1}s",
        env!("CARGO_PKG_VERSION"),
        report.outcomes.len(),
        report.published().count(),
        report.failure_count(),
        elapsed.num_milliseconds() as f64 / 1000.0,
    );

    let rows: Vec<OutcomeRow> = report
        .outcomes
        .iter()
        .map(|outcome| {
            let (head, publish, detail) = match &outcome.state {
                RepoState::SyncFailed { cause } => {
                    ("sync failed".to_string(), "skipped".to_string(), cause.clone())
                }
                RepoState::Published { sync, publish } | RepoState::PublishFailed { sync, publish } => (
                    short_head(&sync.head),
                    status_label(publish.status_code),
                    preview(publish.body.as_deref().unwrap_or_default()),
                ),
            };
            OutcomeRow {
                pipeline: outcome.pipeline.to_string(),
                head,
                publish,
                detail,
            }
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    for name in report.published() {
        println!("{} {}", "✓".green().bold(), name);
    }
    for failure in &report.sync_failures {
        println!("{} {} sync: {}", "✗".red().bold(), failure.pipeline, failure.cause);
    }
    for failure in &report.publish_failures {
        println!(
            "{} {} pull request: {}",
            "✗".red().bold(),
            failure.pipeline,
            status_label(failure.status_code)
        );
    }
}

fn short_head(head: &str) -> String {
    head.chars().take(8).collect()
}

fn status_label(status: Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "no response".to_string(),
    }
}

fn preview(body: &str) -> String {
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= BODY_PREVIEW {
        return flat;
    }
    let cut: String = flat.chars().take(BODY_PREVIEW).collect();
    format!("{cut}…")
}
