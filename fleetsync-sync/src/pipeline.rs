//! Whole-run entrypoint shared by `fleetsync sync` and the integration tests.
//!
//! Order matters: credentials and every other fatal input are checked before
//! the catalog is fetched, so a misconfigured run touches nothing.

use fleetsync_core::{Blacklist, CatalogSource, ConfigError, Credentials, Settings, WorkingSet};

use crate::coordinator::{RunContext, RunCoordinator};
use crate::outcome::RunReport;
use crate::publisher::PullRequestApi;
use crate::syncer::TemplateSyncer;

/// What to run.
#[derive(Debug, Clone, Default)]
pub struct RunPlan {
    pub settings: Settings,
    /// Substring selector; when set the blacklist is ignored.
    pub explicit_name: Option<String>,
}

/// External collaborators of a run.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub catalog: &'a dyn CatalogSource,
    pub syncer: &'a dyn TemplateSyncer,
    pub api: &'a dyn PullRequestApi,
}

/// Load the blacklist, fetch the catalog and select the working set.
///
/// Only the blacklist can fail; a failed fetch yields an empty set.
pub fn working_set(plan: &RunPlan, catalog: &dyn CatalogSource) -> Result<WorkingSet, ConfigError> {
    let blacklist = Blacklist::load_optional(plan.settings.blacklist.as_deref())?;
    let records = catalog.fetch();
    let set = WorkingSet::build(records, &blacklist, plan.explicit_name.as_deref());
    tracing::info!(
        "working set: {} pipeline(s) ({} blacklisted name(s){})",
        set.len(),
        blacklist.len(),
        plan.explicit_name
            .as_deref()
            .map(|name| format!(", selector `{name}`"))
            .unwrap_or_default()
    );
    Ok(set)
}

/// Execute a full run.
///
/// `env` resolves environment variables (usually `std::env::var(..).ok()`).
/// Only [`ConfigError`]s are returned; every per-repository failure is in the
/// report.
pub fn run(
    plan: &RunPlan,
    env: impl Fn(&str) -> Option<String>,
    collaborators: Collaborators<'_>,
) -> Result<RunReport, ConfigError> {
    let credentials = Credentials::from_lookup(env)?;
    let locator = plan.settings.locator()?;
    let set = working_set(plan, collaborators.catalog)?;

    let ctx = RunContext {
        credentials: &credentials,
        locator: &locator,
        bot_user: plan.settings.bot_user(),
        tracking_branch: plan.settings.template_branch(),
        base_branch: plan.settings.base_branch(),
        jobs: plan.settings.jobs(),
    };
    let report = RunCoordinator::new(collaborators.syncer, collaborators.api, ctx).run(&set);

    tracing::info!(
        "run finished: {} repositories, {} sync failure(s), {} publish failure(s)",
        report.outcomes.len(),
        report.sync_failures.len(),
        report.publish_failures.len()
    );
    Ok(report)
}
