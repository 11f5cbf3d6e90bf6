//! `fleetsync list` — preview the working set without touching any repository.

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use fleetsync_core::{HttpCatalog, WorkingSet};
use fleetsync_sync::pipeline::{self, RunPlan};

use super::settings::SettingsArgs;

/// Arguments for `fleetsync list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list pipelines whose name contains this text (ignores the blacklist).
    pub pipeline: Option<String>,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Emit pipeline names as a JSON array.
    #[arg(long)]
    pub json: bool,
}

impl ListArgs {
    pub fn run(self) -> Result<()> {
        let settings = self.settings.resolve()?;
        let catalog = HttpCatalog::new(settings.catalog_url()?, settings.http_timeout());
        let plan = RunPlan {
            settings,
            explicit_name: self.pipeline,
        };
        let set = pipeline::working_set(&plan, &catalog).context("failed to select pipelines")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&set.names()).context("failed to serialize names")?
            );
            return Ok(());
        }
        print_table(&set);
        Ok(())
    }
}

#[derive(Tabled)]
struct PipelineRow {
    #[tabled(rename = "PIPELINE")]
    name: String,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
}

fn print_table(set: &WorkingSet) {
    if set.is_empty() {
        println!("No pipelines selected.");
        return;
    }
    let rows: Vec<PipelineRow> = set
        .iter()
        .map(|record| PipelineRow {
            name: record.name.to_string(),
            description: record
                .metadata
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("{} pipeline(s)", set.len());
}
