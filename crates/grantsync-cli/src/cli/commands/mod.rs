//! CLI command handlers. Each command is in its own file.

mod add_organisations;
mod check_config;
mod completions;
mod create_grantees;
mod create_grants;
mod update_grantees;
mod update_grants;

use anyhow::Result;
use grantsync_core::client::PlatformClient;
use grantsync_core::config::Settings;
use grantsync_core::jobs::JobOptions;
use grantsync_core::report::RunReport;
use std::path::Path;

pub use add_organisations::run_add_organisations;
pub use check_config::run_check_config;
pub use completions::{run_completions, run_man};
pub use create_grantees::run_create_grantees;
pub use create_grants::run_create_grants;
pub use update_grantees::run_update_grantees;
pub use update_grants::run_update_grants;

/// What every job command needs.
pub struct JobContext<'a> {
    pub settings: &'a Settings,
    pub client: &'a PlatformClient,
    pub opts: JobOptions,
    pub report_path: Option<&'a Path>,
}

/// Print the summary and write the JSON report if one was asked for.
pub(super) fn finish(ctx: &JobContext<'_>, report: &RunReport) -> Result<()> {
    print!("{report}");
    if let Some(path) = ctx.report_path {
        report.write_json(path)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}
