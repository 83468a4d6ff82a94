//! `grantsync update-grantees <csv>` – push custom fields onto existing grantees.

use anyhow::Result;
use grantsync_core::jobs::update_grantees;
use grantsync_core::records;
use std::path::Path;

use super::{finish, JobContext};

pub fn run_update_grantees(ctx: &JobContext<'_>, csv: &Path) -> Result<()> {
    let table = records::read_csv(csv)?;
    let report = update_grantees::run(ctx.settings, ctx.client, &table, ctx.opts)?;
    finish(ctx, &report)
}
