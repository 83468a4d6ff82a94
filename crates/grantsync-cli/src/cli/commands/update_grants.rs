//! `grantsync update-grants <csv>` – set pipeline/stage on existing grants.

use anyhow::Result;
use grantsync_core::jobs::update_grants;
use grantsync_core::records;
use std::path::Path;

use super::{finish, JobContext};

pub fn run_update_grants(ctx: &JobContext<'_>, csv: &Path) -> Result<()> {
    let table = records::read_csv(csv)?;
    let report = update_grants::run(ctx.settings, ctx.client, &table, ctx.opts)?;
    finish(ctx, &report)
}
