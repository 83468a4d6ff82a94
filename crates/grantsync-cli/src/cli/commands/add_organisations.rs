//! `grantsync add-organisations <csv>` – create missing organisations in batches.

use anyhow::Result;
use grantsync_core::jobs::add_organisations;
use grantsync_core::records;
use std::path::Path;

use super::{finish, JobContext};

pub fn run_add_organisations(
    ctx: &JobContext<'_>,
    csv: &Path,
    batch_size: Option<usize>,
) -> Result<()> {
    let table = records::read_csv(csv)?;
    let batch_size = batch_size.unwrap_or(ctx.settings.batch_size);
    let report = add_organisations::run(ctx.settings, ctx.client, &table, batch_size, ctx.opts)?;
    finish(ctx, &report)
}
