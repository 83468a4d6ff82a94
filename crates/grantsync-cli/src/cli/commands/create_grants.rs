//! `grantsync create-grants <csv>` – create historical grants and payments.

use anyhow::Result;
use grantsync_core::jobs::create_grants;
use grantsync_core::records;
use std::path::Path;

use super::{finish, JobContext};

pub fn run_create_grants(ctx: &JobContext<'_>, csv: &Path) -> Result<()> {
    let table = records::read_csv(csv)?;
    let report = create_grants::run(ctx.settings, ctx.client, &table, ctx.opts)?;
    finish(ctx, &report)
}
