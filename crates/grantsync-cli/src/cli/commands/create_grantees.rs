//! `grantsync create-grantees <csv>` – create nonprofits, write ids back.

use anyhow::Result;
use grantsync_core::jobs::create_grantees;
use grantsync_core::records;
use std::path::Path;

use super::{finish, JobContext};

pub fn run_create_grantees(ctx: &JobContext<'_>, csv: &Path, output: Option<&Path>) -> Result<()> {
    let mut table = records::read_csv(csv)?;
    let report = create_grantees::run(ctx.settings, ctx.client, &mut table, ctx.opts)?;

    if ctx.opts.dry_run {
        println!("Dry run: {} left unchanged.", csv.display());
    } else {
        let out = output.unwrap_or(csv);
        records::write_csv(out, &table)?;
        println!("Wrote ids to {}", out.display());
    }
    finish(ctx, &report)
}
