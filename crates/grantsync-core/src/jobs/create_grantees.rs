//! Create one nonprofit per grantee row and write the new ids back into the CSV.

use anyhow::Result;

use super::columns::{ID, LEAD_NAME, NAME};
use super::{create_nonprofit, CreateNonprofit, JobOptions};
use crate::client::PlatformClient;
use crate::config::{Endpoint, Settings};
use crate::records::Table;
use crate::report::{RunReport, Step};

pub const JOB: &str = "create-grantees";

/// Value written to the `id` column when a row could not be created.
pub const FAILED_ID: &str = "Failed";

const REQUIRED: [&str; 2] = [NAME, LEAD_NAME];

/// Create each row's nonprofit. Sets the `id` column on every row (adding it
/// if absent): the new platform id, or `Failed`. In dry runs rows are left
/// untouched.
pub fn run(
    settings: &Settings,
    client: &PlatformClient,
    table: &mut Table,
    opts: JobOptions,
) -> Result<RunReport> {
    settings.validate()?;
    let url = settings.endpoint_url(Endpoint::CreateGrantee, None)?;
    let mut report = RunReport::new(JOB, opts.dry_run);
    if !opts.dry_run {
        table.ensure_column(ID);
    }

    for row in table.rows.iter_mut() {
        let label = row.value(NAME).unwrap_or("<unnamed>").to_string();
        let missing: Vec<&str> = REQUIRED
            .iter()
            .copied()
            .filter(|c| row.value(c).is_none())
            .collect();
        if !missing.is_empty() {
            report.failure(
                label,
                Step::Validate,
                format!("Missing fields: {}", missing.join(", ")),
            );
            if !opts.dry_run {
                row.set(ID, FAILED_ID);
            }
            continue;
        }

        let body = CreateNonprofit {
            legal_name: row.value(NAME).unwrap_or_default(),
            primary_contact_name: row.value(LEAD_NAME),
        };
        if opts.dry_run {
            tracing::info!("dry run: would create nonprofit {label}");
            report.success(label, Step::Create, None);
            continue;
        }

        match create_nonprofit(client, &url, &body) {
            Ok(Some(id)) => {
                row.set(ID, id.clone());
                report.success(label, Step::Create, Some(id));
            }
            Ok(None) => {
                row.set(ID, FAILED_ID);
                report.failure(label, Step::Create, "response carried no id");
            }
            Err(e) => {
                row.set(ID, FAILED_ID);
                report.failure(label, Step::Create, e.message());
            }
        }
    }

    report.log_summary();
    Ok(report)
}
