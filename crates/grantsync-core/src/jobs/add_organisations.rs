//! Create organisations that are not on the platform yet, then tag them and
//! store their legacy organization id. Rows are processed in batches.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::columns::{NAME, ORGANIZATION_ID, TAGS, WEBSITE};
use super::{create_nonprofit, CreateNonprofit, JobOptions};
use crate::client::PlatformClient;
use crate::config::{Endpoint, Settings};
use crate::records::{Record, Table};
use crate::remote;
use crate::report::{RunReport, Step};

pub const JOB: &str = "add-organisations";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InteractionInfo {
    pub qb_vendor_details: Option<serde_json::Value>,
    pub organization_tags: Vec<Option<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrganisationUpdate {
    website: Option<String>,
    custom_fields: BTreeMap<String, Option<String>>,
    interaction_additional_info: InteractionInfo,
}

fn update_body(row: &Record, affinity_field: &str) -> OrganisationUpdate {
    let custom_fields = [(
        affinity_field.to_string(),
        row.value(ORGANIZATION_ID).map(str::to_string),
    )]
    .into();
    OrganisationUpdate {
        website: row.value(WEBSITE).map(str::to_string),
        custom_fields,
        interaction_additional_info: InteractionInfo {
            qb_vendor_details: None,
            organization_tags: vec![row.value(TAGS).map(str::to_string)],
        },
    }
}

pub fn run(
    settings: &Settings,
    client: &PlatformClient,
    table: &Table,
    batch_size: usize,
    opts: JobOptions,
) -> Result<RunReport> {
    settings.validate()?;
    let create_url = settings.endpoint_url(Endpoint::CreateGrantee, None)?;
    // Fail before creating anything if the follow-up update cannot be addressed.
    settings.endpoint_url(Endpoint::UpdateGrantee, Some("0"))?;
    let mut report = RunReport::new(JOB, opts.dry_run);

    let mut existing: BTreeSet<String> = remote::list_nonprofits(client, settings)
        .context("fetch existing nonprofits")?
        .iter()
        .filter_map(|np| np.affinity_id(&settings.affinity_field))
        .collect();

    let batch_size = batch_size.max(1);
    let total_batches = table.len().div_ceil(batch_size);
    tracing::info!(
        "processing {} rows in {} batches of {} rows each",
        table.len(),
        total_batches,
        batch_size
    );

    for (i, batch) in table.rows.chunks(batch_size).enumerate() {
        tracing::info!("processing batch {} of {}", i + 1, total_batches);
        for row in batch {
            process_row(settings, client, &create_url, row, &mut existing, &mut report, opts)?;
        }
    }

    report.log_summary();
    Ok(report)
}

fn process_row(
    settings: &Settings,
    client: &PlatformClient,
    create_url: &str,
    row: &Record,
    existing: &mut BTreeSet<String>,
    report: &mut RunReport,
    opts: JobOptions,
) -> Result<()> {
    let label = row.value(NAME).unwrap_or("<unnamed>").to_string();
    let Some(name) = row.value(NAME) else {
        report.failure(label, Step::Validate, "Missing fields: Name");
        return Ok(());
    };
    let org_id = row.value(ORGANIZATION_ID).map(str::to_string);
    if let Some(org_id) = &org_id {
        if existing.contains(org_id) {
            report.skip(label, format!("organization {org_id} already exists"));
            return Ok(());
        }
    }

    let update = update_body(row, &settings.affinity_field);
    if opts.dry_run {
        tracing::info!("dry run: would create {label} and update its custom fields");
        report.success(label.clone(), Step::Create, None);
        report.success(label, Step::Update, None);
        if let Some(org_id) = org_id {
            existing.insert(org_id);
        }
        return Ok(());
    }

    let body = CreateNonprofit {
        legal_name: name,
        primary_contact_name: None,
    };
    let nonprofit_id = match create_nonprofit(client, create_url, &body) {
        Ok(Some(id)) => id,
        Ok(None) => {
            report.failure(label, Step::Create, "response carried no id");
            return Ok(());
        }
        Err(e) => {
            report.failure(label, Step::Create, e.message());
            return Ok(());
        }
    };
    report.success(label.clone(), Step::Create, Some(nonprofit_id.clone()));
    if let Some(org_id) = org_id {
        existing.insert(org_id);
    }

    let update_url = settings.endpoint_url(Endpoint::UpdateGrantee, Some(&nonprofit_id))?;
    match client.post_expecting(&update_url, &update, 204) {
        Ok(_) => report.success(label, Step::Update, Some(nonprofit_id)),
        Err(e) => report.failure(label, Step::Update, e.message()),
    }
    Ok(())
}
