//! Re-attach pipeline and stage metadata to existing grants, matching CSV rows
//! to platform grants by name.

use anyhow::{Context, Result};
use serde::Serialize;

use super::columns::{NAME, PIPELINE, STAGE};
use super::JobOptions;
use crate::client::PlatformClient;
use crate::config::{Endpoint, Settings};
use crate::records::{Record, Table};
use crate::remote::{self, resolve_pipeline_id, resolve_stage_id, GrantSummary, StageLookupError};
use crate::report::{RunReport, Step};

pub const JOB: &str = "update-grants";

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrantMetadataUpdate {
    pub id: Option<String>,
    pub name: String,
    pub nonprofit_id: Option<String>,
    pub pipeline_id: Option<String>,
    #[serde(rename = "StageId")]
    pub stage_id: String,
    pub stage: Option<String>,
}

/// Metadata update for `grant` from its matching `row`.
pub fn metadata_update(
    grant: &GrantSummary,
    row: &Record,
    settings: &Settings,
) -> Result<GrantMetadataUpdate, StageLookupError> {
    let pipeline = row.value(PIPELINE).unwrap_or_default();
    let stage = row.value(STAGE).unwrap_or_default();
    let stage_id = resolve_stage_id(&settings.lookups.pipeline_stages, pipeline, stage)?;
    Ok(GrantMetadataUpdate {
        id: grant.id.clone(),
        name: grant.name.clone().unwrap_or_default(),
        nonprofit_id: grant.nonprofit_id.clone(),
        pipeline_id: resolve_pipeline_id(&settings.lookups.pipelines, pipeline),
        stage_id,
        stage: row.value(STAGE).map(str::to_string),
    })
}

pub fn run(
    settings: &Settings,
    client: &PlatformClient,
    table: &Table,
    opts: JobOptions,
) -> Result<RunReport> {
    settings.validate()?;
    let url = settings.endpoint_url(Endpoint::UpdateGrantMetadata, None)?;
    let mut report = RunReport::new(JOB, opts.dry_run);

    let grants = remote::list_grants(client, settings).context("fetch grants")?;

    for grant in &grants {
        let Some(grant_name) = grant.name.as_deref() else {
            continue;
        };
        for row in table.rows.iter().filter(|r| r.value(NAME) == Some(grant_name)) {
            let update = match metadata_update(grant, row, settings) {
                Ok(u) => u,
                Err(e) => {
                    report.failure(grant_name, Step::Mapping, e.to_string());
                    continue;
                }
            };
            if opts.dry_run {
                tracing::info!("dry run: would update grant {grant_name}: {update:?}");
                report.success(grant_name, Step::Update, None);
                continue;
            }
            tracing::info!("updating grant {grant_name}");
            match client.post_expecting(&url, &update, 200) {
                Ok(_) => report.success(grant_name, Step::Update, grant.id.clone()),
                Err(e) => report.failure(grant_name, Step::Update, e.message()),
            }
        }
    }

    for _ in table.rows.iter().filter(|r| r.value(NAME).is_none()) {
        report.failure("<unnamed>", Step::Validate, "Missing fields: Name");
    }

    let unmatched = table
        .rows
        .iter()
        .filter_map(|r| r.value(NAME))
        .filter(|name| !grants.iter().any(|g| g.name.as_deref() == Some(*name)));
    for name in unmatched {
        report.skip(name, "no grant with this name on the platform");
    }

    report.log_summary();
    Ok(report)
}
