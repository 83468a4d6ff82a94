//! Push profile custom fields onto grantees created earlier (rows carry the
//! platform `id` written back by create-grantees).

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

use super::add_organisations::InteractionInfo;
use super::columns::*;
use super::create_grantees::FAILED_ID;
use super::JobOptions;
use crate::client::PlatformClient;
use crate::config::{Endpoint, Settings};
use crate::normalize::{normalize_contact_name, resolve_foundation_poc};
use crate::records::{Record, Table};
use crate::report::{RunReport, Step};

pub const JOB: &str = "update-grantees";

/// Organization tag every grantee carries.
pub const GRANTEE_TAG: &str = "Grantee (all time)";

/// Platform custom field keys, paired with the CSV column feeding each.
const CUSTOM_FIELDS: [(&str, &str); 9] = [
    ("Area of intervention-1Dl5ES7a", AREA_OF_INTERVENTION),
    ("Org type-ngM_Rj--", ORG_TYPE),
    ("Operate in-h0GCmal-", OPERATE_IN),
    ("description", MISSION),
    ("Level of Engagement-tuTYKb5E", LEVEL_OF_ENGAGEMENT),
    ("website", WEBSITE),
    ("Portfolio-WgSIOWIz", PORTFOLIO),
    ("Region-ObIfV84Z", REGION),
    ("Status (manual)-Jj5hsNIX", GRANTEE_STATUS),
];
const END_OF_ACCOUNTING_YEAR_FIELD: &str = "End of Accounting Year-XWqSCPwH";
const CONTACT_FIELD: &str = "lif_contact_person";

#[derive(Debug, Serialize)]
struct PointOfContact {
    id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GranteeUpdate {
    website: Option<String>,
    description: Option<String>,
    custom_fields: BTreeMap<String, Option<String>>,
    #[serde(rename = "foundationPOC")]
    foundation_poc: PointOfContact,
    interaction_additional_info: InteractionInfo,
}

/// Trimmed cell; blank stays `""`, an absent column becomes null.
fn cell(row: &Record, column: &str) -> Option<String> {
    row.get(column).map(|v| v.trim().to_string())
}

fn update_body(row: &Record, settings: &Settings) -> GranteeUpdate {
    let contact = cell(row, LEAD_NAME)
        .map(|lead| normalize_contact_name(&lead, &settings.lookups.contact_aliases));

    let mut custom_fields: BTreeMap<String, Option<String>> = CUSTOM_FIELDS
        .iter()
        .map(|(key, column)| (key.to_string(), cell(row, column)))
        .collect();
    custom_fields.insert(settings.affinity_field.clone(), cell(row, ORGANIZATION_ID));
    custom_fields.insert(CONTACT_FIELD.to_string(), contact.clone());
    custom_fields.insert(
        END_OF_ACCOUNTING_YEAR_FIELD.to_string(),
        cell(row, END_OF_ACCOUNTING_YEAR),
    );

    GranteeUpdate {
        website: cell(row, WEBSITE),
        description: cell(row, MISSION),
        custom_fields,
        foundation_poc: PointOfContact {
            id: contact
                .as_deref()
                .and_then(|c| resolve_foundation_poc(c, &settings.lookups.users)),
        },
        interaction_additional_info: InteractionInfo {
            qb_vendor_details: None,
            organization_tags: vec![Some(GRANTEE_TAG.to_string())],
        },
    }
}

pub fn run(
    settings: &Settings,
    client: &PlatformClient,
    table: &Table,
    opts: JobOptions,
) -> Result<RunReport> {
    settings.validate()?;
    let mut report = RunReport::new(JOB, opts.dry_run);

    for row in &table.rows {
        let label = row.value(NAME).unwrap_or("<unnamed>").to_string();
        let nonprofit_id = match row.value(ID) {
            Some(id) if id != FAILED_ID => id,
            _ => {
                report.skip(label, "no platform id in the id column");
                continue;
            }
        };

        let body = update_body(row, settings);
        if opts.dry_run {
            tracing::info!("dry run: would update custom fields for nonprofit {nonprofit_id}");
            report.success(label, Step::Update, Some(nonprofit_id.to_string()));
            continue;
        }

        let url = settings.endpoint_url(Endpoint::UpdateGrantee, Some(nonprofit_id))?;
        match client.post_expecting(&url, &body, 204) {
            Ok(_) => {
                tracing::info!("updated custom fields for nonprofit {nonprofit_id}");
                report.success(label, Step::Update, Some(nonprofit_id.to_string()));
            }
            Err(e) => report.failure(label, Step::Update, e.message()),
        }
    }

    report.log_summary();
    Ok(report)
}
