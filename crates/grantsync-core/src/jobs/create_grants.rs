//! Create historical grants (and their payment, for awarded stages) from a
//! grant-opportunities export.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

use super::columns::*;
use super::JobOptions;
use crate::client::PlatformClient;
use crate::config::{Endpoint, Settings};
use crate::normalize::{
    calendar_year_duration, clean_amount, normalize_support_type, parse_date, resolve_assignee,
};
use crate::records::{Record, Table};
use crate::remote;
use crate::report::{RunReport, Step};

pub const JOB: &str = "create-grants";

const FORM_TITLE: &str = "Historical Grants";
const DISBURSEMENT_ENTITY_FIELD: &str = "Disbursement Entity-pTa3wGtW";

/// Everything a row needs besides its own cells.
pub struct GrantContext<'a> {
    pub settings: &'a Settings,
    /// Affinity id → platform nonprofit id.
    pub nonprofits: &'a BTreeMap<String, String>,
}

fn foundation_block(settings: &Settings) -> Value {
    let f = &settings.foundation;
    json!({
        "id": f.id.clone().unwrap_or_else(|| settings.foundation_id.clone()),
        "displayName": f.display_name,
        "ein": f.ein,
        "subdomain": f.subdomain,
        "created": f.created,
        "vitallyId": f.vitally_id,
        "accountType": f.account_type,
        "logoFile": f.logo_file,
        "granteeMFAEnabled": f.grantee_mfa_enabled,
        "foundationMFAEnabled": f.foundation_mfa_enabled,
        "currency": { "locale": f.currency_locale, "code": f.currency_code },
    })
}

fn payment(row: &Record, ctx: &GrantContext<'_>, nonprofit_id: Option<&str>) -> Value {
    let due_raw = row
        .value(DISBURSEMENT_DATE)
        .or_else(|| row.value(ESTIMATED_DISBURSEMENT_DATE))
        .unwrap_or_default();
    let status = if row.value(DISBURSEMENT_DATE).is_some() {
        "SENT"
    } else {
        "NOT_STARTED"
    };
    let assignee = resolve_assignee(
        row.get(LEAD).unwrap_or_default(),
        &ctx.settings.lookups.users,
        ctx.settings.default_assignee_id.as_deref(),
    );
    json!({
        "active": true,
        "additionalInfo": {
            "additionalFields": { DISBURSEMENT_ENTITY_FIELD: row.value(DISBURSEMENT_ENTITY) },
            "budgetCategory": row.value(PORTFOLIO_ORGANIZATION),
        },
        "amount": row.get(AMOUNT).and_then(clean_amount),
        "assignee": null,
        "assigneeId": assignee,
        "comments": null,
        "dueDate": parse_date(due_raw),
        "nonprofitId": nonprofit_id,
        "status": status,
        "type": "ACH",
        "contingencies": null,
        "created": null,
        "createdBy": null,
        "foundation": null,
        "hasScenario": null,
        "id": null,
        "linkedEntities": null,
        "scenarios": null,
        "sentDate": null,
        "sourceId": null,
        "submission": null,
        "updated": null,
        "updatedBy": null,
    })
}

/// Build the create-grant body for one row. The caller has already checked
/// that the row has a name and a support type.
pub fn grant_payload(row: &Record, ctx: &GrantContext<'_>) -> Value {
    let settings = ctx.settings;
    let lookups = &settings.lookups;

    let nonprofit_id = row
        .value(ORGANIZATION_ID)
        .and_then(|org| ctx.nonprofits.get(org))
        .map(String::as_str);
    let support_type = normalize_support_type(row.get(SUPPORT_TYPE).unwrap_or_default());
    let stage = row.value(STAGE);
    let approved = stage.is_some_and(|s| settings.approved_stages.iter().any(|a| a == s));
    let amount = row.get(AMOUNT).and_then(clean_amount);
    let program_area = row
        .value(PORTFOLIO_ORGANIZATION)
        .and_then(|p| lookups.program_areas.get(p));
    let pipeline_id = row.value(PIPELINE).and_then(|p| lookups.pipelines.get(p));

    let payments = if approved {
        vec![payment(row, ctx, nonprofit_id)]
    } else {
        Vec::new()
    };
    let awarded_amount = if approved { json!(amount) } else { json!(0) };

    json!({
        "formProposalId": null,
        "foundationId": settings.foundation_id,
        "grantPayments": payments,
        "grantProposalSubmission": {
            "additionalInfo": {
                "entities": [],
                "grantRefereeInfo": { "grantRefereeRequestDetails": [] },
                "customGrantFields": null,
                "commentsDisabled": null,
                "customGrantTypeId": lookups.support_types.get(&support_type),
            },
            "archived": null,
            "assigneeToTaskTemplates": null,
            "assigneesToTask": null,
            "awardedAmount": awarded_amount,
            "awardedDate": row.get(CLOSE_DATE).and_then(parse_date),
            "coloredTags": [],
            "customEmailTemplate": null,
            "customGrantType": null,
            "customProgramAreas": [],
            "description": "",
            "disableStageChange": true,
            "duration": calendar_year_duration(row.get(CALENDAR_YEAR).unwrap_or_default()),
            "entityType": null,
            "externalAssigneesToTask": null,
            "firstFormDetails": { "formTitle": FORM_TITLE, "internal": false },
            "formProposal": null,
            "foundation": foundation_block(settings),
            "foundationId": settings.foundation_id,
            "foundationTaskAssignees": null,
            "foundationWatchers": null,
            "grantAmount": { "minAmount": amount },
            "grantFormProposal": settings.grant_form_proposal_id,
            "hasPendingPayments": null,
            "hasPendingReports": null,
            "id": null,
            "multiForm": null,
            "name": row.value(NAME),
            "nonprofit": null,
            "nonprofitId": nonprofit_id,
            "nonprofitStage": null,
            "nonprofitTaskAssignees": null,
            "organizationName": null,
            "parentGrant": null,
            "parentGrantId": null,
            "parentNonprofit": null,
            "parentNonprofitId": null,
            "paymentSummary": null,
            "pipelineId": pipeline_id,
            "pipelineInfo": null,
            "programAreas": [program_area],
            "purpose": "",
            "readyForNextStage": null,
            "recipientEmail": null,
            "responses": [],
            "scenarios": null,
            "sendProposalCreatedEmail": false,
            "stage": stage,
            "submissionBindings": null,
            "submissionIndividual": null,
            "submittable": null,
            "submitted": null,
            "tags": [],
            "taskAssignees": null,
            "taskDeadline": null,
            "taskIds": null,
            "taskTemplateResponses": null,
            "updatedByFoundationUser": null,
            "updatedByNonprofitUser": null,
            "watchers": [],
            "status": "PUBLISHED",
            "eligibilityEnabled": false,
            "eligibility": null,
            "scoringCriteria": null,
            "visibility": "PRIVATE",
            "form": { "elements": [], "title": "", "submitButtonText": "Submit" },
            "draftComponent": null,
            "published": null,
        },
    })
}

pub fn run(
    settings: &Settings,
    client: &PlatformClient,
    table: &Table,
    opts: JobOptions,
) -> Result<RunReport> {
    settings.validate()?;
    let url = settings.endpoint_url(Endpoint::CreateGrant, None)?;
    let mut report = RunReport::new(JOB, opts.dry_run);

    let nonprofits = remote::list_nonprofits(client, settings).context("fetch nonprofits")?;
    let by_affinity = remote::nonprofits_by_affinity_id(&nonprofits, &settings.affinity_field);
    let mut existing: BTreeSet<String> = remote::list_grants(client, settings)
        .context("fetch existing grants")?
        .into_iter()
        .filter_map(|g| g.name)
        .collect();

    let ctx = GrantContext {
        settings,
        nonprofits: &by_affinity,
    };

    for row in &table.rows {
        let Some(name) = row.value(NAME) else {
            report.failure("<unnamed>", Step::Validate, "Missing fields: Name");
            continue;
        };
        if existing.contains(name) {
            report.skip(name, "grant already exists");
            continue;
        }
        if row.value(SUPPORT_TYPE).is_none() {
            report.skip(name, "no support type");
            continue;
        }
        if row
            .value(ORGANIZATION_ID)
            .and_then(|org| by_affinity.get(org))
            .is_none()
        {
            tracing::warn!("no platform nonprofit for grant {name}; sending without nonprofitId");
        }

        let body = grant_payload(row, &ctx);
        if opts.dry_run {
            tracing::debug!("dry run payload for {name}: {body}");
            tracing::info!("dry run: would create grant {name}");
            report.success(name, Step::Create, None);
            existing.insert(name.to_string());
            continue;
        }

        tracing::info!("grant {name} does not exist, creating");
        match client.post_expecting(&url, &body, 200) {
            Ok(resp) => {
                let id = super::created_id(&resp).unwrap_or(None);
                existing.insert(name.to_string());
                report.success(name, Step::Create, id);
            }
            Err(e) => report.failure(name, Step::Create, e.message()),
        }
    }

    report.log_summary();
    Ok(report)
}
