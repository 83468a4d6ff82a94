//! Read-only lookups against the platform, plus pipeline/stage resolution.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::client::PlatformClient;
use crate::config::{Endpoint, PipelineDefinition, PipelineStages, Settings};

/// Pipeline id the platform uses for "no pipeline".
pub const NIL_PIPELINE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest {
    page_size: u32,
}

/// One nonprofit from the contacts search.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonprofitSummary {
    #[serde(default)]
    pub nonprofit_id: Option<String>,
    #[serde(default)]
    pub custom_fields: Option<BTreeMap<String, serde_json::Value>>,
}

impl NonprofitSummary {
    /// Legacy organization id stored in `field`, as text.
    pub fn affinity_id(&self, field: &str) -> Option<String> {
        match self.custom_fields.as_ref()?.get(field)? {
            serde_json::Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// One grant from the grants search.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantSummary {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub nonprofit_id: Option<String>,
    #[serde(default)]
    pub stage_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Responses<T> {
    #[serde(default)]
    responses: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactsSearch {
    #[serde(default)]
    search_response: Option<Responses<NonprofitSummary>>,
}

/// Fetch one page of nonprofits (`searchResponse.responses`).
pub fn list_nonprofits(
    client: &PlatformClient,
    settings: &Settings,
) -> anyhow::Result<Vec<NonprofitSummary>> {
    let url = settings.endpoint_url(Endpoint::GetContacts, None)?;
    let req = SearchRequest {
        page_size: settings.page_size,
    };
    let resp = client.post_expecting(&url, &req, 200)?;
    let parsed: Option<ContactsSearch> = resp.json()?;
    let nonprofits = parsed
        .and_then(|c| c.search_response)
        .map(|r| r.responses)
        .unwrap_or_default();
    tracing::info!("fetched {} nonprofits", nonprofits.len());
    Ok(nonprofits)
}

/// Fetch one page of grants (`responses`).
pub fn list_grants(
    client: &PlatformClient,
    settings: &Settings,
) -> anyhow::Result<Vec<GrantSummary>> {
    let url = settings.endpoint_url(Endpoint::GetGrants, None)?;
    let req = SearchRequest {
        page_size: settings.page_size,
    };
    let resp = client.post_expecting(&url, &req, 200)?;
    let parsed: Option<Responses<GrantSummary>> = resp.json()?;
    let grants = parsed.map(|r| r.responses).unwrap_or_default();
    tracing::info!("fetched {} grants", grants.len());
    Ok(grants)
}

/// Affinity id → nonprofit id. The first nonprofit wins on duplicates.
pub fn nonprofits_by_affinity_id(
    nonprofits: &[NonprofitSummary],
    field: &str,
) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for np in nonprofits {
        if let (Some(aff), Some(id)) = (np.affinity_id(field), np.nonprofit_id.as_ref()) {
            out.entry(aff).or_insert_with(|| id.clone());
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageLookupError {
    #[error("pipeline not found: {0}")]
    PipelineNotFound(String),
    #[error("stage not found: {stage} (pipeline {pipeline})")]
    StageNotFound { pipeline: String, stage: String },
}

/// Stage id for `stage` within `pipeline`. Map tables match exactly,
/// list tables match names case-insensitively.
pub fn resolve_stage_id(
    pipelines: &BTreeMap<String, PipelineDefinition>,
    pipeline: &str,
    stage: &str,
) -> Result<String, StageLookupError> {
    let def = pipelines
        .get(pipeline)
        .ok_or_else(|| StageLookupError::PipelineNotFound(pipeline.to_string()))?;
    let found = match &def.stages {
        PipelineStages::Map(m) => m.get(stage).cloned(),
        PipelineStages::List(list) => list
            .iter()
            .find(|s| s.name.to_lowercase() == stage.to_lowercase())
            .map(|s| s.id.clone()),
    };
    found.ok_or_else(|| StageLookupError::StageNotFound {
        pipeline: pipeline.to_string(),
        stage: stage.to_string(),
    })
}

/// Pipeline id for `name`; the nil UUID and unknown names map to `None`.
pub fn resolve_pipeline_id(pipelines: &BTreeMap<String, String>, name: &str) -> Option<String> {
    pipelines
        .get(name)
        .filter(|id| id.as_str() != NIL_PIPELINE_ID)
        .cloned()
}
