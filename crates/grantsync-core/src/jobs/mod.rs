//! Migration jobs. Each job reads an already-loaded CSV table, looks up what
//! the platform has, maps rows into payloads and records every outcome in a
//! `RunReport`. Row-level failures never abort a job; lookup failures do.

pub mod add_organisations;
pub mod columns;
pub mod create_grantees;
pub mod create_grants;
pub mod update_grantees;
pub mod update_grants;

use serde::{Deserialize, Serialize};

use crate::client::PlatformClient;
use crate::retry::RequestError;

/// Flags shared by every job.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobOptions {
    /// Build and log payloads but send no writes. Read-only lookups still run.
    pub dry_run: bool,
}

/// Body of the create-nonprofit call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateNonprofit<'a> {
    pub legal_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_contact_name: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct Created {
    #[serde(default)]
    id: Option<serde_json::Value>,
}

/// `id` of a create response, as text.
pub(crate) fn created_id(resp: &crate::client::ApiResponse) -> Result<Option<String>, RequestError> {
    let created: Option<Created> = resp.json()?;
    Ok(created.and_then(|c| c.id).and_then(|id| match id {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

/// Create one nonprofit (expects 200) and return its id.
pub(crate) fn create_nonprofit(
    client: &PlatformClient,
    url: &str,
    body: &CreateNonprofit<'_>,
) -> Result<Option<String>, RequestError> {
    let resp = client.post_expecting(url, body, 200)?;
    created_id(&resp)
}
