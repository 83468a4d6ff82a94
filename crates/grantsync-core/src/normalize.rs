//! Cell normalization shared by the row → payload mappings.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Lead column value meaning "no staff member assigned".
pub const NO_LEAD: &str = "N/A";

/// Parse `MM/DD/YYYY` or `MM/DD/YY` into `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    // chrono's %Y also accepts two digits, so pick the format by year width.
    let fmt = match raw.rsplit('/').next().map(str::len) {
        Some(4) => Some("%m/%d/%Y"),
        Some(2) => Some("%m/%d/%y"),
        _ => None,
    };
    match fmt.and_then(|f| NaiveDate::parse_from_str(raw, f).ok()) {
        Some(d) => Some(d.format("%Y-%m-%d").to_string()),
        None => {
            tracing::info!("error parsing date: {raw}");
            None
        }
    }
}

/// `"12,500.00"` → `12500.0`.
pub fn clean_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            tracing::info!("invalid amount format: {raw}");
            None
        }
    }
}

/// Exports spell the SAFE support type with dots.
pub fn normalize_support_type(raw: &str) -> String {
    raw.trim().replace("S.A.F.E", "SAFE")
}

/// Trim and map known misspellings onto the platform user name.
pub fn normalize_contact_name(raw: &str, aliases: &BTreeMap<String, String>) -> String {
    let name = raw.trim();
    aliases
        .get(name)
        .cloned()
        .unwrap_or_else(|| name.to_string())
}

fn is_unassigned(name: &str) -> bool {
    let name = name.trim();
    name.is_empty() || name == NO_LEAD
}

/// Payment assignee: the lead's user id, or `default_id` when there is no
/// lead or the lead is not a platform user.
pub fn resolve_assignee(
    lead: &str,
    users: &BTreeMap<String, String>,
    default_id: Option<&str>,
) -> Option<String> {
    if is_unassigned(lead) {
        return default_id.map(str::to_string);
    }
    users
        .get(lead.trim())
        .cloned()
        .or_else(|| default_id.map(str::to_string))
}

/// Foundation point of contact for a nonprofit; no fallback.
pub fn resolve_foundation_poc(lead: &str, users: &BTreeMap<String, String>) -> Option<String> {
    if is_unassigned(lead) {
        return None;
    }
    users.get(lead.trim()).cloned()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantDuration {
    pub start: String,
    pub end: String,
}

/// Grant duration covering one calendar year.
pub fn calendar_year_duration(year: &str) -> GrantDuration {
    let year = year.trim();
    GrantDuration {
        start: format!("{year}-01-01"),
        end: format!("{year}-12-31"),
    }
}
