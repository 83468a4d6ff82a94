use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Custom field holding the legacy CRM organization id on platform nonprofits.
pub const DEFAULT_AFFINITY_FIELD: &str = "Affinity ID-4jS8olxc";

/// Errors from config validation and environment overrides.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting `{0}` (set it in config.toml or the environment)")]
    Missing(&'static str),
    #[error("endpoint `{0}` is not configured")]
    MissingEndpoint(&'static str),
    #[error("endpoint `{endpoint}` needs a nonprofit id: {template}")]
    MissingNonprofitId {
        endpoint: &'static str,
        template: String,
    },
    #[error("endpoint `{endpoint}` mixes named and positional placeholders: {template}")]
    MixedPlaceholders {
        endpoint: &'static str,
        template: String,
    },
    #[error("endpoint `{endpoint}` has unfilled placeholders: {url}")]
    UnfilledPlaceholder { endpoint: &'static str, url: String },
    #[error("endpoint `{endpoint}` is not a valid URL ({url}): {source}")]
    InvalidUrl {
        endpoint: &'static str,
        url: String,
        source: url::ParseError,
    },
    #[error("environment variable {var} is not valid JSON: {source}")]
    EnvJson {
        var: &'static str,
        source: serde_json::Error,
    },
}

/// Retry policy parameters (`[retry]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per request (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff.
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 5.0,
            max_delay_secs: 30,
        }
    }
}

/// Platform endpoints the jobs talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    CreateGrantee,
    UpdateGrantee,
    GetContacts,
    GetGrants,
    CreateGrant,
    UpdateGrantMetadata,
}

impl Endpoint {
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::CreateGrantee => "create_grantee",
            Endpoint::UpdateGrantee => "update_grantee",
            Endpoint::GetContacts => "get_contacts",
            Endpoint::GetGrants => "get_grants",
            Endpoint::CreateGrant => "create_grant",
            Endpoint::UpdateGrantMetadata => "update_grant_metadata",
        }
    }
}

/// URL templates (`[endpoints]`).
///
/// Templates may use `{foundation_id}` and `{nonprofit_id}`, or the positional
/// `{}` form where the first is the foundation and the second the nonprofit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub create_grantee: String,
    pub update_grantee: String,
    pub get_contacts: String,
    pub get_grants: String,
    pub create_grant: String,
    pub update_grant_metadata: String,
}

impl Endpoints {
    pub fn template(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::CreateGrantee => &self.create_grantee,
            Endpoint::UpdateGrantee => &self.update_grantee,
            Endpoint::GetContacts => &self.get_contacts,
            Endpoint::GetGrants => &self.get_grants,
            Endpoint::CreateGrant => &self.create_grant,
            Endpoint::UpdateGrantMetadata => &self.update_grant_metadata,
        }
    }

    /// Fill the template for `endpoint` and check the result parses as a URL.
    pub fn render(
        &self,
        endpoint: Endpoint,
        foundation_id: &str,
        nonprofit_id: Option<&str>,
    ) -> Result<String, ConfigError> {
        let template = self.template(endpoint).trim();
        if template.is_empty() {
            return Err(ConfigError::MissingEndpoint(endpoint.name()));
        }
        let named = template.contains("{foundation_id}") || template.contains("{nonprofit_id}");
        let positional = template.matches("{}").count();
        if named && positional > 0 {
            return Err(ConfigError::MixedPlaceholders {
                endpoint: endpoint.name(),
                template: template.to_string(),
            });
        }
        let needs_nonprofit = template.contains("{nonprofit_id}") || positional >= 2;
        let nonprofit = match (needs_nonprofit, nonprofit_id) {
            (true, None) => {
                return Err(ConfigError::MissingNonprofitId {
                    endpoint: endpoint.name(),
                    template: template.to_string(),
                })
            }
            (_, id) => id.unwrap_or_default(),
        };

        let mut url = template
            .replace("{foundation_id}", foundation_id)
            .replace("{nonprofit_id}", nonprofit);
        for value in [foundation_id, nonprofit] {
            if url.contains("{}") {
                url = url.replacen("{}", value, 1);
            }
        }
        if url.contains('{') || url.contains('}') {
            return Err(ConfigError::UnfilledPlaceholder {
                endpoint: endpoint.name(),
                url,
            });
        }

        url::Url::parse(&url).map_err(|source| ConfigError::InvalidUrl {
            endpoint: endpoint.name(),
            url: url.clone(),
            source,
        })?;
        Ok(url)
    }
}

/// Stage table of one pipeline: either `name = id` or a list of `{ name, id }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PipelineStages {
    Map(BTreeMap<String, String>),
    List(Vec<StageEntry>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEntry {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub stages: PipelineStages,
}

/// Name → platform id tables (`[lookups]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Lookups {
    /// Support type label → custom grant type id.
    pub support_types: BTreeMap<String, String>,
    /// Portfolio label → program area id.
    pub program_areas: BTreeMap<String, String>,
    /// Staff display name → platform user id.
    pub users: BTreeMap<String, String>,
    /// Pipeline label → pipeline id.
    pub pipelines: BTreeMap<String, String>,
    /// Pipeline label → its stages.
    pub pipeline_stages: BTreeMap<String, PipelineDefinition>,
    /// Spellings in the exports that differ from the platform user names.
    pub contact_aliases: BTreeMap<String, String>,
}

impl Default for Lookups {
    fn default() -> Self {
        let contact_aliases = [
            ("Amolo Ngweno", "Amolo Ng'weno"),
            ("Seth Aaron Gross Andrew", "Seth Andrews"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            support_types: BTreeMap::new(),
            program_areas: BTreeMap::new(),
            users: BTreeMap::new(),
            pipelines: BTreeMap::new(),
            pipeline_stages: BTreeMap::new(),
            contact_aliases,
        }
    }
}

/// Foundation block embedded in every grant proposal payload (`[foundation]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FoundationProfile {
    /// Defaults to `foundation_id` when unset.
    pub id: Option<String>,
    pub display_name: String,
    pub ein: String,
    pub subdomain: String,
    pub created: Option<String>,
    pub vitally_id: String,
    pub account_type: String,
    pub logo_file: Option<String>,
    pub grantee_mfa_enabled: bool,
    pub foundation_mfa_enabled: bool,
    pub currency_locale: String,
    pub currency_code: String,
}

impl Default for FoundationProfile {
    fn default() -> Self {
        Self {
            id: None,
            display_name: String::new(),
            ein: String::new(),
            subdomain: String::new(),
            created: None,
            vitally_id: String::new(),
            account_type: "CLIENT".to_string(),
            logo_file: None,
            grantee_mfa_enabled: false,
            foundation_mfa_enabled: false,
            currency_locale: "en-US".to_string(),
            currency_code: "USD".to_string(),
        }
    }
}

/// Global configuration loaded from `~/.config/grantsync/config.toml`
/// plus environment overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub foundation_id: String,
    pub bearer_token: String,
    /// Assignee for payments whose lead is `N/A` or not in `lookups.users`.
    pub default_assignee_id: Option<String>,
    /// Form proposal the historical grants are attached to.
    pub grant_form_proposal_id: Option<String>,
    /// Nonprofit custom field holding the legacy organization id.
    pub affinity_field: String,
    /// Page size for the search endpoints (one page is fetched).
    pub page_size: u32,
    /// Rows per batch for add-organisations progress logging.
    pub batch_size: usize,
    /// Stages that count as awarded: these get a payment and an awarded amount.
    pub approved_stages: Vec<String>,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    pub endpoints: Endpoints,
    /// Optional retry policy; if missing, built-in defaults are used.
    pub retry: Option<RetryConfig>,
    pub lookups: Lookups,
    pub foundation: FoundationProfile,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            foundation_id: String::new(),
            bearer_token: String::new(),
            default_assignee_id: None,
            grant_form_proposal_id: None,
            affinity_field: DEFAULT_AFFINITY_FIELD.to_string(),
            page_size: 10_000,
            batch_size: 100,
            approved_stages: vec!["Active grant".to_string(), "Engagement completed".to_string()],
            connect_timeout_secs: 15,
            timeout_secs: 30,
            endpoints: Endpoints::default(),
            retry: None,
            lookups: Lookups::default(),
            foundation: FoundationProfile::default(),
        }
    }
}

fn set_string(target: &mut String, value: Option<String>) {
    if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
        *target = v.trim().to_string();
    }
}

fn parse_json_env<T: serde::de::DeserializeOwned>(
    var: &'static str,
    value: Option<String>,
) -> Result<Option<T>, ConfigError> {
    match value.filter(|v| !v.trim().is_empty()) {
        None => Ok(None),
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| ConfigError::EnvJson { var, source }),
    }
}

impl Settings {
    /// Apply environment overrides. `lookup` is usually `std::env::var(..).ok()`.
    /// Empty values are ignored so a blank line in `.env` keeps the TOML value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        set_string(&mut self.foundation_id, lookup("PROD_FOUNDATION_ID"));
        set_string(&mut self.bearer_token, lookup("PROD_BEARER_TOKEN"));

        let ep = &mut self.endpoints;
        set_string(&mut ep.create_grantee, lookup("CREATE_GRANTEE_PROD_ENDPOINT"));
        set_string(&mut ep.update_grantee, lookup("UPDATE_GRANTEE_PROD_ENDPOINT"));
        set_string(&mut ep.get_contacts, lookup("GET_CONTACTS_ENDPOINT"));
        set_string(&mut ep.get_grants, lookup("GET_GRANTS_ENDPOINT"));
        set_string(&mut ep.create_grant, lookup("CREATE_GRANT_ENDPOINT"));
        set_string(&mut ep.update_grant_metadata, lookup("UPDATE_GRANT_METADATA"));

        let lk = &mut self.lookups;
        if let Some(t) = parse_json_env("SUPPORT_TYPES", lookup("SUPPORT_TYPES"))? {
            lk.support_types = t;
        }
        if let Some(t) = parse_json_env("PROGRAM_AREAS", lookup("PROGRAM_AREAS"))? {
            lk.program_areas = t;
        }
        if let Some(t) = parse_json_env("USERS", lookup("USERS"))? {
            lk.users = t;
        }
        if let Some(t) = parse_json_env("PIPELINES", lookup("PIPELINES"))? {
            lk.pipelines = t;
        }
        if let Some(t) = parse_json_env("PIPELINES_DATA", lookup("PIPELINES_DATA"))? {
            lk.pipeline_stages = t;
        }
        Ok(())
    }

    /// Check the settings every job needs before any request is sent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.foundation_id.trim().is_empty() {
            return Err(ConfigError::Missing("foundation_id"));
        }
        if self.bearer_token.trim().is_empty() {
            return Err(ConfigError::Missing("bearer_token"));
        }
        Ok(())
    }

    /// Render the URL for `endpoint` with this foundation's id.
    pub fn endpoint_url(
        &self,
        endpoint: Endpoint,
        nonprofit_id: Option<&str>,
    ) -> Result<String, ConfigError> {
        self.endpoints
            .render(endpoint, &self.foundation_id, nonprofit_id)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    /// Copy safe to print: the bearer token is masked.
    pub fn redacted(&self) -> Settings {
        let mut out = self.clone();
        if !out.bearer_token.is_empty() {
            out.bearer_token = "********".to_string();
        }
        out
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("grantsync")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<Settings> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = Settings::default();
        let toml = default_cfg.to_toml()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from(&path)
}

/// Load configuration from an explicit path (must exist).
pub fn load_from(path: &Path) -> Result<Settings> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: Settings =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

/// Full load used by the CLI: TOML file, then `.env`, then process environment.
pub fn load(config_file: Option<&Path>, env_file: Option<&Path>) -> Result<Settings> {
    let mut cfg = match config_file {
        Some(p) => load_from(p)?,
        None => load_or_init()?,
    };

    match env_file {
        Some(p) => {
            dotenvy::from_path(p).with_context(|| format!("load env file {}", p.display()))?
        }
        None => {
            if let Ok(p) = dotenvy::dotenv() {
                tracing::debug!("loaded environment from {}", p.display());
            }
        }
    }

    cfg.apply_env(|k| std::env::var(k).ok())?;
    Ok(cfg)
}
