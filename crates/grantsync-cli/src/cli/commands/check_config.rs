//! `grantsync check-config` – validate settings and print them with the token masked.

use anyhow::Result;
use grantsync_core::config::{Endpoint, Settings};

const ENDPOINTS: [Endpoint; 6] = [
    Endpoint::CreateGrantee,
    Endpoint::UpdateGrantee,
    Endpoint::GetContacts,
    Endpoint::GetGrants,
    Endpoint::CreateGrant,
    Endpoint::UpdateGrantMetadata,
];

pub fn run_check_config(settings: &Settings) -> Result<()> {
    println!("{}", settings.redacted().to_toml()?);
    for ep in ENDPOINTS {
        match settings.endpoint_url(ep, Some("<nonprofit_id>")) {
            Ok(url) => println!("{:<24} {}", ep.name(), url),
            Err(e) => println!("{:<24} ! {}", ep.name(), e),
        }
    }
    settings.validate()?;
    println!("Configuration OK.");
    Ok(())
}
