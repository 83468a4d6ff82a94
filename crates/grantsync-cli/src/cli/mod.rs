//! CLI for the grantsync migration toolkit.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use grantsync_core::client::PlatformClient;
use grantsync_core::config;
use grantsync_core::jobs::JobOptions;
use std::path::PathBuf;

use commands::{
    run_add_organisations, run_check_config, run_completions, run_create_grantees,
    run_create_grants, run_man, run_update_grantees, run_update_grants, JobContext,
};

/// Top-level CLI: global flags plus one subcommand per migration job.
#[derive(Debug, Parser)]
#[command(name = "grantsync")]
#[command(about = "Sync CSV exports into the grants platform", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/grantsync/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Environment file to load instead of ./.env.
    #[arg(long, global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Build and log payloads without sending any writes.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Also write the run report as JSON to this path.
    #[arg(long, global = true, value_name = "PATH")]
    pub report: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Create grantee nonprofits and write their ids back into the CSV.
    CreateGrantees {
        /// Grantees export (needs Name and LIF Primary Lead Name).
        csv: PathBuf,
        /// Write the CSV with ids here instead of overwriting the input.
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Create organisations missing from the platform, then tag them.
    AddOrganisations {
        /// Organisations export (Name, Organization Id, Website, Tags).
        csv: PathBuf,
        /// Rows per batch (defaults to batch_size from config).
        #[arg(long, value_name = "N")]
        batch_size: Option<usize>,
    },

    /// Update custom fields on grantees created earlier.
    UpdateGrantees {
        /// Grantees export with the id column filled by create-grantees.
        csv: PathBuf,
    },

    /// Create historical grants and their payments.
    CreateGrants {
        /// Grant opportunities export.
        csv: PathBuf,
    },

    /// Update pipeline and stage on existing grants.
    UpdateGrants {
        /// Grant opportunities export.
        csv: PathBuf,
    },

    /// Load and validate the configuration, then print it (token masked).
    CheckConfig,

    /// Print shell completions.
    Completions {
        shell: Shell,
    },

    /// Print the man page.
    Man,
}

impl Cli {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match &cli.command {
            CliCommand::Completions { shell } => return run_completions(*shell),
            CliCommand::Man => return run_man(),
            _ => {}
        }

        let settings = config::load(cli.config.as_deref(), cli.env_file.as_deref())?;
        tracing::debug!("loaded config: {:?}", settings.redacted());

        if let CliCommand::CheckConfig = cli.command {
            return run_check_config(&settings);
        }

        let client = PlatformClient::from_settings(&settings);
        let ctx = JobContext {
            settings: &settings,
            client: &client,
            opts: JobOptions {
                dry_run: cli.dry_run,
            },
            report_path: cli.report.as_deref(),
        };

        match cli.command {
            CliCommand::CreateGrantees { csv, output } => {
                run_create_grantees(&ctx, &csv, output.as_deref())?
            }
            CliCommand::AddOrganisations { csv, batch_size } => {
                run_add_organisations(&ctx, &csv, batch_size)?
            }
            CliCommand::UpdateGrantees { csv } => run_update_grantees(&ctx, &csv)?,
            CliCommand::CreateGrants { csv } => run_create_grants(&ctx, &csv)?,
            CliCommand::UpdateGrants { csv } => run_update_grants(&ctx, &csv)?,
            CliCommand::CheckConfig | CliCommand::Completions { .. } | CliCommand::Man => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
