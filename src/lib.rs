//! Provision, edit, upgrade and delete ephemeral cloud search clusters for CI.

pub mod auth;
pub mod client;
mod cmd;
pub mod config;
pub mod credentials;
pub mod error;
pub mod metadata;
pub mod models;
pub mod orchestrator;
pub mod plan;
pub mod poller;
pub mod region;
pub mod upload;

#[cfg(test)]
mod fixtures;
#[cfg(test)]
mod orchestrator_test;

use anyhow::{Context, Result};
use structopt::StructOpt;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::client::CloudClient;
use crate::config::Config;
use crate::metadata::MetadataStore;
use crate::orchestrator::Orchestrator;

/// Manage ephemeral cloud clusters for CI test runs.
#[derive(StructOpt)]
#[structopt(name = "estf-cloud")]
pub struct EstfCloud {
    #[structopt(subcommand)]
    action: EstfCloudSubcommands,
    /// Enable debug logging.
    #[structopt(short)]
    verbose: bool,
}

impl EstfCloud {
    pub async fn run(self) -> Result<()> {
        let cfg = Config::new()?;

        // Initialize logging. The -v flag forces debug output, otherwise RUST_LOG is used.
        let fmt_layer = fmt::layer().with_target(true);
        let (filter_layer, level_filter) = if self.verbose {
            (EnvFilter::new("debug"), LevelFilter::DEBUG)
        } else {
            let directives = cfg.rust_log.as_deref().unwrap_or("info");
            (EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info")), LevelFilter::TRACE)
        };
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .with(level_filter)
            .try_init()
            .context("error initializing logging/tracing system")?;

        match &self.action {
            EstfCloudSubcommands::Create(inner) => inner.run(&cfg).await,
            EstfCloudSubcommands::Edit(inner) => inner.run(&cfg).await,
            EstfCloudSubcommands::Upgrade(inner) => inner.run(&cfg).await,
            EstfCloudSubcommands::Delete(inner) => inner.run(&cfg).await,
            EstfCloudSubcommands::UploadData(inner) => inner.run(&cfg).await,
        }
    }
}

#[derive(StructOpt)]
pub enum EstfCloudSubcommands {
    /// Create a new cluster and write its metadata record.
    #[structopt(name = "create")]
    Create(cmd::create::Create),
    /// Edit the settings of a live cluster.
    #[structopt(name = "edit")]
    Edit(cmd::edit::Edit),
    /// Upgrade a live cluster to a new stack version.
    #[structopt(name = "upgrade")]
    Upgrade(cmd::upgrade::Upgrade),
    /// Delete a cluster and its metadata record.
    #[structopt(name = "delete")]
    Delete(cmd::delete::Delete),
    /// Upload demo datasets to a live cluster.
    #[structopt(name = "upload-data")]
    UploadData(cmd::upload_data::UploadData),
}

/// Build an orchestrator backed by an authenticated control-plane client.
///
/// Credentials are fetched and the login performed on every invocation.
pub(crate) async fn connect(cfg: &Config) -> Result<Orchestrator<CloudClient>> {
    let host = cfg.host()?;
    let store = MetadataStore::new(cfg.workspace_dir()?);
    let creds = credentials::from_config(cfg)?
        .fetch(&cfg.vault_path)
        .await
        .context("error fetching control-plane credentials")?;
    let client = CloudClient::connect(host, Some(cfg.region_hint()), &creds).await?;
    Ok(Orchestrator::new(client, store, cfg.wait_config()).wait_for_es_on_create(cfg.estf_cloud_wait_for_es))
}
