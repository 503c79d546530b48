//! Upgrade a live cluster.

use anyhow::Result;
use structopt::StructOpt;

use crate::config::Config;

/// Upgrade a live cluster to a new stack version.
#[derive(StructOpt)]
#[structopt(name = "upgrade")]
pub struct Upgrade {
    /// The ID of the Elasticsearch cluster.
    #[structopt(long)]
    cluster_id: String,
    /// The ID of the Kibana cluster, read from the metadata record when omitted.
    #[structopt(long)]
    kibana_cluster_id: Option<String>,
    /// The target stack version, falling back to ESTF_UPGRADE_CLOUD_VERSION.
    #[structopt(long)]
    version: Option<String>,
}

impl Upgrade {
    pub async fn run(&self, cfg: &Config) -> Result<()> {
        let version = cfg.upgrade_version(self.version.as_deref())?;
        let handle = super::resolve_handle(cfg, &self.cluster_id, self.kibana_cluster_id.as_deref(), true).await?;
        let orch = crate::connect(cfg).await?;
        orch.upgrade(&handle, Some(version)).await
    }
}
