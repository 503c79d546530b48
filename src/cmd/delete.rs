//! Delete a cluster.

use anyhow::Result;
use structopt::StructOpt;

use crate::config::Config;

/// Delete a cluster and its metadata record.
#[derive(StructOpt)]
#[structopt(name = "delete")]
pub struct Delete {
    /// The ID of the Elasticsearch cluster.
    #[structopt(long)]
    cluster_id: String,
}

impl Delete {
    pub async fn run(&self, cfg: &Config) -> Result<()> {
        tracing::info!(cluster_id = %self.cluster_id, "deleting cluster");
        let orch = crate::connect(cfg).await?;
        orch.delete(&self.cluster_id).await
    }
}
