//! Edit a live cluster.

use anyhow::Result;
use structopt::StructOpt;

use crate::config::Config;
use crate::orchestrator::EditRequest;

/// Edit the settings of a live cluster.
#[derive(StructOpt)]
#[structopt(name = "edit")]
pub struct Edit {
    /// The ID of the Elasticsearch cluster.
    #[structopt(long)]
    cluster_id: String,
    /// The ID of the Kibana cluster, read from the metadata record when omitted.
    #[structopt(long)]
    kibana_cluster_id: Option<String>,
    /// Replace the Elasticsearch user settings with this YAML.
    #[structopt(long)]
    es_settings: Option<String>,
    /// Replace the Kibana user settings with this YAML.
    #[structopt(long)]
    kibana_settings: Option<String>,
    /// Disable inline, stored and file scripting.
    #[structopt(long)]
    es_script_settings: bool,
}

impl Edit {
    pub async fn run(&self, cfg: &Config) -> Result<()> {
        let kibana_required = self.kibana_settings.is_some();
        let handle = super::resolve_handle(cfg, &self.cluster_id, self.kibana_cluster_id.as_deref(), kibana_required).await?;
        let req = EditRequest {
            es_settings: self.es_settings.clone(),
            kibana_settings: self.kibana_settings.clone(),
            disable_scripting: self.es_script_settings,
        };
        tracing::info!(cluster_id = %handle.cluster_id, ?req, "editing cluster");
        let orch = crate::connect(cfg).await?;
        orch.edit(&handle, &req).await
    }
}
