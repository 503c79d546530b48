//! Create a new cluster.

use anyhow::Result;
use structopt::StructOpt;

use crate::config::Config;
use crate::plan::{PlanOverrides, PlanSizing};

/// Create a new cluster and write its metadata record.
#[derive(StructOpt)]
#[structopt(name = "create")]
pub struct Create {
    /// Elasticsearch user settings YAML.
    #[structopt(long)]
    es_settings: Option<String>,
    /// Kibana user settings YAML.
    #[structopt(long)]
    kibana_settings: Option<String>,
    /// Elasticsearch user settings override YAML.
    #[structopt(long)]
    es_settings_override: Option<String>,
    /// Kibana user settings override YAML.
    #[structopt(long)]
    kibana_settings_override: Option<String>,
}

impl Create {
    pub async fn run(&self, cfg: &Config) -> Result<()> {
        // Validated ahead of any network call.
        let version = cfg.stack_version()?;
        tracing::info!(version, region = cfg.region_hint(), "creating cluster");

        let overrides = PlanOverrides {
            es_settings: self.es_settings.clone(),
            kibana_settings: self.kibana_settings.clone(),
            es_settings_override: self.es_settings_override.clone(),
            kibana_settings_override: self.kibana_settings_override.clone(),
            system_settings: None,
            sizing: PlanSizing {
                kibana_zone_count: cfg.estf_cloud_kibana_zone_count,
                ..Default::default()
            },
        };
        let orch = crate::connect(cfg).await?;
        let outcome = orch.create(Some(version), cfg.region_hint(), overrides).await?;

        println!("cluster_id: {}", outcome.handle.cluster_id);
        println!("kibana_cluster_id: {}", outcome.handle.kibana_cluster_id);
        println!("elasticsearch_url: {}", outcome.metadata.elasticsearch_url);
        println!("kibana_url: {}", outcome.metadata.kibana_url);
        if let Some(path) = outcome.record {
            println!("cloud_properties_file: {}", path.display());
        }
        Ok(())
    }
}
