//! CLI subcommands.

pub mod create;
pub mod delete;
pub mod edit;
pub mod upgrade;
pub mod upload_data;

use anyhow::Result;

use crate::config::{non_empty, Config};
use crate::error::CloudError;
use crate::metadata::MetadataStore;
use crate::models::ClusterHandle;

/// Build the handle of a live cluster.
///
/// When no Kibana cluster ID is given, it is read from the cluster's metadata record. If the
/// Kibana cluster is not `required` and no record exists, the handle carries an empty Kibana ID.
async fn resolve_handle(cfg: &Config, cluster_id: &str, kibana_cluster_id: Option<&str>, required: bool) -> Result<ClusterHandle> {
    if let Some(kibana_cluster_id) = non_empty(kibana_cluster_id) {
        return Ok(ClusterHandle { cluster_id: cluster_id.into(), kibana_cluster_id: kibana_cluster_id.into() });
    }
    let store = MetadataStore::new(cfg.workspace_dir()?);
    match store.load(cluster_id).await? {
        Some(md) => {
            tracing::debug!(cluster_id, kibana_cluster_id = %md.kibana_cluster_id, "using Kibana cluster ID from metadata record");
            Ok(ClusterHandle { cluster_id: cluster_id.into(), kibana_cluster_id: md.kibana_cluster_id })
        }
        None if !required => {
            tracing::debug!(cluster_id, "no Kibana cluster ID given and no metadata record found");
            Ok(ClusterHandle { cluster_id: cluster_id.into(), kibana_cluster_id: String::new() })
        }
        None => Err(CloudError::Config(format!(
            "no Kibana cluster ID given and no metadata record found at {:?}, pass --kibana-cluster-id",
            store.path(cluster_id)?
        ))
        .into()),
    }
}
