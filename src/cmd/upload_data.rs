//! Upload sample data to a live cluster.

use std::path::PathBuf;

use anyhow::Result;
use structopt::StructOpt;

use crate::config::Config;
use crate::error::CloudError;
use crate::metadata::MetadataStore;

/// Where the extracted bank accounts dataset is read from by default, relative to the workspace.
const DEFAULT_ACCOUNTS_FILE: &str = "tmp/accounts.json";

/// Upload demo datasets to a live cluster, using its metadata record.
#[derive(StructOpt)]
#[structopt(name = "upload-data")]
pub struct UploadData {
    /// The ID of the Elasticsearch cluster.
    #[structopt(long)]
    cluster_id: String,
    /// The bank accounts NDJSON dataset, defaulting to tmp/accounts.json in the workspace.
    #[structopt(long, parse(from_os_str))]
    accounts_file: Option<PathBuf>,
}

impl UploadData {
    pub async fn run(&self, cfg: &Config) -> Result<()> {
        let workspace = cfg.workspace_dir()?;
        let store = MetadataStore::new(&workspace);
        let metadata = match store.load(&self.cluster_id).await? {
            Some(metadata) => metadata,
            None => {
                return Err(CloudError::Config(format!("no metadata record found at {:?}, create the cluster first", store.path(&self.cluster_id)?)).into())
            }
        };
        let accounts_file = self.accounts_file.clone().unwrap_or_else(|| workspace.join(DEFAULT_ACCOUNTS_FILE));
        tracing::info!(cluster_id = %self.cluster_id, accounts_file = ?accounts_file, "uploading sample data");
        crate::upload::upload_data(metadata, &accounts_file).await
    }
}
