//! Sample data upload.
//!
//! Loads demo datasets into a freshly created deployment:
//!
//! - the bank accounts dataset, bulk indexed into Elasticsearch;
//! - a `bank*` index pattern, made the Kibana default;
//! - Kibana's bundled sample data sets, in the default space and in an `automation` space.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::RequestBuilder;
use serde::Deserialize;
use serde_json::json;

use crate::error::CloudError;
use crate::metadata::ConnectionMetadata;

/// The index and type of the bank accounts dataset.
pub const BANK_BULK_PATH: &str = "/bank/account/_bulk?pretty";
/// The title of the index pattern made the Kibana default.
pub const BANK_INDEX_PATTERN: &str = "bank*";
/// The space the sample data is installed into in addition to the default space.
pub const AUTOMATION_SPACE_ID: &str = "automation";
const AUTOMATION_SPACE_NAME: &str = "Automation";
/// The Kibana sample data sets installed into each space.
pub const SAMPLE_DATA_SETS: [&str; 3] = ["ecommerce", "logs", "flights"];

const XSRF_HEADER: &str = "kbn-xsrf";
const XSRF_VALUE: &str = "automation";
const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Uploads sample data to a live deployment with its superuser credentials.
pub struct SampleDataUploader {
    http: reqwest::Client,
    metadata: ConnectionMetadata,
}

#[derive(Deserialize)]
struct SavedObject {
    id: String,
}

impl SampleDataUploader {
    pub fn new(metadata: ConnectionMetadata) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("error building sample data HTTP client")?;
        Ok(Self { http, metadata })
    }

    /// Run every upload step in order, stopping at the first failure.
    pub async fn run(&self, accounts_ndjson: String) -> Result<()> {
        self.upload_bank_accounts(accounts_ndjson).await?;
        self.set_default_index_pattern().await?;
        self.load_sample_data().await?;
        tracing::info!(cluster_id = %self.metadata.cluster_id, "sample data uploaded");
        Ok(())
    }

    /// Bulk index the bank accounts dataset.
    pub async fn upload_bank_accounts(&self, accounts_ndjson: String) -> Result<()> {
        let url = format!("{}{}", self.metadata.elasticsearch_url, BANK_BULK_PATH);
        let req = self
            .http
            .post(&url)
            .basic_auth(&self.metadata.username, Some(self.metadata.password.expose()))
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(accounts_ndjson);
        self.send("bank accounts bulk upload", req).await?;
        Ok(())
    }

    /// Create the `bank*` index pattern and make it the default, returning its ID.
    pub async fn set_default_index_pattern(&self) -> Result<String> {
        let res = self
            .send(
                "index pattern creation",
                self.kibana("/api/saved_objects/index-pattern").json(&json!({"attributes": {"title": BANK_INDEX_PATTERN}})),
            )
            .await?;
        let pattern: SavedObject = res.json().await.context("error decoding index pattern response")?;

        self.send("default index pattern update", self.kibana("/api/kibana/settings").json(&json!({"changes": {"defaultIndex": pattern.id}})))
            .await?;
        tracing::debug!(index_pattern = %pattern.id, "set default index pattern");
        Ok(pattern.id)
    }

    /// Create the automation space and install every sample data set into it and the default space.
    pub async fn load_sample_data(&self) -> Result<()> {
        self.send(
            "space creation",
            self.kibana("/api/spaces/space").json(&json!({"name": AUTOMATION_SPACE_NAME, "id": AUTOMATION_SPACE_ID})),
        )
        .await?;
        for path in sample_data_paths() {
            self.send(&format!("sample data load of {}", path), self.kibana(&path)).await?;
        }
        Ok(())
    }

    fn kibana(&self, path: &str) -> RequestBuilder {
        self.http
            .post(format!("{}{}", self.metadata.kibana_url, path))
            .basic_auth(&self.metadata.username, Some(self.metadata.password.expose()))
            .header(XSRF_HEADER, XSRF_VALUE)
    }

    async fn send(&self, step: &str, req: RequestBuilder) -> Result<reqwest::Response> {
        let res = req.send().await.with_context(|| format!("error sending request for {}", step))?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(CloudError::Upload { step: step.into(), status: status.as_u16(), body }.into());
        }
        tracing::debug!(step, status = status.as_u16(), "sample data step complete");
        Ok(res)
    }
}

/// The Kibana paths which install the sample data sets, default space first.
pub fn sample_data_paths() -> Vec<String> {
    let default_space = SAMPLE_DATA_SETS.iter().map(|set| format!("/api/sample_data/{}", set));
    let automation_space = SAMPLE_DATA_SETS
        .iter()
        .map(|set| format!("/s/{}/api/sample_data/{}", AUTOMATION_SPACE_ID, set));
    default_space.chain(automation_space).collect()
}

/// Upload sample data to the given deployment, reading the bank accounts dataset from the given file.
pub async fn upload_data(metadata: ConnectionMetadata, accounts_file: &Path) -> Result<()> {
    let accounts = tokio::fs::read_to_string(accounts_file)
        .await
        .map_err(|source| CloudError::FileIo { path: accounts_file.to_path_buf(), source })?;
    SampleDataUploader::new(metadata)?.run(accounts).await
}
