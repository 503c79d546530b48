//! Cluster connection metadata records.
//!
//! Each live cluster has one record at `<workspace>/<cluster_id>.properties`, a flat `key=value`
//! text file read by downstream test tooling to connect to the cluster.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use anyhow::Result;

use crate::config::Redacted;
use crate::error::CloudError;

/// The domain suffix of every cluster endpoint.
pub const ENDPOINT_DOMAIN: &str = "foundit.no";
/// The port of every cluster endpoint.
pub const ENDPOINT_PORT: u16 = 9243;

const KEY_CLUSTER_ID: &str = "cluster_id";
const KEY_ES_USERNAME: &str = "es_username";
const KEY_ES_PASSWORD: &str = "es_password";
const KEY_KIBANA_CLUSTER_ID: &str = "kibana_cluster_id";
const KEY_ES_URL: &str = "elasticsearch_url";
const KEY_KIBANA_URL: &str = "kibana_url";
const HEADER: &str = "#Cloud Cluster Info";

/// Everything needed to connect to a live deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionMetadata {
    pub cluster_id: String,
    pub kibana_cluster_id: String,
    pub username: String,
    pub password: Redacted,
    pub elasticsearch_url: String,
    pub kibana_url: String,
}

impl ConnectionMetadata {
    /// Build the metadata of a deployment, deriving its endpoint URLs from its region.
    pub fn new(cluster_id: &str, kibana_cluster_id: &str, username: &str, password: &str, region: &str) -> Self {
        let provider = endpoint_provider(region);
        Self {
            cluster_id: cluster_id.into(),
            kibana_cluster_id: kibana_cluster_id.into(),
            username: username.into(),
            password: password.into(),
            elasticsearch_url: endpoint_url(cluster_id, region, provider),
            kibana_url: endpoint_url(kibana_cluster_id, region, provider),
        }
    }

    /// Render this record in its on-disk format.
    pub fn to_properties(&self) -> String {
        let entries = [
            (KEY_CLUSTER_ID, self.cluster_id.as_str()),
            (KEY_ES_USERNAME, self.username.as_str()),
            (KEY_ES_PASSWORD, self.password.expose()),
            (KEY_KIBANA_CLUSTER_ID, self.kibana_cluster_id.as_str()),
            (KEY_ES_URL, self.elasticsearch_url.as_str()),
            (KEY_KIBANA_URL, self.kibana_url.as_str()),
        ];
        let mut out = String::from(HEADER);
        out.push('\n');
        for (key, val) in entries {
            out.push_str(key);
            out.push('=');
            out.push_str(val);
            out.push('\n');
        }
        out
    }

    /// Parse a record from its on-disk format.
    ///
    /// Blank lines and `#`/`!` comments are skipped. Both `=` and `:` are accepted as separators.
    pub fn from_properties(data: &str) -> Result<Self> {
        let entries: HashMap<&str, &str> = data
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
            .filter_map(|line| {
                let pos = line.find(|c: char| c == '=' || c == ':')?;
                Some((line[..pos].trim(), line[pos + 1..].trim()))
            })
            .collect();
        let get = |key: &str| {
            entries
                .get(key)
                .map(|val| val.to_string())
                .ok_or_else(|| CloudError::Config(format!("metadata record has no {} entry", key)))
        };
        Ok(Self {
            cluster_id: get(KEY_CLUSTER_ID)?,
            kibana_cluster_id: get(KEY_KIBANA_CLUSTER_ID)?,
            username: get(KEY_ES_USERNAME)?,
            password: Redacted(get(KEY_ES_PASSWORD)?),
            elasticsearch_url: get(KEY_ES_URL)?,
            kibana_url: get(KEY_KIBANA_URL)?,
        })
    }
}

/// The provider segment of the endpoints of clusters in the given region.
///
/// Regions of unrecognized providers use the AWS staging segment.
pub fn endpoint_provider(region: &str) -> &'static str {
    if region.contains("gcp") {
        "gcp"
    } else if region.contains("azure") {
        "azure"
    } else {
        "aws.staging"
    }
}

/// Build the endpoint URL of a cluster.
pub fn endpoint_url(cluster_id: &str, region: &str, provider: &str) -> String {
    format!("https://{}.{}.{}.{}:{}", cluster_id, region, provider, ENDPOINT_DOMAIN, ENDPOINT_PORT)
}

/// Check that the given cluster ID is a single plain path component.
pub fn validate_cluster_id(cluster_id: &str) -> Result<()> {
    let mut components = Path::new(cluster_id).components();
    let is_plain = matches!((components.next(), components.next()), (Some(Component::Normal(_)), None));
    if !is_plain || cluster_id.contains(&['/', '\\'][..]) || cluster_id.contains("..") {
        return Err(CloudError::Config(format!("invalid cluster ID {:?}", cluster_id)).into());
    }
    Ok(())
}

/// The directory of metadata records.
#[derive(Clone, Debug)]
pub struct MetadataStore {
    dir: PathBuf,
}

impl MetadataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The path of the record of the given cluster.
    ///
    /// Fails if the cluster ID would not name a file directly inside the store directory.
    pub fn path(&self, cluster_id: &str) -> Result<PathBuf> {
        validate_cluster_id(cluster_id)?;
        Ok(self.dir.join(format!("{}.properties", cluster_id)))
    }

    /// Write the given record, replacing any existing record of the same cluster.
    pub async fn write(&self, metadata: &ConnectionMetadata) -> Result<PathBuf> {
        let path = self.path(&metadata.cluster_id)?;
        tokio::fs::write(&path, metadata.to_properties())
            .await
            .map_err(|source| CloudError::FileIo { path: path.clone(), source })?;
        tracing::info!(path = ?path, cluster_id = %metadata.cluster_id, "wrote cluster metadata record");
        Ok(path)
    }

    /// Load the record of the given cluster, if it exists.
    pub async fn load(&self, cluster_id: &str) -> Result<Option<ConnectionMetadata>> {
        let path = self.path(cluster_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(data) => ConnectionMetadata::from_properties(&data).map(Some),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CloudError::FileIo { path, source }.into()),
        }
    }

    /// Remove the record of the given cluster, returning `false` if there was none.
    pub async fn remove(&self, cluster_id: &str) -> Result<bool> {
        let path = self.path(cluster_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = ?path, cluster_id, "removed cluster metadata record");
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::warn!(path = ?path, cluster_id, "no metadata record to remove");
                Ok(false)
            }
            Err(source) => Err(CloudError::FileIo { path, source }.into()),
        }
    }
}

