//! Runtime configuration.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::CloudError;
use crate::poller::WaitConfig;
use crate::region::DEFAULT_REGION;

pub const ENV_HOST: &str = "ESTF_CLOUD_HOST";
pub const ENV_VERSION: &str = "ESTF_CLOUD_VERSION";
pub const ENV_UPGRADE_VERSION: &str = "ESTF_UPGRADE_CLOUD_VERSION";
pub const ENV_WORKSPACE: &str = "WORKSPACE";
pub const DEFAULT_VAULT_PATH: &str = "secret/stack-testing/cloud";

/// Runtime configuration data.
///
/// Every field maps to the env var of the same name in upper case. Values which are only needed
/// by some operations are optional here and validated by their accessor at the point of use.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// The logging config, which uses `tracing_subscriber::EnvFilter` directives.
    pub rust_log: Option<String>,

    /// The control-plane host, either a bare hostname or a full URL.
    pub estf_cloud_host: Option<String>,
    /// The region hint, used for region path resolution and instance preset selection.
    #[serde(default = "Config::default_region")]
    pub estf_cloud_region: String,
    /// The stack version of newly created clusters.
    pub estf_cloud_version: Option<String>,
    /// The target stack version of an upgrade.
    pub estf_upgrade_cloud_version: Option<String>,
    /// The number of zones of the Kibana cluster.
    #[serde(default = "Config::default_zone_count")]
    pub estf_cloud_kibana_zone_count: u32,
    /// The directory in which cluster metadata records are kept.
    pub workspace: Option<String>,

    /// The address of the Vault server holding the control-plane credentials.
    pub vault_addr: Option<String>,
    /// The Vault token.
    pub vault_token: Option<Redacted>,
    /// The Vault path of the control-plane credentials.
    #[serde(default = "Config::default_vault_path")]
    pub vault_path: String,
    /// Control-plane username, used only when Vault is not configured.
    pub estf_cloud_username: Option<String>,
    /// Control-plane password, used only when Vault is not configured.
    pub estf_cloud_password: Option<Redacted>,

    /// Seconds between readiness polls.
    #[serde(default = "Config::default_poll_interval")]
    pub estf_cloud_poll_interval_seconds: u64,
    /// Seconds after which a readiness wait gives up.
    #[serde(default = "Config::default_poll_timeout")]
    pub estf_cloud_poll_timeout_seconds: u64,
    /// Also wait for the Elasticsearch cluster to start before a create is considered done.
    #[serde(default)]
    pub estf_cloud_wait_for_es: bool,
}

impl Config {
    /// Create a new config instance from the runtime environment.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Result<Self> {
        envy::from_env().context("error building config from env")
    }

    /// The control-plane host.
    pub fn host(&self) -> Result<&str> {
        required(self.estf_cloud_host.as_deref(), ENV_HOST)
    }

    /// The region hint.
    pub fn region_hint(&self) -> &str {
        non_empty(Some(self.estf_cloud_region.as_str())).unwrap_or(DEFAULT_REGION)
    }

    /// The stack version of newly created clusters.
    pub fn stack_version(&self) -> Result<&str> {
        required(self.estf_cloud_version.as_deref(), ENV_VERSION)
    }

    /// The upgrade target version, preferring the given CLI value over the environment.
    pub fn upgrade_version<'a>(&'a self, cli: Option<&'a str>) -> Result<&'a str> {
        match non_empty(cli) {
            Some(version) => Ok(version),
            None => non_empty(self.estf_upgrade_cloud_version.as_deref())
                .ok_or_else(|| CloudError::Config(format!("an upgrade stack version is required, set {} or pass --version", ENV_UPGRADE_VERSION)).into()),
        }
    }

    /// The directory holding metadata records, falling back to the current directory.
    pub fn workspace_dir(&self) -> Result<PathBuf> {
        let dir = match non_empty(self.workspace.as_deref()) {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir().context("error resolving current directory")?,
        };
        if !dir.is_dir() {
            return Err(CloudError::Config(format!("{} must be a directory, got {:?}", ENV_WORKSPACE, dir)).into());
        }
        Ok(dir)
    }

    /// The readiness wait parameters.
    pub fn wait_config(&self) -> WaitConfig {
        WaitConfig {
            interval: Duration::from_secs(self.estf_cloud_poll_interval_seconds),
            timeout: Duration::from_secs(self.estf_cloud_poll_timeout_seconds),
        }
    }

    fn default_region() -> String {
        DEFAULT_REGION.into()
    }

    fn default_zone_count() -> u32 {
        1
    }

    fn default_vault_path() -> String {
        DEFAULT_VAULT_PATH.into()
    }

    fn default_poll_interval() -> u64 {
        10
    }

    fn default_poll_timeout() -> u64 {
        1800
    }
}

/// Treat empty strings the same as absent values.
pub(crate) fn non_empty(val: Option<&str>) -> Option<&str> {
    val.map(str::trim).filter(|val| !val.is_empty())
}

fn required<'a>(val: Option<&'a str>, var: &str) -> Result<&'a str> {
    non_empty(val).ok_or_else(|| CloudError::missing_env(var).into())
}

/// A string value which must never appear in logs.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Redacted(pub String);

impl Redacted {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"<redacted>\"")
    }
}

impl From<&str> for Redacted {
    fn from(val: &str) -> Self {
        Self(val.into())
    }
}
