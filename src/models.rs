//! Control-plane data models.
//!
//! Plans fetched from the control plane carry many more fields than this crate reads or writes.
//! Every plan model flattens unknown fields into `extra` so that a fetched plan can be submitted
//! back with only the intended modification.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Control-plane login request.
#[derive(Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Control-plane login response.
#[derive(Clone, Deserialize)]
pub struct LoginResponse {
    pub token: Option<String>,
}

/// A request to create an Elasticsearch cluster along with its Kibana cluster.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CreateClusterRequest {
    pub cluster_name: String,
    pub plan: ElasticsearchClusterPlan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kibana: Option<CreateKibanaRequest>,
}

/// The Kibana part of a create request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CreateKibanaRequest {
    pub plan: KibanaClusterPlan,
}

/// The plan of an Elasticsearch cluster.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ElasticsearchClusterPlan {
    #[serde(default)]
    pub cluster_topology: Vec<TopologyElement>,
    #[serde(default)]
    pub elasticsearch: ElasticsearchConfiguration,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The Elasticsearch configuration of a plan.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ElasticsearchConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_settings_yaml: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_settings_override_yaml: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_settings: Option<SystemSettings>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Elasticsearch system settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SystemSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_create_index: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destructive_requires_name: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripting: Option<ScriptingSettings>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SystemSettings {
    /// The system settings applied to every newly created cluster.
    pub fn create_defaults() -> Self {
        let enabled = ScriptTypeSettings { enabled: Some(true), sandbox_mode: None };
        Self {
            auto_create_index: Some(true),
            destructive_requires_name: Some(false),
            scripting: Some(ScriptingSettings {
                inline: Some(enabled.clone()),
                stored: Some(enabled),
                file: None,
            }),
            extra: Map::new(),
        }
    }

    /// System settings with every script type disabled and sandboxing off.
    pub fn scripting_disabled() -> Self {
        let disabled = ScriptTypeSettings { enabled: Some(false), sandbox_mode: Some(false) };
        Self {
            scripting: Some(ScriptingSettings {
                inline: Some(disabled.clone()),
                stored: Some(disabled.clone()),
                file: Some(disabled),
            }),
            ..Default::default()
        }
    }
}

/// Per script-type scripting settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ScriptingSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<ScriptTypeSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored: Option<ScriptTypeSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<ScriptTypeSettings>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ScriptTypeSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox_mode: Option<bool>,
}

/// The plan of a Kibana cluster.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct KibanaClusterPlan {
    #[serde(default)]
    pub cluster_topology: Vec<TopologyElement>,
    #[serde(default)]
    pub kibana: KibanaConfiguration,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The Kibana configuration of a plan.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct KibanaConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_settings_yaml: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_settings_override_yaml: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single node group of a cluster's topology.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TopologyElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_configuration_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<NodeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<TopologySize>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The roles of the nodes of a topology element.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeType {
    #[serde(default)]
    pub master: bool,
    #[serde(default)]
    pub data: bool,
    #[serde(default)]
    pub ingest: bool,
    #[serde(default)]
    pub ml: bool,
}

/// The size of each node of a topology element.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopologySize {
    pub value: u32,
    pub resource: String,
}

impl TopologySize {
    /// A memory size in megabytes.
    pub fn memory(megabytes: u32) -> Self {
        Self { value: megabytes, resource: "memory".into() }
    }
}

/// The response of a create or plan update call.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ClusterCrudResponse {
    #[serde(default)]
    pub elasticsearch_cluster_id: Option<String>,
    #[serde(default)]
    pub kibana_cluster_id: Option<String>,
    #[serde(default)]
    pub credentials: Option<ClusterCredentials>,
}

/// The credentials of the `elastic` superuser of a new cluster.
#[derive(Clone, Deserialize, PartialEq)]
pub struct ClusterCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ClusterCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterCredentials").field("username", &self.username).field("password", &"<redacted>").finish()
    }
}

/// The response of a Kibana upgrade call.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ClusterUpgradeInfo {
    #[serde(default)]
    pub cluster_id: Option<String>,
}

/// Info on an Elasticsearch cluster.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ElasticsearchClusterInfo {
    pub cluster_id: String,
    #[serde(default)]
    pub status: ClusterStatus,
    #[serde(default)]
    pub region: Option<String>,
}

/// Info on a Kibana cluster.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct KibanaClusterInfo {
    pub cluster_id: String,
    #[serde(default)]
    pub status: ClusterStatus,
}

/// The reported status of a cluster.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClusterStatus {
    Initializing,
    Stopping,
    Stopped,
    Rebooting,
    Restarting,
    Reconfiguring,
    Started,
    #[serde(other)]
    Unknown,
}

impl ClusterStatus {
    /// Check if the cluster has finished provisioning or updating and is serving traffic.
    pub fn is_running(self) -> bool {
        self == ClusterStatus::Started
    }
}

impl Default for ClusterStatus {
    fn default() -> Self {
        ClusterStatus::Unknown
    }
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let val = match self {
            ClusterStatus::Initializing => "initializing",
            ClusterStatus::Stopping => "stopping",
            ClusterStatus::Stopped => "stopped",
            ClusterStatus::Rebooting => "rebooting",
            ClusterStatus::Restarting => "restarting",
            ClusterStatus::Reconfiguring => "reconfiguring",
            ClusterStatus::Started => "started",
            ClusterStatus::Unknown => "unknown",
        };
        f.write_str(val)
    }
}

/// The identifiers of a live deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterHandle {
    pub cluster_id: String,
    pub kibana_cluster_id: String,
}
