//! Deployment plan construction.

use anyhow::Result;
use serde_json::Map;
use uuid::Uuid;

use crate::config::non_empty;
use crate::error::CloudError;
use crate::models::{
    CreateClusterRequest, CreateKibanaRequest, ElasticsearchClusterPlan, ElasticsearchConfiguration, KibanaClusterPlan, KibanaConfiguration, NodeType,
    SystemSettings, TopologyElement, TopologySize,
};

/// The prefix of every generated cluster name.
pub const CLUSTER_NAME_PREFIX: &str = "ESTF_Cluster__";

/// The instance configurations used for each kind of node of a provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstancePresets {
    /// Master and data nodes.
    pub data: &'static str,
    /// Kibana instances.
    pub kibana: &'static str,
    /// Machine learning nodes.
    pub ml: &'static str,
}

pub const AWS_PRESETS: InstancePresets = InstancePresets {
    data: "aws.data.highio.i3",
    kibana: "aws.kibana.r5d",
    ml: "aws.ml.m5d",
};

pub const GCP_PRESETS: InstancePresets = InstancePresets {
    data: "gcp.data.highio.1",
    kibana: "gcp.kibana.1",
    ml: "gcp.ml.1",
};

pub const AZURE_PRESETS: InstancePresets = InstancePresets {
    data: "azure.data.highio.l32sv2",
    kibana: "azure.kibana.e32sv3",
    ml: "azure.ml.d64sv3",
};

impl InstancePresets {
    /// Select the presets of the provider named by the given region hint.
    ///
    /// Checked in order: `gcp`, then `azure`, with AWS as the fallback.
    pub fn for_region_hint(hint: &str) -> Self {
        if hint.contains("gcp") {
            GCP_PRESETS
        } else if hint.contains("azure") {
            AZURE_PRESETS
        } else {
            AWS_PRESETS
        }
    }
}

/// Node counts and sizes of a new deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanSizing {
    /// Zones of the Elasticsearch cluster.
    pub zone_count: u32,
    /// Zones of the Kibana cluster.
    pub kibana_zone_count: u32,
    /// Memory in MB of each master/data node.
    pub data_memory_mb: u32,
    /// Memory in MB of each ML node, where `0` provisions no ML capacity.
    pub ml_memory_mb: u32,
    /// Memory in MB of each Kibana instance.
    pub kibana_memory_mb: u32,
}

impl Default for PlanSizing {
    fn default() -> Self {
        Self {
            zone_count: 1,
            kibana_zone_count: 1,
            data_memory_mb: 1024,
            ml_memory_mb: 0,
            kibana_memory_mb: 1024,
        }
    }
}

/// Caller overrides applied to a new deployment's plan.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlanOverrides {
    /// Elasticsearch user settings YAML.
    pub es_settings: Option<String>,
    /// Kibana user settings YAML.
    pub kibana_settings: Option<String>,
    /// Elasticsearch user settings override YAML.
    pub es_settings_override: Option<String>,
    /// Kibana user settings override YAML.
    pub kibana_settings_override: Option<String>,
    /// Replaces the default system settings when given.
    pub system_settings: Option<SystemSettings>,
    pub sizing: PlanSizing,
}

/// Build the create request of a new deployment.
pub fn build_create_plan(stack_version: Option<&str>, region_hint: &str, overrides: PlanOverrides) -> Result<CreateClusterRequest> {
    let version = non_empty(stack_version).ok_or_else(|| CloudError::Config("a stack version is required to create a cluster".into()))?;
    let presets = InstancePresets::for_region_hint(region_hint);
    let sizing = &overrides.sizing;
    tracing::debug!(version, region_hint, ?presets, "building create plan");

    let es_topology = vec![
        TopologyElement {
            instance_configuration_id: Some(presets.data.into()),
            node_type: Some(NodeType { master: true, data: true, ingest: true, ml: false }),
            zone_count: Some(sizing.zone_count),
            size: Some(TopologySize::memory(sizing.data_memory_mb)),
            extra: Map::new(),
        },
        TopologyElement {
            instance_configuration_id: Some(presets.ml.into()),
            node_type: Some(NodeType { ml: true, ..Default::default() }),
            zone_count: Some(sizing.zone_count),
            size: Some(TopologySize::memory(sizing.ml_memory_mb)),
            extra: Map::new(),
        },
    ];
    let kibana_topology = vec![TopologyElement {
        instance_configuration_id: Some(presets.kibana.into()),
        node_type: None,
        zone_count: Some(sizing.kibana_zone_count),
        size: Some(TopologySize::memory(sizing.kibana_memory_mb)),
        extra: Map::new(),
    }];

    Ok(CreateClusterRequest {
        cluster_name: generate_cluster_name(),
        plan: ElasticsearchClusterPlan {
            cluster_topology: es_topology,
            elasticsearch: ElasticsearchConfiguration {
                version: Some(version.into()),
                user_settings_yaml: overrides.es_settings,
                user_settings_override_yaml: overrides.es_settings_override,
                system_settings: Some(overrides.system_settings.unwrap_or_else(SystemSettings::create_defaults)),
                extra: Map::new(),
            },
            extra: Map::new(),
        },
        kibana: Some(CreateKibanaRequest {
            plan: KibanaClusterPlan {
                cluster_topology: kibana_topology,
                kibana: KibanaConfiguration {
                    version: Some(version.into()),
                    user_settings_yaml: overrides.kibana_settings,
                    user_settings_override_yaml: overrides.kibana_settings_override,
                    extra: Map::new(),
                },
                extra: Map::new(),
            },
        }),
    })
}

/// Generate a new globally unique cluster name.
pub fn generate_cluster_name() -> String {
    format!("{}{}", CLUSTER_NAME_PREFIX, Uuid::new_v4())
}
