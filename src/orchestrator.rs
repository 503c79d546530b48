//! Cluster lifecycle orchestration.
//!
//! A deployment moves through `Requested -> Provisioning -> Ready`, then between `Ready` and
//! `Editing` or `Upgrading` any number of times, and finally to `Deleted`. Every transition out
//! of `Provisioning`, `Editing` and `Upgrading` is gated on a readiness wait.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::client::ControlPlane;
use crate::config::non_empty;
use crate::error::CloudError;
use crate::metadata::{validate_cluster_id, ConnectionMetadata, MetadataStore};
use crate::models::{ClusterHandle, SystemSettings};
use crate::plan::{build_create_plan, PlanOverrides};
use crate::poller::{wait_for, WaitConfig};
use crate::region::Region;

/// Plan updates are always applied, never only validated.
const VALIDATE_ONLY: bool = false;

/// The lifecycle states of a deployment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Requested,
    Provisioning,
    Ready,
    Editing,
    Upgrading,
    Deleted,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let val = match self {
            LifecycleState::Requested => "requested",
            LifecycleState::Provisioning => "provisioning",
            LifecycleState::Ready => "ready",
            LifecycleState::Editing => "editing",
            LifecycleState::Upgrading => "upgrading",
            LifecycleState::Deleted => "deleted",
        };
        f.write_str(val)
    }
}

/// The result of a successful create.
#[derive(Clone, Debug)]
pub struct CreateOutcome {
    pub handle: ClusterHandle,
    pub metadata: ConnectionMetadata,
    /// The path of the metadata record, or `None` if it could not be written.
    pub record: Option<PathBuf>,
}

/// The modifications of an edit.
///
/// Each field is applied independently of the others, and any subset may be given.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditRequest {
    /// Replaces the Elasticsearch user settings YAML.
    pub es_settings: Option<String>,
    /// Replaces the Kibana user settings YAML.
    pub kibana_settings: Option<String>,
    /// Disables every script type on the Elasticsearch cluster.
    pub disable_scripting: bool,
}

/// Sequences control-plane calls into the create, edit, upgrade and delete lifecycle operations.
pub struct Orchestrator<C> {
    client: C,
    store: MetadataStore,
    wait: WaitConfig,
    /// Also wait for the Elasticsearch cluster to start before a create completes.
    wait_for_es_on_create: bool,
}

impl<C: ControlPlane> Orchestrator<C> {
    pub fn new(client: C, store: MetadataStore, wait: WaitConfig) -> Self {
        Self { client, store, wait, wait_for_es_on_create: false }
    }

    /// Configure whether create also waits for the Elasticsearch cluster to start.
    ///
    /// By default only the Kibana cluster is awaited before the metadata record is written.
    pub fn wait_for_es_on_create(mut self, val: bool) -> Self {
        self.wait_for_es_on_create = val;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Create a new deployment and persist its connection metadata.
    pub async fn create(&self, stack_version: Option<&str>, region_hint: &str, overrides: PlanOverrides) -> Result<CreateOutcome> {
        let req = build_create_plan(stack_version, region_hint, overrides)?;
        log_transition(&req.cluster_name, LifecycleState::Requested);

        let res = self.client.create_cluster(&req).await.context("error creating cluster")?;
        let cluster_id = res.elasticsearch_cluster_id.context("create response carried no Elasticsearch cluster ID")?;
        let kibana_cluster_id = res.kibana_cluster_id.context("create response carried no Kibana cluster ID")?;
        let creds = res.credentials.context("create response carried no cluster credentials")?;
        let handle = ClusterHandle { cluster_id, kibana_cluster_id };
        tracing::info!(cluster_name = %req.cluster_name, cluster_id = %handle.cluster_id, kibana_cluster_id = %handle.kibana_cluster_id, "cluster created");
        log_transition(&handle.cluster_id, LifecycleState::Provisioning);

        self.wait_kibana_running(&handle.kibana_cluster_id).await?;
        if self.wait_for_es_on_create {
            self.wait_es_running(&handle.cluster_id).await?;
        }

        let info = self.client.get_es_cluster(&handle.cluster_id).await.context("error fetching cluster info")?;
        let region = info
            .region
            .filter(|region| !region.is_empty())
            .unwrap_or_else(|| Region::resolve(Some(region_hint)).id().to_string());
        let metadata = ConnectionMetadata::new(&handle.cluster_id, &handle.kibana_cluster_id, &creds.username, &creds.password, &region);
        log_transition(&handle.cluster_id, LifecycleState::Ready);

        // The deployment is live whether or not the record could be written.
        let record = match self.store.write(&metadata).await {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::error!(error = ?err, cluster_id = %handle.cluster_id, "error writing cluster metadata record");
                None
            }
        };
        Ok(CreateOutcome { handle, metadata, record })
    }

    /// Apply the given edits to a live deployment.
    ///
    /// The Kibana cluster ID of the handle is only used, and only required, when Kibana settings are given.
    pub async fn edit(&self, handle: &ClusterHandle, req: &EditRequest) -> Result<()> {
        if req.kibana_settings.is_some() && handle.kibana_cluster_id.trim().is_empty() {
            return Err(CloudError::Config("a Kibana cluster ID is required to edit Kibana settings".into()).into());
        }
        log_transition(&handle.cluster_id, LifecycleState::Editing);
        let mut es_plan = self.client.get_es_plan(&handle.cluster_id).await.context("error fetching cluster plan")?;

        if let Some(settings) = req.es_settings.as_ref() {
            tracing::info!(cluster_id = %handle.cluster_id, "updating Elasticsearch user settings");
            es_plan.elasticsearch.user_settings_yaml = Some(settings.clone());
            let res = self
                .client
                .update_es_plan(&handle.cluster_id, &es_plan, VALIDATE_ONLY)
                .await
                .context("error updating cluster plan")?;
            self.wait_es_running(res.elasticsearch_cluster_id.as_deref().unwrap_or(&handle.cluster_id)).await?;
        }

        if let Some(settings) = req.kibana_settings.as_ref() {
            tracing::info!(kibana_cluster_id = %handle.kibana_cluster_id, "updating Kibana user settings");
            let mut kibana_plan = self
                .client
                .get_kibana_plan(&handle.kibana_cluster_id)
                .await
                .context("error fetching Kibana cluster plan")?;
            kibana_plan.kibana.user_settings_yaml = Some(settings.clone());
            let res = self
                .client
                .update_kibana_plan(&handle.kibana_cluster_id, &kibana_plan, VALIDATE_ONLY)
                .await
                .context("error updating Kibana cluster plan")?;
            self.wait_kibana_running(res.kibana_cluster_id.as_deref().unwrap_or(&handle.kibana_cluster_id))
                .await?;
        }

        if req.disable_scripting {
            tracing::info!(cluster_id = %handle.cluster_id, "disabling Elasticsearch scripting");
            let scripting = SystemSettings::scripting_disabled().scripting.unwrap_or_default();
            es_plan.elasticsearch.system_settings.get_or_insert_with(SystemSettings::default).scripting = Some(scripting);
            let res = self
                .client
                .update_es_plan(&handle.cluster_id, &es_plan, VALIDATE_ONLY)
                .await
                .context("error updating cluster scripting settings")?;
            self.wait_es_running(res.elasticsearch_cluster_id.as_deref().unwrap_or(&handle.cluster_id)).await?;
        }

        log_transition(&handle.cluster_id, LifecycleState::Ready);
        Ok(())
    }

    /// Upgrade a live deployment to the given stack version.
    pub async fn upgrade(&self, handle: &ClusterHandle, version: Option<&str>) -> Result<()> {
        let version = non_empty(version).ok_or_else(|| CloudError::Config("an upgrade stack version is required".into()))?;
        log_transition(&handle.cluster_id, LifecycleState::Upgrading);
        tracing::info!(cluster_id = %handle.cluster_id, version, "upgrading cluster");

        let mut es_plan = self.client.get_es_plan(&handle.cluster_id).await.context("error fetching cluster plan")?;
        es_plan.elasticsearch.version = Some(version.to_string());
        let res = self
            .client
            .update_es_plan(&handle.cluster_id, &es_plan, VALIDATE_ONLY)
            .await
            .context("error submitting cluster upgrade")?;
        self.wait_es_running(res.elasticsearch_cluster_id.as_deref().unwrap_or(&handle.cluster_id)).await?;

        let info = self
            .client
            .upgrade_kibana_cluster(&handle.kibana_cluster_id, VALIDATE_ONLY)
            .await
            .context("error submitting Kibana cluster upgrade")?;
        self.wait_kibana_running(info.cluster_id.as_deref().unwrap_or(&handle.kibana_cluster_id))
            .await?;

        log_transition(&handle.cluster_id, LifecycleState::Ready);
        Ok(())
    }

    /// Delete a deployment and its metadata record.
    ///
    /// The Kibana cluster is removed by the control plane along with the Elasticsearch cluster.
    pub async fn delete(&self, cluster_id: &str) -> Result<()> {
        validate_cluster_id(cluster_id)?;
        self.client.delete_es_cluster(cluster_id).await.context("error deleting cluster")?;
        log_transition(cluster_id, LifecycleState::Deleted);
        if let Err(err) = self.store.remove(cluster_id).await {
            tracing::error!(error = ?err, cluster_id, "error removing cluster metadata record");
        }
        Ok(())
    }

    /// Wait for the given Elasticsearch cluster to report `started`.
    async fn wait_es_running(&self, cluster_id: &str) -> Result<()> {
        let description = format!("Elasticsearch cluster {} to start", cluster_id);
        wait_for(&description, self.wait, || async move {
            let info = self.client.get_es_cluster(cluster_id).await?;
            tracing::debug!(cluster_id, status = %info.status, "polled Elasticsearch cluster status");
            Ok::<_, anyhow::Error>(info.status.is_running())
        })
        .await
    }

    /// Wait for the given Kibana cluster to report `started`.
    async fn wait_kibana_running(&self, kibana_cluster_id: &str) -> Result<()> {
        let description = format!("Kibana cluster {} to start", kibana_cluster_id);
        wait_for(&description, self.wait, || async move {
            let info = self.client.get_kibana_cluster(kibana_cluster_id).await?;
            tracing::debug!(kibana_cluster_id, status = %info.status, "polled Kibana cluster status");
            Ok::<_, anyhow::Error>(info.status.is_running())
        })
        .await
    }
}

fn log_transition(cluster: &str, state: LifecycleState) {
    tracing::info!(cluster = %cluster, state = %state, "cluster lifecycle transition");
}
