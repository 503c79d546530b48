use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use uuid::Uuid;

use crate::error::CloudError;
use crate::fixtures::{StubControlPlane, ES_CLUSTER_ID, KIBANA_CLUSTER_ID};
use crate::metadata::{ConnectionMetadata, MetadataStore};
use crate::models::{ClusterHandle, ClusterStatus, ScriptTypeSettings, SystemSettings};
use crate::orchestrator::*;
use crate::plan::{PlanOverrides, CLUSTER_NAME_PREFIX, GCP_PRESETS};
use crate::poller::WaitConfig;

fn fast_wait() -> WaitConfig {
    WaitConfig {
        interval: Duration::from_millis(1),
        timeout: Duration::from_secs(5),
    }
}

fn handle() -> ClusterHandle {
    ClusterHandle {
        cluster_id: ES_CLUSTER_ID.into(),
        kibana_cluster_id: KIBANA_CLUSTER_ID.into(),
    }
}

#[tokio::test]
async fn create_end_to_end_on_gcp() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let stub = StubControlPlane::new("gcp-europe-west-1").with_kibana_statuses(&[ClusterStatus::Initializing, ClusterStatus::Reconfiguring]);
    let orch = Orchestrator::new(stub, MetadataStore::new(dir.path()), fast_wait());

    let outcome = orch.create(Some("8.1.0"), "gcp-europe-west-1", PlanOverrides::default()).await?;

    // Plan submitted with GCP presets and a generated name.
    let created = orch.client().created.lock().unwrap().clone();
    assert_eq!(created.len(), 1, "expected exactly one create call");
    let req = &created[0];
    let suffix = req.cluster_name.strip_prefix(CLUSTER_NAME_PREFIX).context("expected cluster name prefix")?;
    assert!(Uuid::parse_str(suffix).is_ok(), "expected cluster name to end with a uuid, got {}", req.cluster_name);
    assert_eq!(req.plan.cluster_topology[0].instance_configuration_id.as_deref(), Some(GCP_PRESETS.data));
    assert_eq!(req.plan.elasticsearch.version.as_deref(), Some("8.1.0"));

    // Kibana polled until started: two transitional statuses then started.
    assert_eq!(orch.client().count("get_kibana_cluster"), 3, "unexpected kibana poll count, calls: {:?}", orch.client().calls());
    // Data cluster status is not awaited on create by default, only fetched once for its region.
    assert_eq!(orch.client().count("get_es_cluster"), 1, "unexpected ES fetch count, calls: {:?}", orch.client().calls());

    assert_eq!(outcome.handle, handle());
    assert!(outcome.metadata.kibana_url.contains("europe-west-1"), "unexpected kibana url {}", outcome.metadata.kibana_url);
    assert!(outcome.metadata.kibana_url.contains(".gcp."), "unexpected kibana url {}", outcome.metadata.kibana_url);
    assert_eq!(outcome.metadata.elasticsearch_url, format!("https://{}.gcp-europe-west-1.gcp.foundit.no:9243", ES_CLUSTER_ID));

    let path = outcome.record.context("expected a metadata record path")?;
    assert_eq!(path, dir.path().join(format!("{}.properties", ES_CLUSTER_ID)));
    let written = ConnectionMetadata::from_properties(&std::fs::read_to_string(&path)?)?;
    assert_eq!(written, outcome.metadata);
    assert_eq!(written.username, "elastic");
    assert_eq!(written.password.expose(), "changeme");
    Ok(())
}

#[tokio::test]
async fn create_can_also_wait_for_es() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let stub = StubControlPlane::new("us-east-1").with_es_statuses(&[ClusterStatus::Initializing]);
    let orch = Orchestrator::new(stub, MetadataStore::new(dir.path()), fast_wait()).wait_for_es_on_create(true);

    let outcome = orch.create(Some("8.1.0"), "us-east-1", PlanOverrides::default()).await?;
    // Two polls plus the region fetch.
    assert_eq!(orch.client().count("get_es_cluster"), 3, "calls: {:?}", orch.client().calls());
    assert_eq!(outcome.metadata.elasticsearch_url, format!("https://{}.us-east-1.aws.staging.foundit.no:9243", ES_CLUSTER_ID));
    Ok(())
}

#[tokio::test]
async fn create_without_version_makes_no_calls() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let orch = Orchestrator::new(StubControlPlane::new("us-east-1"), MetadataStore::new(dir.path()), fast_wait());
    let err = orch.create(None, "us-east-1", PlanOverrides::default()).await.expect_err("expected a config error");
    assert!(matches!(err.downcast_ref::<CloudError>(), Some(CloudError::Config(_))), "unexpected error {:?}", err);
    assert!(orch.client().calls().is_empty(), "expected no control-plane calls, got {:?}", orch.client().calls());
    Ok(())
}

#[tokio::test]
async fn create_times_out_when_kibana_never_starts() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let stub = StubControlPlane { never_started: true, ..StubControlPlane::new("us-east-1") };
    let wait = WaitConfig { interval: Duration::from_millis(1), timeout: Duration::from_millis(20) };
    let orch = Orchestrator::new(stub, MetadataStore::new(dir.path()), wait);

    let err = orch.create(Some("8.1.0"), "us-east-1", PlanOverrides::default()).await.expect_err("expected a timeout");
    let cloud_err = err.downcast_ref::<CloudError>().context("expected a cloud error")?;
    assert!(cloud_err.is_timeout(), "expected a timeout, got {:?}", cloud_err);
    assert!(!dir.path().join(format!("{}.properties", ES_CLUSTER_ID)).exists(), "expected no record after a timeout");
    Ok(())
}

#[tokio::test]
async fn create_survives_metadata_write_failure() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("does-not-exist");
    let orch = Orchestrator::new(StubControlPlane::new("us-east-1"), MetadataStore::new(&missing), fast_wait());

    let outcome = orch.create(Some("8.1.0"), "us-east-1", PlanOverrides::default()).await?;
    assert!(outcome.record.is_none(), "expected no record path when the write fails");
    assert_eq!(outcome.handle, handle());
    Ok(())
}

#[tokio::test]
async fn edit_with_only_kibana_settings_leaves_es_plan_alone() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let stub = StubControlPlane::new("us-east-1").with_kibana_statuses(&[ClusterStatus::Reconfiguring]);
    let orch = Orchestrator::new(stub, MetadataStore::new(dir.path()), fast_wait());
    let req = EditRequest { kibana_settings: Some("xpack.reporting.enabled: false".into()), ..Default::default() };

    orch.edit(&handle(), &req).await?;

    let stub = orch.client();
    assert_eq!(stub.count("update_es_plan"), 0, "expected no ES plan update, calls: {:?}", stub.calls());
    assert_eq!(stub.count("update_kibana_plan"), 1, "calls: {:?}", stub.calls());
    assert_eq!(stub.count("get_kibana_cluster"), 2, "calls: {:?}", stub.calls());
    assert_eq!(stub.count("get_es_cluster"), 0, "calls: {:?}", stub.calls());
    let submitted = stub.submitted_kibana_plans.lock().unwrap().clone();
    assert_eq!(submitted[0].kibana.user_settings_yaml.as_deref(), Some("xpack.reporting.enabled: false"));
    Ok(())
}

#[tokio::test]
async fn edit_es_settings_preserves_unmodeled_plan_fields() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let stub = StubControlPlane::new("us-east-1").with_es_statuses(&[ClusterStatus::Reconfiguring]);
    *stub.es_plan.lock().unwrap() = serde_json::from_value(json!({
        "cluster_topology": [{"instance_configuration_id": "aws.data.highio.i3", "zone_count": 1, "memory_per_node": 1024}],
        "elasticsearch": {"version": "7.17.0", "enabled_built_in_plugins": ["x"]},
        "transient": {"strategy": {"autodetect": {}}}
    }))?;
    let orch = Orchestrator::new(stub, MetadataStore::new(dir.path()), fast_wait());
    let req = EditRequest { es_settings: Some("search.max_buckets: 100".into()), ..Default::default() };

    orch.edit(&handle(), &req).await?;

    let stub = orch.client();
    assert_eq!(stub.count("update_es_plan"), 1, "calls: {:?}", stub.calls());
    assert_eq!(stub.count("update_kibana_plan"), 0, "calls: {:?}", stub.calls());
    assert_eq!(stub.count("get_es_cluster"), 2, "calls: {:?}", stub.calls());
    let submitted = serde_json::to_value(&stub.submitted_es_plans.lock().unwrap()[0])?;
    assert_eq!(submitted["elasticsearch"]["user_settings_yaml"], "search.max_buckets: 100");
    assert_eq!(submitted["elasticsearch"]["version"], "7.17.0");
    assert_eq!(submitted["elasticsearch"]["enabled_built_in_plugins"], json!(["x"]));
    assert_eq!(submitted["cluster_topology"][0]["memory_per_node"], 1024);
    assert_eq!(submitted["transient"], json!({"strategy": {"autodetect": {}}}));
    Ok(())
}

#[tokio::test]
async fn edit_disable_scripting_overwrites_scripting_block() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let stub = StubControlPlane::new("us-east-1");
    stub.es_plan.lock().unwrap().elasticsearch.system_settings = Some(SystemSettings::create_defaults());
    let orch = Orchestrator::new(stub, MetadataStore::new(dir.path()), fast_wait());
    let req = EditRequest { disable_scripting: true, ..Default::default() };

    orch.edit(&handle(), &req).await?;

    let stub = orch.client();
    assert_eq!(stub.count("update_es_plan"), 1, "calls: {:?}", stub.calls());
    let submitted = stub.submitted_es_plans.lock().unwrap()[0].clone();
    let settings = submitted.elasticsearch.system_settings.context("expected system settings")?;
    assert_eq!(settings.auto_create_index, Some(true), "expected non-scripting settings to be kept");
    let scripting = settings.scripting.context("expected scripting settings")?;
    let disabled = Some(ScriptTypeSettings { enabled: Some(false), sandbox_mode: Some(false) });
    assert_eq!(scripting.inline, disabled);
    assert_eq!(scripting.stored, disabled);
    assert_eq!(scripting.file, disabled);
    Ok(())
}

#[tokio::test]
async fn edit_all_branches_fire_independently() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let orch = Orchestrator::new(StubControlPlane::new("us-east-1"), MetadataStore::new(dir.path()), fast_wait());
    let req = EditRequest {
        es_settings: Some("a: b".into()),
        kibana_settings: Some("c: d".into()),
        disable_scripting: true,
    };

    orch.edit(&handle(), &req).await?;

    let stub = orch.client();
    assert_eq!(stub.count("get_es_plan"), 1, "calls: {:?}", stub.calls());
    assert_eq!(stub.count("update_es_plan"), 2, "calls: {:?}", stub.calls());
    assert_eq!(stub.count("update_kibana_plan"), 1, "calls: {:?}", stub.calls());
    let last = stub.submitted_es_plans.lock().unwrap()[1].clone();
    assert_eq!(last.elasticsearch.user_settings_yaml.as_deref(), Some("a: b"), "expected script update to carry earlier settings");
    Ok(())
}

#[tokio::test]
async fn edit_with_nothing_requested_only_reads_plan() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let orch = Orchestrator::new(StubControlPlane::new("us-east-1"), MetadataStore::new(dir.path()), fast_wait());
    orch.edit(&handle(), &EditRequest::default()).await?;
    assert_eq!(orch.client().calls(), vec!["get_es_plan"]);
    Ok(())
}

#[tokio::test]
async fn edit_es_only_does_not_need_a_kibana_cluster_id() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let orch = Orchestrator::new(StubControlPlane::new("us-east-1"), MetadataStore::new(dir.path()), fast_wait());
    let handle = ClusterHandle { cluster_id: ES_CLUSTER_ID.into(), kibana_cluster_id: String::new() };
    let req = EditRequest { es_settings: Some("action.auto_create_index: true".into()), disable_scripting: true, ..Default::default() };

    orch.edit(&handle, &req).await?;
    assert_eq!(orch.client().count("update_es_plan"), 2, "unexpected calls: {:?}", orch.client().calls());
    assert_eq!(orch.client().count("get_kibana_plan"), 0, "expected kibana to be left alone");

    let req = EditRequest { kibana_settings: Some("xpack.reporting.enabled: false".into()), ..Default::default() };
    let err = orch.edit(&handle, &req).await.expect_err("expected a kibana edit without a kibana ID to fail");
    assert!(matches!(err.downcast_ref::<CloudError>(), Some(CloudError::Config(_))), "unexpected error {:?}", err);
    assert_eq!(orch.client().count("get_kibana_plan"), 0, "expected no kibana calls");
    Ok(())
}

#[tokio::test]
async fn edit_surfaces_control_plane_errors() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let stub = StubControlPlane { fail_updates_with: Some(400), ..StubControlPlane::new("us-east-1") };
    let orch = Orchestrator::new(stub, MetadataStore::new(dir.path()), fast_wait());
    let req = EditRequest { es_settings: Some("a: b".into()), ..Default::default() };

    let err = orch.edit(&handle(), &req).await.expect_err("expected a control plane error");
    assert!(
        matches!(err.downcast_ref::<CloudError>(), Some(CloudError::ControlPlane { status: 400, .. })),
        "unexpected error {:?}",
        err
    );
    assert_eq!(orch.client().count("get_es_cluster"), 0, "expected no polling after a failed update");
    Ok(())
}

#[tokio::test]
async fn upgrade_sets_version_then_upgrades_kibana() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let stub = StubControlPlane::new("us-east-1")
        .with_es_statuses(&[ClusterStatus::Reconfiguring])
        .with_kibana_statuses(&[ClusterStatus::Restarting]);
    let orch = Orchestrator::new(stub, MetadataStore::new(dir.path()), fast_wait());

    orch.upgrade(&handle(), Some("8.2.0")).await?;

    let stub = orch.client();
    assert_eq!(
        stub.calls(),
        vec![
            "get_es_plan",
            "update_es_plan",
            "get_es_cluster",
            "get_es_cluster",
            "upgrade_kibana_cluster",
            "get_kibana_cluster",
            "get_kibana_cluster",
        ]
    );
    let submitted = stub.submitted_es_plans.lock().unwrap()[0].clone();
    assert_eq!(submitted.elasticsearch.version.as_deref(), Some("8.2.0"));
    Ok(())
}

#[tokio::test]
async fn upgrade_requires_version() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let orch = Orchestrator::new(StubControlPlane::new("us-east-1"), MetadataStore::new(dir.path()), fast_wait());
    for version in [None, Some("")] {
        let err = orch.upgrade(&handle(), version).await.expect_err("expected a config error");
        assert!(matches!(err.downcast_ref::<CloudError>(), Some(CloudError::Config(_))), "unexpected error {:?}", err);
    }
    assert!(orch.client().calls().is_empty(), "expected no control-plane calls, got {:?}", orch.client().calls());
    Ok(())
}

#[tokio::test]
async fn delete_removes_record_and_tolerates_missing_one() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = MetadataStore::new(dir.path());
    store.write(&ConnectionMetadata::new(ES_CLUSTER_ID, KIBANA_CLUSTER_ID, "elastic", "pw", "us-east-1")).await?;
    store.write(&ConnectionMetadata::new("other", "other-kb", "elastic", "pw", "us-east-1")).await?;
    let orch = Orchestrator::new(StubControlPlane::new("us-east-1"), store.clone(), fast_wait());

    orch.delete(ES_CLUSTER_ID).await?;
    assert!(!store.path(ES_CLUSTER_ID)?.exists(), "expected the record to be removed");
    assert!(store.path("other")?.exists(), "expected other records to remain");

    orch.delete(ES_CLUSTER_ID).await?;
    assert_eq!(orch.client().count("delete_es_cluster"), 2);
    assert_eq!(orch.client().count("get_kibana_cluster"), 0, "expected kibana to be left to the control plane");
    Ok(())
}

#[tokio::test]
async fn delete_rejects_cluster_ids_outside_the_workspace() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let orch = Orchestrator::new(StubControlPlane::new("us-east-1"), MetadataStore::new(dir.path()), fast_wait());
    let err = orch.delete("../victim").await.expect_err("expected an invalid cluster ID to be rejected");
    assert!(matches!(err.downcast_ref::<CloudError>(), Some(CloudError::Config(_))), "unexpected error {:?}", err);
    assert!(orch.client().calls().is_empty(), "expected no control-plane calls, got {:?}", orch.client().calls());
    Ok(())
}

#[test]
fn lifecycle_states_display() {
    let states = [
        (LifecycleState::Requested, "requested"),
        (LifecycleState::Provisioning, "provisioning"),
        (LifecycleState::Ready, "ready"),
        (LifecycleState::Editing, "editing"),
        (LifecycleState::Upgrading, "upgrading"),
        (LifecycleState::Deleted, "deleted"),
    ];
    for (state, expected) in states {
        assert_eq!(state.to_string(), expected);
    }
}
