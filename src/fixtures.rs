use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::client::ControlPlane;
use crate::error::CloudError;
use crate::models::{
    ClusterCredentials, ClusterCrudResponse, ClusterStatus, ClusterUpgradeInfo, CreateClusterRequest, ElasticsearchClusterInfo, ElasticsearchClusterPlan,
    KibanaClusterInfo, KibanaClusterPlan,
};

pub const ES_CLUSTER_ID: &str = "es-0123456789";
pub const KIBANA_CLUSTER_ID: &str = "kb-9876543210";

/// An in-memory control plane which records every call made against it.
///
/// Status queues are drained one value per status fetch; once drained, clusters report `started`
/// unless `never_started` is set.
#[derive(Default)]
pub struct StubControlPlane {
    pub region: String,
    pub es_statuses: Mutex<VecDeque<ClusterStatus>>,
    pub kibana_statuses: Mutex<VecDeque<ClusterStatus>>,
    pub never_started: bool,
    pub fail_updates_with: Option<u16>,
    pub es_plan: Mutex<ElasticsearchClusterPlan>,
    pub kibana_plan: Mutex<KibanaClusterPlan>,

    pub calls: Mutex<Vec<&'static str>>,
    pub created: Mutex<Vec<CreateClusterRequest>>,
    pub submitted_es_plans: Mutex<Vec<ElasticsearchClusterPlan>>,
    pub submitted_kibana_plans: Mutex<Vec<KibanaClusterPlan>>,
}

impl StubControlPlane {
    pub fn new(region: &str) -> Self {
        Self { region: region.into(), ..Default::default() }
    }

    pub fn with_es_statuses(self, statuses: &[ClusterStatus]) -> Self {
        *self.es_statuses.lock().unwrap() = statuses.iter().copied().collect();
        self
    }

    pub fn with_kibana_statuses(self, statuses: &[ClusterStatus]) -> Self {
        *self.kibana_statuses.lock().unwrap() = statuses.iter().copied().collect();
        self
    }

    /// The number of calls made to the given method.
    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| **call == method).count()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str) {
        self.calls.lock().unwrap().push(method);
    }

    fn next_status(&self, queue: &Mutex<VecDeque<ClusterStatus>>) -> ClusterStatus {
        match queue.lock().unwrap().pop_front() {
            Some(status) => status,
            None if self.never_started => ClusterStatus::Initializing,
            None => ClusterStatus::Started,
        }
    }

    fn check_update(&self) -> Result<()> {
        match self.fail_updates_with {
            Some(status) => Err(CloudError::ControlPlane { status, body: r#"{"errors":[]}"#.into() }.into()),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl ControlPlane for StubControlPlane {
    async fn create_cluster(&self, req: &CreateClusterRequest) -> Result<ClusterCrudResponse> {
        self.record("create_cluster");
        self.created.lock().unwrap().push(req.clone());
        Ok(ClusterCrudResponse {
            elasticsearch_cluster_id: Some(ES_CLUSTER_ID.into()),
            kibana_cluster_id: Some(KIBANA_CLUSTER_ID.into()),
            credentials: Some(ClusterCredentials { username: "elastic".into(), password: "changeme".into() }),
        })
    }

    async fn get_es_cluster(&self, cluster_id: &str) -> Result<ElasticsearchClusterInfo> {
        self.record("get_es_cluster");
        Ok(ElasticsearchClusterInfo {
            cluster_id: cluster_id.into(),
            status: self.next_status(&self.es_statuses),
            region: Some(self.region.clone()),
        })
    }

    async fn get_es_plan(&self, _cluster_id: &str) -> Result<ElasticsearchClusterPlan> {
        self.record("get_es_plan");
        Ok(self.es_plan.lock().unwrap().clone())
    }

    async fn update_es_plan(&self, cluster_id: &str, plan: &ElasticsearchClusterPlan, _validate_only: bool) -> Result<ClusterCrudResponse> {
        self.record("update_es_plan");
        self.check_update()?;
        self.submitted_es_plans.lock().unwrap().push(plan.clone());
        Ok(ClusterCrudResponse { elasticsearch_cluster_id: Some(cluster_id.into()), ..Default::default() })
    }

    async fn delete_es_cluster(&self, _cluster_id: &str) -> Result<()> {
        self.record("delete_es_cluster");
        Ok(())
    }

    async fn get_kibana_cluster(&self, kibana_cluster_id: &str) -> Result<KibanaClusterInfo> {
        self.record("get_kibana_cluster");
        Ok(KibanaClusterInfo {
            cluster_id: kibana_cluster_id.into(),
            status: self.next_status(&self.kibana_statuses),
        })
    }

    async fn get_kibana_plan(&self, _kibana_cluster_id: &str) -> Result<KibanaClusterPlan> {
        self.record("get_kibana_plan");
        Ok(self.kibana_plan.lock().unwrap().clone())
    }

    async fn update_kibana_plan(&self, kibana_cluster_id: &str, plan: &KibanaClusterPlan, _validate_only: bool) -> Result<ClusterCrudResponse> {
        self.record("update_kibana_plan");
        self.check_update()?;
        self.submitted_kibana_plans.lock().unwrap().push(plan.clone());
        Ok(ClusterCrudResponse { kibana_cluster_id: Some(kibana_cluster_id.into()), ..Default::default() })
    }

    async fn upgrade_kibana_cluster(&self, kibana_cluster_id: &str, _validate_only: bool) -> Result<ClusterUpgradeInfo> {
        self.record("upgrade_kibana_cluster");
        self.check_update()?;
        Ok(ClusterUpgradeInfo { cluster_id: Some(kibana_cluster_id.into()) })
    }
}

/// A request received by a `CannedServer`.
#[derive(Clone, Debug, Default)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Header names are lowercased.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(key, _)| key == name).map(|(_, val)| val.as_str())
    }
}

/// A local HTTP server answering each connection with the next of a fixed list of responses.
///
/// Every response closes its connection, so each client request lands on a fresh connection.
pub struct CannedServer {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl CannedServer {
    pub async fn start(responses: Vec<(u16, &str)>) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await.context("error binding canned server")?;
        let addr = listener.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();
        let responses: Vec<(u16, String)> = responses.into_iter().map(|(status, body)| (status, body.to_string())).collect();
        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                match read_request(&mut stream).await {
                    Ok(req) => recorded.lock().unwrap().push(req),
                    Err(_) => return,
                }
                let res = format!(
                    "HTTP/1.1 {} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(res.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        Ok(Self { base_url: format!("http://{}", addr), requests })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|win| win == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split(' ');
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, val)| (key.trim().to_lowercase(), val.trim().to_string()))
        .collect();

    let len = headers
        .iter()
        .find(|(key, _)| key == "content-length")
        .and_then(|(_, val)| val.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + len {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let end = buf.len().min(header_end + len);
    let body = String::from_utf8_lossy(&buf[header_end..end]).to_string();
    Ok(RecordedRequest { method, path, headers, body })
}
