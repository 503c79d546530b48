//! Control-plane client.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::{self, BearerToken};
use crate::credentials::Credentials;
use crate::error::CloudError;
use crate::models::{
    ClusterCrudResponse, ClusterUpgradeInfo, CreateClusterRequest, ElasticsearchClusterInfo, ElasticsearchClusterPlan, KibanaClusterInfo, KibanaClusterPlan,
};
use crate::region::resolve_region_path;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// The control-plane operations used by the cluster lifecycle.
///
/// Any non-2xx response is returned as `CloudError::ControlPlane`. Calls are never retried here.
#[async_trait::async_trait]
pub trait ControlPlane: Send + Sync {
    /// Create an Elasticsearch cluster and its Kibana cluster.
    async fn create_cluster(&self, req: &CreateClusterRequest) -> Result<ClusterCrudResponse>;
    /// Fetch info on an Elasticsearch cluster.
    async fn get_es_cluster(&self, cluster_id: &str) -> Result<ElasticsearchClusterInfo>;
    /// Fetch the current plan of an Elasticsearch cluster.
    async fn get_es_plan(&self, cluster_id: &str) -> Result<ElasticsearchClusterPlan>;
    /// Submit a new plan for an Elasticsearch cluster.
    async fn update_es_plan(&self, cluster_id: &str, plan: &ElasticsearchClusterPlan, validate_only: bool) -> Result<ClusterCrudResponse>;
    /// Delete an Elasticsearch cluster, along with its Kibana cluster.
    async fn delete_es_cluster(&self, cluster_id: &str) -> Result<()>;
    /// Fetch info on a Kibana cluster.
    async fn get_kibana_cluster(&self, kibana_cluster_id: &str) -> Result<KibanaClusterInfo>;
    /// Fetch the current plan of a Kibana cluster.
    async fn get_kibana_plan(&self, kibana_cluster_id: &str) -> Result<KibanaClusterPlan>;
    /// Submit a new plan for a Kibana cluster.
    async fn update_kibana_plan(&self, kibana_cluster_id: &str, plan: &KibanaClusterPlan, validate_only: bool) -> Result<ClusterCrudResponse>;
    /// Upgrade a Kibana cluster to the version of its Elasticsearch cluster.
    async fn upgrade_kibana_cluster(&self, kibana_cluster_id: &str, validate_only: bool) -> Result<ClusterUpgradeInfo>;
}

/// An authenticated, region-scoped REST client of the control plane.
#[derive(Clone, Debug)]
pub struct CloudClient {
    http: reqwest::Client,
    /// The region-scoped base URL of every resource call.
    base_url: String,
}

impl CloudClient {
    /// Authenticate against the control plane at `host` and build a client scoped to `region`.
    pub async fn connect(host: &str, region: Option<&str>, creds: &Credentials) -> Result<Self> {
        let api_url = auth::api_base_url(host)?;
        tracing::info!(api_url = %api_url, "setting up control-plane client");
        let login_http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("error building control-plane HTTP client")?;
        let token = auth::authenticate(&login_http, &api_url, creds).await?;
        let client = Self::with_token(&format!("{}{}", api_url, resolve_region_path(region)), &token)?;
        tracing::info!(base_url = %client.base_url, "control-plane client ready");
        Ok(client)
    }

    /// Build a client which authenticates every call with the given token.
    pub fn with_token(base_url: &str, token: &BearerToken) -> Result<Self> {
        let mut auth_header = HeaderValue::from_str(&token.header_value()).context("bearer token is not a valid header value")?;
        auth_header.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth_header);
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .default_headers(headers)
            .build()
            .context("error building control-plane HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The region-scoped base URL of this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn send(&self, req: RequestBuilder) -> Result<reqwest::Response> {
        let res = req.send().await.context("error sending control-plane request")?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), body = %body, "control-plane call failed");
            return Err(CloudError::ControlPlane { status: status.as_u16(), body }.into());
        }
        Ok(res)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let res = self.send(self.request(Method::GET, path)).await?;
        res.json().await.with_context(|| format!("error decoding control-plane response of GET {}", path))
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: Option<&B>) -> Result<T> {
        let mut req = self.request(Method::POST, path);
        if let Some(body) = body {
            req = req.json(body);
        }
        let res = self.send(req).await?;
        res.json().await.with_context(|| format!("error decoding control-plane response of POST {}", path))
    }
}

#[async_trait::async_trait]
impl ControlPlane for CloudClient {
    #[tracing::instrument(level = "debug", skip(self, req), fields(cluster_name = %req.cluster_name))]
    async fn create_cluster(&self, req: &CreateClusterRequest) -> Result<ClusterCrudResponse> {
        self.post("/clusters/elasticsearch", Some(req)).await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_es_cluster(&self, cluster_id: &str) -> Result<ElasticsearchClusterInfo> {
        self.get(&format!("/clusters/elasticsearch/{}", cluster_id)).await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_es_plan(&self, cluster_id: &str) -> Result<ElasticsearchClusterPlan> {
        self.get(&format!("/clusters/elasticsearch/{}/plan", cluster_id)).await
    }

    #[tracing::instrument(level = "debug", skip(self, plan))]
    async fn update_es_plan(&self, cluster_id: &str, plan: &ElasticsearchClusterPlan, validate_only: bool) -> Result<ClusterCrudResponse> {
        self.post(&format!("/clusters/elasticsearch/{}/plan?validate_only={}", cluster_id, validate_only), Some(plan))
            .await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn delete_es_cluster(&self, cluster_id: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, &format!("/clusters/elasticsearch/{}", cluster_id)))
            .await?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_kibana_cluster(&self, kibana_cluster_id: &str) -> Result<KibanaClusterInfo> {
        self.get(&format!("/clusters/kibana/{}", kibana_cluster_id)).await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_kibana_plan(&self, kibana_cluster_id: &str) -> Result<KibanaClusterPlan> {
        self.get(&format!("/clusters/kibana/{}/plan", kibana_cluster_id)).await
    }

    #[tracing::instrument(level = "debug", skip(self, plan))]
    async fn update_kibana_plan(&self, kibana_cluster_id: &str, plan: &KibanaClusterPlan, validate_only: bool) -> Result<ClusterCrudResponse> {
        self.post(&format!("/clusters/kibana/{}/plan?validate_only={}", kibana_cluster_id, validate_only), Some(plan))
            .await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn upgrade_kibana_cluster(&self, kibana_cluster_id: &str, validate_only: bool) -> Result<ClusterUpgradeInfo> {
        self.post::<(), _>(&format!("/clusters/kibana/{}/_upgrade?validate_only={}", kibana_cluster_id, validate_only), None)
            .await
    }
}
