//! Control-plane credentials retrieval.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::{non_empty, Config, Redacted};
use crate::error::CloudError;

/// Long-lived control-plane credentials.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Redacted,
}

/// A source of control-plane credentials.
#[async_trait::async_trait]
pub trait CredentialSource: Send + Sync {
    /// Fetch the credentials stored under the given path.
    async fn fetch(&self, path: &str) -> Result<Credentials>;
}

/// Build the credential source described by the given config.
///
/// Vault is used when `VAULT_ADDR` and `VAULT_TOKEN` are both set. When neither is set, the
/// credentials are taken directly from `ESTF_CLOUD_USERNAME` and `ESTF_CLOUD_PASSWORD`.
pub fn from_config(cfg: &Config) -> Result<Box<dyn CredentialSource>> {
    let addr = non_empty(cfg.vault_addr.as_deref());
    let token = cfg.vault_token.as_ref().and_then(|token| non_empty(Some(token.expose())));
    match (addr, token) {
        (Some(addr), Some(token)) => Ok(Box::new(VaultCredentials::new(addr, token)?)),
        (None, None) => Ok(Box::new(EnvCredentials {
            username: cfg.estf_cloud_username.clone(),
            password: cfg.estf_cloud_password.clone(),
        })),
        _ => Err(CloudError::Config("environment variables VAULT_ADDR and VAULT_TOKEN are required".into()).into()),
    }
}

/// Credentials read from a Vault KV secret.
pub struct VaultCredentials {
    http: reqwest::Client,
    addr: String,
    token: Redacted,
}

/// The envelope of a Vault read.
#[derive(Deserialize)]
struct VaultSecret {
    #[serde(default)]
    data: HashMap<String, serde_json::Value>,
}

impl VaultCredentials {
    pub fn new(addr: &str, token: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("error building Vault HTTP client")?;
        Ok(Self {
            http,
            addr: addr.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }
}

#[async_trait::async_trait]
impl CredentialSource for VaultCredentials {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn fetch(&self, path: &str) -> Result<Credentials> {
        let url = format!("{}/v1/{}", self.addr, path.trim_start_matches('/'));
        let res = self
            .http
            .get(&url)
            .header("X-Vault-Token", self.token.expose())
            .send()
            .await
            .map_err(|err| CloudError::Secrets(format!("error reaching Vault at {}: {}", self.addr, err)))?;

        let status = res.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CloudError::Secrets(format!("no secret found at {}", path)).into());
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(CloudError::Secrets(format!("Vault returned {} for {}: {}", status, path, body)).into());
        }
        let secret: VaultSecret = res.json().await.context("error decoding Vault secret")?;
        credentials_from_secret(path, &secret.data)
    }
}

/// Extract the username and password from the given secret data.
fn credentials_from_secret(path: &str, data: &HashMap<String, serde_json::Value>) -> Result<Credentials> {
    let field = |key: &str| {
        data.get(key)
            .and_then(|val| val.as_str())
            .map(String::from)
            .ok_or_else(|| CloudError::Secrets(format!("secret at {} has no {} field", path, key)))
    };
    Ok(Credentials {
        username: field("username")?,
        password: Redacted(field("password")?),
    })
}

/// Credentials supplied directly through the environment.
pub struct EnvCredentials {
    pub username: Option<String>,
    pub password: Option<Redacted>,
}

#[async_trait::async_trait]
impl CredentialSource for EnvCredentials {
    async fn fetch(&self, _path: &str) -> Result<Credentials> {
        let username = non_empty(self.username.as_deref());
        let password = self.password.as_ref().and_then(|pw| non_empty(Some(pw.expose())));
        match (username, password) {
            (Some(username), Some(password)) => Ok(Credentials { username: username.into(), password: password.into() }),
            _ => Err(CloudError::Config("control-plane credentials are required, set VAULT_ADDR and VAULT_TOKEN or ESTF_CLOUD_USERNAME and ESTF_CLOUD_PASSWORD".into()).into()),
        }
    }
}
