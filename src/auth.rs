//! Control-plane authentication.

use std::fmt;

use anyhow::{Context, Result};
use url::Url;

use crate::credentials::Credentials;
use crate::error::CloudError;
use crate::models::{LoginRequest, LoginResponse};

/// The path prefix of the control-plane API.
pub const API_VERSION_PATH: &str = "/api/v0.1";
const LOGIN_PATH: &str = "/saas/auth/_login";

/// A short-lived bearer token issued by the control plane.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The value of the `Authorization` header carrying this token.
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Resolve the host component of the given host config value.
///
/// The value may be a bare hostname or a full URL, in which case only its host is used.
pub fn resolve_host(host: &str) -> Result<String> {
    let host = host.trim();
    if !host.contains("http") {
        return Ok(host.trim_end_matches('/').to_string());
    }
    let url = Url::parse(host).map_err(|err| CloudError::Config(format!("malformed control-plane URL {:?}: {}", host, err)))?;
    url.host_str()
        .map(String::from)
        .ok_or_else(|| CloudError::Config(format!("control-plane URL {:?} has no host", host)).into())
}

/// Build the base URL of the control-plane API from the given host config value.
pub fn api_base_url(host: &str) -> Result<String> {
    Ok(format!("https://{}{}", resolve_host(host)?, API_VERSION_PATH))
}

/// Exchange the given credentials for a bearer token.
#[tracing::instrument(level = "debug", skip(http, creds))]
pub async fn authenticate(http: &reqwest::Client, base_url: &str, creds: &Credentials) -> Result<BearerToken> {
    let url = format!("{}{}", base_url, LOGIN_PATH);
    let res = http
        .post(&url)
        .json(&LoginRequest { username: &creds.username, password: creds.password.expose() })
        .send()
        .await
        .map_err(|err| CloudError::Auth(format!("error reaching control plane at {}: {}", base_url, err)))?;

    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(CloudError::Auth(format!("login rejected with {}: {}", status, body)).into());
    }
    let login: LoginResponse = res.json().await.context("error decoding control-plane login response")?;
    match login.token {
        Some(token) if !token.is_empty() => {
            tracing::debug!("authenticated against control plane");
            Ok(BearerToken::new(token))
        }
        _ => Err(CloudError::Auth("login response carried no token".into()).into()),
    }
}
