//! HTTP client for the scheduler API

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::MESH_TOKEN_HEADER;
use crate::api::models::{
    FinishJobRequest, LeaseJobsRequest, LeaseJobsResponse, OkResponse, RegisterWorkerRequest,
};
use crate::store::{JsonMap, LeasedJob};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("Server answered {status}: {code}: {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ClientError {
    /// Transport failures and 5xx answers are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::RequestFailed(_) | ClientError::Timeout => true,
            ClientError::Status { status, .. } => *status >= 500,
            ClientError::InvalidUrl(_) | ClientError::Decode(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            user_agent: concat!("mesh-worker/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Worker-side handle to one scheduler
#[derive(Debug, Clone)]
pub struct MeshClient {
    client: Client,
    base_url: String,
    token: String,
    config: ClientConfig,
}

impl MeshClient {
    pub fn new(base_url: &str, token: &str, config: ClientConfig) -> Result<Self> {
        let parsed = reqwest::Url::parse(base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            config,
        })
    }

    pub async fn register(&self, node_id: &str, capabilities: &JsonMap) -> Result<()> {
        let body = RegisterWorkerRequest {
            node_id: node_id.to_string(),
            capabilities: capabilities.clone(),
        };
        let _: OkResponse = self.post("/v1/workers/register", &body).await?;
        Ok(())
    }

    pub async fn lease(
        &self,
        node_id: &str,
        want_sites: Option<&[String]>,
        max_jobs: u32,
    ) -> Result<Vec<LeasedJob>> {
        let body = LeaseJobsRequest {
            node_id: node_id.to_string(),
            want_sites: want_sites.map(<[String]>::to_vec),
            max_jobs: i64::from(max_jobs),
        };
        let response: LeaseJobsResponse = self.post("/v1/jobs/lease", &body).await?;
        Ok(response.jobs)
    }

    pub async fn finish(&self, request: &FinishJobRequest) -> Result<()> {
        let _: OkResponse = self.post("/v1/jobs/finish", request).await?;
        Ok(())
    }

    /// POST with retry
    ///
    /// Every call here is safe to repeat: registration is an upsert, a
    /// repeated finish is a no-op and a lease lost with its response is
    /// reclaimed by the reaper.
    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.post_once(path, body).await {
                Ok(value) => {
                    if attempts > 1 {
                        debug!(path, attempts, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempts <= self.config.max_retries => {
                    warn!(path, attempts, error = %e, "Request failed, retrying");

                    // Exponential backoff: 1s, 2s, 4s
                    let backoff = Duration::from_secs(2u64.pow(attempts - 1));
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    if e.is_retryable() {
                        warn!(path, attempts, error = %e, "Request failed after retries");
                    }
                    return Err(e);
                }
            }
        }
    }

    /// POST once (no retry)
    async fn post_once<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .header(MESH_TOKEN_HEADER, &self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::Timeout
                } else {
                    ClientError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// Turn an error answer into [`ClientError::Status`], keeping the server's
/// `{code, message}` when the body has one
async fn status_error(status: StatusCode, response: reqwest::Response) -> ClientError {
    let text = response.text().await.unwrap_or_default();
    let parsed: Option<serde_json::Value> = serde_json::from_str(&text).ok();

    let field = |name: &str| {
        parsed
            .as_ref()
            .and_then(|v| v.get(name))
            .and_then(|v| v.as_str())
            .map(str::to_owned)
    };

    ClientError::Status {
        status: status.as_u16(),
        code: field("code")
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string()),
        message: field("message").unwrap_or(text),
    }
}
