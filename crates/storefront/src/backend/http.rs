//! JSON-over-HTTP transport.
//!
//! Every call is `POST {BACKEND_URL}/rpc/{method}` with body
//! `{"args": [...]}`. Authenticated callers send their delegation as a bearer
//! token. The backend answers `{"ok": <value>}` or `{"err": "<message>"}`.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument};

use super::{BackendError, Caller, Transport};
use crate::config::BackendConfig;

const BODY_LOG_LIMIT: usize = 500;

#[derive(Serialize)]
struct RpcRequest {
    args: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum RpcReply {
    Ok(Value),
    Err(String),
}

/// Transport speaking the backend's HTTP RPC gateway.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Create a transport for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("atelier-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.url.clone(),
        })
    }

    fn truncated(body: &str) -> String {
        body.chars().take(BODY_LOG_LIMIT).collect()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, caller, args), fields(caller = %caller.principal()))]
    async fn call(
        &self,
        caller: &Caller,
        method: &'static str,
        args: Vec<Value>,
    ) -> Result<Value, BackendError> {
        let mut request = self
            .client
            .post(format!("{}/rpc/{method}", self.endpoint))
            .json(&RpcRequest { args });

        if let Some(identity) = caller.identity() {
            request = request.bearer_auth(identity.delegation().expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(
                status = %status,
                body = %Self::truncated(&body),
                "Backend returned non-success status"
            );
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let reply: RpcReply = serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %Self::truncated(&body),
                "Failed to parse backend reply"
            );
            BackendError::Json(e)
        })?;

        match reply {
            RpcReply::Ok(value) => Ok(value),
            RpcReply::Err(message) => {
                debug!(message = %message, "Backend rejected call");
                Err(BackendError::Rejected { method, message })
            }
        }
    }

    #[instrument(skip(self))]
    async fn probe(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(format!("{}/status", self.endpoint))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(BackendError::Status {
                status: status.as_u16(),
                body: String::new(),
            })
        }
    }
}
