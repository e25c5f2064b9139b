//! Controller transport
//!
//! The reconciler only needs one capability from the network: send a payload,
//! get a response or an error back. [`HttpTransport`] implements it with a
//! `POST <url>/v1/collectors/<name>/heartbeat` carrying the collector token in
//! the `Authorization` header. Retries are left to the next heartbeat.

use crate::config::ControllerTarget;
use crate::error::TransportError;
use crate::heartbeat::{HeartbeatPayload, HeartbeatResponse};
use reqwest::header::AUTHORIZATION;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub trait Transport {
    fn send(
        &self,
        target: &ControllerTarget,
        payload: &HeartbeatPayload,
    ) -> impl Future<Output = Result<HeartbeatResponse, TransportError>> + Send;
}

/// HTTP/JSON transport
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("refocus-collector/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn send(
        &self,
        target: &ControllerTarget,
        payload: &HeartbeatPayload,
    ) -> Result<HeartbeatResponse, TransportError> {
        let url = target.heartbeat_url();
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, target.token.as_str())
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(HeartbeatResponse::default());
        }

        serde_json::from_slice(&body).map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}
