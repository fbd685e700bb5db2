use crate::SynthesisResult;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

/// Raw outcome of one HTTP exchange, before any protocol checks.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The network seam of the synthesis client.
///
/// Implementations only move bytes: status and payload validation happen in
/// the provider, so a non-2xx response is `Ok` here.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        api_key: &SecretString,
        body: &serde_json::Value,
    ) -> SynthesisResult<TransportResponse>;
}

/// [`Transport`] backed by a shared `reqwest::Client`. The key travels as the
/// `key` query parameter.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        api_key: &SecretString,
        body: &serde_json::Value,
    ) -> SynthesisResult<TransportResponse> {
        let response = self
            .client
            .post(url)
            .query(&[("key", api_key.expose_secret())])
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}
