//! HTTP client for the external text→vector embedding provider.
//!
//! The core (`vdb-service`) never calls this: it only ever receives
//! `Vec<f32>` embeddings handed to it by the HTTP layer. This client is the
//! thing that produces them for the `/v1/embed` route, and for callers that
//! want to embed-then-insert in one request.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("embedding provider returned an error: {0}")]
    Provider(String),

    #[error("embedding provider returned {got} embeddings for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
}

#[derive(Serialize)]
struct EmbedRequestBody<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponseBody {
    embeddings: Vec<Vec<f32>>,
}

/// A thin wrapper around `reqwest::Client` that posts batches of text to a
/// configured embedding endpoint and returns one vector per input, in order.
///
/// Failures are never retried here — the HTTP layer maps them straight to a
/// 502, matching the "no internal retry" rule the core itself follows.
pub struct EmbeddingClient {
    http: Client,
    config: EmbeddingConfig,
}

impl EmbeddingClient {
    pub fn new(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let mut builder = Client::builder().timeout(Duration::from_secs(30));
        if let Some(api_key) = &config.api_key {
            let mut headers = reqwest::header::HeaderMap::new();
            let auth = format!("Bearer {api_key}")
                .parse()
                .map_err(|_| EmbeddingError::Provider("invalid api key".to_string()))?;
            headers.insert(reqwest::header::AUTHORIZATION, auth);
            builder = builder.default_headers(headers);
        }
        let http = builder.build()?;
        Ok(Self { http, config })
    }

    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbedRequestBody { model: &self.config.model, input: texts };
        let response = self.http.post(&self.config.endpoint).json(&body).send().await?;

        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Provider(detail));
        }

        let parsed: EmbedResponseBody = response.json().await?;
        if parsed.embeddings.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch { expected: texts.len(), got: parsed.embeddings.len() });
        }
        Ok(parsed.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_construction_with_api_key_succeeds() {
        let cfg = EmbeddingConfig { api_key: Some("secret".to_string()), ..EmbeddingConfig::default() };
        assert!(EmbeddingClient::new(cfg).is_ok());
    }

    #[tokio::test]
    async fn embedding_an_empty_batch_short_circuits() {
        let client = EmbeddingClient::new(EmbeddingConfig::default()).unwrap();
        let out = client.embed_batch(&[]).await.unwrap();
        assert!(out.is_empty());
    }
}
