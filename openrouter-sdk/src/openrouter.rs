use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;

use crate::{
    client::{ChatTransport, TransportResponse},
    error::ChatError,
    models::{KeyInfo, KeyInfoEnvelope, ModelList},
    reconcile::NormalizedReply,
    types::ProviderRequest,
};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_APP_URL: &str = "http://localhost:3000";
pub const DEFAULT_APP_TITLE: &str = "Custom AI Agent";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// OpenRouter HTTP client
pub struct OpenRouterClient {
    api_key: String,
    base_url: String,
    app_url: String,
    app_title: String,
    http_client: reqwest::Client,
}

fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ChatError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(ChatError::from)
}

impl OpenRouterClient {
    /// Create a client with the given API key
    pub fn new(api_key: impl Into<String>) -> Result<Self, ChatError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ChatError::invalid_input("API key cannot be empty"));
        }

        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            app_url: DEFAULT_APP_URL.to_string(),
            app_title: DEFAULT_APP_TITLE.to_string(),
            http_client: build_http_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Values for the `HTTP-Referer` and `X-Title` attribution headers
    pub fn with_app_info(mut self, url: impl Into<String>, title: impl Into<String>) -> Self {
        self.app_url = url.into();
        self.app_title = title.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ChatError> {
        self.http_client = build_http_client(timeout)?;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> Result<HeaderMap, ChatError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|_| ChatError::invalid_input("Invalid API key format"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("http-referer"),
            HeaderValue::from_str(&self.app_url)
                .map_err(|_| ChatError::invalid_input("Invalid app URL"))?,
        );
        headers.insert(
            HeaderName::from_static("x-title"),
            HeaderValue::from_str(&self.app_title)
                .map_err(|_| ChatError::invalid_input("Invalid app title"))?,
        );
        Ok(headers)
    }

    /// Send a chat-completions request and reconcile the reply
    pub async fn chat_completion(
        &self,
        request: &ProviderRequest,
    ) -> Result<NormalizedReply, ChatError> {
        self.complete(request).await
    }

    /// List the models available to this key
    pub async fn list_models(&self) -> Result<ModelList, ChatError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .headers(self.headers()?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "model listing rejected");
            return Err(ChatError::upstream_rejected(
                "Failed to fetch available models",
                status.as_u16(),
            ));
        }

        response
            .json::<ModelList>()
            .await
            .map_err(|e| ChatError::malformed(format!("model list: {}", e)))
    }

    /// Usage and limits of the configured key
    pub async fn key_info(&self) -> Result<KeyInfo, ChatError> {
        let url = format!("{}/auth/key", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .headers(self.headers()?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "key lookup rejected");
            return Err(ChatError::upstream_rejected(
                "Failed to fetch key information",
                status.as_u16(),
            ));
        }

        let envelope: KeyInfoEnvelope = response
            .json()
            .await
            .map_err(|e| ChatError::malformed(format!("key info: {}", e)))?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl ChatTransport for OpenRouterClient {
    async fn send(&self, request: &ProviderRequest) -> Result<TransportResponse, ChatError> {
        let url = format!("{}/chat/completions", self.base_url);

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion"
        );

        let response = self
            .http_client
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat completion request failed");
                ChatError::from(e)
            })?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!(status, bytes = body.len(), "chat completion returned");
        Ok(TransportResponse { status, body })
    }

    fn provider_name(&self) -> &str {
        "openrouter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_rejected() {
        let err = OpenRouterClient::new("  ").err().unwrap();
        assert_eq!(err.to_string(), "API key cannot be empty");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OpenRouterClient::new("key")
            .unwrap()
            .with_base_url("http://localhost:9999/api/v1/");
        assert_eq!(client.base_url(), "http://localhost:9999/api/v1");
    }

    #[test]
    fn test_attribution_headers() {
        let client = OpenRouterClient::new("sk-test")
            .unwrap()
            .with_app_info("https://agents.example", "Agent Lab");
        let headers = client.headers().unwrap();
        assert_eq!(headers["authorization"], "Bearer sk-test");
        assert_eq!(headers["http-referer"], "https://agents.example");
        assert_eq!(headers["x-title"], "Agent Lab");
    }
}
