use async_trait::async_trait;

use crate::{
    error::ChatError,
    reconcile::{parse_response, NormalizedReply},
    types::ProviderRequest,
};

/// Raw HTTP exchange result, before interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Something that can carry a chat-completions request upstream
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Perform the call; only network-level failures are errors here
    async fn send(&self, request: &ProviderRequest) -> Result<TransportResponse, ChatError>;

    /// Perform the call and reconcile the response
    async fn complete(&self, request: &ProviderRequest) -> Result<NormalizedReply, ChatError> {
        let response = self.send(request).await?;
        parse_response(response.status, &response.body)
    }

    /// Provider name for logging, e.g. "openrouter"
    fn provider_name(&self) -> &str;
}
