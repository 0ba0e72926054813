use thiserror::Error;

/// Fallback message when the provider rejects a request without explaining why
pub const GENERIC_UPSTREAM_MESSAGE: &str = "Failed to get response from OpenRouter";

/// Error taxonomy for a chat turn
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    /// Caller supplied unusable input (HTTP 400)
    #[error("{message}")]
    InvalidInput { message: String },

    /// Provider returned a non-2xx status or an error envelope
    #[error("{message}")]
    UpstreamRejected { message: String, status: u16 },

    /// Provider returned a shape that cannot be interpreted
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    /// Network-level failure talking to the provider
    #[error("Transport failure: {message}")]
    TransportFailure { message: String },

    /// Unknown agent or session (HTTP 404)
    #[error("{message}")]
    NotFound { message: String },

    /// Local failure such as a storage error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Discriminant of [`ChatError`], handy for matching in callers and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    InvalidInput,
    UpstreamRejected,
    MalformedResponse,
    TransportFailure,
    NotFound,
    Internal,
}

impl ChatError {
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn upstream_rejected<S: Into<String>>(message: S, status: u16) -> Self {
        Self::UpstreamRejected {
            message: message.into(),
            status,
        }
    }

    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::TransportFailure {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ChatErrorKind {
        match self {
            ChatError::InvalidInput { .. } => ChatErrorKind::InvalidInput,
            ChatError::UpstreamRejected { .. } => ChatErrorKind::UpstreamRejected,
            ChatError::MalformedResponse { .. } => ChatErrorKind::MalformedResponse,
            ChatError::TransportFailure { .. } => ChatErrorKind::TransportFailure,
            ChatError::NotFound { .. } => ChatErrorKind::NotFound,
            ChatError::Internal { .. } => ChatErrorKind::Internal,
        }
    }

    /// HTTP status a server should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            ChatError::InvalidInput { .. } => 400,
            ChatError::UpstreamRejected { status, .. } => *status,
            ChatError::MalformedResponse { .. } => 500,
            ChatError::TransportFailure { .. } => 502,
            ChatError::NotFound { .. } => 404,
            ChatError::Internal { .. } => 500,
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::transport(err.to_string())
    }
}
