use async_trait::async_trait;
use openrouter_sdk::ChatError;
use shared_types::{Agent, ChatSession, Message};

mod memory;
pub mod migrations;
mod sqlite;

pub use memory::{InMemoryAgentStore, InMemorySessionStore};
pub use sqlite::{initialize_database, initialize_in_memory, SqliteAgentStore, SqliteSessionStore};

/// Per-agent chat session persistence
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The agent's session with its messages in conversation order
    async fn load(&self, agent_id: &str) -> Result<Option<ChatSession>, StorageError>;
    async fn create(&self, agent_id: &str) -> Result<ChatSession, StorageError>;
    /// Append to the end of the session and advance its `updated` time
    async fn append(&self, session_id: &str, message: &Message) -> Result<(), StorageError>;
    /// Returns whether the message existed
    async fn remove(&self, session_id: &str, message_id: &str) -> Result<bool, StorageError>;
    /// Drop the agent's session and all of its messages
    async fn clear(&self, agent_id: &str) -> Result<(), StorageError>;
}

#[async_trait]
pub trait AgentStore: Send + Sync {
    /// All agents, oldest first
    async fn list(&self) -> Result<Vec<Agent>, StorageError>;
    async fn get(&self, id: &str) -> Result<Option<Agent>, StorageError>;
    async fn create(&self, agent: Agent) -> Result<Agent, StorageError>;
    async fn update(&self, agent: Agent) -> Result<Agent, StorageError>;
    async fn delete(&self, id: &str) -> Result<bool, StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage operation failed: {0}")]
    OperationFailed(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::OperationFailed(err.to_string())
    }
}

impl From<StorageError> for ChatError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(message) => ChatError::not_found(message),
            other => ChatError::internal(other.to_string()),
        }
    }
}
