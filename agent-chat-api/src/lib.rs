use openrouter_sdk::{ChatTransport, OpenRouterClient};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

pub mod chat;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod storage;

use chat::ChatService;
use storage::{AgentStore, SessionStore};

pub type DbConnection = Arc<Mutex<Connection>>;

/// Shared state behind every handler
pub struct AppState {
    pub chat: ChatService,
    pub agents: Arc<dyn AgentStore>,
    /// Used directly for the model catalogue and key lookups
    pub openrouter: Arc<OpenRouterClient>,
    pub start_time: SystemTime,
}

impl AppState {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        agents: Arc<dyn AgentStore>,
        transport: Arc<dyn ChatTransport>,
        openrouter: Arc<OpenRouterClient>,
    ) -> Self {
        Self {
            chat: ChatService::new(sessions, agents.clone(), transport),
            agents,
            openrouter,
            start_time: SystemTime::now(),
        }
    }
}
