#![allow(dead_code)]

use actix_web::{test, web, App};
use agent_chat_api::storage::{
    initialize_in_memory, AgentStore, InMemoryAgentStore, InMemorySessionStore, SessionStore,
    SqliteAgentStore, SqliteSessionStore,
};
use agent_chat_api::{handlers, AppState};
use openrouter_sdk::types::ProviderRequest;
use openrouter_sdk::{ChatError, ChatTransport, OpenRouterClient, TransportResponse};
use shared_types::{Agent, AgentConfig};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Base URL nothing listens on; catalogue routes fail fast against it
pub const UNREACHABLE_BASE_URL: &str = "http://127.0.0.1:1";

pub struct TestApp<S> {
    pub sessions: Arc<dyn SessionStore>,
    pub agents: Arc<dyn AgentStore>,
    pub transport: Arc<MockTransport>,
    pub app: S,
}

/// Scripted transport that records every request it receives
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<TransportResponse, ChatError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_response(&self, status: u16, body: serde_json::Value) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(TransportResponse::new(status, body.to_string())));
    }

    pub fn push_reply(&self, content: &str) {
        self.push_response(200, completion_body(content));
    }

    pub fn push_error(&self, error: ChatError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ChatTransport for MockTransport {
    async fn send(&self, request: &ProviderRequest) -> Result<TransportResponse, ChatError> {
        self.requests.lock().unwrap().push(request.clone());

        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Ok(TransportResponse::new(
                200,
                completion_body("Hi there").to_string(),
            ))
        })
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

pub fn completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "gen-test",
        "model": "openai/gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
    })
}

pub fn agent_config() -> AgentConfig {
    AgentConfig {
        name: "Joke Bot".to_string(),
        description: "Tells jokes".to_string(),
        model: "openai/gpt-4o-mini".to_string(),
        system_prompt: "You are a witty assistant who tells short jokes.".to_string(),
        temperature: 0.5,
        max_tokens: 300,
    }
}

pub async fn create_agent<S>(test_app: &TestApp<S>) -> Agent {
    test_app
        .agents
        .create(Agent::new(agent_config()))
        .await
        .unwrap()
}

pub enum Backend {
    Memory,
    Sqlite,
}

fn stores(backend: Backend) -> anyhow::Result<(Arc<dyn SessionStore>, Arc<dyn AgentStore>)> {
    Ok(match backend {
        Backend::Memory => (
            Arc::new(InMemorySessionStore::new()),
            Arc::new(InMemoryAgentStore::new()),
        ),
        Backend::Sqlite => {
            let conn = initialize_in_memory()?;
            (
                Arc::new(SqliteSessionStore::new(conn.clone())),
                Arc::new(SqliteAgentStore::new(conn)),
            )
        }
    })
}

pub async fn setup_test_app() -> anyhow::Result<
    TestApp<
        impl actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
    >,
> {
    setup_test_app_with(Backend::Memory, UNREACHABLE_BASE_URL).await
}

pub async fn setup_test_app_with(
    backend: Backend,
    openrouter_base_url: &str,
) -> anyhow::Result<
    TestApp<
        impl actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
    >,
> {
    let (sessions, agents) = stores(backend)?;
    let transport = Arc::new(MockTransport::new());
    let openrouter = Arc::new(
        OpenRouterClient::new("test-key")?.with_base_url(openrouter_base_url),
    );

    let state = web::Data::new(AppState::new(
        sessions.clone(),
        agents.clone(),
        transport.clone(),
        openrouter,
    ));

    let app = test::init_service(
        App::new()
            .app_data(state)
            .configure(handlers::configure),
    )
    .await;

    Ok(TestApp {
        sessions,
        agents,
        transport,
        app,
    })
}
