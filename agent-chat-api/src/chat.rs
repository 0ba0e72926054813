//! Chat turns: optimistic append of the user message, provider call, then
//! settle or roll back.

use crate::storage::{AgentStore, SessionStore};
use openrouter_sdk::{build_request, ChatError, ChatParams, ChatTransport};
use shared_types::{validate_message, ChatResponse, Message};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};

/// Progress of a single chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    UserAppended,
    AwaitingProvider,
    Settled,
    RolledBack,
}

impl TurnState {
    pub fn can_advance_to(self, next: TurnState) -> bool {
        matches!(
            (self, next),
            (TurnState::Idle, TurnState::UserAppended)
                | (TurnState::UserAppended, TurnState::AwaitingProvider)
                | (TurnState::AwaitingProvider, TurnState::Settled)
                | (TurnState::AwaitingProvider, TurnState::RolledBack)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TurnState::Settled | TurnState::RolledBack)
    }
}

struct Turn<'a> {
    agent_id: &'a str,
    state: TurnState,
}

impl<'a> Turn<'a> {
    fn new(agent_id: &'a str) -> Self {
        Self {
            agent_id,
            state: TurnState::Idle,
        }
    }

    fn advance(&mut self, next: TurnState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal turn transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(agent_id = %self.agent_id, from = ?self.state, to = ?next, "turn transition");
        self.state = next;
    }
}

/// Undoes the optimistic user append unless the turn settles.
///
/// Holds the agent's turn lock. If the turn future is dropped while armed
/// (client disconnect, caller timeout), the rollback finishes on a spawned
/// task that keeps the lock until the store is restored.
struct PendingRollback {
    sessions: Arc<dyn SessionStore>,
    agent_id: String,
    session_id: String,
    message_id: String,
    // Session did not exist before this turn; rollback removes it entirely.
    created_session: bool,
    lock: Option<OwnedMutexGuard<()>>,
    armed: bool,
}

impl PendingRollback {
    async fn run(mut self) {
        undo_turn(
            self.sessions.as_ref(),
            &self.agent_id,
            &self.session_id,
            &self.message_id,
            self.created_session,
        )
        .await;
        self.armed = false;
    }

    fn settle(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingRollback {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let sessions = self.sessions.clone();
        let agent_id = std::mem::take(&mut self.agent_id);
        let session_id = std::mem::take(&mut self.session_id);
        let message_id = std::mem::take(&mut self.message_id);
        let created_session = self.created_session;
        let lock = self.lock.take();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(agent_id = %agent_id, message_id = %message_id, "Chat turn cancelled, rolling back");
                handle.spawn(async move {
                    undo_turn(
                        sessions.as_ref(),
                        &agent_id,
                        &session_id,
                        &message_id,
                        created_session,
                    )
                    .await;
                    drop(lock);
                });
            }
            Err(_) => error!(
                agent_id = %agent_id,
                message_id = %message_id,
                "Chat turn dropped outside a runtime; user message left in place"
            ),
        }
    }
}

// Rollback failures are logged and never replace the error being surfaced.
async fn undo_turn(
    sessions: &dyn SessionStore,
    agent_id: &str,
    session_id: &str,
    message_id: &str,
    created_session: bool,
) {
    if created_session {
        match sessions.clear(agent_id).await {
            Ok(()) => debug!(agent_id = %agent_id, session_id = %session_id, "Removed session created by failed turn"),
            Err(e) => error!(
                agent_id = %agent_id,
                session_id = %session_id,
                error = %e,
                "Rollback failed"
            ),
        }
        return;
    }

    match sessions.remove(session_id, message_id).await {
        Ok(true) => debug!(session_id = %session_id, message_id = %message_id, "Rolled back user message"),
        Ok(false) => warn!(session_id = %session_id, message_id = %message_id, "User message already gone during rollback"),
        Err(e) => error!(
            session_id = %session_id,
            message_id = %message_id,
            error = %e,
            "Rollback failed"
        ),
    }
}

type TurnLock = Arc<tokio::sync::Mutex<()>>;

/// Runs chat turns against the stores and the provider transport
pub struct ChatService {
    sessions: Arc<dyn SessionStore>,
    agents: Arc<dyn AgentStore>,
    transport: Arc<dyn ChatTransport>,
    turn_locks: Mutex<HashMap<String, TurnLock>>,
}

impl ChatService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        agents: Arc<dyn AgentStore>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            sessions,
            agents,
            transport,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    fn turn_lock(&self, agent_id: &str) -> Result<TurnLock, ChatError> {
        let mut locks = self
            .turn_locks
            .lock()
            .map_err(|e| ChatError::internal(format!("Lock error: {}", e)))?;
        Ok(locks
            .entry(agent_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone())
    }

    // Drops the map entry once nothing else holds or waits on it.
    fn release_turn_lock(&self, agent_id: &str, lock: TurnLock) {
        drop(lock);
        match self.turn_locks.lock() {
            Ok(mut locks) => {
                if locks
                    .get(agent_id)
                    .is_some_and(|entry| Arc::strong_count(entry) == 1)
                {
                    locks.remove(agent_id);
                }
            }
            Err(e) => warn!(agent_id = %agent_id, error = %e, "Could not prune turn lock"),
        }
    }

    /// Send a user message using the agent's own generation settings
    pub async fn send_message(
        &self,
        agent_id: &str,
        text: &str,
    ) -> Result<ChatResponse, ChatError> {
        self.send_message_with(agent_id, text, None).await
    }

    /// Send a user message; `extra` overrides the agent's generation settings
    pub async fn send_message_with(
        &self,
        agent_id: &str,
        text: &str,
        extra: Option<ChatParams>,
    ) -> Result<ChatResponse, ChatError> {
        let errors = validate_message(text);
        if !errors.is_empty() {
            return Err(ChatError::invalid_input(errors.join(", ")));
        }

        let agent = self
            .agents
            .get(agent_id)
            .await?
            .ok_or_else(|| ChatError::not_found("Agent not found"))?;

        let guard = self.turn_lock(agent_id)?.lock_owned().await;

        let mut turn = Turn::new(agent_id);
        let (mut session, created_session) = match self.sessions.load(agent_id).await? {
            Some(session) => (session, false),
            None => {
                info!(agent_id = %agent_id, "Starting new chat session");
                (self.sessions.create(agent_id).await?, true)
            }
        };

        let user_message = Message::user(text);
        self.sessions.append(&session.id, &user_message).await?;
        let pending = PendingRollback {
            sessions: self.sessions.clone(),
            agent_id: agent_id.to_string(),
            session_id: session.id.clone(),
            message_id: user_message.id().to_string(),
            created_session,
            lock: Some(guard),
            armed: true,
        };
        session.push(user_message);
        turn.advance(TurnState::UserAppended);

        let params = match extra {
            Some(extra) => ChatParams::from_agent(&agent.config).overlay(extra),
            None => ChatParams::from_agent(&agent.config),
        };
        let request = build_request(&session, &agent.config, Some(&params));
        turn.advance(TurnState::AwaitingProvider);

        info!(
            agent_id = %agent_id,
            model = %request.model,
            provider = self.transport.provider_name(),
            history = session.messages.len(),
            "Sending chat turn"
        );

        let reply = match self.transport.complete(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(agent_id = %agent_id, error = %e, "Provider call failed, rolling back");
                pending.run().await;
                turn.advance(TurnState::RolledBack);
                return Err(e);
            }
        };

        let mut assistant_message = Message::assistant(reply.content);
        if let Some(tool_calls) = reply.tool_calls.filter(|calls| !calls.is_empty()) {
            assistant_message = assistant_message.with_tool_calls(tool_calls);
        }

        if let Err(e) = self.sessions.append(&session.id, &assistant_message).await {
            error!(agent_id = %agent_id, error = %e, "Failed to store assistant reply, rolling back");
            pending.run().await;
            turn.advance(TurnState::RolledBack);
            return Err(ChatError::internal(format!(
                "Failed to store assistant reply: {}",
                e
            )));
        }
        pending.settle();
        turn.advance(TurnState::Settled);

        info!(
            agent_id = %agent_id,
            total_tokens = reply.usage.as_ref().map(|u| u.total_tokens),
            "Chat turn settled"
        );

        Ok(ChatResponse {
            message: assistant_message,
            usage: reply.usage,
        })
    }

    /// Messages of the agent's session, oldest first
    pub async fn history(&self, agent_id: &str) -> Result<Vec<Message>, ChatError> {
        Ok(self
            .sessions
            .load(agent_id)
            .await?
            .map(|session| session.messages)
            .unwrap_or_default())
    }

    pub async fn clear(&self, agent_id: &str) -> Result<(), ChatError> {
        let lock = self.turn_lock(agent_id)?;
        let result = {
            let _guard = lock.lock().await;
            self.sessions.clear(agent_id).await
        };
        self.release_turn_lock(agent_id, lock);

        result?;
        info!(agent_id = %agent_id, "Cleared chat history");
        Ok(())
    }

    #[cfg(test)]
    fn tracked_turn_locks(&self) -> usize {
        self.turn_locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryAgentStore, InMemorySessionStore, StorageError};
    use async_trait::async_trait;
    use openrouter_sdk::{ChatErrorKind, TransportResponse};
    use openrouter_sdk::types::ProviderRequest;
    use shared_types::{Agent, AgentConfig, ChatSession, Role};
    use std::time::Duration;

    struct StaticTransport {
        status: u16,
        body: String,
    }

    #[async_trait]
    impl ChatTransport for StaticTransport {
        async fn send(&self, _request: &ProviderRequest) -> Result<TransportResponse, ChatError> {
            Ok(TransportResponse::new(self.status, self.body.clone()))
        }

        fn provider_name(&self) -> &str {
            "static"
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl ChatTransport for FailingTransport {
        async fn send(&self, _request: &ProviderRequest) -> Result<TransportResponse, ChatError> {
            Err(ChatError::transport("connection reset"))
        }

        fn provider_name(&self) -> &str {
            "failing"
        }
    }

    struct SlowTransport;

    #[async_trait]
    impl ChatTransport for SlowTransport {
        async fn send(&self, _request: &ProviderRequest) -> Result<TransportResponse, ChatError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Err(ChatError::transport("too slow"))
        }

        fn provider_name(&self) -> &str {
            "slow"
        }
    }

    /// Session store whose second append fails
    struct FlakyStore {
        inner: InMemorySessionStore,
        appends: Mutex<usize>,
    }

    #[async_trait]
    impl SessionStore for FlakyStore {
        async fn load(&self, agent_id: &str) -> Result<Option<ChatSession>, StorageError> {
            self.inner.load(agent_id).await
        }

        async fn create(&self, agent_id: &str) -> Result<ChatSession, StorageError> {
            self.inner.create(agent_id).await
        }

        async fn append(&self, session_id: &str, message: &Message) -> Result<(), StorageError> {
            let attempt = {
                let mut appends = self.appends.lock().unwrap();
                *appends += 1;
                *appends
            };
            if attempt == 2 {
                return Err(StorageError::OperationFailed("disk full".to_string()));
            }
            self.inner.append(session_id, message).await
        }

        async fn remove(&self, session_id: &str, message_id: &str) -> Result<bool, StorageError> {
            self.inner.remove(session_id, message_id).await
        }

        async fn clear(&self, agent_id: &str) -> Result<(), StorageError> {
            self.inner.clear(agent_id).await
        }
    }

    async fn agent_store() -> (Arc<InMemoryAgentStore>, String) {
        let store = Arc::new(InMemoryAgentStore::new());
        let agent = Agent::new(AgentConfig {
            name: "Helper".to_string(),
            description: String::new(),
            model: "openai/gpt-4o-mini".to_string(),
            system_prompt: "You are a helpful assistant.".to_string(),
            temperature: 0.7,
            max_tokens: 256,
        });
        let id = agent.id.clone();
        store.create(agent).await.unwrap();
        (store, id)
    }

    fn hi_there() -> Arc<dyn ChatTransport> {
        Arc::new(StaticTransport {
            status: 200,
            body: serde_json::json!({
                "choices": [{"message": {"content": "Hi there"}}],
                "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
            })
            .to_string(),
        })
    }

    #[test]
    fn test_turn_transitions() {
        assert!(TurnState::Idle.can_advance_to(TurnState::UserAppended));
        assert!(TurnState::AwaitingProvider.can_advance_to(TurnState::RolledBack));
        assert!(!TurnState::Idle.can_advance_to(TurnState::Settled));
        assert!(!TurnState::Settled.can_advance_to(TurnState::RolledBack));
        assert!(TurnState::RolledBack.is_terminal());
        assert!(!TurnState::AwaitingProvider.is_terminal());
    }

    #[tokio::test]
    async fn test_settled_turn_appends_user_then_assistant() {
        let (agents, agent_id) = agent_store().await;
        let sessions = Arc::new(InMemorySessionStore::new());
        let service = ChatService::new(sessions.clone(), agents, hi_there());

        let response = service.send_message(&agent_id, "Hello").await.unwrap();
        assert_eq!(response.message.content, "Hi there");
        assert_eq!(response.message.role(), Role::Assistant);
        assert_eq!(response.usage.unwrap().total_tokens, 13);

        let history = service.history(&agent_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role(), Role::User);
        assert_eq!(history[0].content, "Hello");
        assert_eq!(history[1].id(), response.message.id());
    }

    #[tokio::test]
    async fn test_provider_error_rolls_back() {
        let (agents, agent_id) = agent_store().await;
        let sessions = Arc::new(InMemorySessionStore::new());
        let service = ChatService::new(sessions.clone(), agents, hi_there());
        service.send_message(&agent_id, "Hello").await.unwrap();

        let failing = ChatService::new(
            sessions.clone(),
            service.agents.clone(),
            Arc::new(FailingTransport),
        );
        let err = failing
            .send_message(&agent_id, "Tell me a joke")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ChatErrorKind::TransportFailure);

        let history = failing.history(&agent_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|m| m.content != "Tell me a joke"));
    }

    #[tokio::test]
    async fn test_blank_message_rejected_before_any_change() {
        let (agents, agent_id) = agent_store().await;
        let sessions = Arc::new(InMemorySessionStore::new());
        let service = ChatService::new(sessions.clone(), agents, hi_there());

        let err = service.send_message(&agent_id, "   ").await.unwrap_err();
        assert_eq!(err.kind(), ChatErrorKind::InvalidInput);
        assert!(sessions.load(&agent_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_agent_is_not_found() {
        let (agents, _) = agent_store().await;
        let service = ChatService::new(Arc::new(InMemorySessionStore::new()), agents, hi_there());
        let err = service.send_message("missing", "Hello").await.unwrap_err();
        assert_eq!(err.kind(), ChatErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_failed_assistant_append_rolls_back_as_internal() {
        let (agents, agent_id) = agent_store().await;
        let store = Arc::new(FlakyStore {
            inner: InMemorySessionStore::new(),
            appends: Mutex::new(0),
        });
        let service = ChatService::new(store.clone(), agents, hi_there());

        let err = service.send_message(&agent_id, "Hello").await.unwrap_err();
        assert_eq!(err.kind(), ChatErrorKind::Internal);
        assert!(service.history(&agent_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_turns_do_not_interleave() {
        let (agents, agent_id) = agent_store().await;
        let service = Arc::new(ChatService::new(
            Arc::new(InMemorySessionStore::new()),
            agents,
            hi_there(),
        ));

        let a = {
            let service = service.clone();
            let agent_id = agent_id.clone();
            tokio::spawn(async move { service.send_message(&agent_id, "first").await })
        };
        let b = {
            let service = service.clone();
            let agent_id = agent_id.clone();
            tokio::spawn(async move { service.send_message(&agent_id, "second").await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let roles: Vec<_> = service
            .history(&agent_id)
            .await
            .unwrap()
            .iter()
            .map(|m| m.role())
            .collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
    }

    #[tokio::test]
    async fn test_clear_removes_history() {
        let (agents, agent_id) = agent_store().await;
        let service = ChatService::new(Arc::new(InMemorySessionStore::new()), agents, hi_there());
        service.send_message(&agent_id, "Hello").await.unwrap();

        service.clear(&agent_id).await.unwrap();
        assert!(service.history(&agent_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_first_turn_leaves_no_session() {
        let (agents, agent_id) = agent_store().await;
        let sessions = Arc::new(InMemorySessionStore::new());
        let service = ChatService::new(sessions.clone(), agents, Arc::new(FailingTransport));

        let err = service.send_message(&agent_id, "Hello").await.unwrap_err();
        assert_eq!(err.kind(), ChatErrorKind::TransportFailure);
        assert!(sessions.load(&agent_id).await.unwrap().is_none());
    }

    async fn wait_for_history_len(service: &ChatService, agent_id: &str, len: usize) -> usize {
        let mut current = usize::MAX;
        for _ in 0..100 {
            current = service.history(agent_id).await.unwrap().len();
            if current == len {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        current
    }

    #[tokio::test]
    async fn test_cancelled_turn_rolls_back() {
        let (agents, agent_id) = agent_store().await;
        let sessions = Arc::new(InMemorySessionStore::new());
        let service = ChatService::new(sessions.clone(), agents, Arc::new(SlowTransport));

        let outcome = tokio::time::timeout(
            Duration::from_millis(100),
            service.send_message(&agent_id, "Tell me a joke"),
        )
        .await;
        assert!(outcome.is_err());

        assert_eq!(wait_for_history_len(&service, &agent_id, 0).await, 0);
        assert!(sessions.load(&agent_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_turn_keeps_earlier_history() {
        let (agents, agent_id) = agent_store().await;
        let sessions = Arc::new(InMemorySessionStore::new());
        ChatService::new(sessions.clone(), agents.clone(), hi_there())
            .send_message(&agent_id, "Hello")
            .await
            .unwrap();

        let slow = ChatService::new(sessions.clone(), agents, Arc::new(SlowTransport));
        let outcome = tokio::time::timeout(
            Duration::from_millis(100),
            slow.send_message(&agent_id, "Tell me a joke"),
        )
        .await;
        assert!(outcome.is_err());

        assert_eq!(wait_for_history_len(&slow, &agent_id, 2).await, 2);
        let history = slow.history(&agent_id).await.unwrap();
        assert!(history.iter().all(|m| m.content != "Tell me a joke"));
    }

    #[tokio::test]
    async fn test_clear_releases_turn_lock() {
        let (agents, agent_id) = agent_store().await;
        let service = ChatService::new(Arc::new(InMemorySessionStore::new()), agents, hi_there());
        service.send_message(&agent_id, "Hello").await.unwrap();
        assert_eq!(service.tracked_turn_locks(), 1);

        service.clear(&agent_id).await.unwrap();
        assert_eq!(service.tracked_turn_locks(), 0);
    }
}
