use super::{AgentStore, SessionStore, StorageError};
use async_trait::async_trait;
use shared_types::{Agent, ChatSession, Message};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::OperationFailed(format!("Lock error: {}", e)))
}

/// Sessions keyed by agent id
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<String, ChatSession>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn find_session<'a>(
    sessions: &'a mut HashMap<String, ChatSession>,
    session_id: &str,
) -> Result<&'a mut ChatSession, StorageError> {
    sessions
        .values_mut()
        .find(|s| s.id == session_id)
        .ok_or_else(|| StorageError::NotFound(format!("Session {} not found", session_id)))
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, agent_id: &str) -> Result<Option<ChatSession>, StorageError> {
        Ok(lock(&self.sessions)?.get(agent_id).cloned())
    }

    async fn create(&self, agent_id: &str) -> Result<ChatSession, StorageError> {
        let session = ChatSession::new(agent_id);
        lock(&self.sessions)?.insert(agent_id.to_string(), session.clone());
        Ok(session)
    }

    async fn append(&self, session_id: &str, message: &Message) -> Result<(), StorageError> {
        let mut sessions = lock(&self.sessions)?;
        find_session(&mut sessions, session_id)?.push(message.clone());
        Ok(())
    }

    async fn remove(&self, session_id: &str, message_id: &str) -> Result<bool, StorageError> {
        let mut sessions = lock(&self.sessions)?;
        Ok(find_session(&mut sessions, session_id)?.remove_message(message_id))
    }

    async fn clear(&self, agent_id: &str) -> Result<(), StorageError> {
        lock(&self.sessions)?.remove(agent_id);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAgentStore {
    agents: Arc<Mutex<HashMap<String, Agent>>>,
}

impl InMemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentStore for InMemoryAgentStore {
    async fn list(&self) -> Result<Vec<Agent>, StorageError> {
        let mut agents: Vec<Agent> = lock(&self.agents)?.values().cloned().collect();
        agents.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        Ok(agents)
    }

    async fn get(&self, id: &str) -> Result<Option<Agent>, StorageError> {
        Ok(lock(&self.agents)?.get(id).cloned())
    }

    async fn create(&self, agent: Agent) -> Result<Agent, StorageError> {
        lock(&self.agents)?.insert(agent.id.clone(), agent.clone());
        Ok(agent)
    }

    async fn update(&self, agent: Agent) -> Result<Agent, StorageError> {
        let mut agents = lock(&self.agents)?;
        match agents.get_mut(&agent.id) {
            Some(existing) => {
                *existing = agent.clone();
                Ok(agent)
            }
            None => Err(StorageError::NotFound(format!("Agent {} not found", agent.id))),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        Ok(lock(&self.agents)?.remove(id).is_some())
    }
}
