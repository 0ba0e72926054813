use super::migrations::run_migrations;
use super::{AgentStore, SessionStore, StorageError};
use crate::DbConnection;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use shared_types::{Agent, AgentConfig, ChatSession, Message, Role};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Open (or create) the database file and bring the schema up to date
pub fn initialize_database(path: &Path) -> Result<DbConnection, StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            StorageError::OperationFailed(format!("Failed to create database directory: {}", e))
        })?;
    }

    prepare(Connection::open(path)?)
}

/// Private in-memory database, mostly for tests
pub fn initialize_in_memory() -> Result<DbConnection, StorageError> {
    prepare(Connection::open_in_memory()?)
}

fn prepare(mut conn: Connection) -> Result<DbConnection, StorageError> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    run_migrations(&mut conn)
        .map_err(|e| StorageError::OperationFailed(format!("Migration failed: {}", e)))?;
    Ok(Arc::new(Mutex::new(conn)))
}

fn lock(connection: &DbConnection) -> Result<MutexGuard<'_, Connection>, StorageError> {
    connection
        .lock()
        .map_err(|e| StorageError::OperationFailed(format!("Lock error: {}", e)))
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::Other(format!("Invalid timestamp '{}': {}", value, e)))
}

struct MessageRow {
    id: String,
    role: String,
    content: String,
    rich_content: Option<String>,
    name: Option<String>,
    tool_call_id: Option<String>,
    tool_calls: Option<String>,
    timestamp: String,
}

impl MessageRow {
    fn into_message(self) -> Result<Message, StorageError> {
        let role: Role = self.role.parse().map_err(StorageError::Other)?;
        let mut message = Message::restore(self.id, role, self.content, parse_time(&self.timestamp)?);
        message.rich_content = self
            .rich_content
            .map(|json| serde_json::from_str(&json))
            .transpose()?;
        message.name = self.name;
        message.tool_call_id = self.tool_call_id;
        message.tool_calls = self
            .tool_calls
            .map(|json| serde_json::from_str(&json))
            .transpose()?;
        Ok(message)
    }
}

pub struct SqliteSessionStore {
    connection: DbConnection,
}

impl SqliteSessionStore {
    pub fn new(connection: DbConnection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self, agent_id: &str) -> Result<Option<ChatSession>, StorageError> {
        let conn = lock(&self.connection)?;

        let header = conn
            .query_row(
                "SELECT id, agent_id, created, updated FROM chat_sessions WHERE agent_id = ?1",
                params![agent_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, agent_id, created, updated)) = header else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            r#"
            SELECT id, role, content, rich_content, name, tool_call_id, tool_calls, timestamp
            FROM chat_messages
            WHERE session_id = ?1
            ORDER BY seq
            "#,
        )?;

        let rows = stmt
            .query_map(params![id], |row| {
                Ok(MessageRow {
                    id: row.get(0)?,
                    role: row.get(1)?,
                    content: row.get(2)?,
                    rich_content: row.get(3)?,
                    name: row.get(4)?,
                    tool_call_id: row.get(5)?,
                    tool_calls: row.get(6)?,
                    timestamp: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let messages = rows
            .into_iter()
            .map(MessageRow::into_message)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(ChatSession {
            id,
            agent_id,
            messages,
            created: parse_time(&created)?,
            updated: parse_time(&updated)?,
        }))
    }

    async fn create(&self, agent_id: &str) -> Result<ChatSession, StorageError> {
        let conn = lock(&self.connection)?;
        let session = ChatSession::new(agent_id);

        conn.execute(
            "INSERT INTO chat_sessions (id, agent_id, created, updated) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id,
                session.agent_id,
                session.created.to_rfc3339(),
                session.updated.to_rfc3339(),
            ],
        )?;

        Ok(session)
    }

    async fn append(&self, session_id: &str, message: &Message) -> Result<(), StorageError> {
        let conn = lock(&self.connection)?;
        let tx = conn.unchecked_transaction()?;

        let touched = tx.execute(
            "UPDATE chat_sessions SET updated = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), session_id],
        )?;
        if touched == 0 {
            return Err(StorageError::NotFound(format!(
                "Session {} not found",
                session_id
            )));
        }

        let rich_content = message
            .rich_content
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let tool_calls = message
            .tool_calls
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        tx.execute(
            r#"
            INSERT INTO chat_messages
                (id, session_id, role, content, rich_content, name, tool_call_id, tool_calls, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                message.id(),
                session_id,
                message.role().as_str(),
                message.content,
                rich_content,
                message.name,
                message.tool_call_id,
                tool_calls,
                message.timestamp().to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    async fn remove(&self, session_id: &str, message_id: &str) -> Result<bool, StorageError> {
        let conn = lock(&self.connection)?;
        let removed = conn.execute(
            "DELETE FROM chat_messages WHERE session_id = ?1 AND id = ?2",
            params![session_id, message_id],
        )?;
        Ok(removed > 0)
    }

    async fn clear(&self, agent_id: &str) -> Result<(), StorageError> {
        let conn = lock(&self.connection)?;
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM chat_messages WHERE session_id IN (SELECT id FROM chat_sessions WHERE agent_id = ?1)",
            params![agent_id],
        )?;
        tx.execute(
            "DELETE FROM chat_sessions WHERE agent_id = ?1",
            params![agent_id],
        )?;
        tx.commit()?;
        Ok(())
    }
}

pub struct SqliteAgentStore {
    connection: DbConnection,
}

impl SqliteAgentStore {
    pub fn new(connection: DbConnection) -> Self {
        Self { connection }
    }
}

struct AgentRow {
    id: String,
    name: String,
    description: String,
    model: String,
    system_prompt: String,
    temperature: f64,
    max_tokens: u32,
    created: String,
    updated: String,
}

impl AgentRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            model: row.get(3)?,
            system_prompt: row.get(4)?,
            temperature: row.get(5)?,
            max_tokens: row.get(6)?,
            created: row.get(7)?,
            updated: row.get(8)?,
        })
    }

    fn into_agent(self) -> Result<Agent, StorageError> {
        Ok(Agent {
            id: self.id,
            config: AgentConfig {
                name: self.name,
                description: self.description,
                model: self.model,
                system_prompt: self.system_prompt,
                temperature: self.temperature as f32,
                max_tokens: self.max_tokens,
            },
            created: parse_time(&self.created)?,
            updated: parse_time(&self.updated)?,
        })
    }
}

const AGENT_COLUMNS: &str =
    "id, name, description, model, system_prompt, temperature, max_tokens, created, updated";

#[async_trait]
impl AgentStore for SqliteAgentStore {
    async fn list(&self) -> Result<Vec<Agent>, StorageError> {
        let conn = lock(&self.connection)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM agents ORDER BY created, id",
            AGENT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], AgentRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(AgentRow::into_agent).collect()
    }

    async fn get(&self, id: &str) -> Result<Option<Agent>, StorageError> {
        let conn = lock(&self.connection)?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM agents WHERE id = ?1", AGENT_COLUMNS),
                params![id],
                AgentRow::from_row,
            )
            .optional()?;
        row.map(AgentRow::into_agent).transpose()
    }

    async fn create(&self, agent: Agent) -> Result<Agent, StorageError> {
        let conn = lock(&self.connection)?;
        conn.execute(
            &format!(
                "INSERT INTO agents ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                AGENT_COLUMNS
            ),
            params![
                agent.id,
                agent.config.name,
                agent.config.description,
                agent.config.model,
                agent.config.system_prompt,
                f64::from(agent.config.temperature),
                agent.config.max_tokens,
                agent.created.to_rfc3339(),
                agent.updated.to_rfc3339(),
            ],
        )?;
        Ok(agent)
    }

    async fn update(&self, agent: Agent) -> Result<Agent, StorageError> {
        let conn = lock(&self.connection)?;
        let updated = conn.execute(
            r#"
            UPDATE agents
            SET name = ?1, description = ?2, model = ?3, system_prompt = ?4,
                temperature = ?5, max_tokens = ?6, updated = ?7
            WHERE id = ?8
            "#,
            params![
                agent.config.name,
                agent.config.description,
                agent.config.model,
                agent.config.system_prompt,
                f64::from(agent.config.temperature),
                agent.config.max_tokens,
                agent.updated.to_rfc3339(),
                agent.id,
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::NotFound(format!("Agent {} not found", agent.id)));
        }
        Ok(agent)
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let conn = lock(&self.connection)?;
        let deleted = conn.execute("DELETE FROM agents WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }
}
