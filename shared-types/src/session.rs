use crate::message::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conversation between the user and one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub agent_id: String,
    pub messages: Vec<Message>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(agent_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            messages: Vec::new(),
            created: now,
            updated: now,
        }
    }

    /// Append in conversation order and advance `updated`
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.updated = Utc::now();
    }

    /// Remove a message by id; returns whether it was present
    pub fn remove_message(&mut self, message_id: &str) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id() != message_id);
        self.messages.len() != before
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.messages.iter().any(|m| m.id() == message_id)
    }
}

/// Token accounting for one completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageInfo {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_discount: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

/// Result of a settled chat turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status: String,
    pub status_code: u16,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            status_code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatus {
    pub status: String,
    pub version: String,
    pub uptime: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_remove_preserve_order() {
        let mut session = ChatSession::new("agent-1");
        let first = Message::user("one");
        let second = Message::assistant("two");
        let third = Message::user("three");
        let second_id = second.id().to_string();

        session.push(first);
        session.push(second);
        session.push(third);
        assert!(session.remove_message(&second_id));
        assert!(!session.remove_message(&second_id));

        let contents: Vec<_> = session.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "three"]);
    }

    #[test]
    fn test_usage_omits_missing_cache_discount() {
        let usage = UsageInfo {
            prompt_tokens: 5,
            completion_tokens: 3,
            total_tokens: 8,
            cache_discount: None,
        };
        let value = serde_json::to_value(&usage).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"promptTokens": 5, "completionTokens": 3, "totalTokens": 8})
        );
    }

    #[test]
    fn test_error_response_shape() {
        let value = serde_json::to_value(ErrorResponse::new(429, "slow down")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"status": "error", "statusCode": 429, "message": "slow down"})
        );
    }
}
