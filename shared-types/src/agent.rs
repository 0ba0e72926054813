use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_TEMPERATURE: f32 = 0.0;
pub const MAX_TEMPERATURE: f32 = 2.0;
pub const MIN_MAX_TOKENS: u32 = 1;
pub const MAX_MAX_TOKENS: u32 = 4096;

/// User-editable agent settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Provider model identifier, e.g. "anthropic/claude-3.5-sonnet"
    pub model: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A persisted agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    #[serde(flatten)]
    pub config: AgentConfig,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            config,
            created: now,
            updated: now,
        }
    }

    /// Merge a partial update and refresh `updated`
    pub fn apply(&mut self, update: AgentUpdate) {
        if let Some(name) = update.name {
            self.config.name = name;
        }
        if let Some(description) = update.description {
            self.config.description = description;
        }
        if let Some(model) = update.model {
            self.config.model = model;
        }
        if let Some(system_prompt) = update.system_prompt {
            self.config.system_prompt = system_prompt;
        }
        if let Some(temperature) = update.temperature {
            self.config.temperature = temperature;
        }
        if let Some(max_tokens) = update.max_tokens {
            self.config.max_tokens = max_tokens;
        }
        self.updated = Utc::now();
    }
}

/// Partial agent update (PATCH body)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}
