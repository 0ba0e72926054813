use crate::agent::{AgentConfig, MAX_MAX_TOKENS, MAX_TEMPERATURE, MIN_MAX_TOKENS, MIN_TEMPERATURE};

/// Longest accepted chat message, in characters
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Check an agent config, returning every violation found
pub fn validate_agent_config(config: &AgentConfig) -> Vec<String> {
    let mut errors = Vec::new();

    let name = config.name.trim();
    if name.is_empty() {
        errors.push("Name is required".to_string());
    } else if name.chars().count() < 3 {
        errors.push("Name must be at least 3 characters long".to_string());
    }

    if config.model.trim().is_empty() {
        errors.push("Model selection is required".to_string());
    }

    let prompt = config.system_prompt.trim();
    if prompt.is_empty() {
        errors.push("System prompt is required".to_string());
    } else if prompt.chars().count() < 10 {
        errors.push("System prompt must be at least 10 characters long".to_string());
    }

    if !config.temperature.is_finite()
        || config.temperature < MIN_TEMPERATURE
        || config.temperature > MAX_TEMPERATURE
    {
        errors.push("Temperature must be between 0 and 2".to_string());
    }

    if config.max_tokens < MIN_MAX_TOKENS || config.max_tokens > MAX_MAX_TOKENS {
        errors.push("Max tokens must be between 1 and 4096".to_string());
    }

    errors
}

/// Check a user chat message
pub fn validate_message(content: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if content.trim().is_empty() {
        errors.push("Message content cannot be empty".to_string());
    }

    if content.chars().count() > MAX_MESSAGE_CHARS {
        errors.push("Message content cannot exceed 4096 characters".to_string());
    }

    errors
}
