//! Translation of a stored chat session into a provider request.

use serde::{Deserialize, Serialize};
use shared_types::{AgentConfig, ChatSession, Message, Role};
use std::collections::BTreeMap;

use crate::builder::ChatRequestBuilder;
use crate::tools::{Tool, ToolChoice};
use crate::types::{
    MessageContent, ProviderMessage, ProviderPreferences, ProviderRequest, ResponseFormat, Route,
    StopSequences,
};

/// Optional generation parameters; only supplied fields reach the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatParams {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub repetition_penalty: Option<f32>,
    pub min_p: Option<f32>,
    pub top_a: Option<f32>,
    pub seed: Option<i64>,
    pub stop: Option<StopSequences>,
    pub stream: Option<bool>,
    pub tools: Option<Vec<Tool>>,
    pub tool_choice: Option<ToolChoice>,
    pub response_format: Option<ResponseFormat>,
    pub logit_bias: Option<BTreeMap<String, f32>>,
    pub logprobs: Option<bool>,
    pub top_logprobs: Option<u32>,
    pub provider: Option<ProviderPreferences>,
    pub transforms: Option<Vec<String>>,
    pub models: Option<Vec<String>>,
    pub route: Option<Route>,
}

impl ChatParams {
    /// Parameters carried by an agent's own settings
    pub fn from_agent(config: &AgentConfig) -> Self {
        Self {
            temperature: Some(config.temperature),
            max_tokens: Some(config.max_tokens),
            ..Default::default()
        }
    }

    /// Fields set on `other` replace those on `self`
    pub fn overlay(self, other: ChatParams) -> Self {
        Self {
            temperature: other.temperature.or(self.temperature),
            max_tokens: other.max_tokens.or(self.max_tokens),
            top_p: other.top_p.or(self.top_p),
            top_k: other.top_k.or(self.top_k),
            frequency_penalty: other.frequency_penalty.or(self.frequency_penalty),
            presence_penalty: other.presence_penalty.or(self.presence_penalty),
            repetition_penalty: other.repetition_penalty.or(self.repetition_penalty),
            min_p: other.min_p.or(self.min_p),
            top_a: other.top_a.or(self.top_a),
            seed: other.seed.or(self.seed),
            stop: other.stop.or(self.stop),
            stream: other.stream.or(self.stream),
            tools: other.tools.or(self.tools),
            tool_choice: other.tool_choice.or(self.tool_choice),
            response_format: other.response_format.or(self.response_format),
            logit_bias: other.logit_bias.or(self.logit_bias),
            logprobs: other.logprobs.or(self.logprobs),
            top_logprobs: other.top_logprobs.or(self.top_logprobs),
            provider: other.provider.or(self.provider),
            transforms: other.transforms.or(self.transforms),
            models: other.models.or(self.models),
            route: other.route.or(self.route),
        }
    }
}

/// Map a stored message into provider shape
pub fn to_provider_message(message: &Message) -> ProviderMessage {
    let content = match &message.rich_content {
        Some(parts) if !parts.is_empty() => MessageContent::Parts(parts.clone()),
        _ => MessageContent::Text(message.content.clone()),
    };

    let tool_calls = match message.role() {
        Role::Assistant => message
            .tool_calls
            .as_ref()
            .filter(|calls| !calls.is_empty())
            .cloned(),
        _ => None,
    };

    ProviderMessage {
        role: message.role(),
        content,
        name: non_empty(&message.name),
        tool_call_id: non_empty(&message.tool_call_id),
        tool_calls,
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// Build the provider request for the next turn of `session`.
///
/// The agent's system prompt always leads, followed by the session history in
/// order. The session is only read.
pub fn build_request(
    session: &ChatSession,
    agent: &AgentConfig,
    extra: Option<&ChatParams>,
) -> ProviderRequest {
    let mut builder = ChatRequestBuilder::new(agent.model.clone())
        .message(ProviderMessage::system(agent.system_prompt.clone()))
        .messages(session.messages.iter().map(to_provider_message));

    if let Some(params) = extra {
        builder = builder.params(params.clone());
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_types::{ContentPart, ToolCall};

    fn agent() -> AgentConfig {
        AgentConfig {
            name: "Helper".to_string(),
            description: String::new(),
            model: "openai/gpt-4o-mini".to_string(),
            system_prompt: "You are a helpful assistant.".to_string(),
            temperature: 0.3,
            max_tokens: 512,
        }
    }

    #[test]
    fn test_system_prompt_leads_history() {
        let mut session = ChatSession::new("agent-1");
        session.push(Message::user("Hello"));
        session.push(Message::assistant("Hi there"));

        let request = build_request(&session, &agent(), None);
        let roles: Vec<_> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(
            request.messages[0].content,
            MessageContent::Text("You are a helpful assistant.".to_string())
        );
        assert_eq!(request.model, "openai/gpt-4o-mini");
    }

    #[test]
    fn test_omitted_params_are_absent() {
        let mut session = ChatSession::new("agent-1");
        session.push(Message::user("Hello"));

        let request = build_request(&session, &agent(), None);
        assert_eq!(request.temperature, Some(0.7));

        let value = serde_json::to_value(&request).unwrap();
        for key in ["max_tokens", "top_p", "seed", "tools", "provider", "route", "stop"] {
            assert!(value.get(key).is_none(), "{} should be absent", key);
        }
        assert_eq!(value["stream"], json!(false));
    }

    #[test]
    fn test_agent_params_applied_through_from_agent() {
        let session = ChatSession::new("agent-1");
        let params = ChatParams::from_agent(&agent());
        let request = build_request(&session, &agent(), Some(&params));
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.max_tokens, Some(512));
    }

    #[test]
    fn test_overlay_prefers_later_values() {
        let merged = ChatParams::from_agent(&agent()).overlay(ChatParams {
            temperature: Some(1.5),
            seed: Some(7),
            ..Default::default()
        });
        assert_eq!(merged.temperature, Some(1.5));
        assert_eq!(merged.max_tokens, Some(512));
        assert_eq!(merged.seed, Some(7));
    }

    #[test]
    fn test_rich_content_replaces_plain_text() {
        let message = Message::with_rich_content(
            Role::User,
            vec![
                ContentPart::text("Describe this"),
                ContentPart::image("https://example.com/a.png"),
            ],
        );
        let mapped = to_provider_message(&message);
        assert!(matches!(mapped.content, MessageContent::Parts(ref parts) if parts.len() == 2));
    }

    #[test]
    fn test_empty_name_and_tool_call_id_dropped() {
        let mut message = Message::user("hi").with_name("");
        message.tool_call_id = Some(String::new());
        let mapped = to_provider_message(&message);
        assert_eq!(mapped.name, None);
        assert_eq!(mapped.tool_call_id, None);

        let named = to_provider_message(&Message::user("hi").with_name("alice"));
        assert_eq!(named.name.as_deref(), Some("alice"));
    }

    #[test]
    fn test_assistant_tool_calls_preserved() {
        let call = ToolCall::function("call_1", "lookup", "{}");
        let message = Message::assistant("").with_tool_calls(vec![call.clone()]);
        assert_eq!(to_provider_message(&message).tool_calls, Some(vec![call]));

        let empty = Message::assistant("ok").with_tool_calls(Vec::new());
        assert_eq!(to_provider_message(&empty).tool_calls, None);

        let tool_reply = to_provider_message(&Message::tool_result("call_1", "42"));
        assert_eq!(tool_reply.role, Role::Tool);
        assert_eq!(tool_reply.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_session_untouched() {
        let mut session = ChatSession::new("agent-1");
        session.push(Message::user("Hello"));
        let snapshot = session.clone();
        let _ = build_request(&session, &agent(), None);
        assert_eq!(session, snapshot);
    }
}
