use std::collections::BTreeMap;

use crate::normalize::ChatParams;
use crate::tools::{Tool, ToolChoice};
use crate::types::{
    ProviderMessage, ProviderPreferences, ProviderRequest, ResponseFormat, Route, StopSequences,
};

/// Temperature sent when the caller does not choose one
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Fluent assembly of a [`ProviderRequest`]
///
/// ```rust
/// use openrouter_sdk::{builder::ChatRequestBuilder, types::ProviderMessage};
///
/// let request = ChatRequestBuilder::new("openai/gpt-4o-mini")
///     .message(ProviderMessage::system("You are terse."))
///     .message(ProviderMessage::user("Hello"))
///     .max_tokens(256)
///     .build();
///
/// assert_eq!(request.temperature, Some(0.7));
/// assert_eq!(request.stream, Some(false));
/// ```
#[derive(Debug, Clone)]
pub struct ChatRequestBuilder {
    model: String,
    messages: Vec<ProviderMessage>,
    params: ChatParams,
}

impl ChatRequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            params: ChatParams::default(),
        }
    }

    pub fn message(mut self, message: ProviderMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: impl IntoIterator<Item = ProviderMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Overlay a parameter set; supplied fields win over earlier ones
    pub fn params(mut self, params: ChatParams) -> Self {
        self.params = self.params.overlay(params);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.params.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.params.max_tokens = Some(max_tokens);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.params.top_p = Some(top_p);
        self
    }

    pub fn top_k(mut self, top_k: u32) -> Self {
        self.params.top_k = Some(top_k);
        self
    }

    pub fn frequency_penalty(mut self, penalty: f32) -> Self {
        self.params.frequency_penalty = Some(penalty);
        self
    }

    pub fn presence_penalty(mut self, penalty: f32) -> Self {
        self.params.presence_penalty = Some(penalty);
        self
    }

    pub fn repetition_penalty(mut self, penalty: f32) -> Self {
        self.params.repetition_penalty = Some(penalty);
        self
    }

    pub fn min_p(mut self, min_p: f32) -> Self {
        self.params.min_p = Some(min_p);
        self
    }

    pub fn top_a(mut self, top_a: f32) -> Self {
        self.params.top_a = Some(top_a);
        self
    }

    pub fn seed(mut self, seed: i64) -> Self {
        self.params.seed = Some(seed);
        self
    }

    pub fn stop(mut self, stop: StopSequences) -> Self {
        self.params.stop = Some(stop);
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.params.stream = Some(stream);
        self
    }

    pub fn tool(mut self, tool: Tool) -> Self {
        self.params.tools.get_or_insert_with(Vec::new).push(tool);
        self
    }

    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.params.tool_choice = Some(choice);
        self
    }

    pub fn response_format(mut self, format: ResponseFormat) -> Self {
        self.params.response_format = Some(format);
        self
    }

    pub fn logit_bias(mut self, bias: BTreeMap<String, f32>) -> Self {
        self.params.logit_bias = Some(bias);
        self
    }

    pub fn logprobs(mut self, logprobs: bool) -> Self {
        self.params.logprobs = Some(logprobs);
        self
    }

    pub fn top_logprobs(mut self, count: u32) -> Self {
        self.params.top_logprobs = Some(count);
        self
    }

    pub fn provider(mut self, preferences: ProviderPreferences) -> Self {
        self.params.provider = Some(preferences);
        self
    }

    pub fn transforms(mut self, transforms: Vec<String>) -> Self {
        self.params.transforms = Some(transforms);
        self
    }

    /// Fallback models tried in order
    pub fn fallback_models(mut self, models: Vec<String>) -> Self {
        self.params.models = Some(models);
        self
    }

    pub fn route(mut self, route: Route) -> Self {
        self.params.route = Some(route);
        self
    }

    pub fn build(self) -> ProviderRequest {
        let p = self.params;
        ProviderRequest {
            model: self.model,
            messages: self.messages,
            temperature: Some(p.temperature.unwrap_or(DEFAULT_TEMPERATURE)),
            max_tokens: p.max_tokens,
            top_p: p.top_p,
            top_k: p.top_k,
            frequency_penalty: p.frequency_penalty,
            presence_penalty: p.presence_penalty,
            repetition_penalty: p.repetition_penalty,
            min_p: p.min_p,
            top_a: p.top_a,
            seed: p.seed,
            stop: p.stop,
            stream: Some(p.stream.unwrap_or(false)),
            tools: p.tools,
            tool_choice: p.tool_choice,
            response_format: p.response_format,
            logit_bias: p.logit_bias,
            logprobs: p.logprobs,
            top_logprobs: p.top_logprobs,
            provider: p.provider,
            transforms: p.transforms,
            models: p.models,
            route: p.route,
        }
    }
}
