//! Interpretation of provider responses.
//!
//! Everything here is pure: the same status and body always produce the same
//! reply or the same error.

use serde_json::Value;
use shared_types::{ToolCall, UsageInfo};

use crate::error::{ChatError, GENERIC_UPSTREAM_MESSAGE};
use crate::types::{
    ChoiceBody, ProviderErrorBody, ProviderErrorEnvelope, ProviderPayload, ProviderResponse,
    ProviderUsage,
};

/// Status reported when a 2xx body carries an error without a usable code
const FALLBACK_ERROR_STATUS: u16 = 502;

/// Provider-neutral result of one completion
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedReply {
    pub content: String,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

impl From<ProviderUsage> for UsageInfo {
    fn from(usage: ProviderUsage) -> Self {
        UsageInfo {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            cache_discount: usage.cache_discount,
        }
    }
}

/// Decode a raw body into a payload, classifying choices on the way
pub fn decode_payload(status: u16, body: &str) -> Result<ProviderPayload, ChatError> {
    let value: Option<Value> = serde_json::from_str(body).ok();

    if let Some(error) = value
        .as_ref()
        .and_then(|v| v.get("error"))
        .filter(|e| !e.is_null())
    {
        return Ok(ProviderPayload::Error(error_envelope(error)));
    }

    if !is_success(status) {
        let text = body.trim();
        let message = if text.is_empty() {
            GENERIC_UPSTREAM_MESSAGE
        } else {
            text
        };
        return Err(ChatError::upstream_rejected(message, status));
    }

    let value = value.ok_or_else(|| ChatError::malformed("body is not valid JSON"))?;
    let response: ProviderResponse = serde_json::from_value(value)
        .map_err(|e| ChatError::malformed(format!("unexpected response shape: {}", e)))?;

    Ok(ProviderPayload::Completion(response))
}

// An `error` member that is not an object is treated as a bare message.
fn error_envelope(error: &Value) -> ProviderErrorEnvelope {
    let body = match error {
        Value::String(message) => ProviderErrorBody {
            message: Some(message.clone()),
            ..Default::default()
        },
        other => serde_json::from_value(other.clone()).unwrap_or_default(),
    };
    ProviderErrorEnvelope { error: body }
}

fn resolve_status(status: u16, code: Option<&Value>) -> u16 {
    if !is_success(status) {
        return status;
    }

    code.and_then(|c| match c {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse::<u64>().ok(),
        _ => None,
    })
    .and_then(|c| u16::try_from(c).ok())
    .filter(|c| (400..600).contains(c))
    .unwrap_or(FALLBACK_ERROR_STATUS)
}

fn rejection_message(error: &ProviderErrorBody) -> String {
    let message = error
        .message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(GENERIC_UPSTREAM_MESSAGE);

    let reasons = error
        .metadata
        .as_ref()
        .and_then(|m| m.reasons.as_ref())
        .filter(|r| !r.is_empty());

    match reasons {
        Some(reasons) => format!("{} - Reasons: {}", message, reasons.join(", ")),
        None => message.to_string(),
    }
}

/// Turn a decoded payload into a reply or a classified error
pub fn reconcile(status: u16, payload: ProviderPayload) -> Result<NormalizedReply, ChatError> {
    let response = match payload {
        ProviderPayload::Error(envelope) => {
            let status = resolve_status(status, envelope.error.code.as_ref());
            return Err(ChatError::upstream_rejected(
                rejection_message(&envelope.error),
                status,
            ));
        }
        ProviderPayload::Completion(_) if !is_success(status) => {
            return Err(ChatError::upstream_rejected(GENERIC_UPSTREAM_MESSAGE, status));
        }
        ProviderPayload::Completion(response) => response,
    };

    let usage = response.usage.map(UsageInfo::from);
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::malformed("response contains no choices"))?;

    let (content, tool_calls) = match choice.body {
        ChoiceBody::Chat(message) => (message.content.unwrap_or_default(), message.tool_calls),
        ChoiceBody::Text(text) => (text, None),
        ChoiceBody::Delta(_) => {
            return Err(ChatError::malformed(
                "streaming delta received on a non-streaming request",
            ))
        }
    };

    Ok(NormalizedReply {
        content,
        tool_calls,
        usage,
        finish_reason: choice.finish_reason,
    })
}

/// Decode and reconcile a raw HTTP exchange
pub fn parse_response(status: u16, body: &str) -> Result<NormalizedReply, ChatError> {
    let payload = decode_payload(status, body)?;
    reconcile(status, payload)
}
