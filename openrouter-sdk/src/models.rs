//! Model catalogue and API key metadata returned by OpenRouter.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Model suggested when a caller has no preference
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// USD per prompt token, as a decimal string
    pub prompt: String,
    pub completion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub context_length: Option<u64>,
    #[serde(default)]
    pub pricing: Option<ModelPricing>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `GET /models`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub data: Vec<ModelInfo>,
}

/// `data` object of `GET /auth/key`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyInfo {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub usage: Option<f64>,
    /// Credit limit; `None` means unlimited
    #[serde(default)]
    pub limit: Option<f64>,
    #[serde(default)]
    pub is_free_tier: Option<bool>,
    #[serde(default)]
    pub rate_limit: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct KeyInfoEnvelope {
    pub data: KeyInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_list_keeps_unknown_fields() {
        let list: ModelList = serde_json::from_value(json!({"data": [{
            "id": "anthropic/claude-3.5-sonnet",
            "name": "Claude 3.5 Sonnet",
            "context_length": 200000,
            "pricing": {"prompt": "0.000003", "completion": "0.000015"},
            "architecture": {"modality": "text+image->text"}
        }]}))
        .unwrap();

        let model = &list.data[0];
        assert_eq!(model.context_length, Some(200000));
        assert_eq!(model.pricing.as_ref().unwrap().completion, "0.000015");
        assert!(model.extra.contains_key("architecture"));
    }
}
