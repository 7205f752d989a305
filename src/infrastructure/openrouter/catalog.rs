use serde::{Deserialize, Serialize};

/// Well-known model identifiers.
pub mod models {
    /// Lets the router pick a model per request.
    pub const AUTO: &str = "openrouter/auto";

    pub const LLAMA_4_MAVERICK: &str = "meta-llama/llama-4-maverick:free";
    pub const LLAMA_4_SCOUT: &str = "meta-llama/llama-4-scout:free";
    pub const MISTRAL_SMALL_3_1: &str = "mistralai/mistral-small-3.1-24b-instruct:free";

    pub const GEMINI_2_5_FLASH: &str = "google/gemini-2.5-flash";
    pub const GEMINI_2_5_FLASH_PREVIEW: &str = "google/gemini-2.5-flash-preview-05-20";
    pub const GEMINI_2_5_FLASH_LITE: &str = "google/gemini-2.5-flash-lite-preview-06-17";

    /// Every constant above, in declaration order.
    pub const ALL: [&str; 7] = [
        AUTO,
        LLAMA_4_MAVERICK,
        LLAMA_4_SCOUT,
        MISTRAL_SMALL_3_1,
        GEMINI_2_5_FLASH,
        GEMINI_2_5_FLASH_PREVIEW,
        GEMINI_2_5_FLASH_LITE,
    ];

    pub fn is_free(model: &str) -> bool {
        model.ends_with(":free")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub object: Option<String>,
    pub data: Vec<ModelInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub context_length: Option<u64>,
    pub pricing: PricingInfo,
    #[serde(default)]
    pub top_provider: Option<ProviderInfo>,
    #[serde(default)]
    pub architecture: Option<ArchitectureInfo>,
    #[serde(default)]
    pub per_request_limits: Option<RequestLimits>,
}

/// Prices are decimal strings in USD per token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingInfo {
    pub prompt: String,
    pub completion: String,
    #[serde(default)]
    pub request: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl PricingInfo {
    /// True when both prompt and completion tokens cost nothing.
    pub fn is_free(&self) -> bool {
        let zero = |price: &str| price.parse::<f64>().is_ok_and(|p| p == 0.0);
        zero(&self.prompt) && zero(&self.completion)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderInfo {
    #[serde(default)]
    pub context_length: Option<u64>,
    #[serde(default)]
    pub max_completion_tokens: Option<u64>,
    #[serde(default)]
    pub is_moderated: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureInfo {
    #[serde(default)]
    pub modality: Option<String>,
    #[serde(default)]
    pub tokenizer: Option<String>,
    #[serde(default)]
    pub instruct_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLimits {
    #[serde(default)]
    pub prompt_tokens: Option<String>,
    #[serde(default)]
    pub completion_tokens: Option<String>,
}

/// `GET /models/{id}` wraps a single model in `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub data: ModelInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_listing_decodes_sparse_entries() {
        let body = json!({
            "data": [
                {
                    "id": "google/gemini-2.5-flash",
                    "name": "Gemini 2.5 Flash",
                    "context_length": 1048576,
                    "pricing": {"prompt": "0.0000003", "completion": "0.0000025"},
                    "architecture": {"modality": "text+image->text", "tokenizer": "Gemini"}
                },
                {
                    "id": "meta-llama/llama-4-scout:free",
                    "name": "Llama 4 Scout",
                    "pricing": {"prompt": "0", "completion": "0"}
                }
            ]
        });
        let response: ModelsResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.data.len(), 2);
        assert!(!response.data[0].pricing.is_free());
        assert!(response.data[1].pricing.is_free());
        assert_eq!(response.data[1].context_length, None);
    }

    #[test]
    fn test_free_suffix() {
        assert!(models::is_free(models::LLAMA_4_SCOUT));
        assert!(!models::is_free(models::GEMINI_2_5_FLASH));
        assert_eq!(models::ALL.len(), 7);
    }
}
