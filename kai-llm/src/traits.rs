use async_trait::async_trait;
use kai_common::Result;
use kai_config::GenerationSettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
    pub finish_reason: Option<String>,
}

/// Sampling parameters for one request, serialized in the API's camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationSettings::default().into()
    }
}

impl From<GenerationSettings> for GenerationConfig {
    fn from(s: GenerationSettings) -> Self {
        Self {
            temperature: s.temperature,
            top_p: s.top_p,
            top_k: s.top_k,
            max_output_tokens: s.max_output_tokens,
            response_mime_type: s.response_mime_type,
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send `prompt` as the only message of a fresh conversation and return
    /// the model's reply verbatim.
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<LlmResponse>;

    /// Get the model name being used
    fn model_name(&self) -> &str;
}
