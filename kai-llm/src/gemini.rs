use crate::traits::{GenerationConfig, LlmClient, LlmResponse};
use async_trait::async_trait;
use kai_common::{KaiError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: &'a [Content<'a>],
    generation_config: &'a GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

impl<'a> Content<'a> {
    fn user(text: &'a str) -> Self {
        Self {
            role: "user",
            parts: [Part { text }],
        }
    }
}

/// Candidates stopped for these reasons carry no usable answer.
const REJECTED_FINISH_REASONS: &[&str] = &["SAFETY", "RECITATION", "LANGUAGE"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    // function calls and inline data come back without `text`
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
    total_token_count: Option<u32>,
}

/// Google Gemini API client.
///
/// Requires a valid API key and internet access. Every call to
/// [`LlmClient::generate`] sends the prompt as the only turn, so nothing is
/// carried over between prompts.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new client using the provided API key and model.
    pub fn new(api_key: String, model: String, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(request_timeout)
            .build()
            .map_err(|e| KaiError::Llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn generate_content(&self, prompt: &str, config: &GenerationConfig) -> Result<LlmResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let contents = [Content::user(prompt)];
        let request = GeminiRequest {
            contents: &contents,
            generation_config: config,
        };

        tracing::debug!(model = %self.model, "Sending Gemini request");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| KaiError::Llm(format!("Gemini request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                429 => KaiError::Llm("Rate limit exceeded".to_string()),
                401 => KaiError::Llm("Invalid API key".to_string()),
                403 => KaiError::Llm("API access forbidden".to_string()),
                _ => KaiError::Llm(format!("Gemini API error ({}): {}", status, error_text)),
            });
        }

        let gemini_response: GeminiResponse = resp
            .json()
            .await
            .map_err(|e| KaiError::Llm(format!("Failed to parse Gemini response: {}", e)))?;

        self.extract(gemini_response)
    }

    fn extract(&self, gemini_response: GeminiResponse) -> Result<LlmResponse> {
        if let Some(reason) = gemini_response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(KaiError::Llm(format!("Prompt blocked by Gemini: {reason}")));
        }

        let Some(candidate) = gemini_response.candidates.into_iter().next() else {
            return Err(KaiError::Llm(
                "No candidates returned from Gemini".to_string(),
            ));
        };

        if let Some(reason) = candidate
            .finish_reason
            .as_deref()
            .filter(|r| REJECTED_FINISH_REASONS.contains(r))
        {
            return Err(KaiError::Llm(format!(
                "Gemini stopped without a usable answer: {reason}"
            )));
        }

        let texts: Vec<String> = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        if texts.is_empty() {
            return Err(KaiError::Llm(
                "No content parts in Gemini response".to_string(),
            ));
        }

        if let Some(usage) = &gemini_response.usage_metadata {
            tracing::debug!(
                prompt_tokens = ?usage.prompt_token_count,
                candidate_tokens = ?usage.candidates_token_count,
                "Gemini usage"
            );
        }

        Ok(LlmResponse {
            text: texts.concat(),
            model: Some(self.model.clone()),
            tokens_used: gemini_response
                .usage_metadata
                .and_then(|u| u.total_token_count),
            finish_reason: candidate.finish_reason,
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<LlmResponse> {
        self.generate_content(prompt, config).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
