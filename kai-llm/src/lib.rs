//! Language model integration for Kai.
//!
//! This crate exposes the [`traits::LlmClient`] interface, the fixed
//! [`traits::GenerationConfig`], and the Gemini implementation. The client is
//! built once at startup with [`build_client`] and handed to whoever
//! dispatches prompts.
//!
//! # Examples
//! ```no_run
//! use kai_config::KaiConfigLoader;
//! use kai_llm::{build_client, traits::GenerationConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let cfg = KaiConfigLoader::new().load()?;
//! let client = build_client(&cfg)?;
//! let reply = client.generate("Why is the sky blue?", &GenerationConfig::default()).await?;
//! println!("{}", reply.text);
//! # Ok(())
//! # }
//! ```
pub mod gemini;
pub mod traits;

use gemini::GeminiClient;
use kai_config::KaiConfig;
use std::sync::Arc;
use std::time::Duration;
use traits::LlmClient;

/// Construct the process-wide client from configuration.
pub fn build_client(
    config: &KaiConfig,
) -> kai_common::Result<Arc<dyn LlmClient + Send + Sync + 'static>> {
    let client = GeminiClient::new(
        config.api_key.clone(),
        config.model.clone(),
        Duration::from_secs(config.request_timeout_secs.max(1)),
    )?
    .with_base_url(config.base_url.clone());

    tracing::info!(model = %config.model, "LLM client ready");
    Ok(Arc::new(client))
}
