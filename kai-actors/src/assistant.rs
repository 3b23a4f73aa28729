use crate::actor::{Actor, Context};
use crate::{AskCmd, Outcome, Reply, FALLBACK_MESSAGE};
use anyhow::Result;
use kai_llm::traits::{GenerationConfig, LlmClient};
use std::sync::Arc;
use std::time::Instant;

/// Owns the process-wide model client and answers one prompt at a time.
pub struct AssistantActor {
    llm_client: Arc<dyn LlmClient + Send + Sync>,
    config: GenerationConfig,
}

impl AssistantActor {
    pub fn new(llm_client: Arc<dyn LlmClient + Send + Sync>, config: GenerationConfig) -> Self {
        Self { llm_client, config }
    }
}

/// Send `prompt` to the model; any failure is logged and collapsed into
/// [`FALLBACK_MESSAGE`].
pub async fn dispatch(
    client: &dyn LlmClient,
    config: &GenerationConfig,
    prompt: &str,
) -> (String, Outcome) {
    let started = Instant::now();
    match client.generate(prompt, config).await {
        Ok(response) => {
            tracing::info!(
                model = client.model_name(),
                tokens = ?response.tokens_used,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "generation succeeded"
            );
            (response.text, Outcome::Succeeded)
        }
        Err(e) => {
            tracing::error!(
                model = client.model_name(),
                error = %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Error generating response"
            );
            (FALLBACK_MESSAGE.to_string(), Outcome::Failed)
        }
    }
}

#[async_trait::async_trait]
impl Actor for AssistantActor {
    type Msg = AskCmd;

    async fn handle(&mut self, msg: Self::Msg, _ctx: &mut Context<Self>) -> Result<()> {
        let AskCmd { id, prompt, reply } = msg;
        tracing::debug!(%id, chars = prompt.chars().count(), "dispatching prompt");

        let (text, outcome) = dispatch(self.llm_client.as_ref(), &self.config, &prompt).await;

        if reply.send(Reply { id, text, outcome }).is_err() {
            tracing::debug!(%id, "reply receiver dropped");
        }
        Ok(())
    }
}
