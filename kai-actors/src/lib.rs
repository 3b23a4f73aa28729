//! Actor runtime and the prompt-dispatch actor.
//!
//! The UI never talks to the model directly: it sends an [`AskCmd`] to the
//! [`assistant::AssistantActor`] and receives exactly one [`Reply`] on the
//! enclosed oneshot channel, whether the call succeeded or not.
pub mod actor;
pub mod assistant;
pub mod builder;

use tokio::sync::oneshot;
use uuid::Uuid;

/// Shown in place of the model's answer whenever generation fails.
pub const FALLBACK_MESSAGE: &str = "Sorry, there was an error generating a response.";

/// How a dispatch ended. Nothing finer-grained reaches the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    /// Echo of [`AskCmd::id`].
    pub id: Uuid,
    /// Model text verbatim, or [`FALLBACK_MESSAGE`].
    pub text: String,
    pub outcome: Outcome,
}

pub struct AskCmd {
    pub id: Uuid,
    pub prompt: String,
    pub reply: oneshot::Sender<Reply>,
}
