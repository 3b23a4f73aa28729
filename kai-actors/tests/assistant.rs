use async_trait::async_trait;
use kai_actors::actor::spawn_actor;
use kai_actors::assistant::{dispatch, AssistantActor};
use kai_actors::{AskCmd, Outcome, FALLBACK_MESSAGE};
use kai_common::{KaiError, Result};
use kai_llm::traits::{GenerationConfig, LlmClient, LlmResponse};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Notify};
use uuid::Uuid;

/// Answers with a fixed text or fails, counting calls.
struct Scripted {
    answer: Option<String>,
    calls: AtomicUsize,
}

impl Scripted {
    fn ok(text: &str) -> Self {
        Self {
            answer: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            answer: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LlmClient for Scripted {
    async fn generate(&self, _prompt: &str, _config: &GenerationConfig) -> Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Some(text) => Ok(LlmResponse {
                text: text.clone(),
                model: Some("scripted".into()),
                tokens_used: None,
                finish_reason: None,
            }),
            None => Err(KaiError::Llm("network unreachable".into())),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Holds every call until released.
struct Gated {
    gate: Arc<Notify>,
}

#[async_trait]
impl LlmClient for Gated {
    async fn generate(&self, prompt: &str, _config: &GenerationConfig) -> Result<LlmResponse> {
        self.gate.notified().await;
        Ok(LlmResponse {
            text: format!("echo: {prompt}"),
            model: None,
            tokens_used: None,
            finish_reason: None,
        })
    }

    fn model_name(&self) -> &str {
        "gated"
    }
}

#[tokio::test]
async fn success_text_is_returned_verbatim() {
    let raw = "  # Title\n\nBody text\n\n";
    let client = Scripted::ok(raw);
    let (text, outcome) = dispatch(&client, &GenerationConfig::default(), "q").await;
    assert_eq!(text, raw);
    assert_eq!(outcome, Outcome::Succeeded);
}

#[tokio::test]
async fn failure_becomes_the_fallback_message() {
    let client = Scripted::failing();
    let (text, outcome) = dispatch(&client, &GenerationConfig::default(), "q").await;
    assert_eq!(text, FALLBACK_MESSAGE);
    assert_eq!(text, "Sorry, there was an error generating a response.");
    assert_eq!(outcome, Outcome::Failed);
}

#[tokio::test]
async fn failures_are_not_retried() {
    let client = Arc::new(Scripted::failing());
    let handle = spawn_actor(
        AssistantActor::new(client.clone(), GenerationConfig::default()),
        4,
    );

    let (tx, rx) = oneshot::channel();
    let id = Uuid::new_v4();
    handle
        .addr
        .send(AskCmd {
            id,
            prompt: "hello".into(),
            reply: tx,
        })
        .await
        .ok()
        .expect("mailbox open");

    let reply = rx.await.expect("actor always replies");
    assert_eq!(reply.id, id);
    assert_eq!(reply.outcome, Outcome::Failed);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reply_arrives_only_after_the_call_resolves() {
    let gate = Arc::new(Notify::new());
    let handle = spawn_actor(
        AssistantActor::new(
            Arc::new(Gated { gate: gate.clone() }),
            GenerationConfig::default(),
        ),
        4,
    );

    let (tx, mut rx) = oneshot::channel();
    let id = Uuid::new_v4();
    handle
        .addr
        .send(AskCmd {
            id,
            prompt: "ping".into(),
            reply: tx,
        })
        .await
        .ok()
        .expect("mailbox open");

    tokio::task::yield_now().await;
    assert!(rx.try_recv().is_err(), "no reply while the call is pending");

    gate.notify_one();
    let reply = rx.await.expect("reply after release");
    assert_eq!(reply.text, "echo: ping");
    assert_eq!(reply.outcome, Outcome::Succeeded);
}

#[tokio::test]
async fn dropped_receiver_does_not_kill_the_actor() {
    let client = Arc::new(Scripted::ok("fine"));
    let handle = spawn_actor(
        AssistantActor::new(client.clone(), GenerationConfig::default()),
        4,
    );

    let (tx, rx) = oneshot::channel();
    drop(rx);
    handle
        .addr
        .send(AskCmd {
            id: Uuid::new_v4(),
            prompt: "first".into(),
            reply: tx,
        })
        .await
        .ok()
        .expect("mailbox open");

    let (tx, rx) = oneshot::channel();
    handle
        .addr
        .send(AskCmd {
            id: Uuid::new_v4(),
            prompt: "second".into(),
            reply: tx,
        })
        .await
        .ok()
        .expect("mailbox open");
    assert_eq!(rx.await.unwrap().text, "fine");
    assert_eq!(client.calls.load(Ordering::SeqCst), 2);
}
