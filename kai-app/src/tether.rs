use anyhow::{Result, anyhow};
use kai_actors::{actor::Addr, assistant::AssistantActor, builder::Builder};
use kai_config::KaiConfig;
use kai_llm::{build_client, traits::GenerationConfig};
use kai_tui::{Osc52Clipboard, TuiActor, spawn_tui_feeders};
use std::time::Duration;

const ASSISTANT: &str = "assistant:main";
const TUI: &str = "tui:main";

pub struct Tether {
    builder: Builder,
}

impl Tether {
    pub fn new() -> Self {
        Self {
            builder: Builder::new(),
        }
    }

    pub fn builder_mut(&mut self) -> &mut Builder {
        &mut self.builder
    }

    pub async fn run(self) -> Result<()> {
        let res = self.builder.run_until_shutdown().await;
        tracing::info!("Shut down");
        res
    }
}

pub fn build_from_config(t: &mut Tether, cfg: &KaiConfig) -> Result<()> {
    let b = t.builder_mut();
    let shutdown = b.shutdown_handle();

    // -------- PHASE 1: RESERVE --------
    let r_assistant = b.reserve::<AssistantActor>(ASSISTANT, 16);
    let r_tui = b.reserve::<TuiActor>(TUI, 256);

    // -------- PHASE 2: MODEL SIDE --------
    let client = build_client(cfg)?;
    let generation = GenerationConfig::from(cfg.generation.clone());
    b.start_reserved(r_assistant, AssistantActor::new(client, generation));

    // -------- PHASE 3: UI LAST --------
    let assistant: Addr<AssistantActor> = b
        .addr(ASSISTANT)
        .ok_or_else(|| anyhow!("missing actor '{ASSISTANT}'"))?;
    let tui = TuiActor::new(
        assistant,
        Box::new(Osc52Clipboard),
        &cfg.ui,
        shutdown.clone(),
    )?;
    b.start_reserved(r_tui, tui);

    let tui_addr: Addr<TuiActor> = b
        .addr(TUI)
        .ok_or_else(|| anyhow!("missing actor '{TUI}'"))?;
    spawn_tui_feeders(tui_addr, shutdown, Duration::from_millis(cfg.ui.tick_ms.max(1)));

    Ok(())
}
