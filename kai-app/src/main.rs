use anyhow::Result;
use clap::Parser;
use kai_common::KaiError;
use kai_common::observability::{LogConfig, init_logging};
use kai_config::{KaiConfig, KaiConfigLoader};
use std::path::PathBuf;
use tether::{Tether, build_from_config};
mod tether;

const DEFAULT_CONFIG: &str = "kai.yaml";

/// Ask Gemini from the terminal.
#[derive(Debug, Parser)]
#[command(name = "kai", version, about)]
struct Cli {
    /// Config file (YAML, TOML or JSON). Defaults to ./kai.yaml when present.
    #[arg(short, long, env = "KAI_CONFIG")]
    config: Option<PathBuf>,

    /// Model name, e.g. gemini-2.0-flash.
    #[arg(short, long)]
    model: Option<String>,
}

fn load_config(cli: &Cli) -> Result<KaiConfig, KaiError> {
    let mut loader = match &cli.config {
        Some(path) => KaiConfigLoader::new().with_file(path),
        None => KaiConfigLoader::new().with_optional_file(DEFAULT_CONFIG),
    };
    if let Some(model) = &cli.model {
        loader = loader.with_override("model", model.clone());
    }
    loader.load().map_err(|e| KaiError::Config(e.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Config first; a missing key must fail before the terminal is touched
    let cfg = load_config(&cli)?;

    // 2) Logging goes to a file since the UI owns the screen
    let log_file = init_logging(LogConfig {
        dir: cfg.logging.dir.clone(),
        format: cfg.logging.format,
        filter: Some(cfg.logging.filter.clone()),
        echo_stderr: false,
    })?;
    tracing::info!(log_file = %log_file.display(), model = %cfg.model, "Starting kai");

    kai_tui::install_panic_hook();
    let mut tether = Tether::new();
    build_from_config(&mut tether, &cfg)?;

    let res = tether.run().await;
    kai_tui::restore_terminal();
    res
}
