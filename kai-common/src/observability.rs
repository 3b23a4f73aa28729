//! Logging for the `kai` binary.
//!
//! The UI owns the terminal, so events go to a daily rolling file
//! (`kai.log.YYYY-MM-DD`) and only optionally to stderr. [`init_logging`] is
//! idempotent: later calls hand back the file chosen by the first one.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use serde::Deserialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE: &str = "kai.log";
const LOG_DIR_ENV: &str = "KAI_LOG_DIR";
const DEFAULT_FILTER: &str = "info";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Encoding of the file sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Directory for the log files. Falls back to `KAI_LOG_DIR`, then
    /// `~/.local/share/kai`.
    pub dir: Option<PathBuf>,
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset (default `info`).
    pub filter: Option<String>,
    /// Also write human-readable events to stderr. Only useful when the UI
    /// is not running.
    pub echo_stderr: bool,
}

/// Install the global subscriber and return today's log file.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(path.clone());
    }

    let dir = log_dir(config.dir.as_deref());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;
    let path = dir.join(format!("{LOG_FILE}.{}", Local::now().format("%Y-%m-%d")));

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, LOG_FILE));
    let _ = LOG_GUARD.set(guard);

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.filter.as_deref().unwrap_or(DEFAULT_FILTER))
            .context("invalid log filter")?,
    };

    let file = match config.format {
        LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(false).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    };
    let stderr = config
        .echo_stderr
        .then(|| fmt::layer().with_writer(std::io::stderr).boxed());

    tracing_subscriber::registry()
        .with(file)
        .with(stderr)
        .with(filter)
        .try_init()
        .context("tracing subscriber already installed")?;

    let _ = LOG_PATH.set(path.clone());
    Ok(path)
}

fn log_dir(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(expand_home)
        .or_else(|| std::env::var_os(LOG_DIR_ENV).map(|d| expand_home(Path::new(&d))))
        .unwrap_or_else(|| match std::env::var_os("HOME") {
            Some(home) => Path::new(&home).join(".local/share/kai"),
            None => PathBuf::from("kai-logs"),
        })
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => Path::new(&home).join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_wins() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(log_dir(Some(tmp.path())), tmp.path());
    }

    #[test]
    fn only_leading_tilde_is_expanded() {
        assert_eq!(
            expand_home(Path::new("/var/log/kai")),
            PathBuf::from("/var/log/kai")
        );
        assert_eq!(
            expand_home(Path::new("logs/~")),
            PathBuf::from("logs/~")
        );
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(
                expand_home(Path::new("~/kai")),
                Path::new(&home).join("kai")
            );
        }
    }

    #[test]
    fn log_format_parses_lowercase() {
        use serde::de::{value, IntoDeserializer};
        let de: value::StrDeserializer<'_, value::Error> = "json".into_deserializer();
        assert_eq!(LogFormat::deserialize(de).unwrap(), LogFormat::Json);
    }
}
