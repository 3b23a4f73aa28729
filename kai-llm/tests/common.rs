use std::sync::OnceLock;

use kai_common::observability::{init_logging, LogConfig, LogFormat};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

/// Debug-level logs to stderr and `$TMPDIR/kai-tests`, once per test binary.
#[allow(dead_code)]
pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let json = std::env::var("KAI_LOG_FORMAT")
            .is_ok_and(|raw| raw.trim().eq_ignore_ascii_case("json"));
        let config = LogConfig {
            dir: Some(std::env::temp_dir().join("kai-tests")),
            format: if json { LogFormat::Json } else { LogFormat::Text },
            filter: Some("debug".into()),
            echo_stderr: true,
        };
        init_logging(config).unwrap_or_default()
    });
}
