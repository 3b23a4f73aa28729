//! Loader for Kai configuration with YAML + environment overlays.
//!
//! Sources, lowest precedence first:
//!
//! 1. serde defaults on [`KaiConfig`]
//! 2. an optional YAML/TOML/JSON file (`kai.yaml` by convention)
//! 3. `KAI__`-prefixed environment variables (`KAI__GENERATION__TOP_K=20`)
//! 4. explicit overrides (CLI flags)
//!
//! String values may reference the environment as `${VAR}`; expansion runs
//! after merging. When no API key is configured the loader falls back to
//! `GEMINI_API_KEY` and fails if that is unset too.
use config::{Config, ConfigError, Environment, File};
use kai_common::observability::LogFormat;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Environment variable consulted when the merged config has no `api_key`.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Deserialize)]
pub struct KaiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub ui: UiSettings,
}

/// Sampling parameters sent with every request.
///
/// The defaults are the values kai always sends. A `generation` section or
/// `KAI__GENERATION__*` only changes them when someone opts in.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
            response_mime_type: "text/plain".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: Option<PathBuf>,
    pub format: LogFormat,
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormat::Text,
            filter: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Redraw/spinner interval.
    pub tick_ms: u64,
    /// How long the "Copied!" indicator stays lit.
    pub copied_ms: u64,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            tick_ms: 80,
            copied_ms: 2000,
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.into()
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_request_timeout_secs() -> u64 {
    120
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// An API key is usable once it is non-empty and fully expanded.
fn usable_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && !key.contains("${")
}

/// Builder hides the `config` crate wiring (file + env + overrides).
pub struct KaiConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    overrides: Vec<(String, String)>,
}

impl Default for KaiConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl KaiConfigLoader {
    /// Start with no file sources; `KAI__` environment overrides are merged on load.
    ///
    /// ```
    /// use kai_config::KaiConfigLoader;
    ///
    /// let config = KaiConfigLoader::new()
    ///     .with_yaml_str("api_key: test-key\nmodel: gemini-1.5-pro")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.model, "gemini-1.5-pro");
    /// assert_eq!(config.generation.top_k, 40);
    /// ```
    pub fn new() -> Self {
        let builder = Config::builder();
        Self {
            builder,
            overrides: Vec::new(),
        }
    }

    /// Attach a config file that must exist; the format is inferred from the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a config file that is skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet (tests, doc examples).
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Force a single key, e.g. `model` from the command line.
    pub fn with_override(mut self, key: &str, value: impl Into<String>) -> Self {
        self.overrides.push((key.to_string(), value.into()));
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders and resolve the API key.
    ///
    /// ```
    /// use kai_config::KaiConfigLoader;
    ///
    /// unsafe { std::env::set_var("KAI_DOC_KEY", "injected-from-env"); }
    ///
    /// let config = KaiConfigLoader::new()
    ///     .with_yaml_str("api_key: \"${KAI_DOC_KEY}\"")
    ///     .load()
    ///     .expect("valid configuration");
    /// assert_eq!(config.api_key, "injected-from-env");
    ///
    /// unsafe { std::env::remove_var("KAI_DOC_KEY"); }
    /// ```
    pub fn load(self) -> Result<KaiConfig, ConfigError> {
        let mut builder = self.builder.add_source(
            Environment::with_prefix("KAI")
                .separator("__")
                .try_parsing(true),
        );
        for (key, value) in self.overrides {
            builder = builder.set_override(key, value)?;
        }
        let cfg = builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let mut typed: KaiConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        if !usable_key(&typed.api_key) {
            typed.api_key = std::env::var(API_KEY_ENV).unwrap_or_default();
        }
        if !usable_key(&typed.api_key) {
            return Err(ConfigError::Message("API key is not defined".into()));
        }
        typed.api_key = typed.api_key.trim().to_string();

        Ok(typed)
    }
}
