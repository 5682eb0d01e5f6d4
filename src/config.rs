//! Configuration loading with env-var overrides.
//!
//! Reads an optional TOML file (`$CBOT_CONFIG`, else
//! `<config_dir>/cbot/config.toml`), fills every missing value with a
//! default, then applies `CBOT_LOG_LEVEL` and `CBOT_MODEL` overrides.
//! A missing file is not an error; a malformed one is.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

pub const DEFAULT_MODEL: &str = "llama3.2";
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Hosted (OpenAI chat-completions) provider configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Name of the env var holding the bearer token. The token itself is
    /// read at call time and never sourced from TOML.
    pub api_key_env: String,
    /// Substring of a model identifier that selects this provider.
    pub marker: String,
}

/// Local (Ollama generate) provider configuration.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub api_base_url: String,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    pub openai: OpenAiConfig,
    pub ollama: OllamaConfig,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum number of memory items kept between agent turns; `0` keeps
    /// everything. Eviction removes whole exchanges, so an odd cap keeps one
    /// item fewer.
    pub memory_cap: usize,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    /// Model identifier used when no CLI flag selects one.
    pub model: String,
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_raw(RawConfig::default())
    }
}

impl Config {
    fn from_raw(raw: RawConfig) -> Self {
        Self {
            log_level: raw.log_level,
            model: raw.model,
            llm: LlmConfig {
                timeout_seconds: raw.llm.timeout_seconds,
                openai: OpenAiConfig {
                    api_base_url: raw.llm.openai.api_base_url,
                    api_key_env: raw.llm.openai.api_key_env,
                    marker: raw.llm.openai.marker,
                },
                ollama: OllamaConfig {
                    api_base_url: raw.llm.ollama.api_base_url,
                },
            },
            agent: AgentConfig {
                memory_cap: raw.agent.memory_cap,
            },
            history_limit: raw.history.limit,
        }
    }
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_model")]
    model: String,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    agent: RawAgent,
    #[serde(default)]
    history: RawHistory,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            model: default_model(),
            llm: RawLlm::default(),
            agent: RawAgent::default(),
            history: RawHistory::default(),
        }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
    #[serde(default)]
    openai: RawOpenAi,
    #[serde(default)]
    ollama: RawOllama,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            openai: RawOpenAi::default(),
            ollama: RawOllama::default(),
        }
    }
}

#[derive(Deserialize)]
struct RawOpenAi {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_api_key_env")]
    api_key_env: String,
    #[serde(default = "default_openai_marker")]
    marker: String,
}

impl Default for RawOpenAi {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            api_key_env: default_openai_api_key_env(),
            marker: default_openai_marker(),
        }
    }
}

#[derive(Deserialize)]
struct RawOllama {
    #[serde(default = "default_ollama_api_base_url")]
    api_base_url: String,
}

impl Default for RawOllama {
    fn default() -> Self {
        Self { api_base_url: default_ollama_api_base_url() }
    }
}

#[derive(Deserialize)]
struct RawAgent {
    #[serde(default = "default_memory_cap")]
    memory_cap: usize,
}

impl Default for RawAgent {
    fn default() -> Self {
        Self { memory_cap: default_memory_cap() }
    }
}

#[derive(Deserialize)]
struct RawHistory {
    #[serde(default = "default_history_limit")]
    limit: usize,
}

impl Default for RawHistory {
    fn default() -> Self {
        Self { limit: default_history_limit() }
    }
}

fn default_log_level() -> String { "warn".to_string() }
fn default_model() -> String { DEFAULT_MODEL.to_string() }
fn default_timeout_seconds() -> u64 { 120 }
fn default_openai_api_base_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_openai_api_key_env() -> String { "OPENAI_API_KEY".to_string() }
fn default_openai_marker() -> String { "openai".to_string() }
fn default_ollama_api_base_url() -> String { "http://localhost:11434/api/generate".to_string() }
fn default_memory_cap() -> usize { 100 }
fn default_history_limit() -> usize { DEFAULT_HISTORY_LIMIT }

/// Default config file location: `<config_dir>/cbot/config.toml`.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cbot").join("config.toml"))
}

/// Load config from the resolved path, then apply env-var overrides.
pub fn load() -> Result<Config, AppError> {
    let path = env::var_os("CBOT_CONFIG").map(PathBuf::from).or_else(default_path);
    let log_level_override = env::var("CBOT_LOG_LEVEL").ok();
    let model_override = env::var("CBOT_MODEL").ok();
    load_from(
        path.as_deref(),
        log_level_override.as_deref(),
        model_override.as_deref(),
    )
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: Option<&Path>,
    log_level_override: Option<&str>,
    model_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = match path {
        Some(path) if path.exists() => {
            let text = fs::read_to_string(path)
                .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
            toml::from_str::<RawConfig>(&text)
                .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?
        }
        _ => RawConfig::default(),
    };

    let mut config = Config::from_raw(raw);
    if let Some(level) = log_level_override {
        config.log_level = level.to_string();
    }
    if let Some(model) = model_override {
        config.model = model.to_string();
    }
    Ok(config)
}
