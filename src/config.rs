//! Env-driven configuration for the service and the CLI.
//!
//! Values are read from the process environment; `dotenv` is loaded on demand
//! by the binaries. Defaults are provided for convenience during development.
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dotenv;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 300;
pub const DEFAULT_HISTORY_CAPACITY: usize = 500;
pub const DEFAULT_QUEUE_TIMEOUT_SECS: u64 = 5;

#[derive(Clone, Debug)]
pub struct Config {
    pub comfyui_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_max_tokens: u32,
    pub prompt_prefix: String,
    pub prompt_suffix: String,
    pub workflows_dir: PathBuf,
    pub output_dir: PathBuf,
    pub admin_user: Option<String>,
    pub admin_pass: Option<String>,
    pub history_capacity: usize,
    pub queue_timeout: Duration,
    pub api_host: String,
    pub api_port: String,
}

impl Config {
    pub fn dotenv_load() {
        dotenv::dotenv().ok();
    }

    pub fn new() -> Result<Self, env::VarError> {
        Ok(Config {
            comfyui_url: env::var("COMFYUI_URL").unwrap_or_else(|_| "http://127.0.0.1:8188".to_string()),
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            openai_base_url: env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            openai_max_tokens: parsed_var("OPENAI_MAX_TOKENS", DEFAULT_MAX_TOKENS),
            prompt_prefix: env::var("PROMPT_PREFIX").unwrap_or_default(),
            prompt_suffix: env::var("PROMPT_SUFFIX").unwrap_or_default(),
            workflows_dir: PathBuf::from(env::var("WORKFLOWS_DIR").unwrap_or_else(|_| "./workflows".to_string())),
            output_dir: PathBuf::from(env::var("OUTPUT_DIR").unwrap_or_else(|_| "./output".to_string())),
            admin_user: non_empty_var("ADMIN_USER"),
            admin_pass: non_empty_var("ADMIN_PASS"),
            history_capacity: capacity_var("HISTORY_CAPACITY"),
            queue_timeout: Duration::from_secs(parsed_var("QUEUE_TIMEOUT_SECS", DEFAULT_QUEUE_TIMEOUT_SECS)),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            api_port: env::var("API_PORT").unwrap_or_else(|_| "8189".to_string()),
        })
    }

    /// Log the effective settings. Secrets are reported as set/unset only.
    pub fn log_summary(&self) {
        tracing::info!(comfyui_url = %self.comfyui_url, "COMFYUI_URL");
        tracing::info!(base_url = %self.openai_base_url, model = %self.openai_model, max_tokens = self.openai_max_tokens, "language model");
        tracing::info!(set = self.openai_api_key.is_some(), "OPENAI_API_KEY");
        tracing::info!(workflows_dir = %self.workflows_dir.display(), output_dir = %self.output_dir.display(), "directories");
        tracing::info!(set = self.admin_user.is_some() && self.admin_pass.is_some(), "ADMIN credentials");
        tracing::info!(capacity = self.history_capacity, queue_timeout_secs = self.queue_timeout.as_secs(), "limits");
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid {} '{}', falling back to {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

fn capacity_var(key: &str) -> usize {
    parsed_var(key, DEFAULT_HISTORY_CAPACITY).max(1)
}
