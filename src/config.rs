// src/config.rs

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{fmt, fs, path::Path, time::Duration};

pub const RAPIDAPI_KEY_ENV: &str = "RAPIDAPI_KEY";
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Relay configuration.
///
/// Endpoints, model and timeouts come from an optional `relay.yaml`; every
/// field has a default so the file can be omitted entirely.
///
/// Secrets are never read from the file. They come from the process
/// environment (a `.env` file is honoured at startup) and are injected once,
/// here, so the relays themselves never touch the environment.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub judge0: Judge0Config,

    #[serde(default)]
    pub piston: PistonConfig,

    #[serde(default)]
    pub assistant: AssistantConfig,

    #[serde(default)]
    pub timeouts: Timeouts,

    #[serde(skip)]
    pub secrets: Secrets,
}

/// Example:
///
/// server:
///   addr: 0.0.0.0:3000
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

fn default_addr() -> String {
    "0.0.0.0:3000".to_string()
}

/// Judge0 through RapidAPI.
///
/// `host` is sent as `X-RapidAPI-Host` on every call.
#[derive(Debug, Clone, Deserialize)]
pub struct Judge0Config {
    #[serde(default = "default_judge0_base_url")]
    pub base_url: String,

    #[serde(default = "default_judge0_host")]
    pub host: String,
}

impl Default for Judge0Config {
    fn default() -> Self {
        Self {
            base_url: default_judge0_base_url(),
            host: default_judge0_host(),
        }
    }
}

fn default_judge0_base_url() -> String {
    "https://judge0-ce.p.rapidapi.com".to_string()
}

fn default_judge0_host() -> String {
    "judge0-ce.p.rapidapi.com".to_string()
}

/// Piston public executor.
///
/// Example:
///
/// piston:
///   base_url: https://emkc.org/api/v2/piston
///   compile_timeout_ms: 10000
///   run_timeout_ms: 3000
#[derive(Debug, Clone, Deserialize)]
pub struct PistonConfig {
    #[serde(default = "default_piston_base_url")]
    pub base_url: String,

    /// Forwarded to Piston; enforced by Piston, not by us.
    #[serde(default = "default_compile_timeout_ms")]
    pub compile_timeout_ms: u64,

    #[serde(default = "default_run_timeout_ms")]
    pub run_timeout_ms: u64,
}

impl Default for PistonConfig {
    fn default() -> Self {
        Self {
            base_url: default_piston_base_url(),
            compile_timeout_ms: default_compile_timeout_ms(),
            run_timeout_ms: default_run_timeout_ms(),
        }
    }
}

fn default_piston_base_url() -> String {
    "https://emkc.org/api/v2/piston".to_string()
}

fn default_compile_timeout_ms() -> u64 {
    10_000
}

fn default_run_timeout_ms() -> u64 {
    3_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_assistant_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: default_assistant_base_url(),
            model: default_model(),
        }
    }
}

fn default_assistant_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

/// Wall-clock bound applied to each outbound call.
#[derive(Debug, Clone, Deserialize)]
pub struct Timeouts {
    #[serde(default = "default_upstream_ms")]
    pub upstream_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            upstream_ms: default_upstream_ms(),
        }
    }
}

fn default_upstream_ms() -> u64 {
    10_000
}

impl Timeouts {
    pub fn upstream(&self) -> Duration {
        Duration::from_millis(self.upstream_ms)
    }
}

/// Credentials for the outbound services.
#[derive(Clone, Default)]
pub struct Secrets {
    /// Shared RapidAPI key (Judge0). Piston needs none.
    pub rapidapi_key: Option<String>,

    pub gemini_api_key: Option<String>,
}

impl Secrets {
    /// Read secrets from the process environment. Blank values count as unset.
    pub fn from_env() -> Self {
        Self {
            rapidapi_key: non_blank_env(RAPIDAPI_KEY_ENV),
            gemini_api_key: non_blank_env(GEMINI_API_KEY_ENV),
        }
    }
}

// Keys must never end up in logs.
impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("rapidapi_key", &self.rapidapi_key.as_ref().map(|_| "<redacted>"))
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn non_blank_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load and parse a YAML config file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let cfg: Config =
            serde_yaml::from_str(&raw).context("Failed to parse YAML config")?;

        Ok(cfg)
    }

    /// Resolve the effective configuration:
    /// - file (if given) or defaults
    /// - secrets from the environment
    /// - structural validation
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };

        cfg.secrets = Secrets::from_env();
        cfg.validate()?;

        Ok(cfg)
    }

    /// Reject configurations the relays cannot work with.
    ///
    /// Missing secrets are not an error here: each relay reports them per call
    /// so the remaining relays keep working.
    pub fn validate(&self) -> Result<()> {
        if self.timeouts.upstream_ms == 0 {
            bail!("timeouts.upstream_ms must be greater than zero");
        }

        for (name, url) in [
            ("judge0.base_url", &self.judge0.base_url),
            ("piston.base_url", &self.piston.base_url),
            ("assistant.base_url", &self.assistant.base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("{} must be an http(s) URL, got {:?}", name, url);
            }
        }

        if self.judge0.host.trim().is_empty() {
            bail!("judge0.host must not be empty");
        }

        if self.assistant.model.trim().is_empty() {
            bail!("assistant.model must not be empty");
        }

        Ok(())
    }

    /// Names of the environment variables that are not set.
    pub fn missing_secrets(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();

        if self.secrets.rapidapi_key.is_none() {
            missing.push(RAPIDAPI_KEY_ENV);
        }
        if self.secrets.gemini_api_key.is_none() {
            missing.push(GEMINI_API_KEY_ENV);
        }

        missing
    }
}
