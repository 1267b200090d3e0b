//! Configuration loading and backend wiring.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use verbdrill_core::engine::{DrillEngine, DrillEngineConfig};
use verbdrill_core::selector::SelectorConfig;

use crate::anthropic::AnthropicOracle;
use crate::openai::OpenAiOracle;

pub const CONFIG_FILE_NAME: &str = "verbdrill.toml";

/// Configuration for the language-model backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OracleConfig {
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    Anthropic {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
}

impl std::fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleConfig::OpenAI {
                api_key: _,
                base_url,
                model,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
            OracleConfig::Anthropic {
                api_key: _,
                base_url,
                model,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
        }
    }
}

impl OracleConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            OracleConfig::OpenAI { .. } => "openai",
            OracleConfig::Anthropic { .. } => "anthropic",
        }
    }

    fn api_key(&self) -> &str {
        match self {
            OracleConfig::OpenAI { api_key, .. } | OracleConfig::Anthropic { api_key, .. } => {
                api_key
            }
        }
    }

    /// Whether the backend has a usable key.
    pub fn is_enabled(&self) -> bool {
        !self.api_key().trim().is_empty()
    }
}

/// Top-level verbdrill configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrillConfig {
    /// Language-model backend. Absent means deterministic grading only.
    #[serde(default)]
    pub oracle: Option<OracleConfig>,
    /// Upper bound on one oracle call, in seconds.
    #[serde(default = "default_oracle_timeout")]
    pub oracle_timeout_secs: u64,
    /// Lifetime of the hint marker, in seconds.
    #[serde(default = "default_hint_ttl")]
    pub hint_ttl_secs: u64,
    #[serde(default)]
    pub selection: SelectorConfig,
    /// Verb corpus file.
    #[serde(default = "default_corpus")]
    pub corpus: PathBuf,
    /// Record store file.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

fn default_oracle_timeout() -> u64 {
    10
}
fn default_hint_ttl() -> u64 {
    3600
}
fn default_corpus() -> PathBuf {
    PathBuf::from("./verbs.toml")
}
fn default_store_path() -> PathBuf {
    PathBuf::from("./verbdrill-data/records.json")
}

impl Default for DrillConfig {
    fn default() -> Self {
        Self {
            oracle: None,
            oracle_timeout_secs: default_oracle_timeout(),
            hint_ttl_secs: default_hint_ttl(),
            selection: SelectorConfig::default(),
            corpus: default_corpus(),
            store_path: default_store_path(),
        }
    }
}

impl DrillConfig {
    /// Engine settings derived from this configuration.
    pub fn engine_config(&self) -> DrillEngineConfig {
        DrillEngineConfig {
            selector: self.selection.clone(),
            hint_ttl: Duration::from_secs(self.hint_ttl_secs),
            oracle_timeout: Duration::from_secs(self.oracle_timeout_secs),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_oracle_config(config: &OracleConfig) -> OracleConfig {
    let resolve = |o: &Option<String>| o.as_deref().map(resolve_env_vars);
    match config {
        OracleConfig::OpenAI {
            api_key,
            base_url,
            model,
        } => OracleConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: resolve(base_url),
            model: resolve(model),
        },
        OracleConfig::Anthropic {
            api_key,
            base_url,
            model,
        } => OracleConfig::Anthropic {
            api_key: resolve_env_vars(api_key),
            base_url: resolve(base_url),
            model: resolve(model),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `verbdrill.toml` in the current directory
/// 2. `~/.config/verbdrill/config.toml`
///
/// Environment variable overrides: `VERBDRILL_OPENAI_KEY`, `VERBDRILL_ANTHROPIC_KEY`.
pub fn load_config() -> Result<DrillConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<DrillConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => DrillConfig::default(),
    };

    Ok(finish_config(
        config,
        std::env::var("VERBDRILL_OPENAI_KEY").ok(),
        std::env::var("VERBDRILL_ANTHROPIC_KEY").ok(),
    ))
}

/// Parse a configuration document.
pub fn parse_config(content: &str) -> Result<DrillConfig> {
    Ok(toml::from_str::<DrillConfig>(content)?)
}

/// Apply key overrides, then resolve `${VAR}` references.
fn finish_config(
    mut config: DrillConfig,
    openai_key: Option<String>,
    anthropic_key: Option<String>,
) -> DrillConfig {
    if let Some(key) = anthropic_key {
        match &mut config.oracle {
            Some(OracleConfig::Anthropic { api_key, .. }) => *api_key = key,
            None => {
                config.oracle = Some(OracleConfig::Anthropic {
                    api_key: key,
                    base_url: None,
                    model: None,
                })
            }
            Some(_) => {}
        }
    }

    if let Some(key) = openai_key {
        match &mut config.oracle {
            Some(OracleConfig::OpenAI { api_key, .. }) => *api_key = key,
            None => {
                config.oracle = Some(OracleConfig::OpenAI {
                    api_key: key,
                    base_url: None,
                    model: None,
                })
            }
            Some(_) => {}
        }
    }

    config.oracle = config.oracle.as_ref().map(resolve_oracle_config);
    config
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("verbdrill"))
}

/// Attach the configured backend to an engine as both oracle and hint writer.
///
/// An absent backend or an empty API key leaves the engine deterministic.
pub fn attach_backend(engine: DrillEngine, config: Option<&OracleConfig>) -> Result<DrillEngine> {
    let Some(config) = config.filter(|c| c.is_enabled()) else {
        info!("no oracle configured, grading is deterministic only");
        return Ok(engine);
    };

    let engine = match config {
        OracleConfig::OpenAI {
            api_key,
            base_url,
            model,
        } => {
            let backend = Arc::new(OpenAiOracle::new(api_key, base_url.clone(), model.clone())?);
            info!(model = backend.model(), "using openai oracle");
            engine
                .with_oracle(backend.clone())
                .with_hint_writer(backend)
        }
        OracleConfig::Anthropic {
            api_key,
            base_url,
            model,
        } => {
            let backend = Arc::new(AnthropicOracle::new(
                api_key,
                base_url.clone(),
                model.clone(),
            )?);
            info!(model = backend.model(), "using anthropic oracle");
            engine
                .with_oracle(backend.clone())
                .with_hint_writer(backend)
        }
    };
    Ok(engine)
}
