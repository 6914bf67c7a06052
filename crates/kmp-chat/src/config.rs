//! LLM configuration persistence and provider selection.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{LLMConfigResponse, LLMConfigUpdate, LLMProvider, LlmStatus};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

pub const OPENAI_MODELS: &[&str] = &["gpt-4o", "gpt-4o-mini", "gpt-4-turbo"];
pub const ANTHROPIC_MODELS: &[&str] = &[
    "claude-sonnet-4-20250514",
    "claude-3-5-sonnet-20241022",
    "claude-3-5-haiku-20241022",
];
pub const GROQ_MODELS: &[&str] = &["llama-3.3-70b-versatile", "llama-3.1-8b-instant"];

/// The provider a call will actually go to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProvider {
    pub provider: LLMProvider,
    pub model: String,
    pub api_key: String,
}

/// Stored LLM configuration (persisted to llm-config.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// `auto`, or one of `openai`, `anthropic`, `groq`.
    #[serde(default = "default_preferred")]
    pub preferred_provider: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub groq_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    #[serde(default = "default_groq_model")]
    pub groq_model: String,
    /// Path to config file for saving.
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn default_preferred() -> String {
    "auto".into()
}
fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.into()
}
fn default_anthropic_model() -> String {
    DEFAULT_ANTHROPIC_MODEL.into()
}
fn default_groq_model() -> String {
    DEFAULT_GROQ_MODEL.into()
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            preferred_provider: default_preferred(),
            openai_api_key: None,
            anthropic_api_key: None,
            groq_api_key: None,
            openai_model: default_openai_model(),
            anthropic_model: default_anthropic_model(),
            groq_model: default_groq_model(),
            config_path: PathBuf::new(),
        }
    }
}

/// Blank keys count as missing.
fn usable(key: &Option<String>) -> Option<&str> {
    key.as_deref().map(str::trim).filter(|k| !k.is_empty())
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|k| !k.trim().is_empty())
}

impl LLMConfig {
    /// Load config from file, falling back to env vars and defaults.
    pub fn load(config_path: &Path) -> Self {
        let mut config: LLMConfig = match std::fs::read_to_string(config_path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                warn!("Ignoring unreadable {}: {}", config_path.display(), e);
                LLMConfig::default()
            }),
            Err(_) => LLMConfig::default(),
        };

        config.config_path = config_path.to_path_buf();

        if usable(&config.openai_api_key).is_none() {
            config.openai_api_key = env_key("OPENAI_API_KEY");
        }
        if usable(&config.anthropic_api_key).is_none() {
            config.anthropic_api_key = env_key("ANTHROPIC_API_KEY");
        }
        if usable(&config.groq_api_key).is_none() {
            config.groq_api_key = env_key("GROQ_API_KEY");
        }

        config
    }

    /// Save config to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(&self.config_path, json)?;
        info!("Saved LLM config to {}", self.config_path.display());
        Ok(())
    }

    /// Merge an update into this config.
    pub fn apply_update(&mut self, update: &LLMConfigUpdate) {
        fn set_key(slot: &mut Option<String>, value: &Option<String>) {
            if let Some(v) = value {
                *slot = Some(v.trim().to_string()).filter(|k| !k.is_empty());
            }
        }

        if let Some(p) = &update.preferred_provider {
            self.preferred_provider = p.to_ascii_lowercase();
        }
        set_key(&mut self.openai_api_key, &update.openai_api_key);
        set_key(&mut self.anthropic_api_key, &update.anthropic_api_key);
        set_key(&mut self.groq_api_key, &update.groq_api_key);
        if let Some(m) = &update.openai_model {
            self.openai_model = m.clone();
        }
        if let Some(m) = &update.anthropic_model {
            self.anthropic_model = m.clone();
        }
        if let Some(m) = &update.groq_model {
            self.groq_model = m.clone();
        }
    }

    fn provider_entry(&self, provider: LLMProvider) -> Option<ResolvedProvider> {
        let (key, model) = match provider {
            LLMProvider::OpenAI => (&self.openai_api_key, &self.openai_model),
            LLMProvider::Anthropic => (&self.anthropic_api_key, &self.anthropic_model),
            LLMProvider::Groq => (&self.groq_api_key, &self.groq_model),
        };
        usable(key).map(|k| ResolvedProvider {
            provider,
            model: model.clone(),
            api_key: k.to_string(),
        })
    }

    /// Resolve which provider and model to use.
    ///
    /// An explicit preference is honoured only when its key is set. In auto
    /// mode the order is OpenAI > Anthropic > Groq.
    pub fn resolve(&self) -> Option<ResolvedProvider> {
        if self.preferred_provider != "auto" {
            return LLMProvider::parse(&self.preferred_provider)
                .and_then(|p| self.provider_entry(p));
        }

        [LLMProvider::OpenAI, LLMProvider::Anthropic, LLMProvider::Groq]
            .into_iter()
            .find_map(|p| self.provider_entry(p))
    }

    pub fn is_configured(&self) -> bool {
        self.resolve().is_some()
    }

    /// Build the public config response (no API keys exposed).
    pub fn to_response(&self) -> LLMConfigResponse {
        LLMConfigResponse {
            preferred_provider: self.preferred_provider.clone(),
            openai_configured: usable(&self.openai_api_key).is_some(),
            anthropic_configured: usable(&self.anthropic_api_key).is_some(),
            groq_configured: usable(&self.groq_api_key).is_some(),
            openai_model: self.openai_model.clone(),
            anthropic_model: self.anthropic_model.clone(),
            groq_model: self.groq_model.clone(),
            active_provider: self.resolve().map(|r| r.provider.to_string()),
        }
    }

    /// Availability summary for the status endpoint.
    pub fn status(&self) -> LlmStatus {
        let resolved = self.resolve();
        let available_models: &[&str] = match resolved.as_ref().map(|r| r.provider) {
            Some(LLMProvider::OpenAI) => OPENAI_MODELS,
            Some(LLMProvider::Anthropic) => ANTHROPIC_MODELS,
            Some(LLMProvider::Groq) => GROQ_MODELS,
            None => &[],
        };
        LlmStatus {
            llm_available: resolved.is_some(),
            llm_provider: resolved.as_ref().map(|r| r.provider.to_string()),
            active_model: resolved.map(|r| r.model),
            available_models: available_models.iter().map(|s| s.to_string()).collect(),
        }
    }
}
