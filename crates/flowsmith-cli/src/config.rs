//! Application configuration.
//!
//! Reads `config/flowsmith.toml` (or the file named by `--config`), then
//! applies environment overrides.  Every key is optional; a missing default
//! file means built-in defaults.

use std::path::Path;

use anyhow::{Context, Result, bail};
use flowsmith_llm::LlmClientConfig;
use flowsmith_workflow::GeneratorConfig;
use serde::Deserialize;
use tracing::debug;

/// Path tried when no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/flowsmith.toml";

/// Fallback variable consulted when `api_key_env` is unset.
const FALLBACK_API_KEY_ENV: &str = "API_KEY";

/// Overrides `model.name`.
const MODEL_OVERRIDE_ENV: &str = "FLOWSMITH_MODEL";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub model: ModelSection,
    pub generation: GenerationSection,
}

/// Which API family the model is served from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum ProviderKind {
    #[default]
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
}

/// `[model]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelSection {
    pub provider: ProviderKind,
    pub name: String,
    /// Required for `openai_compatible`; overrides the public endpoint otherwise.
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Reasoning budget, only sent to Gemini.
    pub thinking_budget: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            name: "gemini-2.5-pro".into(),
            base_url: None,
            api_key_env: "GEMINI_API_KEY".into(),
            max_tokens: None,
            temperature: None,
            thinking_budget: Some(32_768),
            timeout_secs: 120,
        }
    }
}

/// `[generation]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationSection {
    /// Default package preference when `--allow-marketplace` is not given.
    pub allow_marketplace: bool,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load from `explicit`, or from [`DEFAULT_CONFIG_PATH`] if it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path,
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if !default.exists() {
                    debug!(path = DEFAULT_CONFIG_PATH, "no config file, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;

        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup(MODEL_OVERRIDE_ENV).filter(|m| !m.trim().is_empty()) {
            debug!(model = %model, "model overridden from environment");
            self.model.name = model;
        }
    }

    /// The API key, from `api_key_env` and then `API_KEY`.  Empty when
    /// neither is set; the client rejects it.
    pub fn api_key(&self, lookup: impl Fn(&str) -> Option<String>) -> String {
        [self.model.api_key_env.as_str(), FALLBACK_API_KEY_ENV]
            .into_iter()
            .filter_map(|name| lookup(name))
            .find(|key| !key.trim().is_empty())
            .unwrap_or_default()
    }

    /// Client settings for the configured provider.
    pub fn llm_client_config(&self, api_key: String) -> Result<LlmClientConfig> {
        let model = &self.model;
        let mut config = match model.provider {
            ProviderKind::Gemini => LlmClientConfig::gemini(api_key, &model.name),
            ProviderKind::OpenAi => LlmClientConfig::openai(api_key, &model.name),
            ProviderKind::OpenAiCompatible => {
                let Some(base_url) = &model.base_url else {
                    bail!("model.base_url is required for provider openai_compatible");
                };
                LlmClientConfig::openai_compatible(api_key, &model.name, base_url)
            }
        };

        if let Some(base_url) = &model.base_url {
            config.base_url = base_url.trim_end_matches('/').to_owned();
        }
        config.max_tokens = model.max_tokens;
        config.timeout_secs = model.timeout_secs;
        Ok(config)
    }

    /// Request parameters for the solution generator.
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            model: self.model.name.clone(),
            temperature: self.model.temperature,
            max_tokens: self.model.max_tokens,
            thinking_budget: match self.model.provider {
                ProviderKind::Gemini => self.model.thinking_budget,
                ProviderKind::OpenAi | ProviderKind::OpenAiCompatible => None,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
