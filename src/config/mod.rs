use crate::core::error::VtaiError;
use crate::providers::base_client::DEFAULT_MAX_RETRIES;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

pub mod models;
pub mod settings;

pub use settings::{SessionSettings, SettingKey, SettingsUpdate};

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant who tries their best to answer questions: ";

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Gemini,
}

impl FromStr for Provider {
    type Err = VtaiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "gemini" => Ok(Provider::Gemini),
            _ => Err(VtaiError::Config(format!("unknown provider '{}'", s))),
        }
    }
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }

    /// Splits a `provider/model` identifier. Models without a known prefix belong to OpenAI.
    pub fn for_model(model: &str) -> (Provider, &str) {
        match model.split_once('/') {
            Some((prefix, rest)) => match prefix.parse() {
                Ok(provider) => (provider, rest),
                Err(_) => (Provider::OpenAI, model),
            },
            None => (Provider::OpenAI, model),
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub providers: HashMap<Provider, ProviderConfig>,
    #[serde(default)]
    pub defaults: SessionSettings,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Route definition file; the bundled definitions are used when unset.
    #[serde(default)]
    pub routes_path: Option<PathBuf>,
    /// Minimum similarity for a query to join a route. Unset means the
    /// encoder's usual threshold.
    #[serde(default)]
    pub route_score_threshold: Option<f32>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            defaults: SessionSettings::default(),
            system_prompt: default_system_prompt(),
            routes_path: None,
            route_score_threshold: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl Config {
    fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".vtai")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    pub fn load() -> Result<Config, VtaiError> {
        let path = Self::config_path();

        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let config = serde_yml::from_str::<Config>(&contents)
                .map_err(|e| VtaiError::Config(format!("Parse {}: {}", path.display(), e)))?;
            config.defaults.validate().map_err(|e| {
                VtaiError::Config(format!("Invalid defaults in {}: {}", path.display(), e))
            })?;
            return Ok(config);
        }

        let config = Config::default();
        if let Err(e) = config.save() {
            tracing::warn!(path = %path.display(), error = %e, "could not write default config");
        }
        Ok(config)
    }

    pub fn save(&self) -> Result<(), VtaiError> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml_content = serde_yml::to_string(self)?;
        fs::write(&path, yaml_content)?;
        Ok(())
    }

    pub fn history_dir() -> PathBuf {
        Self::config_dir().join("history")
    }

    pub fn input_history_path() -> PathBuf {
        Self::config_dir().join("input_history.txt")
    }

    /// API key for `provider`: the environment wins over the config file.
    pub fn api_key(&self, provider: Provider) -> Option<String> {
        std::env::var(provider.api_key_env())
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                self.providers
                    .get(&provider)
                    .and_then(|p| p.api_key.clone())
                    .filter(|k| !k.trim().is_empty())
            })
    }

    pub fn base_url(&self, provider: Provider) -> String {
        self.providers
            .get(&provider)
            .and_then(|p| p.base_url.clone())
            .unwrap_or_else(|| provider.default_base_url().to_string())
    }

    /// Fills in missing API keys by asking on the terminal with hidden input.
    /// The OpenAI key is required; the Gemini key (vision) may be skipped.
    pub fn prompt_missing_keys(&mut self) -> Result<(), VtaiError> {
        let prompts = [
            (Provider::OpenAI, "Enter OpenAI API Key: ", true),
            (
                Provider::Gemini,
                "Enter Google Gemini API Key, this is used for Vision capability. You can skip this: ",
                false,
            ),
        ];

        let term = console::Term::stderr();
        for (provider, prompt, required) in prompts {
            if self.api_key(provider).is_some() {
                continue;
            }

            term.write_str(prompt)?;
            let key = term.read_secure_line()?.trim().to_string();
            if key.is_empty() {
                if required {
                    return Err(VtaiError::Config(format!(
                        "{} is required",
                        provider.api_key_env()
                    )));
                }
                tracing::info!(provider = ?provider, "no API key provided, skipping");
                continue;
            }

            self.providers.entry(provider).or_default().api_key = Some(key);
        }
        Ok(())
    }
}
