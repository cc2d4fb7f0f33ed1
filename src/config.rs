use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const APP_NAME: &str = "paradox-analyzer";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("provider \"azure\" needs a `deployment` name")]
    MissingDeployment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAI,
    Azure,
}

/// Settings for the remote chat-completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub provider: Provider,
    pub api_base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
    pub api_version: String,
    pub timeout_secs: u64,
    /// Animation frames for the progress spinner; empty keeps the built-in set.
    #[serde(default)]
    pub spinner_glyphs: String,
    pub spinner_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: Provider::OpenAI,
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4-turbo".to_string(),
            deployment: None,
            api_version: "2025-04-01-preview".to_string(),
            timeout_secs: 60,
            spinner_glyphs: String::new(),
            spinner_interval_ms: 100,
        }
    }
}

impl Config {
    /// `$XDG_CONFIG_HOME/paradox-analyzer/config.toml`, when a home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        xdg::BaseDirectories::with_prefix(APP_NAME).get_config_file("config.toml")
    }

    /// Layers defaults, the TOML file at `path` (if it exists), `PARADOX_*`
    /// variables and finally `OPENAI_API_KEY`.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        let config: Config = figment
            .merge(Env::prefixed("PARADOX_"))
            .merge(Env::raw().only(&["OPENAI_API_KEY"]).map(|_| "api_key".into()))
            .extract()
            .map_err(Box::new)?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.provider == Provider::Azure && self.deployment.is_none() {
            return Err(ConfigError::MissingDeployment);
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }
}
