//! Configuration loading
//!
//! YAML configuration with a fallback chain: explicit path, a local
//! `.agendacx.yml`, then the user's config directory. API keys are never
//! stored in the file, only the names of the environment variables that
//! carry them.

use eyre::{eyre, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Model service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_model(),
            api_key_env: default_llm_key_env(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Calendar gateway settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub base_url: String,
    #[serde(default = "default_calendar_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8090".to_string(),
            api_key_env: default_calendar_key_env(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Outbound channel retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// Record store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Team ownership settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamConfig {
    /// Team id every chat maps to in single-tenant deployments
    #[serde(default)]
    pub default_team: i64,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self { default_team: 0 }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub team: TeamConfig,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_key_env() -> String {
    "AGENDACX_LLM_API_KEY".to_string()
}

fn default_calendar_key_env() -> String {
    "AGENDACX_CALENDAR_API_KEY".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_db_path() -> PathBuf {
    PathBuf::from("agendacx.db")
}

impl Config {
    /// Load configuration from the first location that exists: the explicit
    /// path, `.agendacx.yml` in the working directory, then the user config
    /// directory. No file at all means defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let local = PathBuf::from(".agendacx.yml");
        if local.exists() {
            return Self::from_file(&local);
        }

        if let Some(dir) = dirs::config_dir() {
            let global = dir.join("agendacx").join("config.yml");
            if global.exists() {
                return Self::from_file(&global);
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&raw).wrap_err_with(|| format!("parsing {}", path.display()))?;
        debug!(path = %path.display(), "Loaded configuration");
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would only fail later at runtime
    pub fn validate(&self) -> Result<()> {
        if self.llm.base_url.is_empty() {
            return Err(eyre!("llm.base_url must not be empty"));
        }
        if self.llm.model.is_empty() {
            return Err(eyre!("llm.model must not be empty"));
        }
        if self.channel.max_attempts == 0 {
            return Err(eyre!("channel.max_attempts must be at least 1"));
        }
        if self.llm.timeout_ms == 0 || self.calendar.timeout_ms == 0 {
            return Err(eyre!("timeouts must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.channel.max_attempts, 3);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "llm:\n  model: gpt-4o\ncalendar:\n  base_url: https://cal.example.com"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.base_url, default_llm_base_url());
        assert_eq!(config.calendar.base_url, "https://cal.example.com");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "llms:\n  model: typo").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = Config {
            channel: ChannelConfig {
                max_attempts: 0,
                base_delay_ms: 1,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
