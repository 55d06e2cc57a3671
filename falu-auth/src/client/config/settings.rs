use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_authority")]
    pub authority: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Pause between showing the user code and opening the browser
    #[serde(default = "default_browser_delay_secs")]
    pub browser_delay_secs: u64,
}

fn default_api_base_url() -> String {
    "https://api.falu.io".to_string()
}

fn default_authority() -> String {
    "https://login.falu.io".to_string()
}

fn default_client_id() -> String {
    "cli".to_string()
}

fn default_scope() -> String {
    "openid offline_access api".to_string()
}

fn default_browser_delay_secs() -> u64 {
    2
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            authority: default_authority(),
            client_id: default_client_id(),
            scope: default_scope(),
            browser_delay_secs: default_browser_delay_secs(),
        }
    }
}

impl Settings {
    /// Load settings from `FALU_CONFIG` (or `<config dir>/falu/config.toml`)
    /// layered with `FALU__*` environment variables
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = std::env::var("FALU_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::config_dir().map(|dir| dir.join("falu").join("config.toml")));

        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(false));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("FALU").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    pub fn browser_delay(&self) -> Duration {
        Duration::from_secs(self.browser_delay_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("api_base_url", &self.api_base_url),
            ("authority", &self.authority),
        ] {
            if value.is_empty() {
                return Err(format!("{} is required", name));
            }
            if !value.starts_with("http") {
                return Err(format!("{} must be a valid HTTP(S) URL", name));
            }
        }
        if self.client_id.is_empty() {
            return Err("client_id is required".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_http_authority() {
        let settings = Settings {
            authority: "login.falu.io".into(),
            ..Settings::default()
        };
        assert_eq!(
            settings.validate(),
            Err("authority must be a valid HTTP(S) URL".to_string())
        );
    }

    #[test]
    fn test_validate_rejects_empty_client_id() {
        let settings = Settings {
            client_id: String::new(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
