//! Configuration management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::application::errors::ConfigError;

/// Relay configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    pub relay: RelayConfig,
    pub adapters: AdaptersConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
    pub prefix: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RelayConfig {
    /// The single channel bridged to the game server
    pub channel_id: String,
    /// Port the poll endpoint listens on
    pub port: u16,
    pub allow_logins: bool,
    pub clean_invite_links: bool,
    pub use_display_names: bool,
    /// Flush game-originated chat every few seconds instead of per message
    pub batch_outgoing: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AdaptersConfig {
    pub discord: Option<DiscordConfig>,
    pub console: Option<ConsoleConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DiscordConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConsoleConfig {
    pub enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "discord-relay".to_string(),
                prefix: "!".to_string(),
                token: None,
            },
            relay: RelayConfig {
                channel_id: String::new(),
                port: 8080,
                allow_logins: true,
                clean_invite_links: true,
                use_display_names: true,
                batch_outgoing: false,
            },
            adapters: AdaptersConfig {
                discord: Some(DiscordConfig { enabled: true }),
                console: Some(ConsoleConfig { enabled: false }),
            },
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: impl Into<PathBuf>) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.into(), content)
            .map_err(|e| ConfigError::Parse(format!("Failed to write config: {}", e)))
    }

    pub fn load_env() -> Self {
        // Load from environment variables
        let mut config = Config::default();

        if let Ok(token) = std::env::var("RELAY_TOKEN") {
            config.bot.token = Some(token);
        }
        if let Ok(prefix) = std::env::var("RELAY_PREFIX") {
            config.bot.prefix = prefix;
        }
        if let Ok(channel_id) = std::env::var("RELAY_CHANNEL_ID") {
            config.relay.channel_id = channel_id;
        }
        if let Ok(port) = std::env::var("RELAY_PORT") {
            if let Ok(port) = port.parse() {
                config.relay.port = port;
            }
        }

        config
    }

    /// Check the fields the relay cannot run without
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relay.channel_id.is_empty() {
            return Err(ConfigError::MissingField("relay.channel-id".to_string()));
        }
        if self.bot.prefix.is_empty() {
            return Err(ConfigError::InvalidValue(
                "bot.prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn discord_enabled(&self) -> bool {
        self.adapters
            .discord
            .as_ref()
            .map(|d| d.enabled)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_yaml() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed.bot.prefix, "!");
        assert_eq!(parsed.relay.port, 8080);
        assert!(parsed.relay.allow_logins);
        assert!(!parsed.relay.batch_outgoing);
    }

    #[test]
    fn kebab_case_keys_are_accepted() {
        let yaml = r#"
bot:
  name: relay
  prefix: "!"
  token: abc
relay:
  channel-id: "42"
  port: 9000
  allow-logins: false
  clean-invite-links: true
  use-display-names: false
  batch-outgoing: true
adapters:
  discord:
    enabled: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.relay.channel_id, "42");
        assert_eq!(config.relay.port, 9000);
        assert!(!config.relay.allow_logins);
        assert!(config.relay.batch_outgoing);
        assert!(config.discord_enabled());
    }

    #[test]
    fn validation_requires_a_channel() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.relay.channel_id = "42".to_string();
        assert!(config.validate().is_ok());
    }
}
