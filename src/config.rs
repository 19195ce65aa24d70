use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

use crate::dispatch::BotInfo;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub discord_token: String,
    pub database_path: String,
    pub log_level: String,
    pub default_prefix: String,
    /// Register slash commands to this guild only; global registration otherwise.
    pub test_guild_id: Option<u64>,
    pub documentation_url: Option<String>,
    pub repository_url: Option<String>,
    pub contributors: Option<String>,
    pub bot_invite_private: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let test_guild_id = var("TEST_GUILD_ID")
            .map(|id| {
                id.trim()
                    .parse::<u64>()
                    .map_err(|_| anyhow::anyhow!("TEST_GUILD_ID must be a numeric guild id, got `{}`", id))
            })
            .transpose()?;

        let bot_invite_private = match var("BOT_INVITE_PRIVATE") {
            None => true,
            Some(value) => value
                .trim()
                .parse::<bool>()
                .map_err(|_| anyhow::anyhow!("BOT_INVITE_PRIVATE must be true or false, got `{}`", value))?,
        };

        Ok(Config {
            discord_token: var("DISCORD_TOKEN")
                .ok_or_else(|| anyhow::anyhow!("DISCORD_TOKEN environment variable not set"))?,
            database_path: var("DATABASE_PATH").unwrap_or_else(|| "accounts.db".to_string()),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            default_prefix: var("DEFAULT_PREFIX").unwrap_or_else(|| "!".to_string()),
            test_guild_id,
            documentation_url: var("DOCUMENTATION_URL"),
            repository_url: var("REPOSITORY_URL"),
            contributors: var("CONTRIBUTORS"),
            bot_invite_private,
        })
    }

    pub fn bot_info(&self) -> BotInfo {
        BotInfo {
            default_prefix: self.default_prefix.clone(),
            documentation_url: self.documentation_url.clone(),
            repository_url: self.repository_url.clone(),
            contributors: self.contributors.clone(),
            invite_private: self.bot_invite_private,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_missing_token() {
        let result = Config::from_lookup(lookup(&[("DATABASE_PATH", "x.db")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_with_defaults() {
        let config = Config::from_lookup(lookup(&[("DISCORD_TOKEN", "test_discord_token")])).unwrap();
        assert_eq!(config.discord_token, "test_discord_token");
        assert_eq!(config.database_path, "accounts.db");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.default_prefix, "!");
        assert_eq!(config.test_guild_id, None);
        assert!(config.bot_invite_private);
        assert_eq!(config.bot_info().documentation_url, None);
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "t"),
            ("DEFAULT_PREFIX", "?"),
            ("TEST_GUILD_ID", "1234"),
            ("BOT_INVITE_PRIVATE", "false"),
            ("REPOSITORY_URL", "https://example.com"),
            ("CONTRIBUTORS", ""),
        ]))
        .unwrap();
        assert_eq!(config.test_guild_id, Some(1234));
        assert!(!config.bot_invite_private);

        let info = config.bot_info();
        assert_eq!(info.default_prefix, "?");
        assert_eq!(info.repository_url.as_deref(), Some("https://example.com"));
        assert_eq!(info.contributors, None);
    }

    #[test]
    fn test_config_rejects_bad_guild_id() {
        let result = Config::from_lookup(lookup(&[("DISCORD_TOKEN", "t"), ("TEST_GUILD_ID", "abc")]));
        assert!(result.is_err());
    }
}
