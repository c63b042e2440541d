// Environment configuration for the bot process.

use anyhow::{anyhow, Context};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::core::duration::AliasPolicy;
use crate::core::leveling::{DEFAULT_XP_COOLDOWN, DEFAULT_XP_PER_MESSAGE};

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub data_dir: PathBuf,
    /// User allowed to run owner-only commands such as `/setstatus`.
    pub owner_id: Option<u64>,
    /// Register commands in this guild only; they show up instantly there.
    pub dev_guild_id: Option<u64>,
    pub xp_per_message: u64,
    pub xp_cooldown: Duration,
    /// How duration options of moderation commands are read.
    pub duration_aliases: AliasPolicy,
}

impl BotConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let token = get("DISCORD_TOKEN").ok_or_else(|| {
            anyhow!("Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.")
        })?;

        let data_dir = get("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));

        let xp_cooldown = parse_var::<u64>(get("XP_COOLDOWN_SECS"), "XP_COOLDOWN_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_XP_COOLDOWN);

        Ok(Self {
            token,
            data_dir,
            owner_id: parse_var(get("BOT_OWNER"), "BOT_OWNER")?,
            dev_guild_id: parse_var(get("DEV_GUILD_ID"), "DEV_GUILD_ID")?,
            xp_per_message: parse_var(get("XP_PER_MESSAGE"), "XP_PER_MESSAGE")?
                .unwrap_or(DEFAULT_XP_PER_MESSAGE),
            xp_cooldown,
            duration_aliases: parse_var(get("DURATION_ALIASES"), "DURATION_ALIASES")?
                .unwrap_or_default(),
        })
    }
}

fn parse_var<T>(value: Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .map(|v| {
            v.trim()
                .parse::<T>()
                .with_context(|| format!("{key} has an invalid value: {v}"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> anyhow::Result<BotConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn token_is_required() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("DISCORD_TOKEN", "  ")]).is_err());
    }

    #[test]
    fn defaults_apply() {
        let config = config_from(&[("DISCORD_TOKEN", "abc")]).unwrap();
        assert_eq!(config.token, "abc");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.owner_id, None);
        assert_eq!(config.dev_guild_id, None);
        assert_eq!(config.xp_per_message, 15);
        assert_eq!(config.xp_cooldown, Duration::from_secs(30));
        assert_eq!(config.duration_aliases, AliasPolicy::AllAliases);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("DATA_DIR", "/var/lib/dorito"),
            ("BOT_OWNER", "1234"),
            ("DEV_GUILD_ID", "5678"),
            ("XP_PER_MESSAGE", "20"),
            ("XP_COOLDOWN_SECS", "60"),
            ("DURATION_ALIASES", "single-letter"),
        ])
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/dorito"));
        assert_eq!(config.owner_id, Some(1234));
        assert_eq!(config.dev_guild_id, Some(5678));
        assert_eq!(config.xp_per_message, 20);
        assert_eq!(config.xp_cooldown, Duration::from_secs(60));
        assert_eq!(config.duration_aliases, AliasPolicy::SingleLetter);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = config_from(&[("DISCORD_TOKEN", "abc"), ("BOT_OWNER", "me")]).unwrap_err();
        assert!(err.to_string().contains("BOT_OWNER"));

        let err = config_from(&[("DISCORD_TOKEN", "abc"), ("DURATION_ALIASES", "fuzzy")])
            .unwrap_err();
        assert!(err.to_string().contains("DURATION_ALIASES"));
    }
}
