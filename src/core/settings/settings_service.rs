// Guild settings service: feature flags, channels, leveling configuration.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use super::settings_models::{ChannelKind, Feature, GuildSettings, Toggle, MAX_REWARD_LEVEL};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Level must be between 1 and 200, got {0}")]
    InvalidLevel(u32),
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// The stored row, or `None` if the guild never changed anything.
    async fn load(&self, guild_id: u64) -> Result<Option<GuildSettings>, SettingsError>;

    /// Insert or replace the whole row.
    async fn save(&self, settings: &GuildSettings) -> Result<(), SettingsError>;
}

pub struct SettingsService<S: SettingsStore> {
    store: S,
    /// Serializes read-modify-write cycles so two admins editing at once
    /// cannot drop each other's change.
    write_lock: Mutex<()>,
}

impl<S: SettingsStore> SettingsService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn get(&self, guild_id: u64) -> Result<GuildSettings, SettingsError> {
        Ok(self
            .store
            .load(guild_id)
            .await?
            .unwrap_or_else(|| GuildSettings::defaults(guild_id)))
    }

    /// Load, apply `change`, and persist only if `change` reports a change.
    async fn update<T: Send>(
        &self,
        guild_id: u64,
        change: impl FnOnce(&mut GuildSettings) -> (bool, T) + Send,
    ) -> Result<T, SettingsError> {
        let _guard = self.write_lock.lock().await;
        let mut settings = self.get(guild_id).await?;
        let (changed, result) = change(&mut settings);
        if changed {
            self.store.save(&settings).await?;
        }
        Ok(result)
    }

    pub async fn set_feature(
        &self,
        guild_id: u64,
        feature: Feature,
        enabled: bool,
    ) -> Result<Toggle, SettingsError> {
        self.update(guild_id, |s| {
            if s.is_enabled(feature) == enabled {
                (false, Toggle::Unchanged)
            } else {
                s.set_enabled(feature, enabled);
                (true, Toggle::Changed)
            }
        })
        .await
    }

    pub async fn set_channel(
        &self,
        guild_id: u64,
        kind: ChannelKind,
        channel_id: u64,
    ) -> Result<(), SettingsError> {
        self.update(guild_id, |s| {
            let slot = match kind {
                ChannelKind::Modlog => &mut s.modlog_channel,
                ChannelKind::Commands => &mut s.cmd_channel,
            };
            let changed = *slot != Some(channel_id);
            *slot = Some(channel_id);
            (changed, ())
        })
        .await
    }

    /// Returns `false` if the channel was already excluded.
    pub async fn add_no_xp_channel(
        &self,
        guild_id: u64,
        channel_id: u64,
    ) -> Result<bool, SettingsError> {
        self.update(guild_id, |s| {
            if s.no_xp_channels.contains(&channel_id) {
                (false, false)
            } else {
                s.no_xp_channels.push(channel_id);
                (true, true)
            }
        })
        .await
    }

    /// Returns `false` if the channel was not excluded.
    pub async fn remove_no_xp_channel(
        &self,
        guild_id: u64,
        channel_id: u64,
    ) -> Result<bool, SettingsError> {
        self.update(guild_id, |s| {
            let before = s.no_xp_channels.len();
            s.no_xp_channels.retain(|c| *c != channel_id);
            let removed = s.no_xp_channels.len() != before;
            (removed, removed)
        })
        .await
    }

    /// Returns `false` if the role already rewards that level.
    pub async fn add_level_reward(
        &self,
        guild_id: u64,
        level: u32,
        role_id: u64,
    ) -> Result<bool, SettingsError> {
        if !(1..=MAX_REWARD_LEVEL).contains(&level) {
            return Err(SettingsError::InvalidLevel(level));
        }

        self.update(guild_id, |s| {
            let added = s.level_rewards.add(level, role_id);
            (added, added)
        })
        .await
    }

    /// Returns `false` if the role was not a reward anywhere.
    pub async fn remove_level_reward(
        &self,
        guild_id: u64,
        role_id: u64,
    ) -> Result<bool, SettingsError> {
        self.update(guild_id, |s| {
            let removed = s.level_rewards.remove_role(role_id);
            (removed, removed)
        })
        .await
    }

    pub async fn set_level_notifications(
        &self,
        guild_id: u64,
        enabled: bool,
    ) -> Result<Toggle, SettingsError> {
        self.update(guild_id, |s| {
            if s.level_notifs == enabled {
                (false, Toggle::Unchanged)
            } else {
                s.level_notifs = enabled;
                (true, Toggle::Changed)
            }
        })
        .await
    }
}
