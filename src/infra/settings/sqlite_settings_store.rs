use crate::core::settings::{GuildSettings, LevelRewards, SettingsError, SettingsStore};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};
use tracing::warn;

fn storage(e: sqlx::Error) -> SettingsError {
    SettingsError::StorageError(e.to_string())
}

pub struct SqliteSettingsStore {
    pool: Pool<Sqlite>,
}

impl SqliteSettingsStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS guild_settings (
                guild_id INTEGER PRIMARY KEY,
                logging BOOLEAN NOT NULL DEFAULT 0,
                botonly_logging BOOLEAN NOT NULL DEFAULT 1,
                moderation BOOLEAN NOT NULL DEFAULT 1,
                utility BOOLEAN NOT NULL DEFAULT 1,
                fun BOOLEAN NOT NULL DEFAULT 1,
                leveling BOOLEAN NOT NULL DEFAULT 1,
                restrict_cmds BOOLEAN NOT NULL DEFAULT 0,
                modlog_channel INTEGER,
                cmd_channel INTEGER,
                no_xp_channels TEXT NOT NULL DEFAULT '[]',
                level_rewards TEXT NOT NULL DEFAULT '{}',
                level_notifs BOOLEAN NOT NULL DEFAULT 1
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Malformed JSON columns fall back to empty values instead of making the
/// whole guild unreadable.
fn parse_json_column<T: serde::de::DeserializeOwned + Default>(
    guild_id: u64,
    column: &str,
    raw: &str,
) -> T {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(guild_id, column, error = %e, "Ignoring malformed settings column");
        T::default()
    })
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn load(&self, guild_id: u64) -> Result<Option<GuildSettings>, SettingsError> {
        let row = sqlx::query("SELECT * FROM guild_settings WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let no_xp_channels: Vec<u64> =
            parse_json_column(guild_id, "no_xp_channels", row.get("no_xp_channels"));
        let level_rewards: LevelRewards =
            parse_json_column(guild_id, "level_rewards", row.get("level_rewards"));

        Ok(Some(GuildSettings {
            guild_id,
            logging: row.get("logging"),
            botonly_logging: row.get("botonly_logging"),
            moderation: row.get("moderation"),
            utility: row.get("utility"),
            fun: row.get("fun"),
            leveling: row.get("leveling"),
            restrict_cmds: row.get("restrict_cmds"),
            modlog_channel: row
                .get::<Option<i64>, _>("modlog_channel")
                .map(|id| id as u64),
            cmd_channel: row.get::<Option<i64>, _>("cmd_channel").map(|id| id as u64),
            no_xp_channels,
            level_rewards,
            level_notifs: row.get("level_notifs"),
        }))
    }

    async fn save(&self, settings: &GuildSettings) -> Result<(), SettingsError> {
        let no_xp_channels = serde_json::to_string(&settings.no_xp_channels)
            .map_err(|e| SettingsError::StorageError(e.to_string()))?;
        let level_rewards = serde_json::to_string(&settings.level_rewards)
            .map_err(|e| SettingsError::StorageError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO guild_settings (
                guild_id, logging, botonly_logging, moderation, utility, fun, leveling,
                restrict_cmds, modlog_channel, cmd_channel, no_xp_channels, level_rewards,
                level_notifs
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET
                logging = excluded.logging,
                botonly_logging = excluded.botonly_logging,
                moderation = excluded.moderation,
                utility = excluded.utility,
                fun = excluded.fun,
                leveling = excluded.leveling,
                restrict_cmds = excluded.restrict_cmds,
                modlog_channel = excluded.modlog_channel,
                cmd_channel = excluded.cmd_channel,
                no_xp_channels = excluded.no_xp_channels,
                level_rewards = excluded.level_rewards,
                level_notifs = excluded.level_notifs
            "#,
        )
        .bind(settings.guild_id as i64)
        .bind(settings.logging)
        .bind(settings.botonly_logging)
        .bind(settings.moderation)
        .bind(settings.utility)
        .bind(settings.fun)
        .bind(settings.leveling)
        .bind(settings.restrict_cmds)
        .bind(settings.modlog_channel.map(|id| id as i64))
        .bind(settings.cmd_channel.map(|id| id as i64))
        .bind(no_xp_channels)
        .bind(level_rewards)
        .bind(settings.level_notifs)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::{ChannelKind, Feature, SettingsService};
    use crate::infra::database::memory_pool;

    async fn make_store() -> SqliteSettingsStore {
        let store = SqliteSettingsStore::new(memory_pool().await);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn missing_row_loads_as_none() {
        let store = make_store().await;
        assert!(store.load(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn saved_settings_round_trip() {
        let store = make_store().await;
        let mut settings = GuildSettings::defaults(1);
        settings.logging = true;
        settings.modlog_channel = Some(u64::MAX >> 2);
        settings.no_xp_channels = vec![5, 6];
        settings.level_rewards.add(10, 99);
        settings.level_notifs = false;

        store.save(&settings).await.unwrap();

        assert_eq!(store.load(1).await.unwrap(), Some(settings));
    }

    #[tokio::test]
    async fn malformed_json_falls_back_to_empty() {
        let store = make_store().await;
        store.save(&GuildSettings::defaults(1)).await.unwrap();
        sqlx::query("UPDATE guild_settings SET level_rewards = 'nonsense' WHERE guild_id = 1")
            .execute(&store.pool)
            .await
            .unwrap();

        let loaded = store.load(1).await.unwrap().unwrap();
        assert!(loaded.level_rewards.is_empty());
    }

    #[tokio::test]
    async fn service_persists_through_sqlite() {
        let service = SettingsService::new(make_store().await);

        service.set_feature(3, Feature::Fun, false).await.unwrap();
        service.set_channel(3, ChannelKind::Commands, 44).await.unwrap();

        let settings = service.get(3).await.unwrap();
        assert!(!settings.fun);
        assert_eq!(settings.cmd_channel, Some(44));
    }
}
