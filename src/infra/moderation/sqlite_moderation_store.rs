use crate::core::moderation::{ModerationError, ModerationStore, TempBan, Warning};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{Pool, Row, Sqlite};

fn storage(e: sqlx::Error) -> ModerationError {
    ModerationError::StorageError(e.to_string())
}

/// Timestamps are stored as unix seconds so `banned_until <= ?` compares
/// numerically.
fn from_unix(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub struct SqliteModerationStore {
    pool: Pool<Sqlite>,
}

impl SqliteModerationStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS warnings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                mod_id INTEGER NOT NULL,
                reason TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_warnings_member ON warnings (guild_id, user_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS banned_users (
                guild_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                banned_until INTEGER NOT NULL,
                PRIMARY KEY (guild_id, user_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ModerationStore for SqliteModerationStore {
    async fn add_warning(
        &self,
        guild_id: u64,
        user_id: u64,
        moderator_id: u64,
        reason: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Warning, ModerationError> {
        let result = sqlx::query(
            "INSERT INTO warnings (guild_id, user_id, mod_id, reason, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .bind(moderator_id as i64)
        .bind(reason)
        .bind(created_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(Warning {
            id: result.last_insert_rowid(),
            guild_id,
            user_id,
            moderator_id,
            reason: reason.to_string(),
            created_at: from_unix(created_at.timestamp()),
        })
    }

    async fn list_warnings(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Vec<Warning>, ModerationError> {
        let rows = sqlx::query(
            "SELECT id, mod_id, reason, created_at FROM warnings WHERE guild_id = ? AND user_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(rows
            .iter()
            .map(|row| Warning {
                id: row.get("id"),
                guild_id,
                user_id,
                moderator_id: row.get::<i64, _>("mod_id") as u64,
                reason: row.get("reason"),
                created_at: from_unix(row.get("created_at")),
            })
            .collect())
    }

    async fn upsert_temp_ban(&self, ban: &TempBan) -> Result<(), ModerationError> {
        sqlx::query(
            r#"
            INSERT INTO banned_users (guild_id, user_id, banned_until)
            VALUES (?, ?, ?)
            ON CONFLICT(guild_id, user_id) DO UPDATE SET
                banned_until = excluded.banned_until
            "#,
        )
        .bind(ban.guild_id as i64)
        .bind(ban.user_id as i64)
        .bind(ban.banned_until.timestamp())
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn delete_temp_ban(&self, guild_id: u64, user_id: u64) -> Result<bool, ModerationError> {
        let result = sqlx::query("DELETE FROM banned_users WHERE guild_id = ? AND user_id = ?")
            .bind(guild_id as i64)
            .bind(user_id as i64)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(result.rows_affected() > 0)
    }

    async fn due_temp_bans(&self, now: DateTime<Utc>) -> Result<Vec<TempBan>, ModerationError> {
        let rows = sqlx::query(
            "SELECT guild_id, user_id, banned_until FROM banned_users WHERE banned_until <= ? ORDER BY banned_until ASC",
        )
        .bind(now.timestamp())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(rows
            .iter()
            .map(|row| TempBan {
                guild_id: row.get::<i64, _>("guild_id") as u64,
                user_id: row.get::<i64, _>("user_id") as u64,
                banned_until: from_unix(row.get("banned_until")),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::duration::AliasPolicy;
    use crate::core::moderation::ModerationService;
    use crate::infra::database::memory_pool;
    use chrono::Duration;

    async fn make_store() -> SqliteModerationStore {
        let store = SqliteModerationStore::new(memory_pool().await);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn warnings_are_listed_oldest_first_per_member() {
        let store = make_store().await;
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();

        store.add_warning(1, 2, 9, "second", t0 + Duration::hours(1)).await.unwrap();
        let first = store.add_warning(1, 2, 9, "first", t0).await.unwrap();
        store.add_warning(1, 3, 9, "other member", t0).await.unwrap();

        let listed = store.list_warnings(1, 2).await.unwrap();
        let reasons: Vec<&str> = listed.iter().map(|w| w.reason.as_str()).collect();
        assert_eq!(reasons, vec!["first", "second"]);
        assert_eq!(listed[0], first);
    }

    #[tokio::test]
    async fn temp_bans_upsert_and_come_due() {
        let store = make_store().await;
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();

        store
            .upsert_temp_ban(&TempBan {
                guild_id: 1,
                user_id: 2,
                banned_until: now - Duration::seconds(1),
            })
            .await
            .unwrap();
        store
            .upsert_temp_ban(&TempBan {
                guild_id: 1,
                user_id: 3,
                banned_until: now + Duration::days(1),
            })
            .await
            .unwrap();

        let due = store.due_temp_bans(now).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].user_id, 2);

        assert!(store.delete_temp_ban(1, 2).await.unwrap());
        assert!(!store.delete_temp_ban(1, 2).await.unwrap());
        assert!(store.due_temp_bans(now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn service_pages_sqlite_warnings() {
        let service = ModerationService::new(make_store().await, AliasPolicy::AllAliases);
        for i in 0..21 {
            service.add_warning(5, 6, 7, &format!("w{i}")).await.unwrap();
        }

        let page = service.warnings_page(5, 6, 2).await.unwrap();
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.warnings.len(), 1);
    }
}
