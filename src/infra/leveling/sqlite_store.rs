use crate::core::leveling::{AppliedAward, LevelCurve, LevelingError, Progression, ProgressionStore};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

fn storage(e: sqlx::Error) -> LevelingError {
    LevelingError::StorageUnavailable(e.to_string())
}

pub struct SqliteProgressionStore {
    pool: Pool<Sqlite>,
}

impl SqliteProgressionStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS levels (
                guild_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                xp INTEGER NOT NULL DEFAULT 0,
                level INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (guild_id, user_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_levels_guild_xp ON levels (guild_id, xp DESC)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn row_to_progression(row: &sqlx::sqlite::SqliteRow, guild_id: u64) -> Progression {
    Progression {
        user_id: row.get::<i64, _>("user_id") as u64,
        guild_id,
        xp: row.get::<i64, _>("xp").max(0) as u64,
        level: row.get::<i64, _>("level").clamp(0, u32::MAX as i64) as u32,
    }
}

#[async_trait]
impl ProgressionStore for SqliteProgressionStore {
    async fn get_progress(
        &self,
        user_id: u64,
        guild_id: u64,
    ) -> Result<Option<Progression>, LevelingError> {
        let row = sqlx::query(
            "SELECT user_id, xp, level FROM levels WHERE guild_id = ? AND user_id = ?",
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        Ok(row.map(|row| row_to_progression(&row, guild_id)))
    }

    async fn apply_award(
        &self,
        user_id: u64,
        guild_id: u64,
        amount: u64,
        curve: LevelCurve,
    ) -> Result<AppliedAward, LevelingError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        sqlx::query(
            r#"
            INSERT INTO levels (guild_id, user_id, xp, level)
            VALUES (?, ?, ?, 0)
            ON CONFLICT(guild_id, user_id) DO UPDATE SET
            xp = xp + excluded.xp
            "#,
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .bind(i64::try_from(amount).unwrap_or(i64::MAX))
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        let row = sqlx::query(
            "SELECT user_id, xp, level FROM levels WHERE guild_id = ? AND user_id = ?",
        )
        .bind(guild_id as i64)
        .bind(user_id as i64)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage)?;

        let mut progression = row_to_progression(&row, guild_id);
        let previous_level = progression.level;
        progression.level = curve.next_level(previous_level, progression.xp);

        if progression.level != previous_level {
            sqlx::query("UPDATE levels SET level = ? WHERE guild_id = ? AND user_id = ?")
                .bind(progression.level as i64)
                .bind(guild_id as i64)
                .bind(user_id as i64)
                .execute(&mut *tx)
                .await
                .map_err(storage)?;
        }

        tx.commit().await.map_err(storage)?;

        Ok(AppliedAward {
            previous_level,
            progression,
        })
    }

    async fn count_ahead(&self, guild_id: u64, xp: u64) -> Result<u64, LevelingError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM levels WHERE guild_id = ? AND xp > ?")
            .bind(guild_id as i64)
            .bind(i64::try_from(xp).unwrap_or(i64::MAX))
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;

        Ok(count.max(0) as u64)
    }

    async fn top(&self, guild_id: u64, limit: usize) -> Result<Vec<Progression>, LevelingError> {
        let rows = sqlx::query(
            "SELECT user_id, xp, level FROM levels WHERE guild_id = ? ORDER BY xp DESC, user_id ASC LIMIT ?",
        )
        .bind(guild_id as i64)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(rows
            .iter()
            .map(|row| row_to_progression(row, guild_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::leveling::{LevelingService, XpAward};
    use crate::infra::database::memory_pool;

    async fn make_store() -> SqliteProgressionStore {
        let store = SqliteProgressionStore::new(memory_pool().await);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn award_creates_then_accumulates() {
        let store = make_store().await;
        let curve = LevelCurve::default();

        assert!(store.get_progress(1, 10).await.unwrap().is_none());

        let first = store.apply_award(1, 10, 60, curve).await.unwrap();
        assert_eq!(first.progression.xp, 60);
        assert_eq!(first.progression.level, 0);

        let second = store.apply_award(1, 10, 60, curve).await.unwrap();
        assert_eq!(second.previous_level, 0);
        assert_eq!(second.progression.xp, 120);
        assert_eq!(second.progression.level, 1);

        let stored = store.get_progress(1, 10).await.unwrap().unwrap();
        assert_eq!(stored.level, 1);
    }

    #[tokio::test]
    async fn ranking_queries_are_per_guild() {
        let store = make_store().await;
        let curve = LevelCurve::default();

        store.apply_award(1, 10, 500, curve).await.unwrap();
        store.apply_award(2, 10, 300, curve).await.unwrap();
        store.apply_award(3, 10, 300, curve).await.unwrap();
        store.apply_award(4, 20, 9_000, curve).await.unwrap();

        assert_eq!(store.count_ahead(10, 300).await.unwrap(), 1);
        assert_eq!(store.count_ahead(10, 500).await.unwrap(), 0);

        let top = store.top(10, 2).await.unwrap();
        let ids: Vec<u64> = top.iter().map(|p| p.user_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn service_runs_against_sqlite() {
        let service = LevelingService::new(make_store().await);

        let award = service.award_xp(7, 10, 101).await.unwrap();
        assert!(award.level_up().is_some());

        let second = service.award_xp(7, 10, 15).await.unwrap();
        assert!(matches!(second, XpAward::OnCooldown(_)));

        assert_eq!(service.get_rank(7, 10).await.unwrap(), Some(1));
        let top = service.get_top_ranks(10, 10).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].level, 1);
    }
}
