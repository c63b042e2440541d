use crate::core::snippets::{Snippet, SnippetError, SnippetStore, SnippetTrigger};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use tracing::warn;

fn storage(e: sqlx::Error) -> SnippetError {
    SnippetError::StorageError(e.to_string())
}

fn from_unix(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub struct SqliteSnippetStore {
    pool: Pool<Sqlite>,
}

impl SqliteSnippetStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        // NOCASE keeps `Rules` and `rules` from coexisting in one guild.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS snippets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                author_id INTEGER NOT NULL,
                name TEXT NOT NULL COLLATE NOCASE,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE (guild_id, name)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS snippet_triggers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                snippet_id INTEGER NOT NULL,
                phrase TEXT NOT NULL,
                channels TEXT NOT NULL DEFAULT '[]',
                UNIQUE (guild_id, phrase)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn row_to_snippet(row: &SqliteRow) -> Snippet {
    Snippet {
        id: row.get("id"),
        guild_id: row.get::<i64, _>("guild_id") as u64,
        author_id: row.get::<i64, _>("author_id") as u64,
        name: row.get("name"),
        content: row.get("content"),
        created_at: from_unix(row.get("created_at")),
        updated_at: from_unix(row.get("updated_at")),
    }
}

fn row_to_trigger(row: &SqliteRow) -> SnippetTrigger {
    let phrase: String = row.get("phrase");
    let raw_channels: &str = row.get("channels");
    let channels = serde_json::from_str(raw_channels).unwrap_or_else(|e| {
        warn!(phrase = %phrase, error = %e, "Ignoring malformed trigger channel list");
        Vec::new()
    });

    SnippetTrigger {
        id: row.get("id"),
        guild_id: row.get::<i64, _>("guild_id") as u64,
        snippet_id: row.get("snippet_id"),
        phrase,
        channels,
    }
}

fn channels_json(channels: &[u64]) -> Result<String, SnippetError> {
    serde_json::to_string(channels).map_err(|e| SnippetError::StorageError(e.to_string()))
}

#[async_trait]
impl SnippetStore for SqliteSnippetStore {
    async fn find_snippet(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<Option<Snippet>, SnippetError> {
        let row = sqlx::query("SELECT * FROM snippets WHERE guild_id = ? AND name = ?")
            .bind(guild_id as i64)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.as_ref().map(row_to_snippet))
    }

    async fn find_snippet_by_id(
        &self,
        guild_id: u64,
        snippet_id: i64,
    ) -> Result<Option<Snippet>, SnippetError> {
        let row = sqlx::query("SELECT * FROM snippets WHERE guild_id = ? AND id = ?")
            .bind(guild_id as i64)
            .bind(snippet_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.as_ref().map(row_to_snippet))
    }

    async fn insert_snippet(
        &self,
        guild_id: u64,
        author_id: u64,
        name: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Snippet, SnippetError> {
        let result = sqlx::query(
            "INSERT INTO snippets (guild_id, author_id, name, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(guild_id as i64)
        .bind(author_id as i64)
        .bind(name)
        .bind(content)
        .bind(now.timestamp())
        .bind(now.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                SnippetError::AlreadyExists(name.to_string())
            } else {
                storage(e)
            }
        })?;

        Ok(Snippet {
            id: result.last_insert_rowid(),
            guild_id,
            author_id,
            name: name.to_string(),
            content: content.to_string(),
            created_at: from_unix(now.timestamp()),
            updated_at: from_unix(now.timestamp()),
        })
    }

    async fn update_snippet(&self, snippet: &Snippet) -> Result<(), SnippetError> {
        sqlx::query("UPDATE snippets SET name = ?, content = ?, updated_at = ? WHERE id = ?")
            .bind(&snippet.name)
            .bind(&snippet.content)
            .bind(snippet.updated_at.timestamp())
            .bind(snippet.id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    SnippetError::AlreadyExists(snippet.name.clone())
                } else {
                    storage(e)
                }
            })?;
        Ok(())
    }

    async fn delete_snippet(&self, guild_id: u64, snippet_id: i64) -> Result<bool, SnippetError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        sqlx::query("DELETE FROM snippet_triggers WHERE guild_id = ? AND snippet_id = ?")
            .bind(guild_id as i64)
            .bind(snippet_id)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        let result = sqlx::query("DELETE FROM snippets WHERE guild_id = ? AND id = ?")
            .bind(guild_id as i64)
            .bind(snippet_id)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        tx.commit().await.map_err(storage)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_snippets(&self, guild_id: u64) -> Result<Vec<Snippet>, SnippetError> {
        let rows = sqlx::query("SELECT * FROM snippets WHERE guild_id = ? ORDER BY name ASC")
            .bind(guild_id as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        Ok(rows.iter().map(row_to_snippet).collect())
    }

    async fn find_trigger(
        &self,
        guild_id: u64,
        phrase: &str,
    ) -> Result<Option<SnippetTrigger>, SnippetError> {
        let row = sqlx::query("SELECT * FROM snippet_triggers WHERE guild_id = ? AND phrase = ?")
            .bind(guild_id as i64)
            .bind(phrase)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.as_ref().map(row_to_trigger))
    }

    async fn insert_trigger(
        &self,
        guild_id: u64,
        snippet_id: i64,
        phrase: &str,
        channels: &[u64],
    ) -> Result<SnippetTrigger, SnippetError> {
        let result = sqlx::query(
            "INSERT INTO snippet_triggers (guild_id, snippet_id, phrase, channels) VALUES (?, ?, ?, ?)",
        )
        .bind(guild_id as i64)
        .bind(snippet_id)
        .bind(phrase)
        .bind(channels_json(channels)?)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                SnippetError::TriggerExists(phrase.to_string())
            } else {
                storage(e)
            }
        })?;

        Ok(SnippetTrigger {
            id: result.last_insert_rowid(),
            guild_id,
            snippet_id,
            phrase: phrase.to_string(),
            channels: channels.to_vec(),
        })
    }

    async fn update_trigger(&self, trigger: &SnippetTrigger) -> Result<(), SnippetError> {
        sqlx::query("UPDATE snippet_triggers SET phrase = ?, channels = ? WHERE id = ?")
            .bind(&trigger.phrase)
            .bind(channels_json(&trigger.channels)?)
            .bind(trigger.id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    SnippetError::TriggerExists(trigger.phrase.clone())
                } else {
                    storage(e)
                }
            })?;
        Ok(())
    }

    async fn delete_trigger(&self, guild_id: u64, trigger_id: i64) -> Result<bool, SnippetError> {
        let result = sqlx::query("DELETE FROM snippet_triggers WHERE guild_id = ? AND id = ?")
            .bind(guild_id as i64)
            .bind(trigger_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_triggers(&self, guild_id: u64) -> Result<Vec<SnippetTrigger>, SnippetError> {
        let rows = sqlx::query("SELECT * FROM snippet_triggers WHERE guild_id = ? ORDER BY id ASC")
            .bind(guild_id as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        Ok(rows.iter().map(row_to_trigger).collect())
    }
}
