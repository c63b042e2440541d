// Shared SQLite bootstrap. Every store receives a clone of the same pool and
// creates its own tables through `migrate()`.

use anyhow::Context;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;

/// File name of the bot database inside the data directory.
pub const DATABASE_FILE: &str = "dorito.db";

/// Open (creating if needed) the SQLite database at `database_url`.
///
/// Accepts plain paths as well as `sqlite:` URLs. In-memory databases get a
/// single connection so every query sees the same data.
pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let in_memory = database_url.contains(":memory:");

    // Ensure the file exists if it's a file path
    let path_str = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    if !in_memory && !Path::new(path_str).exists() {
        if let Some(parent) = Path::new(path_str).parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating data directory {}", parent.display()))?;
        }
        std::fs::File::create(path_str)
            .with_context(|| format!("creating database file {path_str}"))?;
    }

    let conn_str = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite://{}", database_url)
    };

    let mut options = SqlitePoolOptions::new();
    if in_memory {
        options = options.max_connections(1);
    }

    options
        .connect(&conn_str)
        .await
        .with_context(|| format!("connecting to {conn_str}"))
}

/// Database path for a data directory.
pub fn database_path(data_dir: &Path) -> String {
    data_dir.join(DATABASE_FILE).to_string_lossy().into_owned()
}

#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    connect("sqlite::memory:").await.unwrap()
}
