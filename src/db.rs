use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::Config;
use crate::models::KnowledgeEntry;

pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Persist one knowledge-base entry row.
pub async fn insert_entry(pool: &SqlitePool, entry: &KnowledgeEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO knowledge_base_entries
            (entry_id, folder_id, account_id, filename, file_path, file_size, mime_type, summary, is_active, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.entry_id)
    .bind(&entry.folder_id)
    .bind(&entry.account_id)
    .bind(&entry.filename)
    .bind(&entry.file_path)
    .bind(entry.file_size)
    .bind(&entry.mime_type)
    .bind(&entry.summary)
    .bind(entry.is_active)
    .bind(entry.created_at)
    .execute(pool)
    .await?;

    Ok(())
}
