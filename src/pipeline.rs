//! Ingestion pipeline orchestration.
//!
//! Coordinates the full ingest flow for one file: size and type gates →
//! storage upload → content extraction → summarization → persistence.
//! The boundary is total: every internal error is caught and converted into
//! an [`IngestOutcome::Failure`] with a human-readable reason, so callers
//! never see a panic or a raw error.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::extract;
use crate::models::{IngestOutcome, IngestReceipt, IngestRequest, KnowledgeEntry};
use crate::storage;
use crate::summarize;
use crate::transport;

/// Run the ingestion pipeline for one file.
pub async fn process_file(config: &Config, pool: &SqlitePool, request: IngestRequest) -> IngestOutcome {
    let filename = request.filename.clone();

    match ingest(config, pool, request).await {
        Ok(receipt) => {
            info!(
                file = %receipt.filename,
                entry_id = %receipt.entry_id,
                summary_chars = receipt.summary_length,
                "file ingested"
            );
            IngestOutcome::Success(receipt)
        }
        Err(e) => {
            error!(file = %filename, error = format!("{:#}", e), "ingest failed");
            IngestOutcome::Failure {
                error: format!("{:#}", e),
            }
        }
    }
}

async fn ingest(config: &Config, pool: &SqlitePool, request: IngestRequest) -> Result<IngestReceipt> {
    if request.bytes.len() > config.limits.max_file_size_bytes {
        bail!(
            "File too large: {} bytes (limit {} bytes)",
            request.bytes.len(),
            config.limits.max_file_size_bytes
        );
    }

    if !extract::is_ingestible(&request.bytes, &request.filename, &request.mime_type) {
        let extension = extract::file_extension(&request.filename)
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        bail!("Unsupported file type: {}", extension);
    }

    let entry_id = Uuid::new_v4().to_string();
    let sanitized_filename = storage::sanitize_filename(&request.filename);
    let file_path = storage::object_key(
        &config.storage.prefix,
        &request.folder_id,
        &entry_id,
        &sanitized_filename,
    );

    storage::upload(&config.storage, &file_path, &request.bytes, &request.mime_type)
        .await
        .context("storage upload failed")?;

    let extracted = extract::extract(&request.bytes, &request.filename, &request.mime_type);

    // Extraction can legitimately come back empty (e.g. a PDF of scanned
    // images); summarize basic file facts instead.
    let content = if extracted.text.trim().is_empty() {
        format!(
            "File: {} ({} bytes, {})",
            request.filename,
            request.bytes.len(),
            request.mime_type
        )
    } else {
        extracted.text
    };

    let chat = transport::create_transport(&config.summarize);
    let summary = summarize::summarize(
        chat.as_deref(),
        &config.summarize,
        &content,
        &request.filename,
    )
    .await;

    let entry = KnowledgeEntry {
        entry_id: entry_id.clone(),
        folder_id: request.folder_id,
        account_id: request.account_id,
        filename: request.filename.clone(),
        file_path,
        file_size: request.bytes.len() as i64,
        mime_type: request.mime_type,
        summary: summary.clone(),
        is_active: true,
        created_at: Utc::now().timestamp(),
    };

    db::insert_entry(pool, &entry)
        .await
        .context("failed to persist knowledge entry")?;

    Ok(IngestReceipt {
        entry_id,
        filename: request.filename,
        summary_length: summary.chars().count(),
    })
}
