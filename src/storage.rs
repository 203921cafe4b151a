//! Object storage upload and filename sanitization.
//!
//! Uploads file bytes to an S3 bucket using the S3 REST API with AWS
//! Signature V4 authentication, built from pure-Rust primitives (`hmac`,
//! `sha2`) so there is no C library dependency. Custom endpoints are
//! supported for S3-compatible services (MinIO, LocalStack). A `"disabled"`
//! provider skips the network call entirely, which keeps local and test
//! setups offline.
//!
//! Object keys follow the fixed layout
//! `{prefix}/{folder_id}/{entry_id}/{sanitized_filename}`.
//!
//! # Environment Variables
//!
//! Credentials are read from environment variables:
//! - `AWS_ACCESS_KEY_ID` — required
//! - `AWS_SECRET_ACCESS_KEY` — required
//! - `AWS_SESSION_TOKEN` — optional (for temporary credentials / IAM roles)

use anyhow::{bail, Context, Result};
use chrono::Utc;
use hmac::{Hmac, Mac};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::config::StorageConfig;

type HmacSha256 = Hmac<Sha256>;

static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s\-.]").expect("non-word pattern should compile"));
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern should compile"));
static UNDERSCORE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_+").expect("underscore pattern should compile"));

/// Sanitize a filename for object storage.
///
/// Keeps the extension; in the stem, replaces anything outside word
/// characters, whitespace, hyphens and dots with underscores, collapses
/// whitespace and underscore runs, and trims leading/trailing underscores.
/// An emptied stem becomes the literal `file`.
pub fn sanitize_filename(filename: &str) -> String {
    // Strip any path components first; only the base name is stored.
    let base = std::path::Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());

    let (stem, ext) = split_extension(&base);

    let name = NON_WORD.replace_all(stem, "_");
    let name = WHITESPACE_RUN.replace_all(&name, "_");
    let name = UNDERSCORE_RUN.replace_all(&name, "_");
    let name = name.trim_matches('_');
    let name = if name.is_empty() { "file" } else { name };

    format!("{}{}", name, ext)
}

/// Split `name.ext` into (`name`, `.ext`); a leading dot is part of the stem.
fn split_extension(base: &str) -> (&str, &str) {
    match base.rfind('.') {
        Some(idx) if idx > 0 => base.split_at(idx),
        _ => (base, ""),
    }
}

/// Deterministic object key for a stored file.
pub fn object_key(prefix: &str, folder_id: &str, entry_id: &str, sanitized_filename: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        prefix.trim_end_matches('/'),
        folder_id,
        entry_id,
        sanitized_filename
    )
}

/// Upload file bytes under `key`. A no-op when the provider is disabled.
pub async fn upload(config: &StorageConfig, key: &str, bytes: &[u8], content_type: &str) -> Result<()> {
    if !config.is_enabled() {
        tracing::debug!(key, "storage provider disabled, skipping upload");
        return Ok(());
    }
    match config.provider.as_str() {
        "s3" => put_object(config, key, bytes, content_type).await,
        other => bail!("Unknown storage provider: '{}'", other),
    }
}

// ============ AWS Credentials ============

/// AWS credentials loaded from environment variables.
struct AwsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl AwsCredentials {
    fn from_env() -> Result<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .context("AWS_ACCESS_KEY_ID environment variable not set")?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .context("AWS_SECRET_ACCESS_KEY environment variable not set")?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

// ============ S3 PutObject ============

/// Upload one object with a signed PUT request.
async fn put_object(config: &StorageConfig, key: &str, bytes: &[u8], content_type: &str) -> Result<()> {
    let creds = AwsCredentials::from_env()?;
    let client = reqwest::Client::new();

    let host = s3_host(config);
    let encoded_key = key.split('/').map(uri_encode).collect::<Vec<_>>().join("/");
    let url = format!("https://{}/{}", host, encoded_key);

    let now = Utc::now();
    let date_stamp = now.format("%Y%m%d").to_string();
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

    let payload_hash = hex_sha256(bytes);

    let mut headers = vec![
        ("host".to_string(), host.clone()),
        ("x-amz-content-sha256".to_string(), payload_hash.clone()),
        ("x-amz-date".to_string(), amz_date.clone()),
    ];
    if let Some(ref token) = creds.session_token {
        headers.push(("x-amz-security-token".to_string(), token.clone()));
    }
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    let signed_headers: String = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v))
        .collect();

    let canonical_uri = format!("/{}", encoded_key);
    let canonical_request = format!(
        "PUT\n{}\n\n{}\n{}\n{}",
        canonical_uri, canonical_headers, signed_headers, payload_hash
    );

    let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, config.region);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        credential_scope,
        hex_sha256(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(
        &creds.secret_access_key,
        &date_stamp,
        &config.region,
        "s3",
    );
    let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
        creds.access_key_id, credential_scope, signed_headers, signature
    );

    let mut req_builder = client
        .put(&url)
        .header("Authorization", &authorization)
        .header("Content-Type", content_type)
        .header("x-amz-content-sha256", &payload_hash)
        .header("x-amz-date", &amz_date)
        .body(bytes.to_vec());

    if let Some(ref token) = creds.session_token {
        req_builder = req_builder.header("x-amz-security-token", token);
    }

    let resp = req_builder.send().await.map_err(|e| {
        anyhow::anyhow!("Failed to put s3://{}/{}: {}", config.bucket, key, e)
    })?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!(
            "S3 PutObject failed (HTTP {}) for key '{}': {}",
            status,
            key,
            body.chars().take(500).collect::<String>()
        );
    }

    tracing::debug!(key, bytes = bytes.len(), "object uploaded");
    Ok(())
}

// ============ AWS SigV4 Helpers ============

/// Compute the S3 hostname for the configured bucket and region.
///
/// If a custom `endpoint_url` is set (for MinIO, LocalStack, etc.), that is
/// used instead of the standard `<bucket>.s3.<region>.amazonaws.com`.
fn s3_host(config: &StorageConfig) -> String {
    if let Some(ref endpoint) = config.endpoint_url {
        endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string()
    } else {
        format!("{}.s3.{}.amazonaws.com", config.bucket, config.region)
    }
}

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hex_hmac_sha256(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(key, data))
}

/// Derive the AWS SigV4 signing key for a given date, region, and service.
///
/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// URI-encode a string per RFC 3986 (used in SigV4 canonical requests).
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}
