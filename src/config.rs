use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub summarize: SummarizeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    #[serde(default = "default_max_file_size_bytes")]
    pub max_file_size_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: default_max_file_size_bytes(),
        }
    }
}

fn default_max_file_size_bytes() -> usize {
    50 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_storage_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            bucket: String::new(),
            region: default_region(),
            prefix: default_storage_prefix(),
            endpoint_url: None,
        }
    }
}

impl StorageConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_storage_prefix() -> String {
    "knowledge-base".to_string()
}

/// One configured model candidate. Candidates are tried in list order;
/// the first whose response validates wins.
#[derive(Debug, Deserialize, Clone)]
pub struct ModelCandidate {
    pub name: String,
    pub context_tokens: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummarizeConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_models")]
    pub models: Vec<ModelCandidate>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_reserved_tokens")]
    pub reserved_tokens: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint_url: default_endpoint_url(),
            api_key_env: default_api_key_env(),
            models: default_models(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            reserved_tokens: default_reserved_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SummarizeConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_endpoint_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_temperature() -> f64 {
    0.1
}
fn default_max_output_tokens() -> u32 {
    800
}
fn default_reserved_tokens() -> usize {
    1000
}
fn default_timeout_secs() -> u64 {
    60
}

/// Default candidate ladder: reliable/fast first, high-context fallback,
/// then a small-context emergency fallback.
fn default_models() -> Vec<ModelCandidate> {
    vec![
        ModelCandidate {
            name: "gpt-4o-mini".to_string(),
            context_tokens: 120_000,
        },
        ModelCandidate {
            name: "claude-3-haiku".to_string(),
            context_tokens: 180_000,
        },
        ModelCandidate {
            name: "gpt-3.5-turbo".to_string(),
            context_tokens: 14_000,
        },
    ]
}

impl Config {
    /// A minimal configuration for tests and tooling that does not need
    /// storage or model access.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("data/kbi.sqlite"),
            },
            limits: LimitsConfig::default(),
            storage: StorageConfig::default(),
            summarize: SummarizeConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate limits
    if config.limits.max_file_size_bytes == 0 {
        anyhow::bail!("limits.max_file_size_bytes must be > 0");
    }

    // Validate storage
    match config.storage.provider.as_str() {
        "disabled" => {}
        "s3" => {
            if config.storage.bucket.is_empty() {
                anyhow::bail!("storage.bucket must be set when provider is 's3'");
            }
        }
        other => anyhow::bail!(
            "Unknown storage provider: '{}'. Must be disabled or s3.",
            other
        ),
    }

    // Validate summarization
    match config.summarize.provider.as_str() {
        "disabled" => {}
        "openai" => {
            if config.summarize.endpoint_url.is_empty() {
                anyhow::bail!("summarize.endpoint_url must be set when provider is 'openai'");
            }
            if config.summarize.models.is_empty() {
                anyhow::bail!("summarize.models must not be empty when provider is 'openai'");
            }
            for candidate in &config.summarize.models {
                if candidate.context_tokens == 0 {
                    anyhow::bail!(
                        "summarize.models entry '{}' must have context_tokens > 0",
                        candidate.name
                    );
                }
            }
            if !(0.0..=2.0).contains(&config.summarize.temperature) {
                anyhow::bail!("summarize.temperature must be in [0.0, 2.0]");
            }
        }
        other => anyhow::bail!(
            "Unknown summarize provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("kbi.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let (_dir, path) = write_config("[db]\npath = \"data/kbi.sqlite\"\n");
        let config = load_config(&path).unwrap();
        assert_eq!(config.limits.max_file_size_bytes, 50 * 1024 * 1024);
        assert_eq!(config.storage.provider, "disabled");
        assert_eq!(config.storage.prefix, "knowledge-base");
        assert_eq!(config.summarize.provider, "disabled");
        assert_eq!(config.summarize.models.len(), 3);
        assert_eq!(config.summarize.models[0].name, "gpt-4o-mini");
        assert_eq!(config.summarize.reserved_tokens, 1000);
    }

    #[test]
    fn s3_provider_requires_bucket() {
        let (_dir, path) = write_config(
            "[db]\npath = \"data/kbi.sqlite\"\n\n[storage]\nprovider = \"s3\"\n",
        );
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("storage.bucket"));
    }

    #[test]
    fn unknown_summarize_provider_rejected() {
        let (_dir, path) = write_config(
            "[db]\npath = \"data/kbi.sqlite\"\n\n[summarize]\nprovider = \"carrier-pigeon\"\n",
        );
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Unknown summarize provider"));
    }

    #[test]
    fn model_candidates_keep_list_order() {
        let (_dir, path) = write_config(
            r#"[db]
path = "data/kbi.sqlite"

[summarize]
provider = "openai"
endpoint_url = "http://localhost:4000"

[[summarize.models]]
name = "small"
context_tokens = 8000

[[summarize.models]]
name = "big"
context_tokens = 200000
"#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.summarize.models[0].name, "small");
        assert_eq!(config.summarize.models[1].name, "big");
    }
}
