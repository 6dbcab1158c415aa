//! TOML configuration.
//!
//! Every section is optional; omitted keys fall back to the defaults the
//! mailer ships with. Azure credentials may come from the file or from the
//! `AZURE_AI_ENDPOINT` / `AZURE_AI_KEY` environment variables, applied by
//! [`Config::apply_env`] at the CLI boundary.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENDPOINT_ENV: &str = "AZURE_AI_ENDPOINT";
pub const API_KEY_ENV: &str = "AZURE_AI_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub azure: AzureConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_embeddings_dir")]
    pub embeddings_dir: PathBuf,
    #[serde(default = "default_store_name")]
    pub name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            embeddings_dir: default_embeddings_dir(),
            name: default_store_name(),
        }
    }
}

fn default_embeddings_dir() -> PathBuf {
    PathBuf::from("./vstore")
}
fn default_store_name() -> String {
    "mkb_challenge_store".to_string()
}

impl StoreConfig {
    /// Directory holding `index.sqlite` and `hash.txt`.
    pub fn dir(&self) -> PathBuf {
        self.embeddings_dir.join(&self.name)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_source_path")]
    pub path: PathBuf,
    #[serde(default = "default_title_column")]
    pub title_column: String,
    #[serde(default = "default_url_column")]
    pub url_column: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
            title_column: default_title_column(),
            url_column: default_url_column(),
            label: None,
        }
    }
}

fn default_source_path() -> PathBuf {
    PathBuf::from("MKB-challenge-data.xlsx")
}
fn default_title_column() -> String {
    "Challenge Name".to_string()
}
fn default_url_column() -> String {
    "URL".to_string()
}

impl SourceConfig {
    /// Label stored as the `source` metadata of every row.
    ///
    /// Falls back to the file stem, e.g. `MKB-challenge-data`.
    pub fn source_label(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "spreadsheet".to_string())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { k: default_k() }
    }
}

fn default_k() -> usize {
    6
}

#[derive(Debug, Deserialize, Clone)]
pub struct AzureConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_embedding_deployment")]
    pub embedding_deployment: String,
    #[serde(default = "default_chat_deployment")]
    pub chat_deployment: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            embedding_deployment: default_embedding_deployment(),
            chat_deployment: default_chat_deployment(),
            api_version: default_api_version(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            temperature: None,
        }
    }
}

fn default_embedding_deployment() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_chat_deployment() -> String {
    "gpt-4".to_string()
}
fn default_api_version() -> String {
    "2023-05-15".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    60
}

impl Config {
    /// Fill in credentials missing from the file from the process environment.
    ///
    /// Values in the file win over the environment.
    pub fn apply_env(&mut self) {
        if self.azure.endpoint.is_none() {
            self.azure.endpoint = std::env::var(ENDPOINT_ENV).ok().filter(|v| !v.is_empty());
        }
        if self.azure.api_key.is_none() {
            self.azure.api_key = std::env::var(API_KEY_ENV).ok().filter(|v| !v.is_empty());
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            anyhow::bail!("chunking.chunk_size must be > 0");
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            anyhow::bail!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap,
                self.chunking.chunk_size
            );
        }
        if self.retrieval.k < 1 {
            anyhow::bail!("retrieval.k must be >= 1");
        }
        if self.azure.batch_size < 1 {
            anyhow::bail!("azure.batch_size must be >= 1");
        }
        if let Some(t) = self.azure.temperature {
            if !(0.0..=2.0).contains(&t) {
                anyhow::bail!("azure.temperature must be in [0.0, 2.0]");
            }
        }
        if self.store.name.trim().is_empty() {
            anyhow::bail!("store.name must not be empty");
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

/// Load `path` if it exists, otherwise run on defaults.
///
/// Only used for the default config location; an explicitly passed path
/// that does not exist is an error.
pub fn load_config_or_default(path: &Path, explicit: bool) -> Result<Config> {
    if !explicit && !path.exists() {
        return Ok(Config::default());
    }
    load_config(path)
}
