
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::embeddings::chunking::ChunkingConfig;

pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const ENV_API_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_EMBED_MODEL: &str = "EMBED_MODEL";
pub const ENV_GEN_MODEL: &str = "GEN_MODEL";
pub const ENV_PORT: &str = "PORT";
pub const ENV_OLLAMA_HOST: &str = "OLLAMA_HOST";
pub const ENV_OLLAMA_PORT: &str = "OLLAMA_PORT";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for a single upload request body
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_bytes: 32 * 1024 * 1024,
        }
    }
}

/// Connection to the Ollama server hosting the sentence-embedding model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub batch_size: u32,
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "all-minilm:latest".to_string(),
            batch_size: 64,
            timeout_seconds: 60,
        }
    }
}

/// Generative model settings. The API key is normally supplied through the environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeminiConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            timeout_seconds: 60,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks handed to the generative model per question
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

/// Locations of uploaded documents and the persisted index.
/// Relative paths are resolved against the configuration base directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    pub uploads_dir: PathBuf,
    pub index_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            index_dir: PathBuf::from("saved_index"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GOOGLE_API_KEY is not set; the generative model cannot be reached without it")]
    MissingApiKey,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0:?} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid timeout: {0} seconds (must be between 1 and 600)")]
    InvalidTimeout(u64),
    #[error("Invalid chunk size: {0} (must be between 1 and 100000 characters)")]
    InvalidChunkSize(usize),
    #[error("Overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge { overlap: usize, chunk_size: usize },
    #[error("Invalid top_k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
    #[error("Invalid upload limit: {0} bytes (must be at least 1 KiB)")]
    InvalidUploadLimit(usize),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnvValue { key: &'static str, value: String },
}

impl Config {
    /// Load `config.toml` from `base_dir` (if present) and apply process environment overrides
    #[inline]
    pub fn load<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        Self::load_with(base_dir, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`], reading overrides through `lookup` instead of the process environment
    #[inline]
    pub fn load_with<P, F>(base_dir: P, lookup: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let config_path = base_dir.as_ref().join(CONFIG_FILE_NAME);

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;
            toml::from_str::<Config>(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            Config::default()
        };
        config.base_dir = base_dir.as_ref().to_path_buf();

        config
            .apply_overrides(lookup)
            .context("Invalid environment override")?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    /// Apply overrides for the variables the service honours. Empty values count as unset.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.gemini.api_key = Some(key.trim().to_string());
        }
        if let Some(model) = get(ENV_EMBED_MODEL) {
            self.ollama.model = model;
        }
        if let Some(model) = get(ENV_GEN_MODEL) {
            self.gemini.model = model;
        }
        if let Some(host) = get(ENV_OLLAMA_HOST) {
            self.ollama.host = host;
        }
        if let Some(port) = get(ENV_OLLAMA_PORT) {
            self.ollama.port = parse_port(ENV_OLLAMA_PORT, &port)?;
        }
        if let Some(port) = get(ENV_PORT) {
            self.server.port = parse_port(ENV_PORT, &port)?;
        }

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.gemini.validate()?;
        self.validate_chunking_config()?;

        if !(1..=100).contains(&self.retrieval.top_k) {
            return Err(ConfigError::InvalidTopK(self.retrieval.top_k));
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort(self.server.port));
        }

        if self.server.max_upload_bytes < 1024 {
            return Err(ConfigError::InvalidUploadLimit(
                self.server.max_upload_bytes,
            ));
        }

        Ok(())
    }

    fn validate_chunking_config(&self) -> Result<(), ConfigError> {
        let config = &self.chunking;

        if !(1..=100_000).contains(&config.chunk_size) {
            return Err(ConfigError::InvalidChunkSize(config.chunk_size));
        }

        // A non-positive stride would never terminate
        if config.overlap >= config.chunk_size {
            return Err(ConfigError::OverlapTooLarge {
                overlap: config.overlap,
                chunk_size: config.chunk_size,
            });
        }

        Ok(())
    }

    /// The generative model key, required before serving chat requests
    #[inline]
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.gemini
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE_NAME)
    }

    /// Directory scanned by the ingestion pipeline
    #[inline]
    pub fn uploads_dir(&self) -> PathBuf {
        self.resolve(&self.storage.uploads_dir)
    }

    /// Directory holding the persisted index and metadata files
    #[inline]
    pub fn index_dir(&self) -> PathBuf {
        self.resolve(&self.storage.index_dir)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

fn parse_port(key: &'static str, value: &str) -> Result<u16, ConfigError> {
    match value.trim().parse::<u16>() {
        Ok(0) => Err(ConfigError::InvalidPort(0)),
        Ok(port) => Ok(port),
        Err(_) => Err(ConfigError::InvalidEnvValue {
            key,
            value: value.to_string(),
        }),
    }
}

fn validate_timeout(seconds: u64) -> Result<(), ConfigError> {
    if !(1..=600).contains(&seconds) {
        return Err(ConfigError::InvalidTimeout(seconds));
    }
    Ok(())
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        self.ollama_url()?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        validate_timeout(self.timeout_seconds)
    }

    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

impl GeminiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.endpoint_url()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidProtocol(url.scheme().to_string()));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        validate_timeout(self.timeout_seconds)
    }

    /// Endpoint as a base URL; the path always ends in `/` so joins keep its last segment
    #[inline]
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|_| ConfigError::InvalidUrl(self.endpoint.clone()))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}
