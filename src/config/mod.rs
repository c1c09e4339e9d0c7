// Configuration management module
// Handles the optional TOML file, environment overrides and validation

pub mod settings;


pub use settings::{
    Config, ConfigError, GeminiConfig, OllamaConfig, RetrievalConfig, ServerConfig,
    StorageConfig,
};
