//! Configuration management
//!
//! This module handles loading, validation, and management of the Wayfarer configuration.
//! Configuration is stored in TOML format at ~/.wayfarer/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **inference**: Hosted model selection and request parameters
//! - **memory**: History cap, context window and prompt trip limits
//!
//! # Examples
//!
//! ```no_run
//! use wayfarer_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Data dir: {:?}", config.core.data_dir);
//! println!("Provider: {}", config.inference.default_provider);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    pub core: CoreConfig,

    /// Inference provider configuration
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Conversation memory limits
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Inference configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Provider used for exchanges (workers_ai, ollama)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model id passed to the hosted inference call
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens generated per reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Workers AI settings
    #[serde(default)]
    pub workers_ai: WorkersAiConfig,

    /// Ollama settings
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// Workers AI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersAiConfig {
    /// Base URL for the Workers AI REST API
    #[serde(default = "default_workers_ai_base_url")]
    pub base_url: String,

    /// Account the model runs under
    #[serde(default)]
    pub account_id: String,
    // Note: API token stored in OS keychain or WAYFARER_WORKERS_AI_TOKEN, not in config
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// Conversation memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum turns kept in a stored record
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,

    /// Most recent turns sent to the model with each request
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,

    /// Most recent saved trips listed in the system prompt
    #[serde(default = "default_prompt_trip_limit")]
    pub prompt_trip_limit: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            workers_ai: WorkersAiConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for WorkersAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_workers_ai_base_url(),
            account_id: String::new(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_history_turns: default_max_history_turns(),
            context_turns: default_context_turns(),
            prompt_trip_limit: default_prompt_trip_limit(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.wayfarer")
}

fn default_provider() -> String {
    "workers_ai".to_string()
}

fn default_model() -> String {
    "@cf/meta/llama-3.3-70b-instruct-fp8-fast".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

fn default_workers_ai_base_url() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_max_history_turns() -> usize {
    20
}

fn default_context_turns() -> usize {
    10
}

fn default_prompt_trip_limit() -> usize {
    3
}

impl Config {
    /// Load configuration from the default location (~/.wayfarer/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        // Serialize before processing so the file keeps the portable ~ form
        let config = Self::default_config();
        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        let mut config = config;
        config.validate_and_process()?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.wayfarer/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".wayfarer").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig {
                log_level: default_log_level(),
                data_dir: default_data_dir(),
            },
            inference: InferenceConfig::default(),
            memory: MemoryConfig::default(),
        }
    }

    /// Path of the SQLite database holding user records
    pub fn database_path(&self) -> PathBuf {
        self.core.data_dir.join("wayfarer.db")
    }

    /// Validate and process configuration
    ///
    /// This method validates field ranges, expands ~ in the data directory
    /// and creates it if it doesn't exist.
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_providers = ["workers_ai", "ollama"];
        if !valid_providers.contains(&self.inference.default_provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid default provider '{}'. Must be one of: {}",
                self.inference.default_provider,
                valid_providers.join(", ")
            )));
        }

        if !(0.0..=2.0).contains(&self.inference.temperature) {
            return Err(EngineError::Config(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.memory.max_history_turns == 0 {
            return Err(EngineError::Config(
                "max_history_turns must be at least 1".to_string(),
            ));
        }
        if self.memory.context_turns > self.memory.max_history_turns {
            return Err(EngineError::Config(format!(
                "context_turns ({}) cannot exceed max_history_turns ({})",
                self.memory.context_turns, self.memory.max_history_turns
            )));
        }

        self.core.data_dir = expand_path(&self.core.data_dir)?;

        if !self.core.data_dir.exists() {
            fs::create_dir_all(&self.core.data_dir).map_err(|e| {
                EngineError::Config(format!("Failed to create data directory: {}", e))
            })?;
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
