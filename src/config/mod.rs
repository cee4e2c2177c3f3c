// Required external crates for configuration management and serialization
use serde::Deserialize;
use std::path::PathBuf;
use config::{Config, ConfigError, Environment, File};

/// Configuration for the pretrained model zoo cache
#[derive(Debug, Deserialize, Clone)]
pub struct ZooConfig {
    /// Directory where fetched pretrained bundles are cached
    pub directory: PathBuf,
    /// Base URL for pretrained model downloads
    pub base_url: String,
}

/// Configuration for the export step
#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    /// Destination path of the exported archive
    pub path: PathBuf,
    /// Pretrained model exported when no other model is named
    pub model: String,
}

/// Configuration for candidate extraction
#[derive(Debug, Deserialize, Clone)]
pub struct PredictConfig {
    /// Voxel margin excluded from candidate extraction at each volume face
    pub border: usize,
}

/// Configuration for application logging
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Optional log file path
    pub file: Option<PathBuf>,
}

/// Main settings struct that contains all configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Zoo cache settings
    pub zoo: ZooConfig,
    /// Export settings
    pub export: ExportConfig,
    /// Prediction settings
    pub predict: PredictConfig,
    /// Logging-related settings
    pub logging: LoggingConfig,
}

/// Implementation for loading and parsing configuration
impl Settings {
    /// Creates a new Settings instance by loading config from multiple sources
    /// in the following order of precedence (highest to lowest):
    /// 1. Environment variables prefixed with STARPORT_
    /// 2. Local config file (local.toml) if present
    /// 3. Default config file (default.toml)
    pub fn new() -> Result<Self, ConfigError> {
        // Check if current directory exists
        let config_dir = std::env::current_dir()
            .map_err(|e| ConfigError::Message(
                format!("Failed to get current directory: {}", e)
            ))?
            .join("config");

        // Check if config directory exists
        if !config_dir.exists() {
            return Err(ConfigError::Message(
                format!("Config directory not found at: {}", config_dir.display())
            ));
        }

        // Check if default.toml exists
        let default_config = config_dir.join("default.toml");
        if !default_config.exists() {
            return Err(ConfigError::Message(
                format!("Default configuration file not found at: {}", default_config.display())
            ));
        }

        // Create the local config path
        let local_config = config_dir.join("local.toml");

        // Convert paths to strings and keep them alive
        let default_config_path = default_config.to_string_lossy();
        let local_config_path = local_config.to_string_lossy();

        // Load and validate configuration
        let settings = Config::builder()
            .add_source(File::with_name(&default_config_path))
            .add_source(File::with_name(&local_config_path).required(false))
            .add_source(Environment::with_prefix("STARPORT").separator("_"))
            .build()?
            .try_deserialize::<Settings>()?;

        // Validate settings after loading
        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        // Create zoo cache directory if it doesn't exist
        if !self.zoo.directory.exists() {
            std::fs::create_dir_all(&self.zoo.directory).map_err(|e| {
                ConfigError::Message(format!(
                    "Failed to create zoo directory at {}: {}",
                    self.zoo.directory.display(), e
                ))
            })?;
        }

        // Validate download base URL
        if !self.zoo.base_url.starts_with("http://") && !self.zoo.base_url.starts_with("https://") {
            return Err(ConfigError::Message(
                format!("zoo.base_url must be an http(s) URL, got: {}", self.zoo.base_url)
            ));
        }

        // Validate export model name
        if self.export.model.trim().is_empty() {
            return Err(ConfigError::Message(
                "export.model must not be empty".to_string()
            ));
        }

        // Validate export destination
        if self.export.path.as_os_str().is_empty() {
            return Err(ConfigError::Message(
                "export.path must not be empty".to_string()
            ));
        }

        // Validate logging level
        match self.logging.level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            _ => Err(ConfigError::Message(
                format!("Invalid logging level: {}. Must be one of: error, warn, info, debug, trace",
                    self.logging.level)
            )),
        }?;

        // Create log file directory if configured and doesn't exist
        if let Some(log_file) = &self.logging.file {
            if let Some(parent) = log_file.parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        ConfigError::Message(format!(
                            "Failed to create log directory at {}: {}",
                            parent.display(), e
                        ))
                    })?;
                }
            }
        }

        Ok(())
    }
}
