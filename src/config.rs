use crate::cli::CliArgs;
use crate::error::{Error, Result};
use crate::routing::AuthMode;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Environment type for configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Get environment from string
    pub fn from_name(env: &str) -> Self {
        match env.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "dev",
            Environment::Production => "prod",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub payload: PayloadConfig,

    #[serde(default)]
    pub files: FilesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Server-wide route defaults, overridable per route
    #[serde(default)]
    pub routes: RouteDefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds to wait for in-flight requests after a shutdown signal
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadConfig {
    /// Largest inbound body accepted before answering 413
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Base directory for relative paths in file replies
    #[serde(default = "default_files_root")]
    pub relative_to: PathBuf,

    /// Chunk size used when streaming files to the client
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Register the built-in request logger extension
    #[serde(default)]
    pub requests: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RouteDefaultsConfig {
    #[serde(default)]
    pub auth: AuthMode,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_shutdown_timeout() -> u64 {
    30
}
fn default_max_bytes() -> usize {
    1024 * 1024
}
fn default_files_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_chunk_size() -> usize {
    64 * 1024
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            relative_to: default_files_root(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            requests: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file, then apply environment overrides
    #[cfg(feature = "config")]
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let content = std::fs::read_to_string(path_ref).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path_ref.display(),
                e
            ))
        })?;

        let mut config: AppConfig = toml::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse config file '{}': {}",
                path_ref.display(),
                e
            ))
        })?;

        // Relative file roots are relative to the config file, not the cwd
        if config.files.relative_to.is_relative() {
            if let Some(parent) = path_ref.parent() {
                config.files.relative_to = parent.join(&config.files.relative_to);
            }
        }

        config.apply_env_overrides()?;

        log::debug!("Loaded configuration from: {}", path_ref.display());
        Ok(config)
    }

    /// Create configuration with environment variable overrides
    pub fn from_env() -> Result<Self> {
        let mut config = AppConfig::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Configuration selected by command-line arguments: the `--config` file
    /// when given, environment variables otherwise, then `--port` on top
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        let mut config = match args.config_path() {
            #[cfg(feature = "config")]
            Some(path) => {
                log::info!("Loading configuration from CLI: {}", path.display());
                AppConfig::from_file(path)?
            }
            #[cfg(not(feature = "config"))]
            Some(path) => {
                return Err(Error::config(format!(
                    "Cannot load '{}': built without the config feature",
                    path.display()
                )));
            }
            None => AppConfig::from_env()?,
        };

        if let Some(port) = args.port {
            config.server.port = port;
        }
        Ok(config)
    }

    /// [`AppConfig::from_cli`] over the process arguments
    pub fn from_args() -> Result<Self> {
        Self::from_cli(&CliArgs::parse()?)
    }

    /// Validate configuration before the server starts
    pub fn validate(&self) -> Result<()> {
        if self.payload.max_bytes == 0 {
            return Err(Error::config("payload.max_bytes cannot be 0"));
        }

        if self.files.chunk_size == 0 {
            return Err(Error::config("files.chunk_size cannot be 0"));
        }

        if !self.files.relative_to.exists() {
            log::warn!(
                "Files directory does not exist: {}",
                self.files.relative_to.display()
            );
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(env) = env::var("HOOKWAY_ENV") {
            self.environment = Environment::from_name(&env);
        }
        if let Ok(host) = env::var("HOOKWAY_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("HOOKWAY_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::config("Invalid HOOKWAY_PORT value"))?;
        }
        if let Ok(max) = env::var("HOOKWAY_MAX_PAYLOAD") {
            self.payload.max_bytes = max
                .parse()
                .map_err(|_| Error::config("Invalid HOOKWAY_MAX_PAYLOAD value"))?;
        }
        if let Ok(root) = env::var("HOOKWAY_FILES_ROOT") {
            self.files.relative_to = PathBuf::from(root);
        }
        if let Ok(level) = env::var("HOOKWAY_LOG") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Get server address string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
