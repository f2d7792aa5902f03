//! Configuration module for LessonDrop.

use serde::Deserialize;
use std::path::Path;

use crate::{LessonDropError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host name to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Externally visible base URL (e.g., "https://lessons.example.org").
    ///
    /// When unset, the OAuth redirect URI is derived from host and port.
    #[serde(default)]
    pub public_url: Option<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: None,
        }
    }
}

/// Dropbox application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DropboxConfig {
    /// App key. PKCE is used, so no app secret is needed.
    #[serde(default)]
    pub client_id: String,
    /// Consent page URL.
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    /// RPC endpoint base URL (also hosts the token endpoint).
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Content upload/download endpoint base URL.
    #[serde(default = "default_content_url")]
    pub content_url: String,
    /// Space separated scopes to request. None requests the app's defaults.
    #[serde(default)]
    pub scope: Option<String>,
    /// File used to persist the refresh token across restarts.
    #[serde(default)]
    pub token_file: Option<String>,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
}

fn default_authorize_url() -> String {
    "https://www.dropbox.com/oauth2/authorize".to_string()
}

fn default_api_url() -> String {
    "https://api.dropboxapi.com".to_string()
}

fn default_content_url() -> String {
    "https://content.dropboxapi.com".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_total_timeout() -> u64 {
    60
}

impl Default for DropboxConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            authorize_url: default_authorize_url(),
            api_url: default_api_url(),
            content_url: default_content_url(),
            scope: None,
            token_file: None,
            connect_timeout_secs: default_connect_timeout(),
            total_timeout_secs: default_total_timeout(),
        }
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Dropbox HTTP API.
    #[default]
    Dropbox,
    /// In-process store (development and tests).
    Memory,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StorageConfig {
    /// Backend to use.
    #[serde(default)]
    pub backend: StorageBackend,
}

/// Lesson layout configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LessonsConfig {
    /// Root folder for `/upload` (empty = storage root).
    #[serde(default)]
    pub upload_root: String,
    /// Root folder for lesson indexes and their artifacts.
    #[serde(default = "default_index_root")]
    pub index_root: String,
    /// File name used by `/upload`.
    #[serde(default = "default_upload_file_name")]
    pub upload_file_name: String,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
    /// How many times a conflicting index write is retried from a fresh read.
    #[serde(default = "default_index_write_attempts")]
    pub index_write_attempts: u32,
}

fn default_index_root() -> String {
    "/GoAI-Test".to_string()
}

fn default_upload_file_name() -> String {
    "example.sb3".to_string()
}

fn default_max_upload_size() -> u64 {
    20
}

fn default_index_write_attempts() -> u32 {
    3
}

impl Default for LessonsConfig {
    fn default() -> Self {
        Self {
            upload_root: String::new(),
            index_root: default_index_root(),
            upload_file_name: default_upload_file_name(),
            max_upload_size_mb: default_max_upload_size(),
            index_write_attempts: default_index_write_attempts(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/lessondrop.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Web configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Whether to serve static files.
    #[serde(default = "default_serve_static")]
    pub serve_static: bool,
    /// Path to static files directory.
    #[serde(default = "default_static_path")]
    pub static_path: String,
}

fn default_serve_static() -> bool {
    true
}

fn default_static_path() -> String {
    "public".to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            cors_origins: vec![],
            serve_static: default_serve_static(),
            static_path: default_static_path(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Dropbox configuration.
    #[serde(default)]
    pub dropbox: DropboxConfig,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Lesson layout configuration.
    #[serde(default)]
    pub lessons: LessonsConfig,
    /// Web configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(LessonDropError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| LessonDropError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `LESSONDROP_DROPBOX_CLIENT_ID`: Override the Dropbox app key
    pub fn apply_env_overrides(&mut self) {
        if let Ok(client_id) = std::env::var("LESSONDROP_DROPBOX_CLIENT_ID") {
            if !client_id.is_empty() {
                self.dropbox.client_id = client_id;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The Dropbox backend is selected but no client id is set
    /// - The index write attempt count is zero
    pub fn validate(&self) -> Result<()> {
        if self.storage.backend == StorageBackend::Dropbox && self.dropbox.client_id.is_empty() {
            return Err(LessonDropError::Config(
                "Dropbox backend is selected but dropbox.client_id is not set. \
                 Set it in config.toml or via LESSONDROP_DROPBOX_CLIENT_ID environment variable."
                    .to_string(),
            ));
        }
        if self.lessons.index_write_attempts == 0 {
            return Err(LessonDropError::Config(
                "lessons.index_write_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// OAuth redirect URI pointing at the `/auth` route.
    pub fn redirect_uri(&self) -> String {
        match &self.server.public_url {
            Some(base) => format!("{}/auth", base.trim_end_matches('/')),
            None => format!("http://{}:{}/auth", self.server.host, self.server.port),
        }
    }
}
