//! Configuration management for the OmniFS server
//!
//! Network settings are consumed by the listener; storage settings are the
//! values `format` stamps into a fresh store header.

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::FsError;

pub const DEFAULT_TOTAL_SIZE: u64 = 4 * 1024 * 1024;
pub const DEFAULT_BLOCK_SIZE: u64 = 4096;
pub const DEFAULT_MAX_USERS: u32 = 1024;

/// Complete server configuration
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub server: NetworkConfig,
    pub storage: StorageConfig,
}

/// Listener and protocol limits (restart required)
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    /// IP address to bind the command listener
    /// Environment: OMNIFS_SERVER__BIND_ADDRESS
    pub bind_address: String,

    /// Port for the command listener
    /// Environment: OMNIFS_SERVER__PORT
    pub port: u16,

    /// Maximum concurrent connections
    pub max_clients: usize,

    /// Maximum length of a single command line
    pub max_command_length: usize,

    /// Maximum accepted username length
    pub max_username_length: usize,

    /// Maximum size of one CREATE/EDIT data block
    pub max_upload_bytes: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            max_clients: 64,
            max_command_length: 4096,
            max_username_length: 32,
            max_upload_bytes: 1024 * 1024,
        }
    }
}

/// Store geometry written into the header at format time
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Location of the store header file
    pub store_path: PathBuf,

    /// Total capacity in bytes
    pub total_size: u64,

    /// Allocation unit in bytes
    pub block_size: u64,

    /// Capacity of the identity store
    pub max_users: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("file.omni"),
            total_size: DEFAULT_TOTAL_SIZE,
            block_size: DEFAULT_BLOCK_SIZE,
            max_users: DEFAULT_MAX_USERS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from config.toml with environment overrides.
    ///
    /// The file is optional; every field falls back to its default.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    pub fn load_from(base_name: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(base_name).required(false))
            .add_source(
                Environment::with_prefix("OMNIFS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Address string for the command listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("server.port cannot be 0".into()));
        }

        if self.server.max_clients == 0 {
            return Err(ConfigError::Message(
                "server.max_clients must be greater than 0".into(),
            ));
        }

        if self.server.max_command_length == 0 || self.server.max_username_length == 0 {
            return Err(ConfigError::Message(
                "server command and username limits must be greater than 0".into(),
            ));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Message(
                "server.max_upload_bytes must be greater than 0".into(),
            ));
        }

        self.storage
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))
    }
}

impl StorageConfig {
    /// Read the `[storage]` table of the config file at `path`.
    ///
    /// A missing file or a missing table yields the defaults.
    pub fn load(path: &Path) -> Result<Self, FsError> {
        if path.as_os_str().is_empty() {
            return Err(FsError::InvalidConfig("empty config locator".into()));
        }

        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .build()?;

        let storage = match settings.get::<StorageConfig>("storage") {
            Ok(storage) => storage,
            Err(ConfigError::NotFound(_)) => StorageConfig::default(),
            Err(e) => return Err(e.into()),
        };

        storage.validate()?;
        Ok(storage)
    }

    pub fn total_blocks(&self) -> u64 {
        self.total_size / self.block_size
    }

    pub fn validate(&self) -> Result<(), FsError> {
        if self.block_size == 0 {
            return Err(FsError::InvalidConfig(
                "storage.block_size must be greater than 0".into(),
            ));
        }

        if self.total_size < self.block_size {
            return Err(FsError::InvalidConfig(format!(
                "storage.total_size ({}) is smaller than one block ({})",
                self.total_size, self.block_size
            )));
        }

        if self.total_blocks() > u64::from(u32::MAX) {
            return Err(FsError::InvalidConfig(
                "storage.total_size describes too many blocks".into(),
            ));
        }

        if self.max_users == 0 {
            return Err(FsError::InvalidConfig(
                "storage.max_users must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}
