//! Store header
//!
//! The only thing ever written to disk: a fixed header recording the store
//! geometry. `init` refuses to start without a valid one.

use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use crate::config::StorageConfig;
use crate::error::FsError;
use crate::utils::time::unix_now;

pub const MAGIC: [u8; 8] = *b"OMNIFS01";
pub const FORMAT_VERSION: u32 = 0x0001_0000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreHeader {
    pub magic: [u8; 8],
    pub format_version: u32,
    pub total_size: u64,
    pub header_size: u32,
    pub block_size: u64,
    pub config_timestamp: u64,
    pub user_table_offset: u32,
    pub max_users: u32,
}

fn corrupt(reason: impl Into<String>) -> FsError {
    FsError::Io(io::Error::new(io::ErrorKind::InvalidData, reason.into()))
}

impl StoreHeader {
    pub fn from_config(storage: &StorageConfig) -> Result<Self, FsError> {
        let mut header = Self {
            magic: MAGIC,
            format_version: FORMAT_VERSION,
            total_size: storage.total_size,
            header_size: 0,
            block_size: storage.block_size,
            config_timestamp: unix_now(),
            user_table_offset: 0,
            max_users: storage.max_users,
        };

        let size = bincode::serialized_size(&header)
            .map_err(|e| corrupt(format!("cannot size header: {}", e)))?;
        header.header_size = size as u32;
        header.user_table_offset = size as u32;
        Ok(header)
    }

    pub fn encode(&self) -> Result<Vec<u8>, FsError> {
        bincode::serialize(self)
            .map_err(|e| corrupt(format!("cannot encode header: {}", e)))
    }

    /// Decodes and checks a header read from disk.
    pub fn decode(bytes: &[u8]) -> Result<Self, FsError> {
        let header: StoreHeader = bincode::deserialize(bytes)
            .map_err(|e| corrupt(format!("unreadable header: {}", e)))?;

        if header.magic != MAGIC {
            return Err(corrupt("bad magic"));
        }
        if header.format_version != FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {:#x}",
                header.format_version
            )));
        }
        if header.block_size == 0 || header.total_size < header.block_size {
            return Err(corrupt("inconsistent geometry"));
        }
        if header.total_blocks_u64() > u64::from(u32::MAX) || header.max_users == 0 {
            return Err(corrupt("geometry out of range"));
        }

        Ok(header)
    }

    fn total_blocks_u64(&self) -> u64 {
        self.total_size / self.block_size
    }

    pub fn total_blocks(&self) -> u32 {
        self.total_blocks_u64() as u32
    }
}

/// Writes a fresh header built from the `[storage]` settings at `config_path`.
pub fn format(store_path: &Path, config_path: &Path) -> Result<StoreHeader, FsError> {
    if store_path.as_os_str().is_empty() {
        return Err(FsError::InvalidConfig("empty store locator".into()));
    }

    let storage = StorageConfig::load(config_path)?;
    let header = StoreHeader::from_config(&storage)?;
    fs::write(store_path, header.encode()?)?;

    info!(
        "Formatted store {} ({} bytes, {} byte blocks, {} users max)",
        store_path.display(),
        header.total_size,
        header.block_size,
        header.max_users
    );
    Ok(header)
}

/// Reads the header; `NotFound` when the store file does not exist.
pub fn read_header(store_path: &Path) -> Result<StoreHeader, FsError> {
    if store_path.as_os_str().is_empty() {
        return Err(FsError::InvalidConfig("empty store locator".into()));
    }

    let bytes = match fs::read(store_path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(FsError::NotFound(store_path.display().to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    StoreHeader::decode(&bytes)
}
