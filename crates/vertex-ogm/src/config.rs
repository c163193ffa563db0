//! Environment driven configuration

use std::env;

use dotenv::dotenv;

use crate::data::errors::{OgmError, OgmResult};

/// Records per composed query in batch create/save.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Environment variable overriding the batch chunk size.
pub const CHUNK_SIZE_ENV: &str = "OGM_BATCH_CHUNK_SIZE";

/// Batch protocol settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    chunk_size: usize,
}

impl BatchConfig {
    pub fn new(chunk_size: usize) -> OgmResult<Self> {
        if chunk_size == 0 {
            return Err(OgmError::Configuration("chunk size must be at least 1".to_string()));
        }
        Ok(Self { chunk_size })
    }

    /// Reads `OGM_BATCH_CHUNK_SIZE` (after loading any `.env` file), falling
    /// back to the default when it is unset.
    pub fn from_env() -> OgmResult<Self> {
        dotenv().ok();
        match env::var(CHUNK_SIZE_ENV) {
            Ok(raw) => {
                let chunk_size = raw.trim().parse::<usize>().map_err(|e| {
                    OgmError::Configuration(format!("{} must be a positive integer: {}", CHUNK_SIZE_ENV, e))
                })?;
                Self::new(chunk_size)
            }
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}
