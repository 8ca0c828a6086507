//! HANDLER session configuration.

use mysqlext_core::error::ConfigError;
use mysqlext_core::{Error, MAX_IDENTIFIER_LEN, Result};
use serde::{Deserialize, Serialize};

/// Digits in the largest random handle suffix (20_000_000_000).
pub(crate) const SUFFIX_DIGITS: usize = 11;

/// Defaults applied by a [`HandlerSession`](super::HandlerSession).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Index used when a read doesn't name one
    pub default_index: String,
    /// Rows fetched per round trip when iterating
    pub chunk_size: usize,
    /// Characters kept from the end of the table name in handle names
    pub name_tail: usize,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            default_index: "PRIMARY".to_string(),
            chunk_size: 100,
            name_tail: 31,
        }
    }
}

impl HandlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the index used by reads that don't specify one.
    pub fn default_index(mut self, index: impl Into<String>) -> Self {
        self.default_index = index.into();
        self
    }

    /// Set the default iteration chunk size.
    pub fn chunk_size(mut self, rows: usize) -> Self {
        self.chunk_size = rows;
        self
    }

    /// Set how much of the table name is kept in generated handle names.
    pub fn name_tail(mut self, chars: usize) -> Self {
        self.name_tail = chars;
        self
    }

    /// Reject settings that would produce invalid statements.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(config_error("chunk_size must be at least 1"));
        }
        if self.default_index.is_empty() {
            return Err(config_error("default_index cannot be empty"));
        }
        // tail + '_' + suffix has to fit in one identifier
        let max_tail = MAX_IDENTIFIER_LEN - 1 - SUFFIX_DIGITS;
        if self.name_tail == 0 || self.name_tail > max_tail {
            return Err(config_error(format!(
                "name_tail must be between 1 and {max_tail}, got {}",
                self.name_tail
            )));
        }
        Ok(())
    }
}

fn config_error(msg: impl Into<String>) -> Error {
    Error::Config(ConfigError {
        message: msg.into(),
        source: None,
    })
}
