//! Lowering options
//!
//! Options are usually read from the `[lower]` table of a project manifest,
//! but every field has a default so an empty table is valid.

use crate::error::{LowerError, LowerResult};
use serde::{Deserialize, Serialize};

/// Upper bound for the namespace token: a full SHA-256 digest in hex.
const MAX_HASH_LEN: usize = 64;

/// Lowering options (passed from manifest or driver)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LowerOptions {
    /// Hex digits of the per-namespace private-name token
    pub private_hash_len: usize,
    /// Emit a clear-slot statement when a scope with an alias object exits
    pub clear_scope_aliases: bool,
    /// Extra identifiers local names must avoid (runtime helpers, globals)
    pub reserved: Vec<String>,
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self {
            private_hash_len: 8,
            clear_scope_aliases: true,
            reserved: Vec::new(),
        }
    }
}

impl LowerOptions {
    /// Parse options from a TOML table.
    pub fn from_toml_str(source: &str) -> LowerResult<Self> {
        let options: LowerOptions =
            toml::from_str(source).map_err(|e| LowerError::InvalidOptions {
                message: e.to_string(),
            })?;
        options.validate()?;
        Ok(options)
    }

    pub fn with_private_hash_len(mut self, len: usize) -> Self {
        self.private_hash_len = len;
        self
    }

    pub fn with_clear_scope_aliases(mut self, clear: bool) -> Self {
        self.clear_scope_aliases = clear;
        self
    }

    pub fn with_reserved<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn validate(&self) -> LowerResult<()> {
        if self.private_hash_len == 0 || self.private_hash_len > MAX_HASH_LEN {
            return Err(LowerError::InvalidOptions {
                message: format!(
                    "private_hash_len must be between 1 and {}, got {}",
                    MAX_HASH_LEN, self.private_hash_len
                ),
            });
        }
        if let Some(bad) = self.reserved.iter().find(|name| name.is_empty()) {
            return Err(LowerError::InvalidOptions {
                message: format!("reserved identifier {:?} is empty", bad),
            });
        }
        Ok(())
    }
}
