//! Wildcard key matching
//!
//! Each `*` stands for any run of characters (including none). Everything
//! else matches literally, and the whole key must match.

use regex::Regex;

use super::backend::WILDCARD;
use super::errors::{StorageError, StorageResult};

/// A compiled wildcard key pattern
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    regex: Regex,
}

impl WildcardPattern {
    pub fn compile(pattern: &str) -> StorageResult<Self> {
        let body = pattern
            .split(WILDCARD)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        let regex = Regex::new(&format!("^{}$", body))
            .map_err(|e| StorageError::Io(format!("invalid wildcard pattern '{}': {}", pattern, e)))?;
        Ok(Self { regex })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}
