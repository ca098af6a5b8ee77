//! Engine configuration
//!
//! Every field has a default, so a partial JSON file is a valid config.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Lexical and import settings for one parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Markers that start a single-line comment
    pub comment_markers: Vec<String>,
    pub block_comment_open: String,
    pub block_comment_close: String,
    /// Nested imports deeper than this fail with `ImportDepth`
    pub max_import_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            comment_markers: vec!["#".to_string(), "//".to_string()],
            block_comment_open: "/*".to_string(),
            block_comment_close: "*/".to_string(),
            max_import_depth: 16,
        }
    }
}

impl Config {
    /// Parse a config from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)
            .map_err(|e| Error::Failed(format!("invalid config: {}", e)))?;
        if config.block_comment_open.is_empty() || config.block_comment_close.is_empty() {
            return Err(Error::Failed(
                "invalid config: block comment markers must not be empty".into(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = Config::from_json(r#"{"max_import_depth": 2}"#).unwrap();
        assert_eq!(config.max_import_depth, 2);
        assert_eq!(config.comment_markers, vec!["#", "//"]);
        assert_eq!(config.block_comment_open, "/*");
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Config::from_json("{").is_err());
        assert!(Config::from_json(r#"{"block_comment_open": ""}"#).is_err());
    }
}
