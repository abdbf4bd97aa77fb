use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::http::parser::ParserLimits;

/// Client dispatcher configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Maximum number of requests dispatched concurrently; the rest queue.
    pub max_concurrent: usize,

    /// Cap on response body size in bytes.
    pub max_body_size: usize,

    /// Cap on a single start line or header row in bytes.
    pub max_line_length: usize,

    /// Cap on the total response header block in bytes.
    pub max_header_block: usize,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            max_body_size: 1024 * 1024,
            max_line_length: 8 * 1024,
            max_header_block: 64 * 1024,
            connect_timeout_ms: 10_000,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the file named by `COURIER_CONFIG`, falling
    /// back to defaults when the variable is unset.
    pub fn load() -> Result<Self> {
        match std::env::var("COURIER_CONFIG") {
            Ok(path) => Self::from_yaml_file(&path),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Parse configuration from a YAML file.
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path}"))?;
        serde_yaml::from_str(&raw).with_context(|| format!("invalid config file {path}"))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub(crate) fn parser_limits(&self) -> ParserLimits {
        ParserLimits {
            max_line: self.max_line_length,
            max_headers: self.max_header_block,
        }
    }
}
