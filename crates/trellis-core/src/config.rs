//! Dispatcher and server configuration
//!
//! Loaded from TOML or built in code. Every field has a default, so an
//! empty file is a valid configuration.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer};
use std::path::Path;

/// Default request body ceiling (32KB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 32 * 1024;

/// Default number of pooled body buffers
pub const DEFAULT_BODY_POOL_SIZE: usize = 64;

/// Configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hostname: String,
    pub port: u16,
    /// Tokio worker threads
    pub workers: usize,
    /// Body ceiling in bytes; accepts `32768` or `"32kb"`
    #[serde(deserialize_with = "deserialize_size")]
    pub max_body_size: usize,
    /// Number of buffers kept in the body pool
    pub body_pool_size: usize,
    /// Status for bodies that fill the buffer
    pub too_large_status: u16,
    /// Status for bodies that fail to decode
    pub invalid_format_status: u16,
    /// Log filter used when `RUST_LOG` is unset
    pub log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hostname: "0.0.0.0".to_string(),
            port: 3000,
            workers: num_cpus::get(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            body_pool_size: DEFAULT_BODY_POOL_SIZE,
            too_large_status: 413,
            invalid_format_status: 400,
            log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Semantic checks serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.max_body_size == 0 {
            return Err(Error::Config("max_body_size must be greater than 0".into()));
        }
        if self.body_pool_size == 0 {
            return Err(Error::Config("body_pool_size must be greater than 0".into()));
        }
        for (name, status) in [
            ("too_large_status", self.too_large_status),
            ("invalid_format_status", self.invalid_format_status),
        ] {
            if !(100..=599).contains(&status) {
                return Err(Error::Config(format!("{name} {status} is not an HTTP status")));
            }
        }
        if self.workers == 0 {
            return Err(Error::Config("workers must be greater than 0".into()));
        }
        Ok(())
    }

    /// Socket address string for the listener
    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    pub fn body_pool_size(mut self, size: usize) -> Self {
        self.body_pool_size = size;
        self
    }

    pub fn too_large_status(mut self, status: u16) -> Self {
        self.too_large_status = status;
        self
    }

    pub fn invalid_format_status(mut self, status: u16) -> Self {
        self.invalid_format_status = status;
        self
    }
}

/// Parse size from string (e.g., "10mb", "1gb", "500kb", "100")
pub fn parse_size(s: &str) -> Option<usize> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix("gb") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("mb") {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("kb") {
        (n, 1024)
    } else if let Some(n) = s.strip_suffix('b') {
        (n, 1)
    } else {
        (s.as_str(), 1)
    };

    let num: usize = num_str.trim().parse().ok()?;
    num.checked_mul(multiplier)
}

/// Format size for display
pub fn format_size(bytes: usize) -> String {
    if bytes >= 1024 * 1024 * 1024 {
        format!("{:.1}GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else {
        format!("{}B", bytes)
    }
}

fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Bytes(usize),
        Text(String),
    }

    match Size::deserialize(deserializer)? {
        Size::Bytes(n) => Ok(n),
        Size::Text(s) => parse_size(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid size {s:?}"))),
    }
}
