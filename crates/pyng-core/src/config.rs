//! Configuration for the pyng sender and receiver.
//!
//! Resolution order: environment variables → config file → defaults.
//! Command-line arguments, where a binary accepts them, win over all three.
//!
//! Config file location:
//!   1. $PYNG_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/pyng/config.toml
//!   3. ~/.config/pyng/config.toml

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::PathBuf;

use crate::digest::DigestAlgorithm;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PyngConfig {
    pub receiver: ReceiverConfig,
    pub sender: SenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Address the raw ICMP socket binds to.
    pub bind_addr: Ipv4Addr,
    /// Directory reassembled files are written to.
    pub output_dir: PathBuf,
    /// Fingerprint reported for each reassembled file.
    pub digest: DigestAlgorithm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// How echo requests are emitted.
    pub backend: SendBackend,
    /// Program invoked by the `ping` backend.
    pub ping_program: String,
    /// Pause between chunks in milliseconds. 0 = back to back.
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendBackend {
    /// Shell out to the system `ping` once per chunk.
    #[default]
    Ping,
    /// Build echo requests on a raw ICMP socket.
    Raw,
}

impl std::str::FromStr for SendBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ping" => Ok(SendBackend::Ping),
            "raw" => Ok(SendBackend::Raw),
            other => Err(format!("unknown send backend: {other}")),
        }
    }
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_addr: Ipv4Addr::UNSPECIFIED,
            output_dir: PathBuf::from("."),
            digest: DigestAlgorithm::Md5,
        }
    }
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            backend: SendBackend::Ping,
            ping_program: "ping".to_string(),
            interval_ms: 0,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("pyng")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("invalid value for {key}: {reason}")]
    InvalidOverride { key: &'static str, reason: String },
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl PyngConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path(), |key| std::env::var(key).ok())
    }

    /// Read `path` if it exists, then apply overrides from `lookup`.
    /// A bad override fails the whole load.
    pub fn load_from(
        path: &std::path::Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            PyngConfig::default()
        };
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("PYNG_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Apply PYNG_* overrides read through `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup("PYNG_RECEIVER__BIND_ADDR") {
            self.receiver.bind_addr = v.parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::InvalidOverride {
                    key: "PYNG_RECEIVER__BIND_ADDR",
                    reason: e.to_string(),
                }
            })?;
        }
        if let Some(v) = lookup("PYNG_RECEIVER__OUTPUT_DIR") {
            self.receiver.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("PYNG_RECEIVER__DIGEST") {
            self.receiver.digest = v.parse().map_err(|reason| ConfigError::InvalidOverride {
                key: "PYNG_RECEIVER__DIGEST",
                reason,
            })?;
        }
        if let Some(v) = lookup("PYNG_SENDER__BACKEND") {
            self.sender.backend = v.parse().map_err(|reason| ConfigError::InvalidOverride {
                key: "PYNG_SENDER__BACKEND",
                reason,
            })?;
        }
        if let Some(v) = lookup("PYNG_SENDER__PING_PROGRAM") {
            self.sender.ping_program = v;
        }
        if let Some(v) = lookup("PYNG_SENDER__INTERVAL_MS") {
            self.sender.interval_ms =
                v.parse().map_err(|e: std::num::ParseIntError| {
                    ConfigError::InvalidOverride {
                        key: "PYNG_SENDER__INTERVAL_MS",
                        reason: e.to_string(),
                    }
                })?;
        }
        Ok(())
    }
}
