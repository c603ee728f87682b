//! Daemon configuration
//!
//! Sources, later ones win:
//! 1. Built-in defaults
//! 2. TOML file at `PEERQ_CONFIG` (default `~/.peerq/peerq.toml`), optional
//! 3. Environment variables `PEERQ__<SECTION>__<KEY>`, e.g. `PEERQ__PEER__WORKERS=2`

use anyhow::{Context, Result};
use peerq_core::PeerQueueConfig;
use serde::Deserialize;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "~/.peerq/peerq.toml";
const DEFAULT_LOG_FILTER: &str = "peerq=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Development: pretty formatting with colors
    #[default]
    Pretty,
    /// Production: JSON structured logging
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Write daily rolling files here instead of stderr
    pub dir: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: DEFAULT_LOG_FILTER.to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub peer: PeerQueueConfig,
    pub log: LogConfig,
}

/// Resolve the config file path from `PEERQ_CONFIG` or the default
pub fn config_path() -> String {
    std::env::var("PEERQ_CONFIG")
        .unwrap_or_else(|_| shellexpand::tilde(DEFAULT_CONFIG_PATH).into_owned())
}

/// Load and validate the daemon configuration
pub fn load(path: &str) -> Result<DaemonConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::from(Path::new(path)).required(false))
        .add_source(
            config::Environment::with_prefix("PEERQ")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("failed to read configuration from {}", path))?;

    let cfg: DaemonConfig = settings
        .try_deserialize()
        .context("invalid configuration")?;
    cfg.peer.validate()?;
    Ok(cfg)
}
