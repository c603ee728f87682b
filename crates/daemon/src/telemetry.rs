//! Logging setup
//!
//! stdout carries responses, so logs go to stderr or to rolling files.

use crate::settings::{LogConfig, LogFormat};
use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "peerq.log";

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured filter. The returned guard flushes
/// the file writer on drop and must live until shutdown.
///
/// # Example
///
/// ```text
/// PEERQ__LOG__FORMAT=json PEERQ__LOG__DIR=/var/log/peerq ./peerq
/// ```
pub fn init_logging(cfg: &LogConfig) -> Result<Option<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&cfg.filter))?;

    let (writer, guard) = match &cfg.dir {
        Some(dir) => {
            let dir = shellexpand::tilde(dir).into_owned();
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    match cfg.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(writer))
            .try_init()?,
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_writer(writer))
            .try_init()?,
    }

    Ok(guard)
}
