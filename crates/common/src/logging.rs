//! Structured logging setup
//!
//! Console output (plain or JSON) plus a JSON file log at `AppConfig::log_file_path`.

use crate::config::AppConfig;
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &AppConfig) -> io::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let log_path = config.log_file_path();
    let (log_dir, file_name) = split_log_path(&log_path)?;
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::never(log_dir, file_name);

    let file_layer = fmt::layer()
        .json()
        .with_writer(file_appender)
        .with_ansi(false);

    let (json_console, plain_console) = if config.observability.json_logging {
        (Some(fmt::layer().json().with_target(true)), None)
    } else {
        (None, Some(fmt::layer().with_target(false)))
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_console)
        .with(plain_console)
        .with(file_layer)
        .try_init();

    Ok(())
}

/// Directory and file name of the log file
fn split_log_path(path: &Path) -> io::Result<(&Path, &OsStr)> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("log path '{}' has no file name", path.display()),
        )
    })?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    Ok((dir, file_name))
}
