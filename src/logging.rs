use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

use crate::error::{ImporterError, Result};

/// Initializes console logging, plus JSON file logging when `log_dir` is set.
///
/// `RUST_LOG` wins over the default `sg_importer=info` directive. The returned
/// guard must be held until exit so buffered file logs are flushed.
pub fn init_logging(verbose: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let directive = format!("sg_importer={}", level)
        .parse()
        .map_err(|e| ImporterError::Config(format!("Invalid log directive: {}", e)))?;
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy()
        .add_directive(directive);

    // stdout is reserved for the run summary
    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, "sg_importer.log");
            let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
            (Some(fmt::layer().json().with_writer(non_blocking_writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| ImporterError::Config(format!("Failed to install log subscriber: {}", e)))?;

    Ok(guard)
}
