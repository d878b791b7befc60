//! File-based logging module for podcast-rs
//!
//! This module sets up tracing-based logging that writes to a file instead of stdout,
//! since the application uses a TUI that occupies the terminal.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const LOG_DIR: &str = ".logs";
const LOG_FILE_PREFIX: &str = "podcast-rs";
const DEFAULT_FILTER: &str = "podcast_rs=debug,warn";

/// Initialize the logging system.
///
/// Logs are written to `.logs/podcast-rs.YYYY-MM-DD` with daily rotation.
/// The log level can be controlled via the `RUST_LOG` environment variable;
/// by default this crate logs at DEBUG and everything else at WARN.
pub fn init_logging() -> anyhow::Result<()> {
    // Create logs directory if it doesn't exist
    let log_dir = Path::new(LOG_DIR);
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)?;
    }

    // Daily rotation keeps one file per day
    let file_appender = RollingFileAppender::new(Rotation::DAILY, LOG_DIR, LOG_FILE_PREFIX);

    // Non-blocking so the render loop never waits on disk
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The guard flushes on drop; it has to outlive every log call
    Box::leak(Box::new(guard));

    // RUST_LOG wins over the default filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // No ANSI colors in a file; thread names tell the audio worker apart
    let fmt_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!("Logging initialized - logs written to {}/", LOG_DIR);

    Ok(())
}

/// Log the outcome of a procedure call along with its elapsed time
#[macro_export]
macro_rules! log_procedure_result {
    ($procedure:expr, $started:expr, $result:expr) => {
        match &$result {
            Ok(_) => tracing::info!(
                procedure = $procedure,
                elapsed_ms = $started.elapsed().as_millis() as u64,
                "Procedure succeeded"
            ),
            Err(e) => tracing::error!(
                procedure = $procedure,
                elapsed_ms = $started.elapsed().as_millis() as u64,
                error = %e,
                "Procedure failed"
            ),
        }
    };
}

/// Log the start of a procedure call with additional context
#[macro_export]
macro_rules! log_procedure_request {
    ($procedure:expr, $($field:tt)*) => {
        tracing::debug!(procedure = $procedure, $($field)*, "Procedure started");
    };
}
