//! Tracing setup for the command-line binary.

use std::fs::OpenOptions;
use std::io::Write;

use tracing_subscriber::prelude::*;

const LOG_FILE_NAME: &str = "asciiforge.log";

/// Default directives when `RUST_LOG` is not set
const DEFAULT_FILTER: &str = "info,asciiforge=debug";

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER))
}

/// Install stderr logging, plus a log file in debug builds.
///
/// The returned guard flushes the file writer and must be kept alive for the
/// duration of the program.
#[cfg(debug_assertions)]
pub fn setup_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let logs_dir = crate::paths::logs_dir();
    if std::fs::create_dir_all(&logs_dir).is_err() {
        eprintln!("Failed to create logs directory");
        setup_console_only();
        return None;
    }

    let log_file_path = logs_dir.join(LOG_FILE_NAME);

    // Append session separator to existing log file
    if let Ok(mut file) = OpenOptions::new().append(true).open(&log_file_path) {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let separator = "=".repeat(80);
        let _ = writeln!(
            file,
            "\n\n{}\n=== New Session Started at {} ===\n{}\n",
            separator, timestamp, separator
        );
    }

    let file_appender = tracing_appender::rolling::never(&logs_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // No ANSI colors for file output
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_level(true);

    // Rendered documents go to stdout, so logs stay on stderr
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .with(console_layer)
        .init();

    Some(guard)
}

#[cfg(not(debug_assertions))]
pub fn setup_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    setup_console_only();
    None
}

fn setup_console_only() {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(console_layer)
        .init();
}
