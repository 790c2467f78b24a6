/// Structured logging setup using tracing
///
/// CRITICAL: Writes to stderr ONLY (never stdout) to avoid corrupting JSON-RPC stream.
/// Auto-detects format: human-readable with ANSI colors when stderr is a terminal,
/// structured JSON when piped/redirected. An optional log file always receives JSON.

use std::fs::{File, OpenOptions};
use std::io::IsTerminal;
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::{
    fmt::format::{Format, Json, JsonFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};
use crate::config::Config;

type FileLayer<S> = tracing_subscriber::fmt::Layer<S, JsonFields, Format<Json>, Mutex<File>>;

/// JSON layer appending to `path`, or `None` (with a note on stderr) if it cannot be opened.
///
/// Generic over the subscriber so each format branch gets a layer of its own type.
fn file_layer<S>(path: Option<&str>) -> Option<FileLayer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let path = path?;
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .json(),
        ),
        Err(e) => {
            // Subscriber is not installed yet, so this is the one place stderr is written directly
            eprintln!("Cannot open log file '{}': {} (logging to stderr only)", path, e);
            None
        }
    }
}

/// Initialize tracing subscriber with stderr output (plus optional file)
///
/// Format auto-detection:
/// - Terminal: human-readable with ANSI colors
/// - Pipe/redirect: structured JSON
///
/// Log level from config.log_level (default: info)
/// RUST_LOG env var can override at runtime
pub fn init_logging(config: &Config) {
    // Build env filter from config, with RUST_LOG override
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // Auto-detect format based on stderr terminal status
    let stderr_is_terminal = std::io::stderr().is_terminal();

    if stderr_is_terminal {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
            )
            .with(file_layer(config.log_file.as_deref()))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .json()
            )
            .with(file_layer(config.log_file.as_deref()))
            .init();
    }
}
