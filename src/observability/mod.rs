pub mod recorder;

pub use recorder::{EventRecorder, MemoryRecorder, TracingRecorder, TurnEvent};

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

/// Initialize the tracing subscriber with the configured log level and format.
///
/// `RUST_LOG`, when set and valid, takes precedence over the config value.
pub fn init_tracing(log_level: &str, log_format: LogFormat) {
    let Some(directive) = tracing_directive(log_level) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);
    match log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().flatten_event(true).init(),
    }
}

/// Map a config log level to an `EnvFilter` directive.
///
/// `DISABLED` installs no subscriber at all; `WARNING` and `CRITICAL` are the
/// config spellings of `warn` and `error`.
fn tracing_directive(log_level: &str) -> Option<&'static str> {
    match log_level.trim().to_ascii_uppercase().as_str() {
        "DISABLED" => None,
        "DEBUG" => Some("debug"),
        "WARNING" | "WARN" => Some("warn"),
        "ERROR" | "CRITICAL" => Some("error"),
        _ => Some("info"),
    }
}
