//! Structured trace output, separate from the debug log: JSON lines a
//! log shipper can ingest directly. The subscriber is optional and
//! installs at most once per process.

use crate::config::AppConfig;
use std::{env, fs, path::PathBuf, sync::OnceLock};
use tracing_subscriber::fmt::time::UtcTime;

static INSTALLED: OnceLock<()> = OnceLock::new();

pub(crate) fn tracing_log_path() -> PathBuf {
    match env::var("PREPTERM_TRACE_LOG") {
        Ok(path) => PathBuf::from(path),
        Err(_) => env::temp_dir().join("prepterm_trace.jsonl"),
    }
}

/// Install a JSON tracing subscriber writing to the trace file. One shot;
/// later calls are no-ops. Disabled entirely unless logging is on.
pub(crate) fn init_tracing(config: &AppConfig) {
    if config.no_logs || !(config.logs || config.log_timings) {
        return;
    }
    INSTALLED.get_or_init(|| {
        if let Some(file) = trace_writer() {
            install_subscriber(file);
        }
    });
}

fn trace_writer() -> Option<fs::File> {
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(tracing_log_path())
        .ok()
}

fn install_subscriber(file: fs::File) {
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_timer(UtcTime::rfc_3339())
        .with_current_span(false)
        .with_span_list(false)
        .with_writer(file)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}
