use crate::config::AppConfig;
use std::{
    env, fs,
    io::{self, Write},
    panic,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU8, Ordering},
        Mutex, MutexGuard, OnceLock,
    },
    time::{SystemTime, UNIX_EPOCH},
};

// Gate bits. Content and timing are only ever set together with debug.
const GATE_DEBUG: u8 = 1 << 0;
const GATE_CONTENT: u8 = 1 << 1;
const GATE_TIMINGS: u8 = 1 << 2;

const DEBUG_LOG_CAP: u64 = 5 * 1024 * 1024;
const CRASH_LOG_CAP: u64 = 256 * 1024;

static GATES: AtomicU8 = AtomicU8::new(0);
static DEBUG_LOG: OnceLock<Mutex<Option<DebugLog>>> = OnceLock::new();

/// Debug log location in the OS temp directory.
pub fn log_file_path() -> PathBuf {
    env::temp_dir().join("prepterm_tui.log")
}

/// Crash log location. Entries stay metadata-only unless --log-content is on.
pub fn crash_log_path() -> PathBuf {
    env::temp_dir().join("prepterm_crash.log")
}

fn gate(bit: u8) -> bool {
    GATES.load(Ordering::Relaxed) & bit != 0
}

fn debug_log() -> MutexGuard<'static, Option<DebugLog>> {
    DEBUG_LOG
        .get_or_init(|| Mutex::new(None))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Append handle for the debug log. The file is truncated whenever a write
/// would push it past the cap.
struct DebugLog {
    path: PathBuf,
    file: fs::File,
    len: u64,
}

impl DebugLog {
    fn open(path: PathBuf) -> Option<Self> {
        let mut len = file_len(&path);
        if len > DEBUG_LOG_CAP {
            fs::remove_file(&path).ok();
            len = 0;
        }
        let file = append_handle(&path).ok()?;
        Some(Self { path, file, len })
    }

    fn push_line(&mut self, line: &str) {
        if self.len.saturating_add(line.len() as u64) > DEBUG_LOG_CAP {
            if let Ok(file) = truncate_handle(&self.path) {
                self.file = file;
                self.len = 0;
            }
        }
        if self.file.write_all(line.as_bytes()).is_err() {
            return;
        }
        self.len = self.len.saturating_add(line.len() as u64);
    }
}

fn file_len(path: &Path) -> u64 {
    fs::metadata(path).map(|meta| meta.len()).unwrap_or(0)
}

fn append_handle(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new().create(true).append(true).open(path)
}

fn truncate_handle(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Apply the logging flags and open or drop the debug log accordingly.
pub fn init_logging(config: &AppConfig) {
    let enabled = !config.no_logs && (config.logs || config.log_timings);
    let mut gates = 0;
    if enabled {
        gates |= GATE_DEBUG;
        if config.log_content {
            gates |= GATE_CONTENT;
        }
        if config.log_timings {
            gates |= GATE_TIMINGS;
        }
    }
    GATES.store(gates, Ordering::Relaxed);
    set_writer(enabled);

    crate::telemetry::init_tracing(config);
}

fn set_writer(enabled: bool) {
    *debug_log() = if enabled {
        DebugLog::open(log_file_path())
    } else {
        None
    };
}

/// Append a timestamped line to the debug log, if logging is on.
pub fn log_debug(msg: &str) {
    if !gate(GATE_DEBUG) {
        return;
    }
    let line = format!("[{}] {msg}\n", unix_timestamp());
    if let Some(log) = debug_log().as_mut() {
        log.push_line(&line);
    }
}

/// Like [`log_debug`] for lines quoting user or backend text. Off unless
/// --log-content was given.
pub fn log_debug_content(msg: &str) {
    if gate(GATE_CONTENT) {
        log_debug(msg);
    }
}

/// Record a `timing|...` line when --log-timings is active.
pub fn log_timing(msg: &str) {
    if gate(GATE_TIMINGS) {
        log_debug(&format!("timing|{msg}"));
    }
}

/// Record the panic location and crate version to the crash log.
pub fn log_panic(info: &panic::PanicHookInfo<'_>) {
    if !gate(GATE_DEBUG) {
        return;
    }
    let location = match info.location() {
        Some(loc) => format!("{}:{}", loc.file(), loc.line()),
        None => "unknown".to_string(),
    };
    let entry = format!(
        "[{}] panic at {location}: {} (v{})\n",
        unix_timestamp(),
        panic_payload(info),
        env!("CARGO_PKG_VERSION")
    );
    append_capped(&crash_log_path(), &entry, CRASH_LOG_CAP);
}

fn panic_payload(info: &panic::PanicHookInfo<'_>) -> String {
    if !gate(GATE_CONTENT) {
        return "panic payload omitted (log-content disabled)".to_string();
    }
    let payload = info.payload();
    payload
        .downcast_ref::<&str>()
        .map(|text| text.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "opaque panic payload".to_string())
}

fn append_capped(path: &Path, line: &str, cap: u64) {
    let next = file_len(path).saturating_add(line.len() as u64);
    let handle = if next > cap {
        truncate_handle(path)
    } else {
        append_handle(path)
    };
    if let Ok(mut file) = handle {
        file.write_all(line.as_bytes()).ok();
    }
}

#[cfg(test)]
pub(crate) fn set_logging_for_tests(enabled: bool, content_enabled: bool) {
    let mut gates = 0;
    if enabled {
        gates |= GATE_DEBUG | GATE_TIMINGS;
        if content_enabled {
            gates |= GATE_CONTENT;
        }
    }
    GATES.store(gates, Ordering::Relaxed);
    set_writer(enabled);
}
