//! CLI flags, bounds checks, and the capture-settings snapshot.

use anyhow::{bail, Result};
use clap::Parser;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_VOICE_SAMPLE_RATE: u32 = 16_000;
const DEFAULT_VOICE_CHUNK_MS: u64 = 1_000;
const DEFAULT_VOICE_MAX_CAPTURE_MS: u64 = 60_000;
const MAX_CAPTURE_HARD_LIMIT_MS: u64 = 300_000;
const MAX_DEVICE_NAME_LEN: usize = 256;

/// CLI options for the prepterm TUI. Validated values keep the HTTP and
/// audio layers within sane bounds.
#[derive(Debug, Parser, Clone)]
#[command(about = "Interview prep terminal client", author, version)]
pub struct AppConfig {
    /// Base URL of the interview-prep backend
    #[arg(long = "server-url", env = "PREPTERM_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Overall per-request timeout (milliseconds)
    #[arg(long = "http-timeout-ms", default_value_t = DEFAULT_HTTP_TIMEOUT_MS)]
    pub http_timeout_ms: u64,

    /// Connection timeout (milliseconds)
    #[arg(long = "connect-timeout-ms", default_value_t = DEFAULT_CONNECT_TIMEOUT_MS)]
    pub connect_timeout_ms: u64,

    /// Capture from this input device instead of the system default
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print the input devices cpal can see, then exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Print an environment/backend diagnostic report and exit
    #[arg(long)]
    pub doctor: bool,

    /// Sample rate for uploaded voice audio (Hz)
    #[arg(long = "voice-sample-rate", default_value_t = DEFAULT_VOICE_SAMPLE_RATE)]
    pub voice_sample_rate: u32,

    /// Capture chunk cadence (milliseconds)
    #[arg(long = "voice-chunk-ms", default_value_t = DEFAULT_VOICE_CHUNK_MS)]
    pub voice_chunk_ms: u64,

    /// Hard cap on one recording, in milliseconds
    #[arg(long = "voice-max-capture-ms", default_value_t = DEFAULT_VOICE_MAX_CAPTURE_MS)]
    pub voice_max_capture_ms: u64,

    /// Enable the debug log file
    #[arg(long)]
    pub logs: bool,

    /// Disable all log files, including the crash log
    #[arg(long = "no-logs")]
    pub no_logs: bool,

    /// Allow log lines that quote user or backend text
    #[arg(long = "log-content")]
    pub log_content: bool,

    /// Record per-stage timing lines in the debug log
    #[arg(long)]
    pub log_timings: bool,
}

/// Tunable parameters for the voice capture pipeline.
#[derive(Debug, Clone)]
pub struct VoiceCaptureConfig {
    pub sample_rate: u32,
    pub chunk_ms: u64,
    pub max_capture_ms: u64,
    pub input_device: Option<String>,
}

impl AppConfig {
    /// Check CLI values and normalize the server URL.
    pub fn validate(&mut self) -> Result<()> {
        let trimmed = self.server_url.trim();
        if trimmed.is_empty() {
            bail!("--server-url cannot be empty");
        }
        let rest = trimmed
            .strip_prefix("http://")
            .or_else(|| trimmed.strip_prefix("https://"));
        let Some(rest) = rest else {
            bail!("--server-url must start with http:// or https://, got '{trimmed}'");
        };
        let host = rest.split('/').next().unwrap_or("");
        if host.is_empty() {
            bail!("--server-url '{trimmed}' has no host");
        }
        if trimmed.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
            bail!("--server-url must not contain whitespace or control characters");
        }
        // Store without a trailing slash so endpoint paths join cleanly.
        self.server_url = trimmed.trim_end_matches('/').to_string();

        if !(1_000..=120_000).contains(&self.http_timeout_ms) {
            bail!(
                "--http-timeout-ms must be between 1000 and 120000, got {}",
                self.http_timeout_ms
            );
        }
        if !(100..=30_000).contains(&self.connect_timeout_ms) {
            bail!(
                "--connect-timeout-ms must be between 100 and 30000, got {}",
                self.connect_timeout_ms
            );
        }
        if self.connect_timeout_ms > self.http_timeout_ms {
            bail!(
                "--connect-timeout-ms ({}) cannot exceed --http-timeout-ms ({})",
                self.connect_timeout_ms,
                self.http_timeout_ms
            );
        }

        if !(8_000..=48_000).contains(&self.voice_sample_rate) {
            bail!(
                "--voice-sample-rate must be between 8000 and 48000 Hz, got {}",
                self.voice_sample_rate
            );
        }
        if !(100..=5_000).contains(&self.voice_chunk_ms) {
            bail!(
                "--voice-chunk-ms must be between 100 and 5000, got {}",
                self.voice_chunk_ms
            );
        }
        if self.voice_max_capture_ms < 1_000 || self.voice_max_capture_ms > MAX_CAPTURE_HARD_LIMIT_MS
        {
            bail!(
                "--voice-max-capture-ms must be between 1000 and {MAX_CAPTURE_HARD_LIMIT_MS} ms, got {}",
                self.voice_max_capture_ms
            );
        }
        if self.voice_chunk_ms > self.voice_max_capture_ms {
            bail!(
                "--voice-chunk-ms ({}) cannot exceed --voice-max-capture-ms ({})",
                self.voice_chunk_ms,
                self.voice_max_capture_ms
            );
        }

        if let Some(device) = &self.input_device {
            if device.trim().is_empty() {
                bail!("--input-device cannot be blank");
            }
            if device.len() > MAX_DEVICE_NAME_LEN || device.chars().any(char::is_control) {
                bail!(
                    "--input-device must be <={MAX_DEVICE_NAME_LEN} characters with no control characters"
                );
            }
        }

        Ok(())
    }

    /// Snapshot the CLI-controlled capture settings for the voice worker.
    pub fn voice_capture_config(&self) -> VoiceCaptureConfig {
        VoiceCaptureConfig {
            sample_rate: self.voice_sample_rate,
            chunk_ms: self.voice_chunk_ms,
            max_capture_ms: self.voice_max_capture_ms,
            input_device: self.input_device.clone(),
        }
    }
}
