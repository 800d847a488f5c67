//! `--doctor` report: environment, config, backend reachability, audio.
//!
//! Diagnostics never fail the process; every probe folds its error into
//! the printed report and the command exits 0.

use crate::api::ApiClient;
use crate::audio::Recorder;
use crate::config::AppConfig;
use crate::{crash_log_path, log_file_path};
use std::env;
use std::fmt::{Display, Write};
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Plain-text report assembled section by section.
pub struct DoctorReport {
    text: String,
}

impl DoctorReport {
    pub fn new(title: &str) -> Self {
        Self {
            text: format!("{title}\n"),
        }
    }

    pub fn section(&mut self, name: &str) {
        let _ = writeln!(self.text, "\n{name}:");
    }

    pub fn kv(&mut self, key: &str, value: impl Display) {
        let _ = writeln!(self.text, "  {key}: {value}");
    }

    pub fn raw(&mut self, line: &str) {
        let _ = writeln!(self.text, "{line}");
    }

    pub fn render(&self) -> String {
        self.text.trim_end_matches('\n').to_string()
    }
}

pub fn doctor_report(config: &AppConfig) -> DoctorReport {
    let mut report = DoctorReport::new("prepterm doctor");
    report.kv("version", env!("CARGO_PKG_VERSION"));
    report.kv("os", format!("{}/{}", env::consts::OS, env::consts::ARCH));

    let mut resolved = config.clone();
    let validation = resolved.validate();
    if validation.is_err() {
        resolved = config.clone();
    }

    terminal_section(&mut report);
    config_section(&mut report, &resolved, &validation);
    backend_section(&mut report, &resolved);
    audio_section(&mut report, &resolved);
    report
}

fn terminal_section(report: &mut DoctorReport) {
    report.section("Terminal");
    match crossterm::terminal::size() {
        Ok((cols, rows)) => report.kv("size", format!("{cols}x{rows}")),
        Err(err) => report.kv("size", format!("error: {err}")),
    }
    if let Ok(term) = env::var("TERM") {
        report.kv("term", term);
    }
}

fn config_section(
    report: &mut DoctorReport,
    resolved: &AppConfig,
    validation: &anyhow::Result<()>,
) {
    report.section("Config");
    match validation {
        Ok(()) => report.kv("validation", "ok"),
        Err(err) => report.kv("validation", format!("error: {err}")),
    }
    report.kv("server_url", &resolved.server_url);
    report.kv(
        "timeouts",
        format!(
            "request {}ms, connect {}ms",
            resolved.http_timeout_ms, resolved.connect_timeout_ms
        ),
    );
    let logs = !resolved.no_logs && (resolved.logs || resolved.log_timings);
    report.kv("logs", if logs { "enabled" } else { "disabled" });
    report.kv("log_file", log_file_path().display());
    report.kv("crash_log", crash_log_path().display());
}

fn backend_section(report: &mut DoctorReport, resolved: &AppConfig) {
    report.section("Backend");
    // Short probe timeouts so a dead backend stalls the report for two
    // seconds, not the configured thirty.
    let probe = ApiClient::with_timeouts(&resolved.server_url, PROBE_TIMEOUT, PROBE_TIMEOUT)
        .and_then(|api| api.list_companies());
    match probe {
        Ok(companies) => {
            report.kv("reachable", "yes");
            report.kv("companies", companies.len());
        }
        Err(err) => report.kv("reachable", format!("no ({err:#})")),
    }
}

fn audio_section(report: &mut DoctorReport, resolved: &AppConfig) {
    report.section("Audio");
    let device = resolved.input_device.as_deref().unwrap_or("default");
    report.kv("input_device", device);
    match Recorder::list_devices() {
        Ok(devices) => {
            report.kv("device_count", devices.len());
            if devices.is_empty() {
                report.kv("devices", "none");
            } else {
                report.raw("  devices:");
                for name in &devices {
                    report.raw(&format!("    - {name}"));
                }
            }
        }
        Err(err) => report.kv("devices", format!("error: {err}")),
    }
}
