use std::process::Command;

fn merged_streams(output: &std::process::Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

fn prepterm_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_prepterm").expect("prepterm test binary not built")
}

#[test]
fn help_mentions_name() {
    let output = Command::new(prepterm_bin())
        .arg("--help")
        .output()
        .expect("run prepterm --help");
    assert!(output.status.success());
    let merged = merged_streams(&output);
    assert!(merged.contains("prepterm"));
    assert!(merged.contains("--server-url"));
}

#[test]
fn lists_input_devices_from_env() {
    let output = Command::new(prepterm_bin())
        .arg("--list-input-devices")
        .env("PREPTERM_TEST_DEVICES", "Desk Mic,Webcam Mic")
        .output()
        .expect("run prepterm --list-input-devices");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Audio input devices:"));
    assert!(stdout.contains("Desk Mic"));
    assert!(stdout.contains("Webcam Mic"));
}

#[test]
fn reports_no_input_devices() {
    let output = Command::new(prepterm_bin())
        .arg("--list-input-devices")
        .env("PREPTERM_TEST_DEVICES", "")
        .output()
        .expect("run prepterm --list-input-devices");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No audio input devices found."));
}

#[test]
fn rejects_malformed_server_url() {
    let output = Command::new(prepterm_bin())
        .args(["--server-url", "ftp://example.com"])
        .output()
        .expect("run prepterm with bad url");
    assert!(!output.status.success());
    let merged = merged_streams(&output);
    assert!(merged.contains("server-url"));
}

#[test]
fn doctor_reports_sections_and_exits_zero() {
    let output = Command::new(prepterm_bin())
        .args(["--doctor", "--server-url", "http://127.0.0.1:9"])
        .output()
        .expect("run prepterm --doctor");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("prepterm doctor"));
    assert!(stdout.contains("Backend:"));
    assert!(stdout.contains("Audio:"));
}
