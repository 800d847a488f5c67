use anyhow::Result;
use clap::Parser;
use prepterm::{
    audio::Recorder, config::AppConfig, doctor::doctor_report, init_logging, log_debug,
    log_file_path, ui, App,
};
use std::env;

#[cfg(not(test))]
fn main() -> Result<()> {
    run_cli(env::args_os())
}

#[cfg_attr(test, allow(dead_code))]
fn run_cli<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let mut flags = AppConfig::parse_from(args);

    // Utility flags print to stdout and exit before any terminal setup.
    if flags.doctor {
        println!("{}", doctor_report(&flags).render());
        return Ok(());
    }
    if flags.list_input_devices {
        print!("{}", input_device_listing()?);
        return Ok(());
    }

    flags.validate()?;
    init_logging(&flags);
    log_debug(&format!(
        "prepterm {} starting, log at {:?}",
        env!("CARGO_PKG_VERSION"),
        log_file_path()
    ));
    log_debug(&format!("backend: {}", flags.server_url));

    let mut app = App::new(flags)?;
    app.bootstrap();
    let outcome = ui::run_app(&mut app);

    match &outcome {
        Ok(()) => log_debug("prepterm exited cleanly"),
        Err(err) => log_debug(&format!("prepterm exited with error: {err:#}")),
    }
    outcome
}

/// Device names, one per line. `PREPTERM_TEST_DEVICES` substitutes a
/// synthetic comma-separated list so tests never probe real hardware.
fn input_device_listing() -> Result<String> {
    let devices = match env::var("PREPTERM_TEST_DEVICES") {
        Ok(raw) => split_device_list(&raw),
        Err(_) => Recorder::list_devices()?,
    };
    if devices.is_empty() {
        return Ok("No audio input devices found.\n".to_string());
    }
    let mut listing = String::from("Audio input devices:\n");
    for name in devices {
        listing.push_str("  - ");
        listing.push_str(&name);
        listing.push('\n');
    }
    Ok(listing)
}

fn split_device_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Restores the previous env value when dropped.
    struct DeviceEnv {
        previous: Option<String>,
    }

    impl DeviceEnv {
        fn set(value: &str) -> Self {
            let previous = env::var("PREPTERM_TEST_DEVICES").ok();
            env::set_var("PREPTERM_TEST_DEVICES", value);
            Self { previous }
        }
    }

    impl Drop for DeviceEnv {
        fn drop(&mut self) {
            match self.previous.take() {
                Some(value) => env::set_var("PREPTERM_TEST_DEVICES", value),
                None => env::remove_var("PREPTERM_TEST_DEVICES"),
            }
        }
    }

    #[test]
    fn device_listing_uses_the_injected_list() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _env = DeviceEnv::set("Desk Mic,Webcam Mic");
        let listing = input_device_listing().expect("listing");
        assert!(listing.contains("Audio input devices:"));
        assert!(listing.contains("Desk Mic"));
        assert!(listing.contains("Webcam Mic"));
    }

    #[test]
    fn device_listing_reports_when_empty() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _env = DeviceEnv::set(" , ");
        let listing = input_device_listing().expect("listing");
        assert!(listing.contains("No audio input devices found."));
    }

    #[test]
    fn device_list_splitting_trims_and_drops_empties() {
        assert_eq!(split_device_list("a, b ,,c"), vec!["a", "b", "c"]);
    }
}
