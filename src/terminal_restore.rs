//! Panic-safe terminal teardown shared by the event loop and the panic
//! hook.

use crossterm::{
    cursor::Show,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::{
    io::{self, Write},
    panic,
    sync::{
        atomic::{AtomicU8, Ordering},
        OnceLock,
    },
};

const RAW_MODE: u8 = 1 << 0;
const ALT_SCREEN: u8 = 1 << 1;

// Which terminal modes are live right now. Both the guard and the panic
// hook tear down through reset_terminal, so the set has to be global
// and each mode must be undone at most once.
static ACTIVE_MODES: AtomicU8 = AtomicU8::new(0);
static HOOK_INSTALLED: OnceLock<()> = OnceLock::new();

/// Tracks the terminal modes the UI turns on and undoes them on drop.
/// Creating the guard also installs the crate's panic hook.
pub struct ScreenGuard;

impl ScreenGuard {
    pub fn new() -> Self {
        install_panic_hook();
        ScreenGuard
    }

    pub fn enter_raw_mode(&self) -> io::Result<()> {
        enable_raw_mode()?;
        ACTIVE_MODES.fetch_or(RAW_MODE, Ordering::SeqCst);
        Ok(())
    }

    pub fn enter_alt_screen(&self, out: &mut impl Write) -> io::Result<()> {
        execute!(out, EnterAlternateScreen)?;
        ACTIVE_MODES.fetch_or(ALT_SCREEN, Ordering::SeqCst);
        Ok(())
    }

    pub fn restore(&self) {
        reset_terminal();
    }
}

impl Default for ScreenGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScreenGuard {
    fn drop(&mut self) {
        reset_terminal();
    }
}

/// Undo every active terminal mode. Safe to call any number of times;
/// the swap means each escape sequence goes out at most once.
pub fn reset_terminal() {
    let modes = ACTIVE_MODES.swap(0, Ordering::SeqCst);
    if modes & RAW_MODE != 0 {
        disable_raw_mode().ok();
    }
    let mut out = io::stdout();
    if modes & ALT_SCREEN != 0 {
        execute!(out, LeaveAlternateScreen).ok();
    }
    execute!(out, Show).ok();
    out.flush().ok();
}

fn install_panic_hook() {
    HOOK_INSTALLED.get_or_init(|| {
        let inner = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            // Leave the alternate screen first so the panic message below
            // lands on the real one.
            reset_terminal();
            crate::log_panic(info);
            if let Some(location) = info.location() {
                crate::log_debug(&format!(
                    "panic at {}:{}",
                    location.file(),
                    location.line()
                ));
            }
            crate::log_debug_content(&format!("panic info: {info}"));
            inner(info);
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_clears_every_tracked_mode() {
        ACTIVE_MODES.fetch_or(RAW_MODE | ALT_SCREEN, Ordering::SeqCst);
        reset_terminal();
        assert_eq!(ACTIVE_MODES.load(Ordering::SeqCst), 0);
        reset_terminal();
        assert_eq!(ACTIVE_MODES.load(Ordering::SeqCst), 0);
    }
}
