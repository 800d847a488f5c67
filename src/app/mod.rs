//! Application state and logging for the prepterm UI. The state struct owns
//! the selection, transcript, and worker jobs; rendering reads it and never
//! writes back.

mod logging;
mod state;
#[cfg(test)]
mod tests;

pub use logging::{crash_log_path, log_file_path};
pub use logging::{init_logging, log_debug, log_debug_content, log_panic, log_timing};
#[cfg(test)]
pub(crate) use logging::set_logging_for_tests;
pub use state::{App, ChatOrigin, Message, MessageRole, Overlay, Screen, VoicePhase};
