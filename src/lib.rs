pub mod api;
pub mod audio;
pub mod config;
pub mod doctor;
pub mod markup;
pub mod terminal_restore;
pub mod ui;
pub mod voice;

mod app;
mod relay;
mod telemetry;

pub use app::*;
pub use voice::{VoiceJob, VoiceJobMessage};
