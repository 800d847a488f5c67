//! Background worker for the two-phase voice pipeline: capture microphone
//! audio until the stop flag is raised, release the device, then encode and
//! upload the recording for transcription. The UI stays responsive and gets
//! exactly one message per job.

use crate::api::{ApiClient, SttOutcome};
use crate::audio;
use crate::config::VoiceCaptureConfig;
use crate::{log_debug, log_timing};
use anyhow::Result;
#[cfg(test)]
use std::sync::Mutex;
use std::sync::{atomic::AtomicBool, mpsc, Arc};
use std::thread;
use std::time::Instant;

/// Backend reply meaning the recording carried no usable speech.
const NO_SPEECH_SENTINEL: &str = "No speech detected";

/// Owns the worker thread and the channel it reports on.
pub struct VoiceJob {
    pub receiver: mpsc::Receiver<VoiceJobMessage>,
    pub handle: Option<thread::JoinHandle<()>>,
}

/// Exactly one of these arrives per job, whatever happened.
#[derive(Debug, PartialEq, Eq)]
pub enum VoiceJobMessage {
    /// Usable transcript, ready to forward into chat.
    Transcript(String),
    /// The backend heard nothing worth transcribing.
    NoSpeech,
    /// The backend replied with an error field.
    BackendError(String),
    /// Capture, encoding, or transport failed on our side.
    Failed(String),
}

/// Spawn a worker that records until the stop flag is raised, then uploads.
pub fn spawn_voice_job(
    recorder: audio::Recorder,
    api: Arc<ApiClient>,
    cfg: VoiceCaptureConfig,
    stop_flag: Arc<AtomicBool>,
) -> VoiceJob {
    let (tx, rx) = mpsc::channel();

    let worker = thread::spawn(move || {
        let message = run_voice_pipeline(recorder, &api, &cfg, stop_flag);
        tx.send(message).ok();
    });

    VoiceJob {
        receiver: rx,
        handle: Some(worker),
    }
}

/// Record, release the device, then process what was captured.
fn run_voice_pipeline(
    recorder: audio::Recorder,
    api: &ApiClient,
    cfg: &VoiceCaptureConfig,
    stop_flag: Arc<AtomicBool>,
) -> VoiceJobMessage {
    log_debug("voice capture: recording");
    let capture_timer = Instant::now();
    let capture = match recorder.record_until(stop_flag, cfg) {
        Ok(capture) => capture,
        Err(err) => return VoiceJobMessage::Failed(format!("{err:#}")),
    };
    // The capture stream is gone by now; dropping the recorder releases
    // the device handle before the upload starts.
    drop(recorder);
    let record_ms = capture_timer.elapsed().as_millis();
    log_capture_metrics(&capture.metrics);

    let upload_start = Instant::now();
    let message = process_capture(api, capture);
    log_timing(&format!(
        "phase=voice|record_ms={record_ms}|upload_ms={}",
        upload_start.elapsed().as_millis()
    ));
    message
}

/// Encode the capture as WAV, upload it, and map the backend's reply.
fn process_capture(api: &ApiClient, capture: audio::CaptureResult) -> VoiceJobMessage {
    let wav_bytes = match audio::samples_to_wav(&capture.audio, capture.sample_rate) {
        Ok(bytes) => bytes,
        Err(err) => return VoiceJobMessage::Failed(format!("{err:#}")),
    };

    match transcribe_recording(api, wav_bytes) {
        Ok(SttOutcome::Text(text)) => {
            let cleaned = text.trim().to_string();
            if cleaned.is_empty() || cleaned == NO_SPEECH_SENTINEL {
                VoiceJobMessage::NoSpeech
            } else {
                VoiceJobMessage::Transcript(cleaned)
            }
        }
        Ok(SttOutcome::Error(error)) => VoiceJobMessage::BackendError(error),
        Err(err) => VoiceJobMessage::Failed(format!("{err:#}")),
    }
}

fn transcribe_recording(api: &ApiClient, wav_bytes: Vec<u8>) -> Result<SttOutcome> {
    #[cfg(test)]
    if let Some(hook) = hook_slot().as_ref() {
        return hook(&wav_bytes);
    }
    api.speech_to_text(wav_bytes)
}

fn log_capture_metrics(metrics: &audio::CaptureMetrics) {
    log_debug(&format!(
        "voice_metrics|capture_ms={} chunks={} dropped={} reason={}",
        metrics.capture_ms,
        metrics.chunks_captured,
        metrics.chunks_dropped,
        metrics.stop_reason.label()
    ));
}

#[cfg(test)]
type UploadHook = Box<dyn Fn(&[u8]) -> Result<SttOutcome> + Send + 'static>;

#[cfg(test)]
static UPLOAD_HOOK: Mutex<Option<UploadHook>> = Mutex::new(None);

#[cfg(test)]
fn hook_slot() -> std::sync::MutexGuard<'static, Option<UploadHook>> {
    match UPLOAD_HOOK.lock() {
        Ok(slot) => slot,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Route uploads through `hook` for the duration of `f`. Hook-using tests
/// are serialized because the slot is process-wide.
#[cfg(test)]
pub(crate) fn with_upload_hook<R>(hook: UploadHook, f: impl FnOnce() -> R) -> R {
    static SERIAL: Mutex<()> = Mutex::new(());
    let _serial = match SERIAL.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    struct ClearHook;
    impl Drop for ClearHook {
        fn drop(&mut self) {
            *hook_slot() = None;
        }
    }

    *hook_slot() = Some(hook);
    // Cleared on drop so a panicking test cannot leak its hook.
    let _clear = ClearHook;
    f()
}
