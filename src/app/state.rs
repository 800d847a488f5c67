use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::TryRecvError,
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use crate::api::{ApiClient, ChatOutcome, Microphone, SectionType};
use crate::config::AppConfig;
use crate::relay::{
    self, ListJob, ListJobMessage, ListRequest, RelayJob, RelayJobMessage, RelayKind, RelayRequest,
};
use crate::voice::{self, VoiceJob, VoiceJobMessage};
use crate::{audio, log_debug, log_debug_content};
use anyhow::{Context, Result};

/// Longest input the composer will hold, in characters.
pub(super) const INPUT_CHAR_LIMIT: usize = 8_000;
/// Spinner cadence while a chat reply is pending.
const SPINNER_INTERVAL: Duration = Duration::from_millis(150);
/// Frames for the pending-reply spinner.
const SPINNER_FRAMES: [char; 4] = ['-', '\\', '|', '/'];

macro_rules! touch {
    ($app:expr, $field:ident, $value:expr) => {{
        $app.$field = $value;
        $app.queue_repaint();
    }};
    ($app:expr, $body:block) => {{
        $body
        $app.queue_repaint();
    }};
}

/// Reap a finished worker thread.
fn join_worker(handle: &mut Option<thread::JoinHandle<()>>) {
    if let Some(worker) = handle.take() {
        worker.join().ok();
    }
}

/// The three mutually exclusive screens, derived from the selection alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    CompanyPicker,
    RolePicker,
    Chat,
}

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

/// One transcript entry. The transcript is append-only; only a full reset
/// clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Where a chat send came from. Voice sends append their own user entry
/// before forwarding, so the shared routine must not add a second one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOrigin {
    Typed,
    Voice,
}

/// Recording lifecycle. "Processing" covers the stretch between the stop
/// signal and the worker's single result message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoicePhase {
    Idle,
    Recording,
    Processing,
}

/// Modal overlay drawn on top of whatever screen is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    None,
    MicPicker,
}

/// Central application state shared between the event loop, renderer, and
/// worker jobs.
pub struct App {
    config: AppConfig,
    api: Arc<ApiClient>,
    company: Option<String>,
    role: Option<String>,
    companies: Vec<String>,
    roles: Vec<String>,
    microphones: Vec<Microphone>,
    selected_mic: Option<usize>,
    company_cursor: usize,
    role_cursor: usize,
    mic_cursor: usize,
    overlay: Overlay,
    transcript: Vec<Message>,
    input: String,
    status: String,
    scroll_offset: u16,
    generation: u64,
    pub(super) list_jobs: Vec<ListJob>,
    pub(super) relay_jobs: Vec<RelayJob>,
    pub(super) voice_job: Option<VoiceJob>,
    pub(super) voice_phase: VoicePhase,
    voice_stop: Arc<AtomicBool>,
    voice_started_at: Option<Instant>,
    spinner_index: usize,
    spinner_last_tick: Option<Instant>,
    repaint_queued: bool,
}

impl App {
    /// Create the application state with an HTTP client built from config.
    pub fn new(config: AppConfig) -> Result<Self> {
        let api = Arc::new(ApiClient::new(&config).context("failed to build backend client")?);
        Ok(Self {
            config,
            api,
            company: None,
            role: None,
            companies: Vec::new(),
            roles: Vec::new(),
            microphones: Vec::new(),
            selected_mic: None,
            company_cursor: 0,
            role_cursor: 0,
            mic_cursor: 0,
            overlay: Overlay::None,
            transcript: Vec::new(),
            input: String::new(),
            status: "Select a company to begin.".into(),
            scroll_offset: 0,
            generation: 0,
            list_jobs: Vec::new(),
            relay_jobs: Vec::new(),
            voice_job: None,
            voice_phase: VoicePhase::Idle,
            voice_stop: Arc::new(AtomicBool::new(false)),
            voice_started_at: None,
            spinner_index: 0,
            spinner_last_tick: None,
            repaint_queued: true,
        })
    }

    /// Kick off the initial snapshot fetches (microphones, then companies).
    pub fn bootstrap(&mut self) {
        self.spawn_list_job(ListRequest::Microphones);
        self.spawn_list_job(ListRequest::Companies);
        touch!(self, status, "Loading companies...".into());
    }

    fn spawn_list_job(&mut self, request: ListRequest) {
        self.list_jobs
            .push(relay::start_list_job(self.api.clone(), request, self.generation));
    }

    /// Which screen the renderer should show. Purely a function of the
    /// current selection.
    pub(crate) fn screen(&self) -> Screen {
        match (&self.company, &self.role) {
            (None, _) => Screen::CompanyPicker,
            (Some(_), None) => Screen::RolePicker,
            (Some(_), Some(_)) => Screen::Chat,
        }
    }

    /// Select a company: clears any previous role and fetches the role list
    /// for the new company under a fresh generation.
    pub(crate) fn select_company(&mut self, name: &str) {
        self.generation = self.generation.wrapping_add(1);
        self.company = Some(name.to_string());
        self.role = None;
        self.roles.clear();
        self.role_cursor = 0;
        self.spawn_list_job(ListRequest::Roles {
            company: name.to_string(),
        });
        log_debug(&format!("selected company: {name}"));
        touch!(self, status, format!("Loading roles for {name}..."));
    }

    /// Select a role for the current company.
    pub(crate) fn select_role(&mut self, name: &str) {
        // A role only makes sense under a company.
        let Some(company) = self.company.clone() else {
            return;
        };
        self.generation = self.generation.wrapping_add(1);
        self.role = Some(name.to_string());
        log_debug(&format!("selected role: {name}"));
        touch!(self, status, format!("Ready: {name} at {company}"));
    }

    /// Clear the selection and transcript and reload the company list.
    pub(crate) fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.company = None;
        self.role = None;
        self.roles.clear();
        self.role_cursor = 0;
        self.company_cursor = 0;
        self.transcript.clear();
        self.input.clear();
        self.scroll_offset = 0;
        self.spawn_list_job(ListRequest::Companies);
        log_debug("selection reset");
        touch!(self, status, "Select a company to begin.".into());
    }

    /// Send the typed input through the shared chat routine.
    pub(crate) fn send_current_input(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            touch!(self, status, "Nothing to send; message is empty.".into());
            return;
        }
        if self.company.is_none() || self.role.is_none() {
            touch!(self, status, "Select a company and role first.".into());
            return;
        }
        self.input.clear();
        self.send_chat(text, ChatOrigin::Typed);
    }

    /// Shared chat relay for typed and voice sends. Returns whether a
    /// request was actually dispatched.
    fn send_chat(&mut self, text: String, origin: ChatOrigin) -> bool {
        let (Some(company), Some(role)) = (self.company.clone(), self.role.clone()) else {
            return false;
        };
        if text.trim().is_empty() {
            return false;
        }
        if origin == ChatOrigin::Typed {
            self.append_message(MessageRole::User, text.clone());
        }
        log_debug_content(&format!("chat send: {text}"));
        let request = RelayRequest::Chat {
            message: text,
            company,
            role,
        };
        self.relay_jobs
            .push(relay::start_relay_job(self.api.clone(), request, self.generation));
        self.spinner_index = 0;
        self.spinner_last_tick = Some(Instant::now());
        let frame = SPINNER_FRAMES.first().copied().unwrap_or('-');
        touch!(self, status, format!("Waiting for reply {frame}"));
        true
    }

    /// Request prep content for one of the fixed section categories.
    pub(crate) fn load_content(&mut self, section: SectionType) {
        let (Some(company), Some(role)) = (self.company.clone(), self.role.clone()) else {
            touch!(self, status, "Select a company and role first.".into());
            return;
        };
        let label = section.label();
        self.append_message(MessageRole::User, format!("Clicked: {label}"));
        let request = RelayRequest::Content {
            company,
            role,
            section,
        };
        self.relay_jobs
            .push(relay::start_relay_job(self.api.clone(), request, self.generation));
        touch!(self, status, format!("Loading {label}..."));
    }

    /// Start a recording session. Only valid while idle; acquisition
    /// failures stay out of the transcript and land in the status line.
    pub(crate) fn start_recording(&mut self) {
        match self.voice_phase {
            VoicePhase::Recording => {
                touch!(self, status, "Already recording; press Ctrl+R to stop.".into());
                return;
            }
            VoicePhase::Processing => {
                touch!(self, status, "Still processing the previous recording...".into());
                return;
            }
            VoicePhase::Idle => {}
        }

        match audio::Recorder::new(self.config.input_device.as_deref()) {
            Ok(recorder) => {
                log_debug(&format!("recording via {}", recorder.device_name()));
                let stop_flag = Arc::new(AtomicBool::new(false));
                self.voice_stop = stop_flag.clone();
                let job = voice::spawn_voice_job(
                    recorder,
                    self.api.clone(),
                    self.config.voice_capture_config(),
                    stop_flag,
                );
                self.voice_job = Some(job);
                self.voice_phase = VoicePhase::Recording;
                self.voice_started_at = Some(Instant::now());
                touch!(self, status, "Recording... press Ctrl+R to stop.".into());
            }
            Err(err) => {
                log_debug(&format!("recorder unavailable: {err:#}"));
                touch!(
                    self,
                    status,
                    format!("Failed to start recording: {err:#}. Please check microphone permissions.")
                );
            }
        }
    }

    /// Signal the capture worker to finish. No-op unless recording.
    pub(crate) fn stop_recording(&mut self) {
        if self.voice_phase != VoicePhase::Recording {
            return;
        }
        self.voice_stop.store(true, Ordering::Relaxed);
        self.voice_phase = VoicePhase::Processing;
        self.voice_started_at = None;
        touch!(self, status, "Processing voice input...".into());
    }

    /// Single Ctrl+R binding: start when idle, stop when recording.
    pub(crate) fn toggle_recording(&mut self) {
        if self.voice_phase == VoicePhase::Recording {
            self.stop_recording();
        } else {
            self.start_recording();
        }
    }

    /// Drain all worker channels without blocking the UI thread.
    pub(crate) fn poll_jobs(&mut self) -> Result<()> {
        self.poll_list_jobs();
        self.poll_relay_jobs();
        self.poll_voice_job();
        Ok(())
    }

    fn poll_list_jobs(&mut self) {
        let mut active = Vec::new();
        for mut job in std::mem::take(&mut self.list_jobs) {
            match job.receiver.try_recv() {
                Ok(message) => {
                    join_worker(&mut job.handle);
                    // The microphone snapshot is selection-independent, so
                    // it never goes stale.
                    let stale = job.generation != self.generation
                        && !matches!(message, ListJobMessage::Microphones(_));
                    if stale {
                        log_debug(&format!(
                            "dropping stale list snapshot (generation {} != {})",
                            job.generation, self.generation
                        ));
                    } else {
                        self.handle_list_message(message);
                    }
                }
                Err(TryRecvError::Empty) => active.push(job),
                Err(TryRecvError::Disconnected) => {
                    join_worker(&mut job.handle);
                    touch!(
                        self,
                        status,
                        "Background fetch worker disconnected unexpectedly.".into()
                    );
                }
            }
        }
        self.list_jobs.append(&mut active);
    }

    fn poll_relay_jobs(&mut self) {
        let mut active = Vec::new();
        for mut job in std::mem::take(&mut self.relay_jobs) {
            match job.receiver.try_recv() {
                Ok(message) => {
                    join_worker(&mut job.handle);
                    if job.generation != self.generation {
                        log_debug(&format!(
                            "dropping stale relay reply (generation {} != {})",
                            job.generation, self.generation
                        ));
                    } else {
                        self.handle_relay_message(message);
                    }
                }
                Err(TryRecvError::Empty) => active.push(job),
                Err(TryRecvError::Disconnected) => {
                    join_worker(&mut job.handle);
                    touch!(
                        self,
                        status,
                        "Backend relay worker disconnected unexpectedly.".into()
                    );
                }
            }
        }
        self.relay_jobs.append(&mut active);
    }

    fn poll_voice_job(&mut self) {
        let mut done = false;
        let mut pending: Option<VoiceJobMessage> = None;
        if let Some(job) = self.voice_job.as_mut() {
            match job.receiver.try_recv() {
                Ok(message) => {
                    pending = Some(message);
                    done = true;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    // Plain write; the teardown below queues the repaint.
                    self.status = "Voice worker disconnected unexpectedly.".into();
                    done = true;
                }
            }
            if done {
                join_worker(&mut job.handle);
            }
        }
        if let Some(message) = pending {
            self.handle_voice_job_message(message);
        }
        if done {
            self.voice_job = None;
            self.voice_phase = VoicePhase::Idle;
            self.voice_started_at = None;
            self.queue_repaint();
        }
    }

    fn handle_list_message(&mut self, message: ListJobMessage) {
        match message {
            ListJobMessage::Companies(result) => {
                let companies = result.unwrap_or_else(|err| {
                    log_debug(&format!("company list fetch failed: {err}"));
                    Vec::new()
                });
                log_debug(&format!("company snapshot: {} entries", companies.len()));
                self.companies = companies;
                self.company_cursor = 0;
                if self.company.is_none() {
                    self.status = "Select a company to begin.".into();
                }
                self.queue_repaint();
            }
            ListJobMessage::Roles(result) => {
                let roles = result.unwrap_or_else(|err| {
                    log_debug(&format!("role list fetch failed: {err}"));
                    Vec::new()
                });
                log_debug(&format!("role snapshot: {} entries", roles.len()));
                self.roles = roles;
                self.role_cursor = 0;
                if self.company.is_some() && self.role.is_none() {
                    self.status = "Select a role to continue.".into();
                }
                self.queue_repaint();
            }
            ListJobMessage::Microphones(result) => {
                let microphones = result.unwrap_or_else(|err| {
                    log_debug(&format!("microphone list fetch failed: {err}"));
                    Vec::new()
                });
                log_debug(&format!(
                    "microphone snapshot: {} entries",
                    microphones.len()
                ));
                self.microphones = microphones;
                self.mic_cursor = 0;
                if self
                    .selected_mic
                    .is_some_and(|index| index >= self.microphones.len())
                {
                    self.selected_mic = None;
                }
                self.queue_repaint();
            }
        }
    }

    fn handle_relay_message(&mut self, message: RelayJobMessage) {
        match message {
            RelayJobMessage::Content(Ok(content)) => {
                self.append_message(MessageRole::Assistant, content);
            }
            RelayJobMessage::Content(Err(err)) => {
                log_debug(&format!("content fetch failed: {err}"));
                self.append_message(MessageRole::Assistant, "❌ Failed to load content".into());
            }
            RelayJobMessage::Chat(Ok(ChatOutcome::Response(text))) => {
                self.append_message(
                    MessageRole::Assistant,
                    format!("🤖 **AI Response:**\n\n{text}"),
                );
            }
            RelayJobMessage::Chat(Ok(ChatOutcome::Error(err))) => {
                self.append_message(MessageRole::Assistant, format!("❌ Error: {err}"));
            }
            RelayJobMessage::Chat(Err(err)) => {
                log_debug(&format!("chat relay failed: {err}"));
                self.append_message(MessageRole::Assistant, format!("❌ Error: {err}"));
            }
        }
        self.restore_ready_status();
    }

    /// Fold the voice worker's single message into transcript and state.
    fn handle_voice_job_message(&mut self, message: VoiceJobMessage) {
        match message {
            VoiceJobMessage::Transcript(text) => {
                log_debug("voice transcript received");
                self.append_message(MessageRole::User, format!("🎤 **Voice Input:** {text}"));
                if !self.send_chat(text, ChatOrigin::Voice) {
                    self.restore_ready_status();
                }
            }
            VoiceJobMessage::NoSpeech => {
                log_debug("voice capture heard no speech");
                self.append_message(
                    MessageRole::Assistant,
                    "❌ No speech detected. Please try again.".into(),
                );
                self.restore_ready_status();
            }
            VoiceJobMessage::BackendError(err) => {
                log_debug(&format!("speech-to-text error: {err}"));
                self.append_message(MessageRole::Assistant, format!("❌ Voice Error: {err}"));
                self.restore_ready_status();
            }
            VoiceJobMessage::Failed(err) => {
                log_debug(&format!("voice pipeline failed: {err}"));
                self.append_message(
                    MessageRole::Assistant,
                    format!("❌ Voice processing failed: {err}"),
                );
                self.restore_ready_status();
            }
        }
    }

    fn restore_ready_status(&mut self) {
        let status = match (&self.company, &self.role) {
            (Some(company), Some(role)) => format!("Ready: {role} at {company}"),
            (Some(_), None) => "Select a role to continue.".to_string(),
            (None, _) => "Select a company to begin.".to_string(),
        };
        touch!(self, status, status);
    }

    /// Advance the pending-reply spinner while a chat relay is in flight.
    pub(crate) fn update_spinner(&mut self) {
        if !self
            .relay_jobs
            .iter()
            .any(|job| job.kind == RelayKind::Chat)
        {
            return;
        }
        let now = Instant::now();
        let last_tick = self.spinner_last_tick.get_or_insert_with(Instant::now);
        if now.duration_since(*last_tick) < SPINNER_INTERVAL {
            return;
        }
        self.spinner_last_tick = Some(now);
        self.spinner_index = (self.spinner_index + 1) % SPINNER_FRAMES.len();
        let frame = SPINNER_FRAMES[self.spinner_index];
        touch!(self, status, format!("Waiting for reply {frame}"));
    }

    fn append_message(&mut self, role: MessageRole, content: String) {
        self.transcript.push(Message { role, content });
        // Keep the view pinned near the newest entry.
        touch!(self, scroll_offset, self.bottom_offset());
    }

    /// Scroll offset that keeps the newest transcript entry in view.
    fn bottom_offset(&self) -> u16 {
        self.transcript_line_count()
            .saturating_sub(10)
            .min(u16::MAX as usize) as u16
    }

    /// Rendered line count of the transcript: each entry contributes its
    /// newline-separated lines plus one blank separator between entries.
    /// Width does not matter because long lines clamp instead of wrapping.
    pub(crate) fn transcript_line_count(&self) -> usize {
        let mut total = 0;
        for (index, message) in self.transcript.iter().enumerate() {
            if index > 0 {
                total += 1;
            }
            total += message.content.lines().count().max(1);
        }
        total
    }

    pub(crate) fn scroll_up(&mut self) {
        if self.scroll_offset > 0 {
            touch!(self, scroll_offset, self.scroll_offset.saturating_sub(1));
        }
    }

    pub(crate) fn scroll_down(&mut self) {
        touch!(self, scroll_offset, self.scroll_offset.saturating_add(1));
    }

    pub(crate) fn page_up(&mut self) {
        touch!(self, scroll_offset, self.scroll_offset.saturating_sub(10));
    }

    pub(crate) fn page_down(&mut self) {
        touch!(self, scroll_offset, self.scroll_offset.saturating_add(10));
    }

    pub(crate) fn scroll_to_top(&mut self) {
        touch!(self, scroll_offset, 0);
    }

    pub(crate) fn scroll_to_bottom(&mut self) {
        touch!(self, scroll_offset, self.bottom_offset());
    }

    /// Move the highlight up in whichever list currently has focus.
    pub(crate) fn cursor_up(&mut self) {
        match self.overlay {
            Overlay::MicPicker => {
                if self.mic_cursor > 0 {
                    touch!(self, mic_cursor, self.mic_cursor - 1);
                }
            }
            Overlay::None => match self.screen() {
                Screen::CompanyPicker => {
                    if self.company_cursor > 0 {
                        touch!(self, company_cursor, self.company_cursor - 1);
                    }
                }
                Screen::RolePicker => {
                    if self.role_cursor > 0 {
                        touch!(self, role_cursor, self.role_cursor - 1);
                    }
                }
                Screen::Chat => self.scroll_up(),
            },
        }
    }

    /// Move the highlight down in whichever list currently has focus.
    pub(crate) fn cursor_down(&mut self) {
        match self.overlay {
            Overlay::MicPicker => {
                if self.mic_cursor + 1 < self.microphones.len() {
                    touch!(self, mic_cursor, self.mic_cursor + 1);
                }
            }
            Overlay::None => match self.screen() {
                Screen::CompanyPicker => {
                    if self.company_cursor + 1 < self.companies.len() {
                        touch!(self, company_cursor, self.company_cursor + 1);
                    }
                }
                Screen::RolePicker => {
                    if self.role_cursor + 1 < self.roles.len() {
                        touch!(self, role_cursor, self.role_cursor + 1);
                    }
                }
                Screen::Chat => self.scroll_down(),
            },
        }
    }

    /// Enter: pick the highlighted list entry, or send the typed input on
    /// the chat screen.
    pub(crate) fn select_highlighted(&mut self) {
        match self.overlay {
            Overlay::MicPicker => {
                if let Some(mic) = self.microphones.get(self.mic_cursor) {
                    let name = mic.name.clone();
                    self.selected_mic = Some(self.mic_cursor);
                    self.overlay = Overlay::None;
                    touch!(
                        self,
                        status,
                        format!("Microphone selected: {name} (capture uses --input-device)")
                    );
                } else {
                    touch!(self, overlay, Overlay::None);
                }
            }
            Overlay::None => match self.screen() {
                Screen::CompanyPicker => {
                    if let Some(name) = self.companies.get(self.company_cursor).cloned() {
                        self.select_company(&name);
                    }
                }
                Screen::RolePicker => {
                    if let Some(name) = self.roles.get(self.role_cursor).cloned() {
                        self.select_role(&name);
                    }
                }
                Screen::Chat => self.send_current_input(),
            },
        }
    }

    /// Toggle the microphone selector overlay, refreshing an empty snapshot
    /// on open.
    pub(crate) fn toggle_mic_picker(&mut self) {
        self.overlay = match self.overlay {
            Overlay::MicPicker => Overlay::None,
            Overlay::None => Overlay::MicPicker,
        };
        if self.overlay == Overlay::MicPicker && self.microphones.is_empty() {
            self.spawn_list_job(ListRequest::Microphones);
        }
        self.queue_repaint();
    }

    /// Close any open overlay. Returns whether one was open.
    pub(crate) fn close_overlay(&mut self) -> bool {
        if self.overlay == Overlay::None {
            return false;
        }
        touch!(self, overlay, Overlay::None);
        true
    }

    pub(crate) fn overlay(&self) -> Overlay {
        self.overlay
    }

    pub(crate) fn voice_phase(&self) -> VoicePhase {
        self.voice_phase
    }

    pub(crate) fn recording_elapsed(&self) -> Option<Duration> {
        self.voice_started_at.map(|started| started.elapsed())
    }

    pub(crate) fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    pub(crate) fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub(crate) fn companies(&self) -> &[String] {
        &self.companies
    }

    pub(crate) fn roles(&self) -> &[String] {
        &self.roles
    }

    pub(crate) fn microphones(&self) -> &[Microphone] {
        &self.microphones
    }

    pub(crate) fn selected_mic(&self) -> Option<usize> {
        self.selected_mic
    }

    pub(crate) fn company_cursor(&self) -> usize {
        self.company_cursor
    }

    pub(crate) fn role_cursor(&self) -> usize {
        self.role_cursor
    }

    pub(crate) fn mic_cursor(&self) -> usize {
        self.mic_cursor
    }

    pub(crate) fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub(crate) fn input_text(&self) -> &str {
        &self.input
    }

    pub(crate) fn status_text(&self) -> &str {
        &self.status
    }

    pub(crate) fn scroll_offset(&self) -> u16 {
        self.scroll_offset
    }

    pub(crate) fn has_active_jobs(&self) -> bool {
        !self.list_jobs.is_empty() || !self.relay_jobs.is_empty() || self.voice_job.is_some()
    }

    pub(crate) fn queue_repaint(&mut self) {
        self.repaint_queued = true;
    }

    pub(crate) fn take_repaint(&mut self) -> bool {
        std::mem::take(&mut self.repaint_queued)
    }

    pub(crate) fn push_input_char(&mut self, ch: char) {
        if self.input.len() >= INPUT_CHAR_LIMIT {
            let full = format!("Input is full ({INPUT_CHAR_LIMIT} characters max).");
            if self.status != full {
                touch!(self, status, full);
            }
            return;
        }
        touch!(self, {
            self.input.push(ch);
        });
    }

    pub(crate) fn backspace_input(&mut self) {
        touch!(self, {
            self.input.pop();
        });
    }

    pub(crate) fn clear_input(&mut self) {
        touch!(self, {
            self.input.clear();
        });
    }
}
