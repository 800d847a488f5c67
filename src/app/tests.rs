use super::state::INPUT_CHAR_LIMIT;
use super::*;
use crate::api::{ChatOutcome, Microphone, SectionType, SttOutcome};
use crate::config::AppConfig;
use crate::relay::{self, ListJobMessage, ListRequest, RelayJobMessage, RelayRequest};
use crate::voice::{self, VoiceJob, VoiceJobMessage};
use clap::Parser;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

static LOG_SERIAL: Mutex<()> = Mutex::new(());

/// Logging tests share one global log file, so they run one at a time.
fn serialize_logging(action: impl FnOnce()) {
    let _guard = match LOG_SERIAL.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    action();
}

fn base_config() -> AppConfig {
    AppConfig::parse_from(["prepterm-tests"])
}

fn test_app() -> App {
    App::new(base_config()).expect("app state should build")
}

fn wait_for_jobs(app: &mut App) {
    for _ in 0..400 {
        app.poll_jobs().unwrap();
        if !app.has_active_jobs() {
            return;
        }
        thread::sleep(Duration::from_millis(3));
    }
    panic!("jobs still active after polling deadline");
}

fn empty_lists() -> Box<dyn Fn(&ListRequest) -> ListJobMessage + Send> {
    Box::new(|request| match request {
        ListRequest::Companies => ListJobMessage::Companies(Ok(Vec::new())),
        ListRequest::Roles { .. } => ListJobMessage::Roles(Ok(Vec::new())),
        ListRequest::Microphones => ListJobMessage::Microphones(Ok(Vec::new())),
    })
}

/// Hand the app a completed voice job without touching audio hardware.
fn fake_voice_job(message: VoiceJobMessage) -> VoiceJob {
    let (tx, rx) = mpsc::channel();
    tx.send(message).expect("channel open");
    VoiceJob {
        receiver: rx,
        handle: None,
    }
}

/// An app with "Acme" / "Engineer" already selected.
fn ready_app() -> App {
    let mut app = test_app();
    relay::with_list_hook(empty_lists(), || {
        app.select_company("Acme");
        wait_for_jobs(&mut app);
    });
    app.select_role("Engineer");
    app
}

fn type_text(app: &mut App, text: &str) {
    for ch in text.chars() {
        app.push_input_char(ch);
    }
}

#[test]
fn screen_follows_selection() {
    let mut app = test_app();
    assert_eq!(app.screen(), Screen::CompanyPicker);
    relay::with_list_hook(empty_lists(), || {
        app.select_company("Acme");
        assert_eq!(app.screen(), Screen::RolePicker);
        assert_eq!(app.company(), Some("Acme"));
        app.select_role("Engineer");
        assert_eq!(app.screen(), Screen::Chat);
        app.reset();
        assert_eq!(app.screen(), Screen::CompanyPicker);
        assert_eq!(app.company(), None);
        assert_eq!(app.role(), None);
        wait_for_jobs(&mut app);
    });
}

#[test]
fn selecting_new_company_clears_role_even_if_roles_fetch_fails() {
    let mut app = test_app();
    relay::with_list_hook(
        Box::new(|request| match request {
            ListRequest::Roles { company } if company == "Beta" => {
                ListJobMessage::Roles(Err("backend unreachable".to_string()))
            }
            ListRequest::Roles { .. } => ListJobMessage::Roles(Ok(vec!["Engineer".to_string()])),
            ListRequest::Companies => ListJobMessage::Companies(Ok(Vec::new())),
            ListRequest::Microphones => ListJobMessage::Microphones(Ok(Vec::new())),
        }),
        || {
            app.select_company("Acme");
            wait_for_jobs(&mut app);
            app.select_role("Engineer");
            assert_eq!(app.screen(), Screen::Chat);

            app.select_company("Beta");
            assert_eq!(app.role(), None);
            assert_eq!(app.screen(), Screen::RolePicker);
            wait_for_jobs(&mut app);
            assert_eq!(app.role(), None);
            assert!(app.roles().is_empty());
        },
    );
}

#[test]
fn chat_send_requires_text_and_selection() {
    let mut app = test_app();

    type_text(&mut app, "   ");
    app.send_current_input();
    assert!(app.transcript().is_empty());
    assert!(!app.has_active_jobs());

    app.clear_input();
    type_text(&mut app, "hello");
    app.send_current_input();
    assert!(app.transcript().is_empty());
    assert!(!app.has_active_jobs());
    // Rejected input is kept for editing.
    assert_eq!(app.input_text(), "hello");
}

#[test]
fn whitespace_input_with_selection_sends_nothing() {
    let mut app = ready_app();
    type_text(&mut app, "   ");
    app.send_current_input();
    assert!(app.transcript().is_empty());
    assert!(app.relay_jobs.is_empty());
}

#[test]
fn load_content_requires_selection() {
    let mut app = test_app();
    app.load_content(SectionType::Tips);
    assert!(app.transcript().is_empty());
    assert!(!app.has_active_jobs());

    relay::with_list_hook(empty_lists(), || {
        app.select_company("Acme");
        wait_for_jobs(&mut app);
    });
    app.load_content(SectionType::Tips);
    assert!(app.transcript().is_empty());
    assert!(app.relay_jobs.is_empty());
}

#[test]
fn recording_cannot_start_twice() {
    let mut app = test_app();
    voice::with_upload_hook(
        Box::new(|_| Ok(SttOutcome::Text(String::new()))),
        || {
            app.start_recording();
            assert_eq!(app.voice_phase(), VoicePhase::Recording);
            app.start_recording();
            assert_eq!(
                app.status_text(),
                "Already recording; press Ctrl+R to stop."
            );
            app.stop_recording();
            assert_eq!(app.voice_phase(), VoicePhase::Processing);
            wait_for_jobs(&mut app);
        },
    );
    assert_eq!(app.voice_phase(), VoicePhase::Idle);

    // Stopping when idle is a no-op.
    app.stop_recording();
    assert_eq!(app.voice_phase(), VoicePhase::Idle);
}

#[test]
fn recording_failure_surfaces_in_status_not_transcript() {
    let mut config = base_config();
    config.input_device = Some("prepterm-device-that-does-not-exist".to_string());
    let mut app = App::new(config).expect("app state should build");
    app.start_recording();
    assert_eq!(app.voice_phase(), VoicePhase::Idle);
    assert!(app.status_text().starts_with("Failed to start recording:"));
    assert!(app.transcript().is_empty());
    assert!(app.voice_job.is_none());
}

#[test]
fn content_request_carries_selection_and_appends_two_entries() {
    let mut app = test_app();
    relay::with_list_hook(
        Box::new(|request| match request {
            ListRequest::Companies => ListJobMessage::Companies(Ok(vec!["Acme".to_string()])),
            ListRequest::Roles { .. } => ListJobMessage::Roles(Ok(vec!["Engineer".to_string()])),
            ListRequest::Microphones => ListJobMessage::Microphones(Ok(Vec::new())),
        }),
        || {
            app.bootstrap();
            wait_for_jobs(&mut app);
            app.select_highlighted();
            wait_for_jobs(&mut app);
            app.select_highlighted();
            assert_eq!(app.screen(), Screen::Chat);
        },
    );

    relay::with_relay_hook(
        Box::new(|request| {
            assert_eq!(
                request,
                &RelayRequest::Content {
                    company: "Acme".to_string(),
                    role: "Engineer".to_string(),
                    section: SectionType::Tips,
                }
            );
            RelayJobMessage::Content(Ok("Bring questions of your own.".to_string()))
        }),
        || {
            app.load_content(SectionType::Tips);
            wait_for_jobs(&mut app);
        },
    );

    let transcript = app.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].role, MessageRole::User);
    assert_eq!(transcript[0].content, "Clicked: 💡 Tips");
    assert_eq!(transcript[1].role, MessageRole::Assistant);
    assert_eq!(transcript[1].content, "Bring questions of your own.");
}

#[test]
fn content_transport_failure_appends_fixed_error_entry() {
    let mut app = ready_app();
    relay::with_relay_hook(
        Box::new(|_| RelayJobMessage::Content(Err("connect timeout".to_string()))),
        || {
            app.load_content(SectionType::MockInterview);
            wait_for_jobs(&mut app);
        },
    );
    let transcript = app.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].content, "Clicked: 🎯 Mock Interview");
    assert_eq!(transcript[1].content, "❌ Failed to load content");
}

#[test]
fn chat_error_field_renders_as_error_entry() {
    let mut app = ready_app();
    relay::with_relay_hook(
        Box::new(|_| RelayJobMessage::Chat(Ok(ChatOutcome::Error("rate limited".to_string())))),
        || {
            type_text(&mut app, "hello");
            app.send_current_input();
            assert!(app.input_text().is_empty());
            wait_for_jobs(&mut app);
        },
    );
    let transcript = app.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].role, MessageRole::User);
    assert_eq!(transcript[0].content, "hello");
    assert_eq!(transcript[1].role, MessageRole::Assistant);
    assert_eq!(transcript[1].content, "❌ Error: rate limited");
    assert!(!transcript[1].content.contains("AI Response"));
}

#[test]
fn chat_response_renders_as_ai_entry() {
    let mut app = ready_app();
    relay::with_relay_hook(
        Box::new(|_| {
            RelayJobMessage::Chat(Ok(ChatOutcome::Response("Practice aloud.".to_string())))
        }),
        || {
            type_text(&mut app, "How do I prepare?");
            app.send_current_input();
            wait_for_jobs(&mut app);
        },
    );
    let transcript = app.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1].content, "🤖 **AI Response:**\n\nPractice aloud.");
    assert_eq!(app.status_text(), "Ready: Engineer at Acme");
}

#[test]
fn no_speech_result_does_not_forward_to_chat() {
    let mut app = ready_app();
    app.voice_job = Some(fake_voice_job(VoiceJobMessage::NoSpeech));
    app.voice_phase = VoicePhase::Processing;
    wait_for_jobs(&mut app);

    let transcript = app.transcript();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].role, MessageRole::Assistant);
    assert_eq!(transcript[0].content, "❌ No speech detected. Please try again.");
    assert!(app.relay_jobs.is_empty());
    assert_eq!(app.voice_phase(), VoicePhase::Idle);
}

#[test]
fn voice_transcript_forwards_through_shared_chat_routine() {
    let mut app = ready_app();
    relay::with_relay_hook(
        Box::new(|request| {
            match request {
                RelayRequest::Chat {
                    message,
                    company,
                    role,
                } => {
                    assert_eq!(message, "What should I study?");
                    assert_eq!(company, "Acme");
                    assert_eq!(role, "Engineer");
                }
                other => panic!("unexpected relay request {other:?}"),
            }
            RelayJobMessage::Chat(Ok(ChatOutcome::Response("Systems design.".to_string())))
        }),
        || {
            app.voice_job = Some(fake_voice_job(VoiceJobMessage::Transcript(
                "What should I study?".to_string(),
            )));
            app.voice_phase = VoicePhase::Processing;
            wait_for_jobs(&mut app);
        },
    );

    let transcript = app.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].role, MessageRole::User);
    assert_eq!(
        transcript[0].content,
        "🎤 **Voice Input:** What should I study?"
    );
    assert_eq!(transcript[1].role, MessageRole::Assistant);
    assert_eq!(transcript[1].content, "🤖 **AI Response:**\n\nSystems design.");
}

#[test]
fn voice_backend_error_renders_voice_error_entry() {
    let mut app = ready_app();
    app.voice_job = Some(fake_voice_job(VoiceJobMessage::BackendError(
        "unsupported audio".to_string(),
    )));
    app.voice_phase = VoicePhase::Processing;
    wait_for_jobs(&mut app);

    let transcript = app.transcript();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].content, "❌ Voice Error: unsupported audio");
    assert!(app.relay_jobs.is_empty());
}

#[test]
fn reset_clears_transcript_and_refetches_companies() {
    let mut app = test_app();
    let company_fetches = Arc::new(AtomicUsize::new(0));
    let counter = company_fetches.clone();
    relay::with_list_hook(
        Box::new(move |request| match request {
            ListRequest::Companies => {
                counter.fetch_add(1, Ordering::SeqCst);
                ListJobMessage::Companies(Ok(vec!["Acme".to_string()]))
            }
            ListRequest::Roles { .. } => ListJobMessage::Roles(Ok(vec!["Engineer".to_string()])),
            ListRequest::Microphones => ListJobMessage::Microphones(Ok(Vec::new())),
        }),
        || {
            app.select_company("Acme");
            wait_for_jobs(&mut app);
            app.select_role("Engineer");

            app.voice_job = Some(fake_voice_job(VoiceJobMessage::NoSpeech));
            app.voice_phase = VoicePhase::Processing;
            wait_for_jobs(&mut app);
            assert_eq!(app.transcript().len(), 1);

            app.reset();
            assert!(app.transcript().is_empty());
            assert_eq!(app.screen(), Screen::CompanyPicker);
            wait_for_jobs(&mut app);
        },
    );
    assert_eq!(company_fetches.load(Ordering::SeqCst), 1);
    assert_eq!(app.companies(), ["Acme"]);
}

#[test]
fn stale_roles_snapshot_is_dropped() {
    let mut app = test_app();
    relay::with_list_hook(
        Box::new(|request| match request {
            ListRequest::Roles { company } if company == "Acme" => {
                ListJobMessage::Roles(Ok(vec!["Stale Role".to_string()]))
            }
            ListRequest::Roles { .. } => ListJobMessage::Roles(Ok(vec!["Fresh Role".to_string()])),
            ListRequest::Companies => ListJobMessage::Companies(Ok(Vec::new())),
            ListRequest::Microphones => ListJobMessage::Microphones(Ok(Vec::new())),
        }),
        || {
            app.select_company("Acme");
            app.select_company("Beta");
            wait_for_jobs(&mut app);
        },
    );
    assert_eq!(app.roles(), ["Fresh Role"]);
}

#[test]
fn stale_chat_reply_is_dropped_after_reset() {
    let mut app = ready_app();
    relay::with_list_hook(empty_lists(), || {
        relay::with_relay_hook(
            Box::new(|_| RelayJobMessage::Chat(Ok(ChatOutcome::Response("late".to_string())))),
            || {
                type_text(&mut app, "hi");
                app.send_current_input();
                app.reset();
                wait_for_jobs(&mut app);
            },
        );
    });
    assert!(app.transcript().is_empty());
}

#[test]
fn mic_selection_is_cosmetic_and_closes_overlay() {
    let mut app = test_app();
    relay::with_list_hook(
        Box::new(|request| match request {
            ListRequest::Microphones => ListJobMessage::Microphones(Ok(vec![
                Microphone {
                    index: 0,
                    name: "Built-in".to_string(),
                },
                Microphone {
                    index: 1,
                    name: "USB Mic".to_string(),
                },
            ])),
            ListRequest::Companies => ListJobMessage::Companies(Ok(Vec::new())),
            ListRequest::Roles { .. } => ListJobMessage::Roles(Ok(Vec::new())),
        }),
        || {
            app.toggle_mic_picker();
            wait_for_jobs(&mut app);
        },
    );
    assert_eq!(app.overlay(), Overlay::MicPicker);
    app.cursor_down();
    app.select_highlighted();
    assert_eq!(app.overlay(), Overlay::None);
    assert_eq!(app.selected_mic(), Some(1));
    assert!(app.relay_jobs.is_empty());
    assert!(app.status_text().contains("USB Mic"));
}

#[test]
fn close_overlay_reports_whether_one_was_open() {
    let mut app = test_app();
    assert!(!app.close_overlay());
    relay::with_list_hook(empty_lists(), || {
        app.toggle_mic_picker();
        wait_for_jobs(&mut app);
    });
    assert!(app.close_overlay());
    assert!(!app.close_overlay());
}

#[test]
fn enter_on_empty_picker_is_a_noop() {
    let mut app = test_app();
    app.select_highlighted();
    assert_eq!(app.screen(), Screen::CompanyPicker);
    assert!(!app.has_active_jobs());
}

#[test]
fn input_stops_growing_at_the_limit() {
    let mut app = test_app();
    for _ in 0..INPUT_CHAR_LIMIT {
        app.push_input_char('a');
    }
    app.push_input_char('b');
    assert_eq!(app.input_text().len(), INPUT_CHAR_LIMIT);
    assert!(app.status_text().starts_with("Input is full"));
}

#[test]
fn no_log_file_without_flags() {
    serialize_logging(|| {
        let log_path = log_file_path();
        std::fs::remove_file(&log_path).ok();
        init_logging(&base_config());
        log_debug("never-written");
        assert!(!log_path.exists());
    });
}

#[test]
fn log_flag_writes_lines_to_disk() {
    serialize_logging(|| {
        let log_path = log_file_path();
        std::fs::remove_file(&log_path).ok();
        set_logging_for_tests(true, false);
        log_debug("written-when-enabled");
        let contents = std::fs::read_to_string(&log_path).expect("log file should exist");
        set_logging_for_tests(false, false);
        assert!(contents.contains("written-when-enabled"));
    });
}

#[test]
fn content_lines_need_opt_in() {
    serialize_logging(|| {
        let log_path = log_file_path();
        std::fs::remove_file(&log_path).ok();
        set_logging_for_tests(true, false);
        log_debug_content("typed text stays private");
        let contents = std::fs::read_to_string(&log_path).unwrap_or_default();
        set_logging_for_tests(false, false);
        assert!(
            !contents.contains("typed text stays private"),
            "content lines must stay out of the log unless --log-content is set"
        );
    });
}
