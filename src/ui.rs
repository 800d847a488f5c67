//! `ratatui` front-end: the event loop, the key map, and a pure `draw`
//! over the shared [`App`] state. State transitions never touch the
//! terminal; everything visible is derived from `App` on each frame.

use crate::api::SectionType;
use crate::app::{App, MessageRole, Overlay, Screen, VoicePhase};
use crate::log_debug;
use crate::markup::{self, Segment};
use crate::terminal_restore::ScreenGuard;
use anyhow::Result;
use crossterm::event;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

// Theme colors - calm blue with a warm accent for the active row
const BORDER_COLOR: Color = Color::Rgb(95, 175, 255);
const TITLE_COLOR: Color = Color::Rgb(135, 200, 255);
const DIM_BORDER: Color = Color::Rgb(60, 95, 130);
const BODY_TEXT: Color = Color::Rgb(210, 210, 205);
const ACCENT_TEXT: Color = Color::Rgb(255, 215, 130);
const STATUS_TEXT: Color = Color::Rgb(150, 155, 160);
const RECORDING_BORDER: Color = Color::Rgb(255, 120, 120);

/// Bring up the terminal, hand control to the event loop, and put the
/// screen back no matter how the loop ends.
pub fn run_app(app: &mut App) -> Result<()> {
    let guard = ScreenGuard::new();
    guard.enter_raw_mode()?;
    let mut stdout = io::stdout();
    guard.enter_alt_screen(&mut stdout)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let outcome = event_loop(&mut terminal, app);

    drop(terminal);
    guard.restore();
    outcome
}

fn event_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    // First frame before any input so the pickers appear immediately.
    terminal.draw(|frame| draw(frame, app))?;

    loop {
        app.poll_jobs()?;

        let busy = app.has_active_jobs();
        if busy {
            app.update_spinner();
        }

        // A running job forces a frame each pass so the spinner animates.
        let mut redraw = app.take_repaint() || busy;
        let mut quit = false;
        if event::poll(poll_cadence(busy))? {
            match event::read()? {
                Event::Key(key) => {
                    quit = handle_key_event(app, key);
                    redraw = true;
                }
                Event::Resize(_, _) => redraw = true,
                _ => {}
            }
        }

        if redraw {
            terminal.draw(|frame| draw(frame, app))?;
        }
        if quit {
            return Ok(());
        }
    }
}

fn poll_cadence(busy: bool) -> Duration {
    Duration::from_millis(if busy { 50 } else { 100 })
}

/// Map one keystroke onto the shared [`App`] state. Returns true when the
/// user asked to quit.
fn handle_key_event(app: &mut App, key: KeyEvent) -> bool {
    log_debug(&format!("key: {:?} mods: {:?}", key.code, key.modifiers));

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return true;
    }

    match key.code {
        KeyCode::Char('r') if ctrl => app.toggle_recording(),
        KeyCode::Char('m') if ctrl => app.toggle_mic_picker(),
        KeyCode::Char('g') if ctrl => {
            app.close_overlay();
            app.reset();
        }
        KeyCode::F(n @ 1..=5) => app.load_content(SectionType::ALL[usize::from(n) - 1]),
        KeyCode::Enter => app.select_highlighted(),
        KeyCode::Backspace => app.backspace_input(),
        KeyCode::Esc => {
            if !app.close_overlay() {
                app.clear_input();
            }
        }
        KeyCode::Char(c) if !ctrl => app.push_input_char(c),
        KeyCode::Delete => app.clear_input(),
        KeyCode::Up => app.cursor_up(),
        KeyCode::Down => app.cursor_down(),
        KeyCode::Home => app.scroll_to_top(),
        KeyCode::End => app.scroll_to_bottom(),
        KeyCode::PageUp => app.page_up(),
        KeyCode::PageDown => app.page_down(),
        _ => {}
    }

    false
}

/// Render the main panel, input line, and status bar.
pub fn draw(frame: &mut Frame<'_>, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3), Constraint::Length(2)])
        .split(frame.size());

    let max_cols = usize::from(rows[0].width.saturating_sub(2));
    let recording = app.voice_phase() == VoicePhase::Recording;

    let (title, body) = if recording {
        (" Recording ".to_string(), recording_lines(app, rows[0].height))
    } else if app.overlay() == Overlay::MicPicker {
        (" Select Microphone ".to_string(), mic_lines(app))
    } else {
        match app.screen() {
            Screen::CompanyPicker => (
                " Select Company ".to_string(),
                picker_lines(
                    app.companies(),
                    app.company_cursor(),
                    "🏢",
                    "No companies found in database",
                ),
            ),
            Screen::RolePicker => (
                format!(" Select Role | {} ", app.company().unwrap_or_default()),
                picker_lines(
                    app.roles(),
                    app.role_cursor(),
                    "👨‍💼",
                    "No roles found for this company",
                ),
            ),
            Screen::Chat => (
                format!(
                    " 🏢 {} | 👨‍💼 {} ",
                    app.company().unwrap_or_default(),
                    app.role().unwrap_or_default()
                ),
                transcript_lines(app, max_cols),
            ),
        }
    };

    // Scrolling only applies to the transcript; overlays start at the top.
    let scroll = match app.screen() {
        Screen::Chat if !recording && app.overlay() == Overlay::None => app.scroll_offset(),
        _ => 0,
    };

    let main_border = if recording { RECORDING_BORDER } else { BORDER_COLOR };

    // No text wrapping: long lines are pre-clamped to the panel width with
    // an ellipsis, so the scroll offset always counts real rows.
    let panel = Paragraph::new(body)
        .block(rounded_block(
            main_border,
            Span::styled(
                title,
                Style::default().fg(TITLE_COLOR).add_modifier(Modifier::BOLD),
            ),
        ))
        .style(Style::default().fg(BODY_TEXT))
        .scroll((scroll, 0));
    frame.render_widget(panel, rows[0]);

    // Scrub the input before rendering so stray control sequences in the
    // buffer cannot drive the terminal.
    let input_line = markup::scrub(app.input_text());
    let hints: Vec<Span> = [
        hint(" Ctrl+R ", "voice  "),
        hint("Ctrl+M ", "mic  "),
        hint("Ctrl+G ", "restart  "),
        hint("F1-F5 ", "topics "),
    ]
    .into_iter()
    .flatten()
    .collect();
    let composer = Paragraph::new(input_line.as_str())
        .block(
            rounded_block(
                BORDER_COLOR,
                Span::styled(
                    " Message ",
                    Style::default().fg(TITLE_COLOR).add_modifier(Modifier::BOLD),
                ),
            )
            .title_bottom(Line::from(hints)),
        )
        .style(Style::default().fg(ACCENT_TEXT));
    frame.render_widget(composer, rows[1]);

    let status_bar = Paragraph::new(app.status_text())
        .block(rounded_block(
            DIM_BORDER,
            Span::styled(" Status ", Style::default().fg(STATUS_TEXT)),
        ))
        .style(Style::default().fg(STATUS_TEXT));
    frame.render_widget(status_bar, rows[2]);

    place_input_cursor(frame, rows[1], input_line.as_str());
}

fn rounded_block(border: Color, title: Span<'static>) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .title(title)
}

fn hint(key: &'static str, action: &'static str) -> [Span<'static>; 2] {
    [
        Span::styled(
            key,
            Style::default().fg(ACCENT_TEXT).add_modifier(Modifier::BOLD),
        ),
        Span::styled(action, Style::default().fg(DIM_BORDER)),
    ]
}

/// Park the terminal cursor after the typed text, clamped to the box.
fn place_input_cursor(frame: &mut Frame<'_>, area: Rect, text: &str) {
    let usable = area.width.saturating_sub(2);
    let text_cols = UnicodeWidthStr::width(text).min(usize::from(u16::MAX)) as u16;
    let offset = text_cols.min(usable);
    frame.set_cursor(area.x.saturating_add(1).saturating_add(offset), area.y + 1);
}

fn placeholder_text(message: &str) -> Text<'static> {
    Text::from(Line::styled(
        message.to_string(),
        Style::default().fg(STATUS_TEXT),
    ))
}

fn cursor_row(label: String, selected: bool) -> Line<'static> {
    if selected {
        Line::styled(
            label,
            Style::default().fg(ACCENT_TEXT).add_modifier(Modifier::BOLD),
        )
    } else {
        Line::styled(label, Style::default().fg(BODY_TEXT))
    }
}

/// One line per entry, the cursor row marked and highlighted.
fn picker_lines(entries: &[String], cursor: usize, icon: &str, placeholder: &str) -> Text<'static> {
    if entries.is_empty() {
        return placeholder_text(placeholder);
    }
    let lines = entries
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let marker = if idx == cursor { "▸ " } else { "  " };
            cursor_row(format!("{marker}{icon} {name}"), idx == cursor)
        })
        .collect::<Vec<_>>();
    Text::from(lines)
}

fn mic_lines(app: &App) -> Text<'static> {
    if app.microphones().is_empty() {
        return placeholder_text("No microphones reported by the backend");
    }
    let lines = app
        .microphones()
        .iter()
        .enumerate()
        .map(|(idx, mic)| {
            let marker = if idx == app.mic_cursor() { "▸ " } else { "  " };
            let suffix = if app.selected_mic() == Some(idx) {
                "  (selected)"
            } else {
                ""
            };
            let label = format!("{marker}🎙 [{}] {}{suffix}", mic.index, mic.name);
            cursor_row(label, idx == app.mic_cursor())
        })
        .collect::<Vec<_>>();
    Text::from(lines)
}

/// Styled transcript rows: scrubbed, whitelist-styled, clamped to the
/// panel width. Blank rows separate consecutive messages.
fn transcript_lines(app: &App, max_cols: usize) -> Text<'static> {
    if app.transcript().is_empty() {
        return placeholder_text("Select a company and role to start chatting");
    }
    let mut lines: Vec<Line> = Vec::new();
    for (idx, message) in app.transcript().iter().enumerate() {
        if idx > 0 {
            lines.push(Line::from(""));
        }
        let base = match message.role {
            MessageRole::User => Style::default().fg(ACCENT_TEXT),
            MessageRole::Assistant => Style::default().fg(BODY_TEXT),
        };
        for segments in markup::parse_markup(&message.content) {
            lines.push(styled_line(&segments, base, max_cols));
        }
    }
    Text::from(lines)
}

fn styled_line(segments: &[Segment], base: Style, max_cols: usize) -> Line<'static> {
    let clamped = markup::clamp_segments(segments, max_cols);
    if clamped.is_empty() {
        return Line::from("");
    }
    let spans = clamped
        .into_iter()
        .map(|segment| match segment {
            Segment::Plain(text) => Span::styled(text, base),
            Segment::Bold(text) => Span::styled(text, base.add_modifier(Modifier::BOLD)),
            Segment::Italic(text) => Span::styled(text, base.add_modifier(Modifier::ITALIC)),
        })
        .collect::<Vec<_>>();
    Line::from(spans)
}

/// Centered capture indicator shown while the microphone is open.
fn recording_lines(app: &App, height: u16) -> Text<'static> {
    let elapsed = app
        .recording_elapsed()
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    let pad = usize::from(height.saturating_sub(2)).saturating_sub(3) / 2;
    let mut lines = vec![Line::from(""); pad];
    lines.push(
        Line::styled(
            "🎤 Recording...".to_string(),
            Style::default()
                .fg(RECORDING_BORDER)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center),
    );
    lines.push(
        Line::styled(format!("{elapsed}s"), Style::default().fg(BODY_TEXT))
            .alignment(Alignment::Center),
    );
    lines.push(
        Line::styled(
            "Press Ctrl+R to stop".to_string(),
            Style::default().fg(STATUS_TEXT),
        )
        .alignment(Alignment::Center),
    );
    Text::from(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use clap::Parser;

    fn fresh_app() -> App {
        let config = AppConfig::parse_from(["prepterm-tests"]);
        App::new(config).expect("app state should build")
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::empty()))
    }

    #[test]
    fn typing_appends_and_backspace_removes() {
        let mut app = fresh_app();
        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.input_text(), "a");

        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.input_text(), "");
    }

    #[test]
    fn ctrl_c_requests_quit() {
        let mut app = fresh_app();
        assert!(handle_key_event(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        ));
    }

    #[test]
    fn function_keys_without_selection_do_nothing() {
        let mut app = fresh_app();
        press(&mut app, KeyCode::F(3));
        assert!(app.transcript().is_empty());
        assert!(!app.has_active_jobs());
    }
}
