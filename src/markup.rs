//! Transcript text rendering: scrub first, style second.
//!
//! Remote text is always treated as plain text. The only formatting the
//! transcript honors is a small whitelist applied after scrubbing:
//! `**bold**`, `*italic*`, and newlines. Unterminated markers stay
//! literal. Anything else, including control bytes a hostile backend
//! could use to drive the terminal, is stripped before layout.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// One styled run within a transcript line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Plain(String),
    Bold(String),
    Italic(String),
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Segment::Plain(text) | Segment::Bold(text) | Segment::Italic(text) => text,
        }
    }

    fn width(&self) -> usize {
        UnicodeWidthStr::width(self.text())
    }
}

/// Remove control characters and zero-width glyphs. Newlines survive so
/// the caller can split on them; tabs become spaces.
pub fn scrub(text: &str) -> String {
    text.chars()
        .filter(|ch| !matches!(ch, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}'))
        .filter(|ch| !ch.is_control() || *ch == '\n' || *ch == '\t')
        .map(|ch| if ch == '\t' { ' ' } else { ch })
        .collect()
}

/// Scrub, split on newlines, and parse each line's whitelist markers.
pub fn parse_markup(text: &str) -> Vec<Vec<Segment>> {
    scrub(text).split('\n').map(parse_inline).collect()
}

/// Split one line into plain/bold/italic runs. Bold pairs are resolved
/// first, then italic pairs inside the remaining plain stretches, which
/// matches how the markers nest in backend content.
fn parse_inline(line: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut remaining = line;

    while let Some(start) = remaining.find("**") {
        let after_marker = &remaining[start + 2..];
        let Some(end) = after_marker.find("**") else {
            // No closing marker: the marker and everything after it stay literal.
            push_italic_runs(&mut segments, &remaining[..start]);
            push_plain(&mut segments, &remaining[start..]);
            return segments;
        };
        push_italic_runs(&mut segments, &remaining[..start]);
        segments.push(Segment::Bold(after_marker[..end].to_string()));
        remaining = &after_marker[end + 2..];
    }
    push_italic_runs(&mut segments, remaining);

    segments
}

fn push_italic_runs(segments: &mut Vec<Segment>, text: &str) {
    let mut remaining = text;
    while let Some(start) = remaining.find('*') {
        let after_marker = &remaining[start + 1..];
        let Some(end) = after_marker.find('*') else {
            break;
        };
        push_plain(segments, &remaining[..start]);
        segments.push(Segment::Italic(after_marker[..end].to_string()));
        remaining = &after_marker[end + 1..];
    }
    push_plain(segments, remaining);
}

/// Append plain text, merging into a trailing plain run when present.
fn push_plain(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Plain(last)) = segments.last_mut() {
        last.push_str(text);
        return;
    }
    segments.push(Segment::Plain(text.to_string()));
}

/// Clamp a line of segments to at most `max_cols` display columns,
/// replacing the overflow with a trailing ellipsis. No wrapping.
pub fn clamp_segments(segments: &[Segment], max_cols: usize) -> Vec<Segment> {
    let total: usize = segments.iter().map(Segment::width).sum();
    if total <= max_cols {
        return segments.to_vec();
    }
    if max_cols == 0 {
        return Vec::new();
    }

    let budget = max_cols - 1;
    let mut used = 0;
    let mut clamped = Vec::new();
    for segment in segments {
        if used >= budget {
            break;
        }
        let width = segment.width();
        if used + width <= budget {
            used += width;
            clamped.push(segment.clone());
            continue;
        }
        let prefix = column_prefix(segment.text(), budget - used);
        if !prefix.is_empty() {
            clamped.push(match segment {
                Segment::Plain(_) => Segment::Plain(prefix.to_string()),
                Segment::Bold(_) => Segment::Bold(prefix.to_string()),
                Segment::Italic(_) => Segment::Italic(prefix.to_string()),
            });
        }
        break;
    }
    clamped.push(Segment::Plain("…".to_string()));
    clamped
}

/// Longest prefix fitting within `cols` display columns, cut on a char
/// boundary. A wide char that would straddle the edge is left out.
fn column_prefix(text: &str, cols: usize) -> &str {
    let mut used = 0;
    let mut end = 0;
    for (idx, ch) in text.char_indices() {
        let width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + width > cols {
            break;
        }
        used += width;
        end = idx + ch.len_utf8();
    }
    &text[..end]
}
