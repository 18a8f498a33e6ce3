//! # ANSI SGR Rendering and Text Wrapping
//!
//! Script output may carry a restricted subset of ANSI "Select Graphic
//! Rendition" escape codes: reset (0), bold (1), normal intensity (22),
//! standard foreground colors (30-37) and bright foreground colors
//! (90-97). This module maps each styled run onto ratatui spans and
//! provides width-bounded line wrapping.
//!
//! ## Wrapping limitation
//!
//! A line that already fits the pane width passes through untouched,
//! color codes included. A line that needs wrapping is stripped of its
//! codes first; wrapped output is therefore uncolored. Full ANSI-aware
//! wrapping is an optional enhancement, not a correctness requirement.

use std::sync::OnceLock;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use regex::Regex;

static ANSI_RE: OnceLock<Regex> = OnceLock::new();
static SGR_RE: OnceLock<Regex> = OnceLock::new();

fn ansi_re() -> &'static Regex {
    ANSI_RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*[mK]").expect("valid ANSI regex"))
}

fn sgr_re() -> &'static Regex {
    SGR_RE.get_or_init(|| Regex::new(r"\x1b\[([0-9;]*)m").expect("valid SGR regex"))
}

/// Remove ANSI escape sequences from `text`.
pub fn strip_codes(text: &str) -> String {
    ansi_re().replace_all(text, "").into_owned()
}

/// Number of printable cells `text` occupies, ignoring escape sequences
/// and non-printable bytes.
pub fn visible_width(text: &str) -> usize {
    strip_codes(text).chars().filter(|c| is_printable(*c)).count()
}

/// Only the classic printable range is rendered; control bytes and
/// anything outside it are dropped.
fn is_printable(c: char) -> bool {
    (' '..='~').contains(&c)
}

/// Foreground color for one SGR color code, if it is in the supported
/// subset.
pub fn sgr_color(code: u16) -> Option<Color> {
    match code {
        30 => Some(Color::Black),
        31 => Some(Color::Red),
        32 => Some(Color::Green),
        33 => Some(Color::Yellow),
        34 => Some(Color::Blue),
        35 => Some(Color::Magenta),
        36 => Some(Color::Cyan),
        37 => Some(Color::Gray),
        90 => Some(Color::DarkGray),
        91 => Some(Color::LightRed),
        92 => Some(Color::LightGreen),
        93 => Some(Color::LightYellow),
        94 => Some(Color::LightBlue),
        95 => Some(Color::LightMagenta),
        96 => Some(Color::LightCyan),
        97 => Some(Color::White),
        _ => None,
    }
}

/// Apply one SGR parameter list (the `"1;31"` in `ESC[1;31m`) to a style.
fn apply_sgr(mut style: Style, params: &str) -> Style {
    if params.is_empty() {
        return Style::default();
    }
    for code in params.split(';') {
        let Ok(code) = code.parse::<u16>() else {
            continue;
        };
        style = match code {
            0 => Style::default(),
            1 => style.add_modifier(Modifier::BOLD),
            22 => style.remove_modifier(Modifier::BOLD),
            _ => match sgr_color(code) {
                Some(color) => style.fg(color),
                None => style,
            },
        };
    }
    style
}

/// Parse a single output line into styled spans.
///
/// Escape sequences switch the current style; non-printable bytes are
/// dropped. The caller guarantees the line fits the pane width (see
/// [`wrap_line`]), so no mid-line truncation happens here.
pub fn styled_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut style = Style::default();
    let mut last_end = 0;

    let push_run = |run: &str, style: Style, spans: &mut Vec<Span<'static>>| {
        let printable: String = run.chars().filter(|c| is_printable(*c)).collect();
        if !printable.is_empty() {
            spans.push(Span::styled(printable, style));
        }
    };

    for captures in sgr_re().captures_iter(text) {
        let whole = captures.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        push_run(&text[last_end..whole.0], style, &mut spans);
        let params = captures.get(1).map(|m| m.as_str()).unwrap_or("");
        style = apply_sgr(style, params);
        last_end = whole.1;
    }
    push_run(&text[last_end..], style, &mut spans);

    Line::from(spans)
}

/// Lazy, finite, restartable sequence of display lines at most `width`
/// cells wide. Clone the iterator to restart it.
#[derive(Debug, Clone)]
pub struct WrappedLines {
    passthrough: Option<String>,
    words: std::vec::IntoIter<String>,
    pending: Option<String>,
    width: usize,
    done: bool,
}

/// Wrap one raw output line to `width` display cells.
///
/// Lines that already fit are passed through unchanged, preserving any
/// ANSI codes. Lines that need wrapping are stripped of codes and
/// word-wrapped; words longer than the width are hard-split.
pub fn wrap_line(line: &str, width: usize) -> WrappedLines {
    if width == 0 {
        return WrappedLines {
            passthrough: None,
            words: Vec::new().into_iter(),
            pending: None,
            width,
            done: true,
        };
    }

    if visible_width(line) <= width {
        return WrappedLines {
            passthrough: Some(line.to_string()),
            words: Vec::new().into_iter(),
            pending: None,
            width,
            done: false,
        };
    }

    let clean = strip_codes(line);
    let words: Vec<String> = clean.split_whitespace().map(String::from).collect();
    WrappedLines {
        passthrough: None,
        words: words.into_iter(),
        pending: None,
        width,
        done: false,
    }
}

/// Number of display lines `line` occupies at `width`.
pub fn wrapped_count(line: &str, width: usize) -> usize {
    wrap_line(line, width).count()
}

impl Iterator for WrappedLines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        if let Some(line) = self.passthrough.take() {
            self.done = true;
            return Some(line);
        }

        let mut current = String::new();
        let mut current_len = 0usize;
        loop {
            let word = match self.pending.take().or_else(|| self.words.next()) {
                Some(word) => word,
                None => {
                    self.done = true;
                    return if current.is_empty() { None } else { Some(current) };
                }
            };
            let word_len = word.chars().count();

            if word_len > self.width {
                // A word that can never fit gets hard-split at the width.
                if !current.is_empty() {
                    self.pending = Some(word);
                    return Some(current);
                }
                let head: String = word.chars().take(self.width).collect();
                let tail: String = word.chars().skip(self.width).collect();
                if !tail.is_empty() {
                    self.pending = Some(tail);
                }
                return Some(head);
            }

            if current.is_empty() {
                current = word;
                current_len = word_len;
            } else if current_len + 1 + word_len <= self.width {
                current.push(' ');
                current.push_str(&word);
                current_len += 1 + word_len;
            } else {
                self.pending = Some(word);
                return Some(current);
            }
        }
    }
}
