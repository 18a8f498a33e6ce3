//! # UI State
//!
//! All mutable interface state lives here: the script list with its
//! separator-aware selection, the two output panes with bounded line
//! buffers and scroll positions, the focused pane, the status bar
//! sections, and mouse click tracking for double-click detection.
//!
//! Rendering reads this state each frame; the controller mutates it in
//! response to input and process output. Nothing in this module touches
//! the terminal.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use tracing::debug;

use super::ansi;
use super::layout::{ActivePane, LayoutState, STATUS_BAR_HEIGHT};

/// Two clicks on the same row within this window count as a double-click.
const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(500);

/// Position tolerance for double-click detection, in cells.
const DOUBLE_CLICK_TOLERANCE: u16 = 3;

/// Lines scrolled per mouse wheel notch.
const WHEEL_SCROLL_LINES: usize = 3;

/// How close to the bottom (in wrapped lines) still counts as "at the
/// bottom" for auto-scroll purposes.
const AUTO_SCROLL_SLACK: usize = 2;

/// Marker prefix for non-selectable divider rows in the script list.
const SEPARATOR_PREFIX: &str = "---";

/// One output pane: a bounded buffer of raw output lines plus the scroll
/// position, measured in wrapped display lines.
#[derive(Debug)]
pub struct OutputPane {
    lines: VecDeque<String>,
    capacity: usize,
    /// Scroll offset in wrapped-line space; 0 shows the first line.
    pub scroll: usize,
    // Wrapped-line count cache, keyed by the width it was computed for.
    cached_width: usize,
    cached_count: usize,
    dirty: bool,
}

impl OutputPane {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            capacity: capacity.max(1),
            scroll: 0,
            cached_width: 0,
            cached_count: 0,
            dirty: true,
        }
    }

    /// Append newline-delimited output. Evicts the oldest lines beyond
    /// the capacity, keeping the scroll position stable relative to the
    /// content. If the view was at (or near) the bottom it stays pinned
    /// to the bottom; a manual scroll position is preserved.
    pub fn append(&mut self, text: &str, wrap_width: usize, visible_lines: usize) {
        if text.is_empty() {
            return;
        }

        let was_at_bottom =
            self.scroll + AUTO_SCROLL_SLACK >= self.max_scroll(wrap_width, visible_lines);

        for line in text.lines() {
            self.lines.push_back(line.to_string());
            if self.lines.len() > self.capacity {
                self.lines.pop_front();
                self.scroll = self.scroll.saturating_sub(1);
            }
        }
        self.dirty = true;

        if was_at_bottom {
            self.scroll = self.max_scroll(wrap_width, visible_lines);
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.scroll = 0;
        self.dirty = true;
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Raw (pre-wrap) lines, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Total wrapped display lines at `width`, recomputed only when the
    /// content or the width changed.
    pub fn wrapped_count(&mut self, width: usize) -> usize {
        if self.dirty || self.cached_width != width {
            self.cached_count = self
                .lines
                .iter()
                .map(|line| ansi::wrapped_count(line, width))
                .sum();
            self.cached_width = width;
            self.dirty = false;
        }
        self.cached_count
    }

    /// Largest valid scroll offset for the given geometry.
    pub fn max_scroll(&mut self, width: usize, visible_lines: usize) -> usize {
        self.wrapped_count(width).saturating_sub(visible_lines)
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize, width: usize, visible_lines: usize) {
        let max = self.max_scroll(width, visible_lines);
        self.scroll = (self.scroll + lines).min(max);
    }
}

/// Three status bar sections, rendered left, centered, and right.
#[derive(Debug, Default, Clone)]
pub struct StatusLine {
    pub left: String,
    pub center: String,
    pub right: String,
}

#[derive(Debug, Clone, Copy)]
struct ClickRecord {
    at: Instant,
    x: u16,
    y: u16,
    index: usize,
}

/// Aggregate interface state.
pub struct App {
    /// Script list entries: absolute paths, or separator rows prefixed
    /// with `---`.
    pub scripts: Vec<String>,
    /// Selected entry; never a separator while any valid entry exists.
    pub selected: Option<usize>,
    /// First visible script list row.
    pub list_scroll: usize,
    pub panes: [OutputPane; 2],
    pub layout: LayoutState,
    pub status: StatusLine,
    pub show_help: bool,
    pub should_quit: bool,
    /// Last known terminal size, updated by the render pass and resize
    /// events; mouse hit-testing and scroll geometry derive from it.
    pub terminal_size: (u16, u16),
    last_click: Option<ClickRecord>,
    double_clicked: Option<String>,
}

impl App {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            scripts: Vec::new(),
            selected: None,
            list_scroll: 0,
            panes: [OutputPane::new(buffer_size), OutputPane::new(buffer_size)],
            layout: LayoutState::new(),
            status: StatusLine::default(),
            show_help: false,
            should_quit: false,
            terminal_size: (0, 0),
            last_click: None,
            double_clicked: None,
        }
    }

    /// True for non-selectable divider rows.
    pub fn is_separator(entry: &str) -> bool {
        entry.starts_with(SEPARATOR_PREFIX)
    }

    /// Content rows available inside a bordered pane.
    pub fn visible_lines(&self) -> usize {
        let (_, height) = self.terminal_size;
        usize::from(height.saturating_sub(STATUS_BAR_HEIGHT + 2))
    }

    /// Content width of an output pane (border columns excluded).
    pub fn pane_content_width(&self, pane: usize) -> usize {
        let widths = self.layout.widths(self.terminal_size.0);
        let width = if pane == 0 { widths.output1 } else { widths.output2 };
        usize::from(width.saturating_sub(2))
    }

    /// Replace the script list, re-validating the selection: it is
    /// clamped into bounds and moved off separators, searching forward
    /// first, then backward.
    pub fn set_scripts(&mut self, scripts: Vec<String>) {
        self.scripts = scripts;

        if self.scripts.is_empty() {
            self.selected = None;
            self.list_scroll = 0;
            return;
        }

        self.list_scroll = self.list_scroll.min(self.scripts.len() - 1);
        let start = self
            .selected
            .unwrap_or(0)
            .min(self.scripts.len() - 1);
        self.selected = self.nearest_valid(start);
        self.ensure_selection_visible();
    }

    fn nearest_valid(&self, start: usize) -> Option<usize> {
        if !Self::is_separator(&self.scripts[start]) {
            return Some(start);
        }
        let forward = self.scripts[start..]
            .iter()
            .position(|s| !Self::is_separator(s))
            .map(|offset| start + offset);
        forward.or_else(|| {
            self.scripts[..start]
                .iter()
                .rposition(|s| !Self::is_separator(s))
        })
    }

    /// Select the entry matching `path`, if present. Returns whether the
    /// selection moved.
    pub fn select_path(&mut self, path: &str) -> bool {
        if let Some(index) = self.scripts.iter().position(|s| s == path) {
            if !Self::is_separator(&self.scripts[index]) {
                self.selected = Some(index);
                self.ensure_selection_visible();
                return true;
            }
        }
        false
    }

    /// Currently selected script path; never a separator.
    pub fn selected_script(&self) -> Option<&str> {
        let index = self.selected?;
        let entry = self.scripts.get(index)?;
        if Self::is_separator(entry) {
            None
        } else {
            Some(entry.as_str())
        }
    }

    /// Move the selection one valid entry in `direction` (+1 or -1),
    /// wrapping around and skipping separators.
    fn step_selection(&mut self, direction: isize) {
        if self.scripts.is_empty() {
            return;
        }
        let len = self.scripts.len() as isize;
        let current = self.selected.unwrap_or(0) as isize;
        let mut candidate = current;

        for _ in 0..len {
            candidate = (candidate + direction).rem_euclid(len);
            if !Self::is_separator(&self.scripts[candidate as usize]) {
                self.selected = Some(candidate as usize);
                self.ensure_selection_visible();
                return;
            }
        }
        // Only separators in the list; leave the selection alone.
    }

    pub fn select_next(&mut self) {
        self.step_selection(1);
    }

    pub fn select_previous(&mut self) {
        self.step_selection(-1);
    }

    pub fn select_first(&mut self) {
        if !self.scripts.is_empty() {
            self.selected = self.nearest_valid(0);
            self.ensure_selection_visible();
        }
    }

    pub fn select_last(&mut self) {
        if !self.scripts.is_empty() {
            let last = self.scripts.len() - 1;
            // Prefer searching backward from the end.
            self.selected = self.scripts[..=last]
                .iter()
                .rposition(|s| !Self::is_separator(s));
            self.ensure_selection_visible();
        }
    }

    /// Keep the selected row inside the script list viewport.
    pub fn ensure_selection_visible(&mut self) {
        let Some(selected) = self.selected else {
            return;
        };
        let visible = self.visible_lines().max(1);

        if selected < self.list_scroll {
            self.list_scroll = selected;
        }
        if selected >= self.list_scroll + visible {
            self.list_scroll = selected + 1 - visible;
        }
        let max_scroll = self.scripts.len().saturating_sub(visible);
        self.list_scroll = self.list_scroll.min(max_scroll);
    }

    /// Cycle focus between the two output panes; any other pane focuses
    /// output pane 1 first.
    pub fn cycle_output_focus(&mut self) {
        self.layout.active = match self.layout.active {
            ActivePane::Output1 => ActivePane::Output2,
            _ => ActivePane::Output1,
        };
    }

    pub fn set_status(&mut self, left: String, center: String, right: String) {
        self.status = StatusLine { left, center, right };
    }

    /// Route a mouse event: wheel scrolling in the pane under the cursor,
    /// click-to-focus for output panes, and selection plus double-click
    /// detection in the script list. Returns whether the event was
    /// consumed.
    pub fn handle_mouse(&mut self, event: MouseEvent) -> bool {
        let (width, height) = self.terminal_size;
        if width == 0 || height == 0 {
            return false;
        }
        // Ignore the status bar row.
        if event.row >= height.saturating_sub(STATUS_BAR_HEIGHT) {
            return false;
        }

        let pane = self.layout.pane_at(event.column, width);
        match event.kind {
            MouseEventKind::ScrollUp => {
                if let Some(index) = pane.output_index() {
                    self.panes[index].scroll_up(WHEEL_SCROLL_LINES);
                    return true;
                }
                false
            }
            MouseEventKind::ScrollDown => {
                if let Some(index) = pane.output_index() {
                    let width = self.pane_content_width(index);
                    let visible = self.visible_lines();
                    self.panes[index].scroll_down(WHEEL_SCROLL_LINES, width, visible);
                    return true;
                }
                false
            }
            MouseEventKind::Down(MouseButton::Left) => match pane {
                ActivePane::Output1 | ActivePane::Output2 => {
                    debug!(?pane, "click focuses output pane");
                    self.layout.active = pane;
                    true
                }
                ActivePane::ScriptList => self.handle_list_click(event.column, event.row),
            },
            _ => false,
        }
    }

    /// A click on a script row selects it; a second click on the same row
    /// within the double-click window and position tolerance reports a
    /// double-click. Focus does not change either way.
    fn handle_list_click(&mut self, x: u16, y: u16) -> bool {
        // Top border occupies row 0.
        let Some(row) = y.checked_sub(1) else {
            return false;
        };
        let index = self.list_scroll + usize::from(row);
        if index >= self.scripts.len() || Self::is_separator(&self.scripts[index]) {
            return false;
        }

        let now = Instant::now();
        let is_double = self.last_click.is_some_and(|click| {
            click.index == index
                && now.duration_since(click.at) < DOUBLE_CLICK_WINDOW
                && click.x.abs_diff(x) < DOUBLE_CLICK_TOLERANCE
                && click.y.abs_diff(y) < DOUBLE_CLICK_TOLERANCE
        });

        self.selected = Some(index);
        self.ensure_selection_visible();

        if is_double {
            debug!(index, "double-click on script");
            self.double_clicked = Some(self.scripts[index].clone());
            self.last_click = None;
        } else {
            self.last_click = Some(ClickRecord {
                at: now,
                x,
                y,
                index,
            });
        }
        true
    }

    /// The script double-clicked since the last call, if any. Consuming.
    pub fn take_double_click(&mut self) -> Option<String> {
        self.double_clicked.take()
    }
}
