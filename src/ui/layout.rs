//! # Pane Layout
//!
//! The three panes (script list, output 1, output 2) share the terminal
//! width through two percentage ratios: the script list's share of the
//! full width, and output pane 1's share of what remains. Pane widths
//! are a pure function of the ratios and the terminal size, so resize
//! handling reduces to recomputation.

use tracing::debug;

/// Smallest terminal the UI will start in.
pub const MIN_TERMINAL_WIDTH: u16 = 80;
pub const MIN_TERMINAL_HEIGHT: u16 = 24;

/// Rows reserved for the status bar at the bottom.
pub const STATUS_BAR_HEIGHT: u16 = 1;

const DEFAULT_SCRIPT_LIST_RATIO: u16 = 25;
const MIN_SCRIPT_LIST_RATIO: u16 = 15;
const MAX_SCRIPT_LIST_RATIO: u16 = 50;

const DEFAULT_OUTPUT1_RATIO: u16 = 50;
const MIN_OUTPUT1_RATIO: u16 = 20;
const MAX_OUTPUT1_RATIO: u16 = 80;

const RESIZE_STEP: u16 = 5;

/// Which pane currently has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivePane {
    ScriptList,
    Output1,
    Output2,
}

impl ActivePane {
    /// Output slot index for this pane, if it is an output pane.
    pub fn output_index(self) -> Option<usize> {
        match self {
            ActivePane::ScriptList => None,
            ActivePane::Output1 => Some(0),
            ActivePane::Output2 => Some(1),
        }
    }

    /// The pane showing output slot `index`.
    pub fn for_output(index: usize) -> ActivePane {
        if index == 0 {
            ActivePane::Output1
        } else {
            ActivePane::Output2
        }
    }
}

/// Computed pane widths for one terminal width. Widths always sum to the
/// terminal width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneWidths {
    pub script_list: u16,
    pub output1: u16,
    pub output2: u16,
}

/// Resizable layout state: two ratios plus the focused pane.
#[derive(Debug, Clone)]
pub struct LayoutState {
    script_list_ratio: u16,
    output1_ratio: u16,
    pub active: ActivePane,
}

impl Default for LayoutState {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutState {
    pub fn new() -> Self {
        Self {
            script_list_ratio: DEFAULT_SCRIPT_LIST_RATIO,
            output1_ratio: DEFAULT_OUTPUT1_RATIO,
            // Output pane 1 starts focused so Enter has a target.
            active: ActivePane::Output1,
        }
    }

    /// Deterministic pane widths for the given terminal width.
    pub fn widths(&self, terminal_width: u16) -> PaneWidths {
        let script_list = terminal_width * self.script_list_ratio / 100;
        let remaining = terminal_width - script_list;
        let output1 = remaining * self.output1_ratio / 100;
        let output2 = remaining - output1;
        PaneWidths {
            script_list,
            output1,
            output2,
        }
    }

    /// The pane containing column `x`.
    pub fn pane_at(&self, x: u16, terminal_width: u16) -> ActivePane {
        let widths = self.widths(terminal_width);
        if x < widths.script_list {
            ActivePane::ScriptList
        } else if x < widths.script_list + widths.output1 {
            ActivePane::Output1
        } else {
            ActivePane::Output2
        }
    }

    pub fn script_list_ratio(&self) -> u16 {
        self.script_list_ratio
    }

    pub fn output1_ratio(&self) -> u16 {
        self.output1_ratio
    }

    /// Grow the script list by one step. Returns false at the bound.
    pub fn widen_script_list(&mut self) -> bool {
        if self.script_list_ratio >= MAX_SCRIPT_LIST_RATIO {
            debug!(ratio = self.script_list_ratio, "script list already at maximum width");
            return false;
        }
        self.script_list_ratio =
            (self.script_list_ratio + RESIZE_STEP).min(MAX_SCRIPT_LIST_RATIO);
        debug!(ratio = self.script_list_ratio, "script list widened");
        true
    }

    /// Shrink the script list by one step. Returns false at the bound.
    pub fn narrow_script_list(&mut self) -> bool {
        if self.script_list_ratio <= MIN_SCRIPT_LIST_RATIO {
            debug!(ratio = self.script_list_ratio, "script list already at minimum width");
            return false;
        }
        self.script_list_ratio =
            (self.script_list_ratio - RESIZE_STEP).max(MIN_SCRIPT_LIST_RATIO);
        debug!(ratio = self.script_list_ratio, "script list narrowed");
        true
    }

    /// Grow output pane 1's share of the output area.
    pub fn widen_output1(&mut self) -> bool {
        if self.output1_ratio >= MAX_OUTPUT1_RATIO {
            debug!(ratio = self.output1_ratio, "output pane 1 already at maximum width");
            return false;
        }
        self.output1_ratio = (self.output1_ratio + RESIZE_STEP).min(MAX_OUTPUT1_RATIO);
        debug!(ratio = self.output1_ratio, "output pane 1 widened");
        true
    }

    /// Shrink output pane 1's share of the output area.
    pub fn narrow_output1(&mut self) -> bool {
        if self.output1_ratio <= MIN_OUTPUT1_RATIO {
            debug!(ratio = self.output1_ratio, "output pane 1 already at minimum width");
            return false;
        }
        self.output1_ratio = (self.output1_ratio - RESIZE_STEP).max(MIN_OUTPUT1_RATIO);
        debug!(ratio = self.output1_ratio, "output pane 1 narrowed");
        true
    }

    /// Move the active pane's left edge leftward (the pane to its left
    /// shrinks). The leftmost pane cannot expand further left.
    pub fn resize_active_left(&mut self) -> bool {
        match self.active {
            ActivePane::ScriptList => {
                debug!("script list cannot expand left");
                false
            }
            ActivePane::Output1 => self.narrow_script_list(),
            ActivePane::Output2 => self.narrow_output1(),
        }
    }

    /// Move the active pane's right edge rightward (the pane to its right
    /// shrinks). The rightmost pane cannot expand further right.
    pub fn resize_active_right(&mut self) -> bool {
        match self.active {
            ActivePane::ScriptList => self.widen_script_list(),
            ActivePane::Output1 => self.widen_output1(),
            ActivePane::Output2 => {
                debug!("output pane 2 cannot expand right");
                false
            }
        }
    }

    /// Grow the active pane regardless of direction.
    pub fn resize_active_grow(&mut self) -> bool {
        match self.active {
            ActivePane::ScriptList => self.widen_script_list(),
            ActivePane::Output1 => self.widen_output1(),
            ActivePane::Output2 => self.narrow_output1(),
        }
    }

    /// Shrink the active pane regardless of direction.
    pub fn resize_active_shrink(&mut self) -> bool {
        match self.active {
            ActivePane::ScriptList => self.narrow_script_list(),
            ActivePane::Output1 => self.narrow_output1(),
            ActivePane::Output2 => self.widen_output1(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_widths_sum_to_terminal_width() {
        let layout = LayoutState::new();
        for width in [80u16, 100, 120, 200] {
            let w = layout.widths(width);
            assert_eq!(w.script_list + w.output1 + w.output2, width);
        }
    }

    #[test]
    fn test_widths_follow_ratios() {
        let layout = LayoutState::new();
        let w = layout.widths(120);
        // 25% of 120, then 50% of the remaining 90.
        assert_eq!(w.script_list, 30);
        assert_eq!(w.output1, 45);
        assert_eq!(w.output2, 45);
    }

    #[test]
    fn test_resize_is_idempotent_at_bounds() {
        let mut layout = LayoutState::new();

        while layout.widen_script_list() {}
        assert_eq!(layout.script_list_ratio(), MAX_SCRIPT_LIST_RATIO);
        assert!(!layout.widen_script_list());
        assert_eq!(layout.script_list_ratio(), MAX_SCRIPT_LIST_RATIO);

        while layout.narrow_script_list() {}
        assert_eq!(layout.script_list_ratio(), MIN_SCRIPT_LIST_RATIO);
        assert!(!layout.narrow_script_list());
        assert_eq!(layout.script_list_ratio(), MIN_SCRIPT_LIST_RATIO);
    }

    #[test]
    fn test_output1_resize_bounds() {
        let mut layout = LayoutState::new();

        while layout.widen_output1() {}
        assert_eq!(layout.output1_ratio(), MAX_OUTPUT1_RATIO);
        assert!(!layout.widen_output1());

        while layout.narrow_output1() {}
        assert_eq!(layout.output1_ratio(), MIN_OUTPUT1_RATIO);
        assert!(!layout.narrow_output1());
    }

    #[test]
    fn test_shrinking_terminal_keeps_widths_proportional() {
        let layout = LayoutState::new();
        let wide = layout.widths(120);
        let narrow = layout.widths(90);

        assert_eq!(narrow.script_list + narrow.output1 + narrow.output2, 90);
        assert!(narrow.script_list <= wide.script_list);
        assert!(narrow.output1 <= wide.output1);
        assert!(narrow.output2 <= wide.output2);
    }

    #[test]
    fn test_edge_panes_cannot_expand_outward() {
        let mut layout = LayoutState::new();

        layout.active = ActivePane::ScriptList;
        assert!(!layout.resize_active_left());

        layout.active = ActivePane::Output2;
        assert!(!layout.resize_active_right());
    }

    #[test]
    fn test_directional_resize_moves_shared_edges() {
        let mut layout = LayoutState::new();

        layout.active = ActivePane::Output1;
        let before = layout.script_list_ratio();
        assert!(layout.resize_active_left());
        assert_eq!(layout.script_list_ratio(), before - 5);

        layout.active = ActivePane::Output2;
        let before = layout.output1_ratio();
        assert!(layout.resize_active_left());
        assert_eq!(layout.output1_ratio(), before - 5);
    }

    #[test]
    fn test_pane_at_maps_columns() {
        let layout = LayoutState::new();
        let w = layout.widths(120);

        assert_eq!(layout.pane_at(0, 120), ActivePane::ScriptList);
        assert_eq!(layout.pane_at(w.script_list - 1, 120), ActivePane::ScriptList);
        assert_eq!(layout.pane_at(w.script_list, 120), ActivePane::Output1);
        assert_eq!(
            layout.pane_at(w.script_list + w.output1, 120),
            ActivePane::Output2
        );
        assert_eq!(layout.pane_at(119, 120), ActivePane::Output2);
    }
}
