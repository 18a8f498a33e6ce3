//! # UI Module
//!
//! Terminal user interface components for splitrun.
//!
//! ## Layout
//!
//! ```text
//! ┌─ Scripts ──┬─ Output 1 ────────┬─ Output 2 ────────┐
//! │            │                   │                   │
//! │  [1] a.sh  │  live process     │  live process     │
//! │  [2] b.py  │  output (slot 0)  │  output (slot 1)  │
//! │            │                   │                   │
//! ├────────────┴───────────────────┴───────────────────┤
//! │ left status          center status     right status │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Pane widths follow two adjustable ratios; the script list skips
//! separator rows during navigation; output panes scroll in wrapped-line
//! space with ANSI SGR colors applied.

pub mod ansi;
pub mod app;
pub mod layout;
pub mod render;
pub mod theme;

pub use app::App;
pub use layout::{ActivePane, LayoutState};
pub use render::render;
pub use theme::Theme;
