//! Terminal UI rendering using ratatui.
//!
//! Each panel is implemented in its own submodule with a `render` function.
//!
//! ## Submodules
//!
//! - [`overview`]: Summary cards, the plant and the alert list
//! - [`chart`]: History line charts with pan and zoom
//! - [`stats`]: Min/max/avg table for the history window
//! - [`common`]: Shared components (header, status bar, help and date overlays)
//! - [`theme`]: Day/night palettes, pinned or following the clock
//!
//! ## Rendering Architecture
//!
//! The main loop in `main.rs` lays the screen out like this:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Header (common::render_header)               │
//! ├───────────────┬──────────────────────────────┤
//! │ overview      │ chart::render                │
//! │  cards        │                              │
//! │  plant        ├──────────────────────────────┤
//! │  alerts       │ stats::render (toggle)       │
//! ├───────────────┴──────────────────────────────┤
//! │ Status Bar (common::render_status_bar)       │
//! └──────────────────────────────────────────────┘
//!         ↑
//!    Overlays rendered on top:
//!    - common::render_date_input
//!    - common::render_help
//! ```

pub mod chart;
pub mod common;
pub mod overview;
pub mod stats;
pub mod theme;

pub use theme::{Theme, ThemeMode};
