//! # Panels
//!
//! The per-product toolbar panel: selection state machine, hover
//! visibility and output area. Front-ends only forward widget events to
//! [`PanelController`] and draw what it exposes.

pub mod controller;
pub mod output;
pub mod state;
pub mod visibility;

pub use controller::{parse_epsg, ExportOptions, PanelController};
pub use output::{OutputLevel, OutputLine, OutputLog};
pub use state::{PanelPhase, PanelState};
pub use visibility::HoverVisibility;
