//! UI module for the eLTER toolbar GUI
//!
//! # Layout
//! - `toolbox` - Launcher row: one button per product panel, feedback form
//! - `map_canvas` - Map view (implements `MapHost`) and its canvas
//! - `panel` - Generic product panel drawn from a `PanelSpec`
//! - `export_tab` - Export tab of a panel
//! - `output` - Panel output area
//! - `layers_panel` - Layer visibility and opacity
//! - `legend` - Legend box
//! - `feedback_form` - Field feedback form
//! - `status_bar` - Bottom status messages

pub mod toolbox;
pub mod map_canvas;
pub mod panel;
pub mod export_tab;
pub mod output;
pub mod layers_panel;
pub mod legend;
pub mod feedback_form;
pub mod status_bar;
