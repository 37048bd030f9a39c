//! # Map Host
//!
//! The surface a toolbar panel draws on. The GUI implements [`MapHost`] on its
//! canvas map; tests and the CLI use [`crate::memory::RecordingMap`].
//!
//! Layers are keyed by name: adding a layer whose name already exists
//! replaces it in place, which is how re-applying the same product refreshes
//! the map instead of stacking duplicates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::compute::{TileSource, VisParams};
use crate::errors::ToolbarResult;
use crate::geometry::{BoundingBox, SiteBoundary};

/// Handle of a control (panel) anchored on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlId(pub Uuid);

impl ControlId {
    pub fn new() -> Self {
        ControlId(Uuid::new_v4())
    }
}

impl Default for ControlId {
    fn default() -> Self {
        Self::new()
    }
}

/// Map corner a control is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ControlPosition {
    #[default]
    TopRight,
    TopLeft,
    BottomRight,
    BottomLeft,
}

/// What a panel asks the map to host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSpec {
    pub title: String,
    pub position: ControlPosition,
}

/// A rendered raster layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapLayer {
    pub name: String,
    pub tiles: TileSource,
    pub vis: VisParams,
    pub visible: bool,
    pub opacity: f32,
}

impl MapLayer {
    pub fn new(name: impl Into<String>, tiles: TileSource, vis: VisParams) -> Self {
        MapLayer {
            name: name.into(),
            tiles,
            vis,
            visible: true,
            opacity: 1.0,
        }
    }
}

/// Outline styling for a site boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryStyle {
    /// Hex colour, `#rrggbb`
    pub color: String,
    pub width: f32,
}

impl Default for BoundaryStyle {
    fn default() -> Self {
        BoundaryStyle {
            color: "#000000".to_string(),
            width: 2.0,
        }
    }
}

/// Legend box content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendSpec {
    pub title: String,
    /// (label, `#rrggbb` colour) in display order
    pub entries: Vec<(String, String)>,
}

impl LegendSpec {
    pub fn new(title: impl Into<String>, entries: Vec<(String, String)>) -> Self {
        LegendSpec {
            title: title.into(),
            entries,
        }
    }
}

/// The map a panel is attached to.
pub trait MapHost {
    fn add_control(&mut self, spec: ControlSpec) -> ControlId;

    /// Removing an unknown control is a no-op
    fn remove_control(&mut self, id: ControlId);

    fn has_control(&self, id: ControlId) -> bool;

    fn center_on(&mut self, bbox: &BoundingBox);

    /// Add or replace (same name) a raster layer
    fn add_layer(&mut self, layer: MapLayer);

    /// Add or replace (same name) an outline layer
    fn add_boundary(&mut self, name: &str, boundary: &SiteBoundary, style: &BoundaryStyle);

    fn set_layer_visibility(&mut self, name: &str, visible: bool) -> ToolbarResult<()>;

    fn set_layer_opacity(&mut self, name: &str, opacity: f32) -> ToolbarResult<()>;

    fn show_legend(&mut self, legend: LegendSpec);

    fn clear_legend(&mut self);
}

/// Parse `#rrggbb` (leading `#` optional, trailing alpha ignored) into RGB.
pub fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() < 6 || !digits.is_char_boundary(6) {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#54478C"), Some((0x54, 0x47, 0x8c)));
        assert_eq!(parse_hex_color("4E6DE7ff"), Some((0x4e, 0x6d, 0xe7)));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("zzzzzz"), None);
    }

    #[test]
    fn test_control_ids_are_unique() {
        assert_ne!(ControlId::new(), ControlId::new());
    }
}
