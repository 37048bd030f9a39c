//! Map View (Center)
//!
//! A plain lon/lat canvas standing in for a slippy map. It implements
//! `MapHost`, so panels add controls, outlines, raster layers and legends to
//! it exactly as they would to a web map. Site outlines are drawn; raster
//! layers are listed in the corner since their tiles live on the compute
//! service.

use iced::widget::canvas::{self, Frame, Geometry, Path, Stroke, Text};
use iced::{Color, Point, Rectangle, Renderer, Theme};

use elter_core::geometry::{BoundingBox, SiteBoundary};
use elter_core::map::{
    parse_hex_color, BoundaryStyle, ControlId, ControlSpec, LegendSpec, MapHost, MapLayer,
};
use elter_core::{ToolbarError, ToolbarResult};

use crate::Message;

/// Europe, the default extent
const HOME_VIEW: BoundingBox = BoundingBox {
    min_lon: -12.0,
    min_lat: 34.0,
    max_lon: 32.0,
    max_lat: 66.0,
};

/// Outline drawn on the map
#[derive(Debug, Clone)]
pub struct Outline {
    pub name: String,
    pub boundary: SiteBoundary,
    pub style: BoundaryStyle,
}

/// Map state shared by every panel
#[derive(Debug, Default)]
pub struct MapView {
    controls: Vec<(ControlId, ControlSpec)>,
    layers: Vec<MapLayer>,
    outlines: Vec<Outline>,
    view: Option<BoundingBox>,
    legend: Option<LegendSpec>,
}

impl MapView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layers(&self) -> &[MapLayer] {
        &self.layers
    }

    pub fn legend(&self) -> Option<&LegendSpec> {
        self.legend.as_ref()
    }

    pub fn control_titles(&self) -> Vec<&str> {
        self.controls.iter().map(|(_, spec)| spec.title.as_str()).collect()
    }

    pub fn extent(&self) -> BoundingBox {
        self.view.unwrap_or(HOME_VIEW)
    }

    /// Back to the default extent
    pub fn reset_view(&mut self) {
        self.view = None;
    }

    fn layer_mut(&mut self, name: &str) -> ToolbarResult<&mut MapLayer> {
        self.layers
            .iter_mut()
            .find(|l| l.name == name)
            .ok_or_else(|| ToolbarError::not_found("Layer", name))
    }
}

impl MapHost for MapView {
    fn add_control(&mut self, spec: ControlSpec) -> ControlId {
        let id = ControlId::new();
        log::debug!("Map control added: {}", spec.title);
        self.controls.push((id, spec));
        id
    }

    fn remove_control(&mut self, id: ControlId) {
        self.controls.retain(|(c, _)| *c != id);
    }

    fn has_control(&self, id: ControlId) -> bool {
        self.controls.iter().any(|(c, _)| *c == id)
    }

    fn center_on(&mut self, bbox: &BoundingBox) {
        self.view = Some(*bbox);
    }

    fn add_layer(&mut self, layer: MapLayer) {
        log::info!("Map layer '{}' -> {}", layer.name, layer.tiles.url_template);
        match self.layers.iter_mut().find(|l| l.name == layer.name) {
            Some(existing) => *existing = layer,
            None => self.layers.push(layer),
        }
    }

    fn add_boundary(&mut self, name: &str, boundary: &SiteBoundary, style: &BoundaryStyle) {
        self.outlines.retain(|o| o.name != name);
        self.outlines.push(Outline {
            name: name.to_string(),
            boundary: boundary.clone(),
            style: style.clone(),
        });
    }

    fn set_layer_visibility(&mut self, name: &str, visible: bool) -> ToolbarResult<()> {
        self.layer_mut(name)?.visible = visible;
        Ok(())
    }

    fn set_layer_opacity(&mut self, name: &str, opacity: f32) -> ToolbarResult<()> {
        self.layer_mut(name)?.opacity = opacity.clamp(0.0, 1.0);
        Ok(())
    }

    fn show_legend(&mut self, legend: LegendSpec) {
        self.legend = Some(legend);
    }

    fn clear_legend(&mut self) {
        self.legend = None;
    }
}

/// Hex colour to iced colour, grey when unreadable
pub fn hex_to_color(hex: &str) -> Color {
    match parse_hex_color(hex) {
        Some((r, g, b)) => Color::from_rgb8(r, g, b),
        None => Color::from_rgb(0.5, 0.5, 0.5),
    }
}

/// Canvas program for the map
pub struct MapCanvas<'a> {
    map: &'a MapView,
}

impl<'a> MapCanvas<'a> {
    pub fn new(map: &'a MapView) -> Self {
        Self { map }
    }

    /// Equirectangular projection of the current extent onto the canvas,
    /// keeping the aspect ratio.
    fn projector(&self, bounds: Rectangle) -> impl Fn(f64, f64) -> Point {
        let extent = self.map.extent();
        let margin = 10.0_f64;
        let w = (bounds.width as f64 - 2.0 * margin).max(1.0);
        let h = (bounds.height as f64 - 2.0 * margin).max(1.0);
        let scale = (w / extent.width().max(1e-9)).min(h / extent.height().max(1e-9));
        let (center_lon, center_lat) = extent.center();
        let (cx, cy) = (bounds.width as f64 / 2.0, bounds.height as f64 / 2.0);

        move |lon, lat| {
            Point::new(
                (cx + (lon - center_lon) * scale) as f32,
                (cy - (lat - center_lat) * scale) as f32,
            )
        }
    }

    fn draw_graticule(&self, frame: &mut Frame, bounds: Rectangle, color: Color) {
        let project = self.projector(bounds);
        let extent = self.map.extent();
        let step = graticule_step(extent.width().max(extent.height()));

        let mut lon = (extent.min_lon / step).floor() * step;
        while lon <= extent.max_lon + step {
            let line = Path::line(project(lon, extent.min_lat - step), project(lon, extent.max_lat + step));
            frame.stroke(&line, Stroke::default().with_color(color).with_width(0.5));
            lon += step;
        }
        let mut lat = (extent.min_lat / step).floor() * step;
        while lat <= extent.max_lat + step {
            let line = Path::line(project(extent.min_lon - step, lat), project(extent.max_lon + step, lat));
            frame.stroke(&line, Stroke::default().with_color(color).with_width(0.5));
            lat += step;
        }
    }

    fn draw_outline(&self, frame: &mut Frame, bounds: Rectangle, outline: &Outline) {
        let project = self.projector(bounds);
        let color = hex_to_color(&outline.style.color);

        for polygon in outline.boundary.polygons() {
            let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors().iter());
            for ring in rings {
                let path = Path::new(|builder| {
                    for (i, coord) in ring.coords().enumerate() {
                        let p = project(coord.x, coord.y);
                        if i == 0 {
                            builder.move_to(p);
                        } else {
                            builder.line_to(p);
                        }
                    }
                    builder.close();
                });
                frame.fill(&path, Color { a: 0.12, ..color });
                frame.stroke(
                    &path,
                    Stroke::default().with_color(color).with_width(outline.style.width),
                );
            }
        }

        if let Some(bbox) = outline.boundary.bounding_box() {
            let label = Text {
                content: outline.name.clone(),
                position: project(bbox.min_lon, bbox.max_lat),
                color,
                size: iced::Pixels(10.0),
                ..Text::default()
            };
            frame.fill_text(label);
        }
    }

    fn draw_layer_list(&self, frame: &mut Frame, text_color: Color) {
        for (i, layer) in self.map.layers.iter().rev().enumerate() {
            let alpha = if layer.visible { layer.opacity.max(0.3) } else { 0.3 };
            let label = Text {
                content: format!("▦ {}", layer.name),
                position: Point::new(8.0, 8.0 + i as f32 * 14.0),
                color: Color { a: alpha, ..text_color },
                size: iced::Pixels(11.0),
                ..Text::default()
            };
            frame.fill_text(label);
        }
    }
}

/// Grid spacing in degrees for an extent span
fn graticule_step(span_deg: f64) -> f64 {
    [0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0]
        .into_iter()
        .find(|step| span_deg / step <= 12.0)
        .unwrap_or(20.0)
}

impl<'a> canvas::Program<Message> for MapCanvas<'a> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        theme: &Theme,
        bounds: Rectangle,
        _cursor: iced::mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        let palette = theme.extended_palette();

        let water = Path::rectangle(Point::ORIGIN, bounds.size());
        frame.fill(&water, Color::from_rgb(0.86, 0.91, 0.95));
        self.draw_graticule(&mut frame, bounds, Color::from_rgb(0.72, 0.78, 0.84));

        for outline in &self.map.outlines {
            self.draw_outline(&mut frame, bounds, outline);
        }
        self.draw_layer_list(&mut frame, palette.background.base.text);

        vec![frame.into_geometry()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elter_core::compute::{TileSource, VisParams};

    #[test]
    fn test_graticule_step() {
        assert_eq!(graticule_step(0.5), 0.1);
        assert_eq!(graticule_step(44.0), 5.0);
        assert_eq!(graticule_step(400.0), 20.0);
    }

    #[test]
    fn test_layers_replace_by_name() {
        let mut map = MapView::new();
        let tiles = TileSource {
            url_template: "https://tiles/{z}/{x}/{y}".to_string(),
        };
        map.add_layer(MapLayer::new("a", tiles.clone(), VisParams::default()));
        map.add_layer(MapLayer::new("a", tiles, VisParams::default()));
        assert_eq!(map.layers().len(), 1);
        assert!(map.set_layer_opacity("b", 0.5).is_err());
    }

    #[test]
    fn test_center_and_reset() {
        let mut map = MapView::new();
        let bbox = BoundingBox::new(-6.5, 36.8, -6.2, 37.1);
        map.center_on(&bbox);
        assert_eq!(map.extent(), bbox);
        map.reset_view();
        assert_eq!(map.extent(), HOME_VIEW);
    }
}
