//! # Panel Controller
//!
//! One toolbar panel: cascading network/site selectors, product parameters,
//! Apply/Reset/Export buttons and the output area. Event methods never
//! return errors; every failure becomes a line in [`OutputLog`] and the
//! panel stays usable.
//!
//! ## Example
//!
//! ```rust
//! use std::rc::Rc;
//! use elter_core::catalog::{Catalog, Network};
//! use elter_core::config::ToolbarConfig;
//! use elter_core::geometry::{BoundingBox, SiteBoundary};
//! use elter_core::memory::{InMemoryDirectory, RecordingCompute, RecordingMap};
//! use elter_core::products::{ParamValue, ProductKind};
//! use elter_core::session::Session;
//!
//! let spain = Network::new("net-es", "Spain");
//! let directory = InMemoryDirectory::new().with_site(
//!     &spain.id,
//!     "donana",
//!     "Doñana - Spain",
//!     SiteBoundary::from_bbox(&BoundingBox::new(-6.5, 36.8, -6.2, 37.1)),
//! );
//! let compute = Rc::new(RecordingCompute::new());
//! let session = Session::new(
//!     Rc::new(directory),
//!     compute.clone(),
//!     ToolbarConfig::default(),
//!     Catalog::with_networks(vec![spain]),
//! );
//!
//! let mut map = RecordingMap::new();
//! let mut panel = session.open_panel(ProductKind::Phenology, &mut map);
//! panel.select_network("Spain");
//! panel.select_site(&mut map, "Doñana");
//! panel.set_param(&mut map, "year", ParamValue::Int(2020));
//!
//! assert_eq!(panel.apply(&mut map).as_deref(), Some("SOS Doy 2020"));
//! assert!(map.has_layer("SOS Doy 2020"));
//! ```

use chrono::NaiveDate;

use super::output::OutputLog;
use super::state::{PanelPhase, PanelState};
use super::visibility::HoverVisibility;
use crate::compute::{ExportRequest, ExportState, ExportTicket, RasterHandle, VisParams};
use crate::errors::{ToolbarError, ToolbarResult};
use crate::map::{BoundaryStyle, ControlId, ControlSpec, ControlPosition, MapHost, MapLayer};
use crate::products::composite::{composite_request, composite_vis, COMPOSITE_LAYER};
use crate::products::{
    CompanionLayer, PanelSpec, ParamValue, ParamValues, ParamWidget, ProductContext, ProductKind, ProductStrategy, COMPOSITE_KEY,
    LEGEND_KEY,
};
use crate::registry::RasterRegistry;
use crate::session::Session;
use crate::sites::SiteCache;

/// Fraction of the site extent kept as margin when centering
const CENTER_PADDING: f64 = 0.1;

/// What the export tab submits
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Registry entry to export
    pub raster: Option<String>,
    /// Pixel size in metres, as typed
    pub scale: String,
    /// EPSG code, as typed (`4326` or `EPSG:4326`)
    pub crs: String,
    /// Output file name; blank means the raster name
    pub file_name: String,
}

/// Parse an EPSG code typed as `4326` or `EPSG:4326`
pub fn parse_epsg(text: &str) -> Option<u32> {
    let text = text.trim();
    let code = match text.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("EPSG:") => &text[5..],
        _ => text,
    };
    code.trim().parse::<u32>().ok().filter(|c| *c > 0)
}

pub struct PanelController {
    session: Session,
    strategy: Box<dyn ProductStrategy>,
    spec: PanelSpec,
    control: ControlId,
    state: PanelState,
    visibility: HoverVisibility,
    sites: SiteCache,
    registry: RasterRegistry,
    exports: Vec<ExportTicket>,
    output: OutputLog,
}

impl PanelController {
    /// Anchor a new panel on `map` and, if configured, outline the featured
    /// sites.
    pub fn open(session: Session, strategy: Box<dyn ProductStrategy>, map: &mut dyn MapHost) -> Self {
        let spec = strategy.panel_spec();
        let control = map.add_control(ControlSpec {
            title: spec.title.clone(),
            position: ControlPosition::TopRight,
        });
        log::info!("Opened {} panel", spec.title);

        let mut panel = PanelController {
            state: PanelState::new(spec.defaults()),
            session,
            strategy,
            spec,
            control,
            visibility: HoverVisibility::opened(),
            sites: SiteCache::new(),
            registry: RasterRegistry::new(),
            exports: Vec::new(),
            output: OutputLog::new(),
        };
        if panel.session.config.show_featured_sites {
            panel.draw_featured_sites(map);
        }
        panel
    }

    fn draw_featured_sites(&mut self, map: &mut dyn MapHost) {
        let featured = match &self.session.config.featured_sites {
            Some(sites) => sites.clone(),
            None => self.session.catalog.featured_sites.clone(),
        };
        let style = BoundaryStyle {
            color: self.spec.accent.clone(),
            width: 3.0,
        };

        let mut extent = None;
        for site in &featured {
            match self.session.directory.get_site(&site.id) {
                Ok(record) if !record.boundary.is_empty() => {
                    map.add_boundary(&site.key, &record.boundary, &style);
                    if extent.is_none() {
                        extent = record.boundary.bounding_box();
                    }
                }
                Ok(_) => log::warn!("Featured site {} has no boundary", site.key),
                Err(e) => log::warn!("Featured site {} skipped: {}", site.key, e),
            }
        }
        if let Some(bbox) = extent {
            map.center_on(&bbox.padded(CENTER_PADDING));
        }
    }

    fn is_closed(&self) -> bool {
        self.visibility.is_closed()
    }

    fn report(&mut self, error: &ToolbarError) {
        log::warn!("{} panel: {}", self.spec.title, error);
        self.output.error(error.to_string());
    }

    /// Replace the site list with the sites of network `name`.
    ///
    /// The previous site selection is dropped whatever the outcome. A failed
    /// directory lookup leaves an empty site list.
    pub fn select_network(&mut self, name: &str) {
        if self.is_closed() {
            return;
        }
        let network = match self.session.catalog.network_by_name(name) {
            Ok(network) => network.clone(),
            Err(e) => {
                self.report(&e);
                return;
            }
        };

        self.state.site = None;
        self.state.network = Some(network.clone());
        self.state.phase = PanelPhase::NetworkChosen;

        self.sites = match SiteCache::fetch(self.session.directory.as_ref(), &network.id) {
            Ok(cache) => {
                self.output.info(format!("{}: {} sites", network.name, cache.len()));
                match cache.failed().len() {
                    0 => {}
                    1 => self.output.warning("1 site could not be loaded"),
                    n => self.output.warning(format!("{} sites could not be loaded", n)),
                }
                cache
            }
            Err(e) => {
                self.report(&e);
                SiteCache::new()
            }
        };
    }

    /// Select a site of the current network and center the map on it.
    pub fn select_site(&mut self, map: &mut dyn MapHost, name: &str) {
        if self.is_closed() {
            return;
        }
        if self.state.network.is_none() {
            self.report(&ToolbarError::missing_selection("an eLTER network"));
            return;
        }
        let site = match self.sites.get(name) {
            Ok(site) => site.clone(),
            Err(e) => {
                self.report(&e);
                return;
            }
        };

        if let Some(bbox) = site.boundary.bounding_box() {
            map.center_on(&bbox.padded(CENTER_PADDING));
        }
        log::info!("Selected site {} ({})", site.name, site.id);
        self.output.info(format!("eLTER Title: {}", site.title));

        if self.state.params.flag(COMPOSITE_KEY) {
            let shown = composite_request(&site.boundary).and_then(|request| {
                let handle = self.session.compute.build_product(&request)?;
                self.session.compute.render(&handle, &composite_vis())
            });
            match shown {
                Ok(tiles) => map.add_layer(MapLayer::new(COMPOSITE_LAYER, tiles, composite_vis())),
                Err(e) => {
                    log::warn!("Composite for {} failed: {}", site.name, e);
                    self.output.warning(format!("Seasonal composite unavailable: {}", e));
                }
            }
        }

        self.state.site = Some(site);
        self.state.phase = PanelPhase::SiteChosen;
    }

    /// Change one parameter. Invalid values are reported and ignored.
    pub fn set_param(&mut self, map: &mut dyn MapHost, key: &str, value: ParamValue) {
        if self.is_closed() {
            return;
        }
        let checked = self.spec.param(key).and_then(|spec| spec.check(&value));
        match checked {
            Ok(value) => self.state.params.set(key, value),
            Err(e) => {
                self.report(&e);
                return;
            }
        }

        if key == LEGEND_KEY || self.state.params.flag(LEGEND_KEY) {
            self.refresh_legend(map);
        }
        if self.state.site.is_some() {
            self.state.phase = PanelPhase::ParametersSet;
        }
    }

    /// Set a parameter from typed text. Text that does not parse for the
    /// widget falls back to the widget default with a visible warning.
    pub fn set_param_text(&mut self, map: &mut dyn MapHost, key: &str, text: &str) {
        if self.is_closed() {
            return;
        }
        let spec = match self.spec.param(key) {
            Ok(spec) => spec.clone(),
            Err(e) => {
                self.report(&e);
                return;
            }
        };
        let text = text.trim();
        let parsed = match &spec.widget {
            ParamWidget::Choice { .. } if text.is_empty() => Some(ParamValue::Text(None)),
            ParamWidget::Choice { .. } | ParamWidget::Radio { .. } => Some(ParamValue::text(text)),
            ParamWidget::IntSlider { .. } => text.parse().ok().map(ParamValue::Int),
            ParamWidget::FloatSlider { .. } => text.parse().ok().map(ParamValue::Float),
            ParamWidget::Date if text.is_empty() => Some(ParamValue::Date(None)),
            ParamWidget::Date => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| ParamValue::Date(Some(d))),
            ParamWidget::Flag { .. } => match text.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(ParamValue::Flag(true)),
                "false" | "no" | "off" | "0" => Some(ParamValue::Flag(false)),
                _ => None,
            },
        };

        let value = parsed.unwrap_or_else(|| {
            let fallback = spec.default_value();
            self.output.warning(format!(
                "Could not read '{}' for {}, using {}",
                text, spec.label, fallback
            ));
            fallback
        });
        self.set_param(map, key, value);
    }

    fn refresh_legend(&mut self, map: &mut dyn MapHost) {
        if self.state.params.flag(LEGEND_KEY) {
            map.show_legend(self.strategy.legend(&self.state.params));
            self.output.info("Showing legend...");
        } else {
            map.clear_legend();
        }
    }

    /// Build the product for the selected site, add it to the registry and
    /// the map. Returns the layer name on success.
    pub fn apply(&mut self, map: &mut dyn MapHost) -> Option<String> {
        if self.is_closed() {
            return None;
        }
        let site = match &self.state.site {
            Some(site) => site.clone(),
            None => {
                self.report(&ToolbarError::missing_selection("an eLTER site"));
                return None;
            }
        };

        let ctx = ProductContext {
            catalog: &self.session.catalog,
            config: &self.session.config,
        };
        let plan = match self.strategy.plan(&self.state.params, &site, &ctx) {
            Ok(plan) => plan,
            Err(e) => {
                self.report(&e);
                return None;
            }
        };

        self.output.info("Loading data... Please wait...");
        log::info!("Applying '{}' for {}", plan.layer_name, site.name);

        let handle = match self.session.compute.build_product(&plan.request) {
            Ok(handle) => handle,
            Err(e) => {
                self.report(&e);
                self.state.phase = PanelPhase::ParametersSet;
                return None;
            }
        };
        if self.registry.insert(plan.layer_name.clone(), handle.clone(), site.boundary.clone()) {
            log::debug!("Replaced registry entry '{}'", plan.layer_name);
        }

        match self.show(map, &plan.layer_name, &handle, plan.vis) {
            Ok(()) => {
                self.output.info("The raster has been added to the map.");
                self.show_companions(map, &handle, &plan.companions);
                self.state.phase = PanelPhase::Applied;
                Some(plan.layer_name)
            }
            Err(e) => {
                self.report(&e);
                self.state.phase = PanelPhase::ParametersSet;
                None
            }
        }
    }

    fn show(
        &self,
        map: &mut dyn MapHost,
        name: &str,
        handle: &RasterHandle,
        vis: VisParams,
    ) -> ToolbarResult<()> {
        let tiles = self.session.compute.render(handle, &vis)?;
        map.add_layer(MapLayer::new(name, tiles, vis));
        Ok(())
    }

    /// Hidden context layers of a product. A failure here only warns, the
    /// product itself is already on the map.
    fn show_companions(&mut self, map: &mut dyn MapHost, handle: &RasterHandle, companions: &[CompanionLayer]) {
        if companions.is_empty() {
            return;
        }
        let context = handle.context();
        for companion in companions {
            match self.session.compute.render(&context, &companion.vis) {
                Ok(tiles) => {
                    let mut layer = MapLayer::new(companion.name.as_str(), tiles, companion.vis.clone());
                    layer.visible = false;
                    map.add_layer(layer);
                }
                Err(e) => {
                    log::warn!("Layer '{}' failed: {}", companion.name, e);
                    self.output.warning(format!("{} unavailable: {}", companion.name, e));
                }
            }
        }
    }

    /// Clear the output area. The registry is left alone.
    pub fn reset(&mut self) {
        if self.is_closed() {
            return;
        }
        self.output.clear();
        if self.state.phase == PanelPhase::Applied {
            self.state.phase = PanelPhase::ParametersSet;
        }
    }

    /// Start a server-side export of a registry entry.
    pub fn export(&mut self, options: &ExportOptions) -> Option<ExportTicket> {
        if self.is_closed() {
            return None;
        }
        let name = match options.raster.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => {
                self.report(&ToolbarError::missing_selection("a raster to download"));
                return None;
            }
        };
        let entry = match self.registry.get(&name) {
            Ok(entry) => entry.clone(),
            Err(e) => {
                self.report(&e);
                return None;
            }
        };

        let defaults = self.session.config.export.clone();
        let crs_code = parse_epsg(&options.crs).unwrap_or_else(|| {
            let fallback = parse_epsg(&defaults.crs).unwrap_or(4326);
            self.output.warning(format!(
                "'{}' is not an EPSG code, using EPSG:{}",
                options.crs.trim(),
                fallback
            ));
            fallback
        });
        let scale = match options.scale.trim().parse::<f64>() {
            Ok(scale) if scale.is_finite() && scale > 0.0 => scale,
            _ => {
                self.output.warning(format!(
                    "'{}' is not a valid scale, using {} m",
                    options.scale.trim(),
                    defaults.scale
                ));
                defaults.scale
            }
        };
        let file_name = match options.file_name.trim() {
            "" => name.clone(),
            typed => typed.to_string(),
        };

        let request = ExportRequest {
            handle: entry.handle,
            region: entry.region,
            scale,
            crs: format!("EPSG:{}", crs_code),
            file_name,
        };
        match self.session.compute.export_raster(&request) {
            Ok(ticket) => {
                self.output.info(format!(
                    "Exporting '{}' as {} (task {})",
                    name, request.file_name, ticket.task_id
                ));
                self.exports.push(ticket.clone());
                Some(ticket)
            }
            Err(e) => {
                self.report(&e);
                None
            }
        }
    }

    /// Poll unfinished exports and report the ones that completed or failed.
    pub fn refresh_exports(&mut self) {
        if self.is_closed() {
            return;
        }
        let compute = self.session.compute.clone();
        let mut updates = Vec::new();
        for ticket in self.exports.iter_mut().filter(|t| !t.state.is_finished()) {
            match compute.export_status(&ticket.task_id) {
                Ok(latest) => {
                    if latest.state.is_finished() {
                        updates.push(latest.clone());
                    }
                    *ticket = latest;
                }
                Err(e) => log::warn!("Export status for {} unavailable: {}", ticket.task_id, e),
            }
        }
        for ticket in updates {
            match ticket.state {
                ExportState::Completed => self.output.info(format!(
                    "Export {} finished: {}",
                    ticket.task_id,
                    ticket.destination.as_deref().unwrap_or("(no location given)")
                )),
                _ => self.output.error(format!(
                    "Export {} failed: {}",
                    ticket.task_id,
                    ticket.message.as_deref().unwrap_or("no reason given")
                )),
            }
        }
    }

    /// Tear the panel down. Later events on this panel are ignored.
    pub fn close(&mut self, map: &mut dyn MapHost) {
        if self.is_closed() {
            return;
        }
        map.remove_control(self.control);
        map.clear_legend();
        self.state = PanelState::default();
        self.sites.clear();
        self.registry.clear();
        self.exports.clear();
        self.output.clear();
        self.visibility.close();
        log::info!("Closed {} panel", self.spec.title);
    }

    pub fn pointer_entered(&mut self) {
        self.visibility.pointer_entered();
    }

    pub fn pointer_left(&mut self) {
        self.visibility.pointer_left();
    }

    pub fn toggle_pinned(&mut self) {
        self.visibility.toggle_pinned();
    }

    pub fn is_expanded(&self) -> bool {
        self.visibility.is_expanded()
    }

    pub fn visibility(&self) -> &HoverVisibility {
        &self.visibility
    }

    pub fn phase(&self) -> PanelPhase {
        self.state.phase
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn params(&self) -> &ParamValues {
        &self.state.params
    }

    pub fn spec(&self) -> &PanelSpec {
        &self.spec
    }

    pub fn kind(&self) -> ProductKind {
        self.strategy.kind()
    }

    pub fn control_id(&self) -> ControlId {
        self.control
    }

    pub fn network_names(&self) -> Vec<&str> {
        self.session.catalog.network_names()
    }

    pub fn site_names(&self) -> Vec<&str> {
        self.sites.names()
    }

    pub fn registry(&self) -> &RasterRegistry {
        &self.registry
    }

    pub fn exports(&self) -> &[ExportTicket] {
        &self.exports
    }

    pub fn output(&self) -> &OutputLog {
        &self.output
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::catalog::{Catalog, Network};
    use crate::config::ToolbarConfig;
    use crate::geometry::{BoundingBox, SiteBoundary};
    use crate::memory::{InMemoryDirectory, RecordingCompute, RecordingMap};
    use crate::panel::output::OutputLevel;

    struct Fixture {
        compute: Rc<RecordingCompute>,
        map: RecordingMap,
        panel: PanelController,
    }

    fn square(x: f64, y: f64) -> SiteBoundary {
        SiteBoundary::from_bbox(&BoundingBox::new(x, y, x + 0.5, y + 0.5))
    }

    fn fixture(kind: ProductKind) -> Fixture {
        let spain = Network::new("net-es", "Spain");
        let italy = Network::new("net-it", "Italy");
        let directory = InMemoryDirectory::new()
            .with_site(&spain.id, "es-1", "Doñana - Spain", square(-6.5, 36.8))
            .with_site(&spain.id, "es-2", "Sierra Nevada - Spain", square(-3.5, 37.0))
            .with_site(&spain.id, "es-3", "Unmapped - Spain", SiteBoundary::empty())
            .with_site(&italy.id, "it-1", "Gran Paradiso National Park - Italy", square(7.2, 45.5));
        let compute = Rc::new(RecordingCompute::new());
        let mut config = ToolbarConfig::default();
        config.show_featured_sites = false;
        let session = Session::new(
            Rc::new(directory),
            compute.clone(),
            config,
            Catalog::with_networks(vec![spain, italy]),
        );
        let mut map = RecordingMap::new();
        let panel = session.open_panel(kind, &mut map);
        Fixture { compute, map, panel }
    }

    fn at_donana(kind: ProductKind) -> Fixture {
        let mut f = fixture(kind);
        f.panel.select_network("Spain");
        f.panel.select_site(&mut f.map, "Doñana");
        f
    }

    #[test]
    fn test_open_adds_control_and_starts_expanded() {
        let f = fixture(ProductKind::Phenology);
        assert!(f.map.has_control(f.panel.control_id()));
        assert!(f.panel.is_expanded());
        assert_eq!(f.panel.phase(), PanelPhase::Idle);
    }

    #[test]
    fn test_select_network_lists_only_its_mapped_sites() {
        let mut f = fixture(ProductKind::Phenology);
        f.panel.select_network("Spain");
        assert_eq!(f.panel.site_names(), vec!["Doñana", "Sierra Nevada"]);
        assert_eq!(f.panel.phase(), PanelPhase::NetworkChosen);

        f.panel.select_site(&mut f.map, "Doñana");
        f.panel.select_network("Italy");
        assert_eq!(f.panel.site_names(), vec!["Gran Paradiso National Park"]);
        assert!(f.panel.state().site.is_none());
        assert_eq!(f.panel.phase(), PanelPhase::NetworkChosen);
    }

    #[test]
    fn test_failed_network_lookup_leaves_empty_list() {
        let mut f = fixture(ProductKind::Phenology);
        f.panel.select_network("Spain");
        f.panel.select_site(&mut f.map, "Doñana");

        let broken = Network::new("net-xx", "Nowhere");
        let mut catalog = (*f.panel.session().catalog).clone();
        catalog.networks.push(broken);
        let session = Session {
            catalog: Rc::new(catalog),
            ..f.panel.session().clone()
        };
        let mut panel = PanelController::open(
            session,
            crate::products::strategy_for(ProductKind::Phenology),
            &mut f.map,
        );
        panel.select_network("Spain");
        panel.select_network("Nowhere");
        assert!(panel.site_names().is_empty());
        assert!(panel.state().site.is_none());
        assert!(panel.output().has_errors());
    }

    #[test]
    fn test_failed_site_lookups_are_reported() {
        let spain = Network::new("net-es", "Spain");
        let directory = InMemoryDirectory::new()
            .with_site(&spain.id, "es-1", "Doñana - Spain", square(-6.5, 36.8))
            .with_site(&spain.id, "es-2", "Unmapped - Spain", SiteBoundary::empty())
            .with_broken_site(&spain.id, "es-3")
            .with_broken_site(&spain.id, "es-4");
        let mut config = ToolbarConfig::default();
        config.show_featured_sites = false;
        let session = Session::new(
            Rc::new(directory),
            Rc::new(RecordingCompute::new()),
            config,
            Catalog::with_networks(vec![spain]),
        );
        let mut map = RecordingMap::new();
        let mut panel = session.open_panel(ProductKind::Phenology, &mut map);

        panel.select_network("Spain");
        assert_eq!(panel.site_names(), vec!["Doñana"]);
        let lines = panel.output().lines();
        assert_eq!(lines[0].text, "Spain: 1 sites");
        assert_eq!(lines[1].level, OutputLevel::Warning);
        assert_eq!(lines[1].text, "2 sites could not be loaded");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_select_site_centers_map_and_adds_composite() {
        let f = at_donana(ProductKind::Phenology);
        let center = f.map.last_center().unwrap();
        assert!(center.contains(-6.25, 37.05));
        assert!(f.map.has_layer(COMPOSITE_LAYER));
        assert_eq!(f.compute.build_calls(), 1);
        assert_eq!(f.panel.phase(), PanelPhase::SiteChosen);
    }

    #[test]
    fn test_composite_flag_off_skips_compute() {
        let mut f = fixture(ProductKind::Phenology);
        f.panel.set_param(&mut f.map, COMPOSITE_KEY, ParamValue::Flag(false));
        f.panel.select_network("Spain");
        f.panel.select_site(&mut f.map, "Doñana");
        assert_eq!(f.compute.build_calls(), 0);
        assert!(!f.map.has_layer(COMPOSITE_LAYER));
    }

    #[test]
    fn test_apply_without_site_never_calls_compute() {
        let mut f = fixture(ProductKind::Phenology);
        f.panel.select_network("Spain");
        assert_eq!(f.panel.apply(&mut f.map), None);
        assert_eq!(f.compute.build_calls(), 0);
        let last = f.panel.output().last().unwrap();
        assert_eq!(last.level, OutputLevel::Error);
        assert_eq!(last.text, "Please select an eLTER site first");
        assert_eq!(f.panel.phase(), PanelPhase::NetworkChosen);
    }

    #[test]
    fn test_apply_builds_once_and_registers() {
        let mut f = at_donana(ProductKind::Phenology);
        f.panel.set_param(&mut f.map, "year", ParamValue::Int(2020));
        assert_eq!(f.panel.phase(), PanelPhase::ParametersSet);
        let before = f.compute.build_calls();

        let name = f.panel.apply(&mut f.map);
        assert_eq!(name.as_deref(), Some("SOS Doy 2020"));
        assert_eq!(f.compute.build_calls(), before + 1);
        assert_eq!(f.panel.registry().names(), vec!["SOS Doy 2020"]);
        assert!(f.map.has_layer("SOS Doy 2020"));
        assert_eq!(f.panel.phase(), PanelPhase::Applied);
        assert_eq!(
            f.panel.output().last().unwrap().text,
            "The raster has been added to the map."
        );
    }

    #[test]
    fn test_reapply_same_name_replaces_entry() {
        let mut f = at_donana(ProductKind::Phenology);
        f.panel.apply(&mut f.map);
        f.panel.set_param(&mut f.map, "metric", ParamValue::text("EOS"));
        f.panel.apply(&mut f.map);
        f.panel.set_param(&mut f.map, "metric", ParamValue::text("SOS"));
        f.panel.apply(&mut f.map);
        assert_eq!(f.panel.registry().names(), vec!["SOS Doy 2017", "EOS Doy 2017"]);
        assert_eq!(f.map.layer_names().iter().filter(|n| **n == "SOS Doy 2017").count(), 1);
    }

    #[test]
    fn test_validation_error_skips_compute() {
        let mut f = at_donana(ProductKind::Phenology);
        f.panel.set_param(&mut f.map, "year", ParamValue::Int(2010));
        let before = f.compute.build_calls();
        assert_eq!(f.panel.apply(&mut f.map), None);
        assert_eq!(f.compute.build_calls(), before);
        assert!(f.panel.output().last().unwrap().text.contains("only available since 2017"));
    }

    fn water_at_donana() -> Fixture {
        let mut f = at_donana(ProductKind::Water);
        f.panel.set_param_text(&mut f.map, "start_date", "2021-03-01");
        f.panel.set_param_text(&mut f.map, "end_date", "2021-06-30");
        f
    }

    #[test]
    fn test_water_apply_adds_hidden_context_layers() {
        let mut f = water_at_donana();
        let before = f.compute.build_calls();

        let name = f.panel.apply(&mut f.map).unwrap();
        assert_eq!(name, "MNDWI Sentinel 2 Median");
        assert_eq!(f.compute.build_calls(), before + 1);
        assert_eq!(f.panel.registry().names(), vec!["MNDWI Sentinel 2 Median"]);

        assert!(f.map.layer(&name).unwrap().visible);
        for companion in ["Composite RGB", "Composite Indexes"] {
            let layer = f.map.layer(companion).unwrap();
            assert!(!layer.visible);
            assert!(layer.tiles.url_template.contains("/context/"));
        }
    }

    #[test]
    fn test_missing_context_raster_only_warns() {
        let mut f = water_at_donana();
        f.compute.set_context_missing(true);

        assert!(f.panel.apply(&mut f.map).is_some());
        assert_eq!(f.panel.phase(), PanelPhase::Applied);
        assert!(!f.map.has_layer("Composite RGB"));
        assert!(!f.panel.output().has_errors());
        let warnings = f
            .panel
            .output()
            .lines()
            .iter()
            .filter(|l| l.level == OutputLevel::Warning && l.text.starts_with("Composite"))
            .count();
        assert_eq!(warnings, 2);
    }

    #[test]
    fn test_compute_failure_returns_to_parameters_set() {
        let mut f = at_donana(ProductKind::Phenology);
        f.panel.apply(&mut f.map);
        assert_eq!(f.panel.phase(), PanelPhase::Applied);

        f.compute.fail_next("quota exceeded");
        assert_eq!(f.panel.apply(&mut f.map), None);
        assert_eq!(f.panel.phase(), PanelPhase::ParametersSet);
        assert!(f.panel.output().last().unwrap().text.contains("quota exceeded"));
        assert_eq!(f.panel.registry().len(), 1);
    }

    #[test]
    fn test_invalid_param_is_rejected() {
        let mut f = at_donana(ProductKind::Phenology);
        f.panel.set_param(&mut f.map, "year", ParamValue::Int(1999));
        assert_eq!(f.panel.params().int("year"), Some(2017));
        assert!(f.panel.output().has_errors());
        assert_eq!(f.panel.phase(), PanelPhase::SiteChosen);
    }

    #[test]
    fn test_malformed_text_falls_back_with_warning() {
        let mut f = at_donana(ProductKind::Water);
        f.panel.set_param_text(&mut f.map, "clouds", "lots");
        assert_eq!(f.panel.params().int("clouds"), Some(10));
        assert_eq!(f.panel.output().last().unwrap().level, OutputLevel::Warning);

        f.panel.set_param_text(&mut f.map, "start_date", "2021-03-01");
        assert_eq!(f.panel.params().date("start_date"), NaiveDate::from_ymd_opt(2021, 3, 1));
    }

    #[test]
    fn test_legend_flag_shows_and_clears_legend() {
        let mut f = at_donana(ProductKind::Phenology);
        f.panel.set_param(&mut f.map, LEGEND_KEY, ParamValue::Flag(true));
        assert_eq!(f.map.legend().unwrap().title, "Month");

        f.panel.set_param(&mut f.map, "value", ParamValue::text("Value"));
        assert_eq!(f.map.legend().unwrap().title, "NDVI");

        f.panel.set_param(&mut f.map, LEGEND_KEY, ParamValue::Flag(false));
        assert!(f.map.legend().is_none());
    }

    #[test]
    fn test_reset_clears_output_keeps_registry() {
        let mut f = at_donana(ProductKind::Phenology);
        f.panel.apply(&mut f.map);
        f.panel.reset();
        assert!(f.panel.output().is_empty());
        assert_eq!(f.panel.phase(), PanelPhase::ParametersSet);
        assert_eq!(f.panel.registry().len(), 1);
    }

    #[test]
    fn test_export_forwards_epsg_and_region() {
        let mut f = at_donana(ProductKind::Phenology);
        f.panel.apply(&mut f.map);
        let ticket = f
            .panel
            .export(&ExportOptions {
                raster: Some("SOS Doy 2017".to_string()),
                scale: "30".to_string(),
                crs: "25830".to_string(),
                file_name: "donana_sos".to_string(),
            })
            .unwrap();
        assert_eq!(ticket.state, ExportState::Queued);

        let request = f.compute.last_export().unwrap();
        assert_eq!(request.crs, "EPSG:25830");
        assert_eq!(request.scale, 30.0);
        assert_eq!(request.file_name, "donana_sos");
        assert_eq!(request.region, f.panel.registry().entries()[0].region);
    }

    #[test]
    fn test_export_malformed_crs_uses_default_with_warning() {
        let mut f = at_donana(ProductKind::Phenology);
        f.panel.apply(&mut f.map);
        f.panel.export(&ExportOptions {
            raster: Some("SOS Doy 2017".to_string()),
            scale: "abc".to_string(),
            crs: "43x6".to_string(),
            file_name: String::new(),
        });
        let request = f.compute.last_export().unwrap();
        assert_eq!(request.crs, "EPSG:4326");
        assert_eq!(request.scale, 30.0);
        assert_eq!(request.file_name, "SOS Doy 2017");
        let warnings = f
            .panel
            .output()
            .lines()
            .iter()
            .filter(|l| l.level == OutputLevel::Warning)
            .count();
        assert_eq!(warnings, 2);
    }

    #[test]
    fn test_export_unknown_raster() {
        let mut f = at_donana(ProductKind::Phenology);
        let ticket = f.panel.export(&ExportOptions {
            raster: Some("nothing".to_string()),
            scale: "30".to_string(),
            crs: "4326".to_string(),
            file_name: String::new(),
        });
        assert!(ticket.is_none());
        assert!(f.compute.last_export().is_none());
    }

    #[test]
    fn test_refresh_exports_reports_completion() {
        let mut f = at_donana(ProductKind::Phenology);
        f.panel.apply(&mut f.map);
        let ticket = f
            .panel
            .export(&ExportOptions {
                raster: Some("SOS Doy 2017".to_string()),
                scale: "30".to_string(),
                crs: "4326".to_string(),
                file_name: "out".to_string(),
            })
            .unwrap();
        f.compute.complete_export(&ticket.task_id, "https://downloads.example.org/out.tif");
        f.panel.refresh_exports();
        assert!(f.panel.exports()[0].state.is_finished());
        assert!(f.panel.output().last().unwrap().text.contains("out.tif"));
    }

    #[test]
    fn test_close_clears_everything_and_ignores_later_events() {
        let mut f = at_donana(ProductKind::Phenology);
        f.panel.set_param(&mut f.map, LEGEND_KEY, ParamValue::Flag(true));
        f.panel.apply(&mut f.map);
        let control = f.panel.control_id();

        f.panel.close(&mut f.map);
        assert!(!f.map.has_control(control));
        assert!(f.map.legend().is_none());
        assert_eq!(f.panel.phase(), PanelPhase::Idle);
        assert!(f.panel.state().site.is_none());
        assert!(f.panel.site_names().is_empty());
        assert!(f.panel.registry().is_empty());
        assert!(f.panel.output().is_empty());
        assert!(!f.panel.is_expanded());

        let calls = f.compute.build_calls();
        f.panel.select_network("Spain");
        f.panel.apply(&mut f.map);
        assert_eq!(f.compute.build_calls(), calls);
        assert!(f.panel.site_names().is_empty());
    }

    #[test]
    fn test_parse_epsg() {
        assert_eq!(parse_epsg("4326"), Some(4326));
        assert_eq!(parse_epsg(" EPSG:3035 "), Some(3035));
        assert_eq!(parse_epsg("epsg:25830"), Some(25830));
        assert_eq!(parse_epsg("43x6"), None);
        assert_eq!(parse_epsg(""), None);
        assert_eq!(parse_epsg("0"), None);
    }
}
