//! # In-Memory Services
//!
//! Offline stand-ins for the site directory, the compute service and the
//! map. The CLI uses them for `--dry-run`; tests use them to count and
//! inspect calls.
//!
//! ## Example
//!
//! ```rust
//! use elter_core::catalog::NetworkId;
//! use elter_core::geometry::{BoundingBox, SiteBoundary};
//! use elter_core::memory::InMemoryDirectory;
//! use elter_core::sites::{SiteCache, SiteDirectory};
//!
//! let net = NetworkId::new("net-es");
//! let directory = InMemoryDirectory::new().with_site(
//!     &net,
//!     "donana",
//!     "Doñana - Spain",
//!     SiteBoundary::from_bbox(&BoundingBox::new(-6.5, 36.8, -6.2, 37.1)),
//! );
//! let cache = SiteCache::fetch(&directory, &net).unwrap();
//! assert_eq!(cache.names(), vec!["Doñana"]);
//! assert_eq!(directory.site_lookups(), 1);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::catalog::{Catalog, NetworkId};
use crate::compute::{
    ExportRequest, ExportState, ExportTicket, ProductRequest, RasterCompute, RasterHandle, TileSource, VisParams,
};
use crate::errors::{ToolbarError, ToolbarResult};
use crate::geometry::{BoundingBox, SiteBoundary};
use crate::map::{BoundaryStyle, ControlId, ControlSpec, LegendSpec, MapHost, MapLayer};
use crate::sites::{SiteDirectory, SiteId, SiteRecord};

// ============================================================================
// Site directory
// ============================================================================

/// Site directory backed by a map of networks to site records
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    networks: BTreeMap<NetworkId, Vec<SiteId>>,
    sites: HashMap<SiteId, SiteRecord>,
    broken: HashSet<SiteId>,
    lookups: Cell<usize>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_site(mut self, network: &NetworkId, id: &str, title: &str, boundary: SiteBoundary) -> Self {
        let id = SiteId::new(id);
        self.networks.entry(network.clone()).or_default().push(id.clone());
        self.sites.insert(
            id,
            SiteRecord {
                title: title.to_string(),
                boundary,
            },
        );
        self
    }

    /// A site that is listed but whose lookup always fails
    pub fn with_broken_site(mut self, network: &NetworkId, id: &str) -> Self {
        let id = SiteId::new(id);
        self.networks.entry(network.clone()).or_default().push(id.clone());
        self.broken.insert(id);
        self
    }

    /// A square site for every featured site of `catalog`, plus one site per
    /// network so every dropdown has something in it.
    pub fn demo(catalog: &Catalog) -> Self {
        let mut directory = InMemoryDirectory::new();
        for (i, network) in catalog.networks.iter().enumerate() {
            let lon = -10.0 + (i % 7) as f64 * 5.0;
            let lat = 36.0 + (i / 7) as f64 * 6.0;
            let title = format!("{} Demo Site - {}", network.name, network.name);
            let id = format!("demo-{}", network.id);
            directory = directory.with_site(
                &network.id,
                &id,
                &title,
                SiteBoundary::from_bbox(&BoundingBox::new(lon, lat, lon + 0.5, lat + 0.5)),
            );
        }
        for (i, featured) in catalog.featured_sites.iter().enumerate() {
            let lon = -8.0 + i as f64 * 3.0;
            directory.sites.insert(
                featured.id.clone(),
                SiteRecord {
                    title: featured.key.replace('_', " "),
                    boundary: SiteBoundary::from_bbox(&BoundingBox::new(lon, 45.0, lon + 0.4, 45.4)),
                },
            );
        }
        directory
    }

    /// Number of `get_site` calls so far
    pub fn site_lookups(&self) -> usize {
        self.lookups.get()
    }
}

impl SiteDirectory for InMemoryDirectory {
    fn list_sites(&self, network: &NetworkId) -> ToolbarResult<Vec<SiteId>> {
        self.networks
            .get(network)
            .cloned()
            .ok_or_else(|| ToolbarError::not_found("Network", network.as_str()))
    }

    fn get_site(&self, site: &SiteId) -> ToolbarResult<SiteRecord> {
        self.lookups.set(self.lookups.get() + 1);
        if self.broken.contains(site) {
            return Err(ToolbarError::service("DEIMS", format!("site {} timed out", site)));
        }
        self.sites
            .get(site)
            .cloned()
            .ok_or_else(|| ToolbarError::not_found("Site", site.as_str()))
    }
}

// ============================================================================
// Compute service
// ============================================================================

/// Compute service that records every request and hands out numbered
/// handles (`raster-1`, `raster-2`, ...).
#[derive(Debug, Default)]
pub struct RecordingCompute {
    builds: RefCell<Vec<ProductRequest>>,
    renders: RefCell<Vec<(RasterHandle, VisParams)>>,
    exports: RefCell<Vec<ExportRequest>>,
    tasks: RefCell<BTreeMap<String, ExportTicket>>,
    fail_next: RefCell<Option<String>>,
    failing: Cell<bool>,
    no_context: Cell<bool>,
}

impl RecordingCompute {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next call with `reason`
    pub fn fail_next(&self, reason: &str) {
        *self.fail_next.borrow_mut() = Some(reason.to_string());
    }

    /// Fail every call until switched off
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    /// Refuse to render context rasters, as a service without them would
    pub fn set_context_missing(&self, missing: bool) {
        self.no_context.set(missing);
    }

    fn check(&self) -> ToolbarResult<()> {
        if let Some(reason) = self.fail_next.borrow_mut().take() {
            return Err(ToolbarError::service("Compute", reason));
        }
        if self.failing.get() {
            return Err(ToolbarError::service("Compute", "service unavailable"));
        }
        Ok(())
    }

    pub fn build_calls(&self) -> usize {
        self.builds.borrow().len()
    }

    pub fn render_calls(&self) -> usize {
        self.renders.borrow().len()
    }

    pub fn export_calls(&self) -> usize {
        self.exports.borrow().len()
    }

    pub fn last_build(&self) -> Option<ProductRequest> {
        self.builds.borrow().last().cloned()
    }

    pub fn last_export(&self) -> Option<ExportRequest> {
        self.exports.borrow().last().cloned()
    }

    /// Mark a queued export as done
    pub fn complete_export(&self, task_id: &str, destination: &str) {
        if let Some(ticket) = self.tasks.borrow_mut().get_mut(task_id) {
            ticket.state = ExportState::Completed;
            ticket.destination = Some(destination.to_string());
        }
    }

    /// Mark a queued export as failed
    pub fn fail_export(&self, task_id: &str, message: &str) {
        if let Some(ticket) = self.tasks.borrow_mut().get_mut(task_id) {
            ticket.state = ExportState::Failed;
            ticket.message = Some(message.to_string());
        }
    }
}

impl RasterCompute for RecordingCompute {
    fn build_product(&self, request: &ProductRequest) -> ToolbarResult<RasterHandle> {
        self.builds.borrow_mut().push(request.clone());
        self.check()?;
        let n = self.builds.borrow().len();
        Ok(RasterHandle {
            id: format!("raster-{}", n),
            description: format!("{:?}", request.query),
        })
    }

    fn render(&self, handle: &RasterHandle, vis: &VisParams) -> ToolbarResult<TileSource> {
        self.renders.borrow_mut().push((handle.clone(), vis.clone()));
        self.check()?;
        if self.no_context.get() && handle.id.ends_with("/context") {
            return Err(ToolbarError::not_found("Raster", handle.id.as_str()));
        }
        Ok(TileSource {
            url_template: format!("memory://{}/{{z}}/{{x}}/{{y}}", handle.id),
        })
    }

    fn export_raster(&self, request: &ExportRequest) -> ToolbarResult<ExportTicket> {
        self.exports.borrow_mut().push(request.clone());
        self.check()?;
        let ticket = ExportTicket {
            task_id: format!("export-{}", self.exports.borrow().len()),
            state: ExportState::Queued,
            destination: None,
            message: None,
        };
        self.tasks.borrow_mut().insert(ticket.task_id.clone(), ticket.clone());
        Ok(ticket)
    }

    fn export_status(&self, task_id: &str) -> ToolbarResult<ExportTicket> {
        self.tasks
            .borrow()
            .get(task_id)
            .cloned()
            .ok_or_else(|| ToolbarError::not_found("Export task", task_id))
    }
}

// ============================================================================
// Map
// ============================================================================

/// Map that keeps everything it is asked to show
#[derive(Debug, Default)]
pub struct RecordingMap {
    controls: Vec<(ControlId, ControlSpec)>,
    layers: Vec<MapLayer>,
    boundaries: Vec<(String, SiteBoundary, BoundaryStyle)>,
    centers: Vec<BoundingBox>,
    legend: Option<LegendSpec>,
}

impl RecordingMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn controls(&self) -> Vec<&ControlSpec> {
        self.controls.iter().map(|(_, spec)| spec).collect()
    }

    /// Raster layers in drawing order
    pub fn layers(&self) -> &[MapLayer] {
        &self.layers
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name.as_str()).collect()
    }

    pub fn layer(&self, name: &str) -> Option<&MapLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn has_layer(&self, name: &str) -> bool {
        self.layer(name).is_some()
    }

    pub fn boundary_names(&self) -> Vec<&str> {
        self.boundaries.iter().map(|(name, _, _)| name.as_str()).collect()
    }

    pub fn boundary_style(&self, name: &str) -> Option<&BoundaryStyle> {
        self.boundaries.iter().find(|(n, _, _)| n == name).map(|(_, _, style)| style)
    }

    pub fn last_center(&self) -> Option<&BoundingBox> {
        self.centers.last()
    }

    pub fn legend(&self) -> Option<&LegendSpec> {
        self.legend.as_ref()
    }

    fn layer_mut(&mut self, name: &str) -> ToolbarResult<&mut MapLayer> {
        self.layers
            .iter_mut()
            .find(|l| l.name == name)
            .ok_or_else(|| ToolbarError::not_found("Layer", name))
    }
}

impl MapHost for RecordingMap {
    fn add_control(&mut self, spec: ControlSpec) -> ControlId {
        let id = ControlId::new();
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
        self.centers.push(*bbox);
    }

    fn add_layer(&mut self, layer: MapLayer) {
        match self.layers.iter_mut().find(|l| l.name == layer.name) {
            Some(existing) => *existing = layer,
            None => self.layers.push(layer),
        }
    }

    fn add_boundary(&mut self, name: &str, boundary: &SiteBoundary, style: &BoundaryStyle) {
        self.boundaries.retain(|(n, _, _)| n != name);
        self.boundaries
            .push((name.to_string(), boundary.clone(), style.clone()));
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{DateRange, ProductQuery};

    fn request() -> ProductRequest {
        ProductRequest {
            region: SiteBoundary::from_bbox(&BoundingBox::new(0.0, 0.0, 1.0, 1.0)),
            date_range: DateRange::year(2020).unwrap(),
            query: ProductQuery::Asset {
                asset_id: "projects/x/assets/Donana_2020_SOSD".to_string(),
            },
        }
    }

    fn layer(name: &str) -> MapLayer {
        MapLayer::new(
            name,
            TileSource {
                url_template: format!("memory://{}", name),
            },
            VisParams::default(),
        )
    }

    #[test]
    fn test_compute_numbers_handles() {
        let compute = RecordingCompute::new();
        let a = compute.build_product(&request()).unwrap();
        let b = compute.build_product(&request()).unwrap();
        assert_eq!(a.id, "raster-1");
        assert_eq!(b.id, "raster-2");
        assert_eq!(compute.build_calls(), 2);
    }

    #[test]
    fn test_compute_fail_next_only_once() {
        let compute = RecordingCompute::new();
        compute.fail_next("boom");
        let err = compute.build_product(&request()).unwrap_err();
        assert_eq!(err.error_code(), "SERVICE_ERROR");
        assert!(compute.build_product(&request()).is_ok());
    }

    #[test]
    fn test_export_lifecycle() {
        let compute = RecordingCompute::new();
        let handle = compute.build_product(&request()).unwrap();
        let ticket = compute
            .export_raster(&ExportRequest {
                handle,
                region: request().region,
                scale: 30.0,
                crs: "EPSG:4326".to_string(),
                file_name: "out".to_string(),
            })
            .unwrap();
        assert_eq!(compute.export_status(&ticket.task_id).unwrap().state, ExportState::Queued);

        compute.fail_export(&ticket.task_id, "quota");
        let latest = compute.export_status(&ticket.task_id).unwrap();
        assert_eq!(latest.state, ExportState::Failed);
        assert_eq!(latest.message.as_deref(), Some("quota"));
        assert!(compute.export_status("missing").is_err());
    }

    #[test]
    fn test_map_replaces_layers_by_name() {
        let mut map = RecordingMap::new();
        map.add_layer(layer("a"));
        map.add_layer(layer("b"));
        map.add_layer(layer("a"));
        assert_eq!(map.layer_names(), vec!["a", "b"]);

        map.set_layer_opacity("b", 1.7).unwrap();
        assert_eq!(map.layer("b").unwrap().opacity, 1.0);
        assert!(map.set_layer_visibility("c", false).is_err());
    }

    #[test]
    fn test_map_controls() {
        let mut map = RecordingMap::new();
        let id = map.add_control(ControlSpec {
            title: "Phenology".to_string(),
            position: Default::default(),
        });
        assert!(map.has_control(id));
        map.remove_control(id);
        map.remove_control(id);
        assert!(!map.has_control(id));
    }

    #[test]
    fn test_demo_directory_covers_catalog() {
        let catalog = Catalog::builtin().unwrap();
        let directory = InMemoryDirectory::demo(&catalog);
        for network in &catalog.networks {
            assert_eq!(directory.list_sites(&network.id).unwrap().len(), 1);
        }
        let featured = &catalog.featured_sites[0];
        assert!(!directory.get_site(&featured.id).unwrap().boundary.is_empty());
    }
}
