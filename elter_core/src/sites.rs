//! # Sites and the Site Directory
//!
//! - [`SiteDirectory`] - the metadata service seam (DEIMS in production,
//!   [`crate::memory::InMemoryDirectory`] in tests and dry runs)
//! - [`SiteCache`] - the per-panel mapping from site display name to site,
//!   valid for exactly one network at a time

use serde::{Deserialize, Serialize};

use crate::catalog::NetworkId;
use crate::errors::{ToolbarError, ToolbarResult};
use crate::geometry::SiteBoundary;

/// DEIMS site identifier (the UUID suffix of `https://deims.org/<id>`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(String);

impl SiteId {
    pub fn new(id: impl Into<String>) -> Self {
        SiteId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SiteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the directory returns for one site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub title: String,
    pub boundary: SiteBoundary,
}

/// A site as shown in the site dropdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    /// Display name, the title up to the first `" - "`
    pub name: String,
    pub title: String,
    pub boundary: SiteBoundary,
}

impl Site {
    pub fn from_record(id: SiteId, record: SiteRecord) -> Self {
        Site {
            id,
            name: short_name(&record.title).to_string(),
            title: record.title,
            boundary: record.boundary,
        }
    }
}

/// DEIMS titles look like `"Doñana LTSER Platform - Spain"`; the dropdown
/// shows the part before the first separator.
pub fn short_name(title: &str) -> &str {
    title.split(" - ").next().unwrap_or(title).trim()
}

/// Biodiversity-site metadata service.
pub trait SiteDirectory {
    /// Ids of every site registered under a network
    fn list_sites(&self, network: &NetworkId) -> ToolbarResult<Vec<SiteId>>;

    /// Title and boundary of one site. Unmapped sites come back with an
    /// empty boundary rather than an error.
    fn get_site(&self, site: &SiteId) -> ToolbarResult<SiteRecord>;
}

/// Sites of the currently selected network, in directory order.
#[derive(Debug, Clone, Default)]
pub struct SiteCache {
    network: Option<NetworkId>,
    sites: Vec<Site>,
    /// Sites listed for the network whose lookup failed
    failed: Vec<SiteId>,
}

impl SiteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch every site of `network` and build a fresh cache.
    ///
    /// Sites with an empty boundary are skipped silently. Sites whose lookup
    /// fails are skipped too but remembered, see [`SiteCache::failed`]. A
    /// failed listing is returned as an error and nothing is built.
    /// Duplicate display names keep the first site.
    pub fn fetch(directory: &dyn SiteDirectory, network: &NetworkId) -> ToolbarResult<SiteCache> {
        let ids = directory.list_sites(network)?;
        log::info!("Network {} lists {} sites", network, ids.len());

        let mut sites: Vec<Site> = Vec::with_capacity(ids.len());
        let mut failed = Vec::new();
        for id in ids {
            let record = match directory.get_site(&id) {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("Skipping site {}: {}", id, e);
                    failed.push(id);
                    continue;
                }
            };
            if record.boundary.is_empty() {
                log::debug!("Skipping site {} ({}): no boundary", id, record.title);
                continue;
            }
            let site = Site::from_record(id, record);
            if sites.iter().any(|s| s.name == site.name) {
                log::warn!("Duplicate site name '{}' in network {}", site.name, network);
                continue;
            }
            sites.push(site);
        }

        Ok(SiteCache {
            network: Some(network.clone()),
            sites,
            failed,
        })
    }

    /// Ids whose site lookup failed during [`SiteCache::fetch`]
    pub fn failed(&self) -> &[SiteId] {
        &self.failed
    }

    pub fn network(&self) -> Option<&NetworkId> {
        self.network.as_ref()
    }

    pub fn names(&self) -> Vec<&str> {
        self.sites.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn get(&self, name: &str) -> ToolbarResult<&Site> {
        self.sites
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ToolbarError::not_found("Site", name))
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn clear(&mut self) {
        self.network = None;
        self.sites.clear();
        self.failed.clear();
    }
}
