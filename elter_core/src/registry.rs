//! Rasters produced in a panel, keyed by their display name, in the order
//! they were first applied. The export tab lists them from here.

use serde::{Deserialize, Serialize};

use crate::compute::RasterHandle;
use crate::errors::{ToolbarError, ToolbarResult};
use crate::geometry::SiteBoundary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub name: String,
    pub handle: RasterHandle,
    /// Region the raster was clipped to, reused as export region
    pub region: SiteBoundary,
}

#[derive(Debug, Clone, Default)]
pub struct RasterRegistry {
    entries: Vec<RegistryEntry>,
}

impl RasterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, or replace in place if `name` is already registered.
    /// Returns true when an existing entry was replaced.
    pub fn insert(&mut self, name: impl Into<String>, handle: RasterHandle, region: SiteBoundary) -> bool {
        let entry = RegistryEntry {
            name: name.into(),
            handle,
            region,
        };
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => {
                *existing = entry;
                true
            }
            None => {
                self.entries.push(entry);
                false
            }
        }
    }

    pub fn get(&self, name: &str) -> ToolbarResult<&RegistryEntry> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| ToolbarError::not_found("Raster", name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
