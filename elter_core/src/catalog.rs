//! # Reference Catalog
//!
//! Read-only reference data shipped with the toolbar: the national eLTER
//! networks known to DEIMS, the featured sites drawn when a panel opens, and
//! the table mapping DEIMS site names to the keys used in the precomputed
//! Sentinel-2 phenology assets.
//!
//! The catalog is embedded from `assets/catalog.json` at compile time and
//! parsed once.
//!
//! ## Example
//!
//! ```rust
//! use elter_core::catalog::Catalog;
//!
//! let catalog = Catalog::builtin().unwrap();
//! let spain = catalog.network_by_name("Spain").unwrap();
//! assert_eq!(spain.id.as_str(), "2b70f1fb-f7d9-4615-a1a3-33fc6fa44600");
//! ```

use once_cell::sync::Lazy;
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};

use crate::errors::{ToolbarError, ToolbarResult};
use crate::sites::SiteId;

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Assets;

static BUILTIN: Lazy<ToolbarResult<Catalog>> = Lazy::new(|| {
    let file = Assets::get("catalog.json")
        .ok_or_else(|| ToolbarError::not_found("Embedded asset", "catalog.json"))?;
    let catalog: Catalog = serde_json::from_slice(&file.data)
        .map_err(|e| ToolbarError::serialization(format!("Invalid catalog.json: {}", e)))?;
    log::debug!(
        "Loaded built-in catalog: {} networks, {} featured sites",
        catalog.networks.len(),
        catalog.featured_sites.len()
    );
    Ok(catalog)
});

/// DEIMS identifier of a national network
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(String);

impl NetworkId {
    pub fn new(id: impl Into<String>) -> Self {
        NetworkId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NetworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A national eLTER network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: NetworkId,
    pub name: String,
}

impl Network {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Network {
            id: NetworkId::new(id),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A site outlined on the map when a panel opens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturedSite {
    /// Short key, used as the outline layer name
    pub key: String,
    pub id: SiteId,
}

/// DEIMS site name -> phenology asset key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhenologyAsset {
    pub site: String,
    pub key: String,
}

/// Reference data container
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub networks: Vec<Network>,
    #[serde(default)]
    pub featured_sites: Vec<FeaturedSite>,
    #[serde(default)]
    pub phenology_assets: Vec<PhenologyAsset>,
}

impl Catalog {
    /// The catalog embedded in the binary
    pub fn builtin() -> ToolbarResult<Catalog> {
        BUILTIN.clone()
    }

    /// Catalog with only the given networks, mostly for tests and dry runs
    pub fn with_networks(networks: Vec<Network>) -> Catalog {
        Catalog {
            networks,
            ..Default::default()
        }
    }

    pub fn network_names(&self) -> Vec<&str> {
        self.networks.iter().map(|n| n.name.as_str()).collect()
    }

    /// Look up a network by display name (case-insensitive)
    pub fn network_by_name(&self, name: &str) -> ToolbarResult<&Network> {
        self.networks
            .iter()
            .find(|n| n.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| ToolbarError::not_found("Network", name))
    }

    /// Key of the precomputed phenology asset for a site.
    ///
    /// Sites without an entry use their own name as key.
    pub fn phenology_asset_key<'a>(&'a self, site_name: &'a str) -> &'a str {
        self.phenology_assets
            .iter()
            .find(|a| a.site == site_name)
            .map(|a| a.key.as_str())
            .unwrap_or(site_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.networks.len(), 21);
        assert_eq!(catalog.featured_sites.len(), 9);
        assert_eq!(catalog.network_names()[0], "Austria");
    }

    #[test]
    fn test_network_lookup_is_case_insensitive() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.network_by_name("spain").unwrap().name, "Spain");
        assert!(catalog.network_by_name("Atlantis").is_err());
    }

    #[test]
    fn test_phenology_asset_key() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(
            catalog.phenology_asset_key("Doñana Long-Term Socio-ecological Research Platform"),
            "Donana"
        );
        assert_eq!(catalog.phenology_asset_key("Unlisted Site"), "Unlisted Site");
    }
}
