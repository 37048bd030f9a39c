//! # Toolbar Configuration
//!
//! Service endpoints and defaults, stored as JSON (`elter.json` by default).
//! A missing file means defaults. Three environment variables override the
//! file so credentials need not be written to disk:
//!
//! | Variable              | Field          |
//! |-----------------------|----------------|
//! | `ELTER_DEIMS_URL`     | `deims_url`    |
//! | `ELTER_COMPUTE_URL`   | `compute_url`  |
//! | `ELTER_COMPUTE_TOKEN` | `compute_token`|
//!
//! ## Example
//!
//! ```rust
//! use elter_core::config::ToolbarConfig;
//!
//! let mut config = ToolbarConfig::default();
//! config.apply_overrides(|var| match var {
//!     "ELTER_COMPUTE_URL" => Some("https://compute.example.org".to_string()),
//!     _ => None,
//! });
//! assert_eq!(config.compute_url, "https://compute.example.org");
//! assert_eq!(config.deims_url, "https://deims.org");
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::FeaturedSite;
use crate::errors::ToolbarResult;
use crate::file_io;

/// Current config schema version
pub const CONFIG_SCHEMA_VERSION: &str = "0.1.0";

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "elter.json";

/// Export form defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDefaults {
    /// Pixel size in metres
    pub scale: f64,
    /// EPSG code, as typed in the form
    pub crs: String,
}

impl Default for ExportDefaults {
    fn default() -> Self {
        ExportDefaults {
            scale: 30.0,
            crs: "4326".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolbarConfig {
    pub version: String,
    pub deims_url: String,
    pub compute_url: String,
    /// Bearer token for the compute service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute_token: Option<String>,
    pub timeout_secs: u64,
    /// Where feedback records and uploaded CSVs are written
    pub data_dir: PathBuf,
    pub export: ExportDefaults,
    /// Outline the featured sites when a panel opens
    pub show_featured_sites: bool,
    /// Replaces the built-in featured site table when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_sites: Option<Vec<FeaturedSite>>,
    /// Folder holding the precomputed Sentinel-2 phenology assets
    pub phenology_asset_root: String,
}

impl Default for ToolbarConfig {
    fn default() -> Self {
        ToolbarConfig {
            version: CONFIG_SCHEMA_VERSION.to_string(),
            deims_url: "https://deims.org".to_string(),
            compute_url: "http://localhost:8085".to_string(),
            compute_token: None,
            timeout_secs: 60,
            data_dir: PathBuf::from("."),
            export: ExportDefaults::default(),
            show_featured_sites: true,
            featured_sites: None,
            phenology_asset_root: "projects/ee-digdgeografo/assets/".to_string(),
        }
    }
}

impl ToolbarConfig {
    /// Load from `path`, falling back to defaults when the file does not
    /// exist, then apply environment overrides.
    pub fn load(path: &Path) -> ToolbarResult<Self> {
        let mut config = if path.exists() {
            let config: ToolbarConfig = file_io::load_json(path)?;
            file_io::validate_version(&config.version, CONFIG_SCHEMA_VERSION)?;
            log::info!("Loaded config from {}", path.display());
            config
        } else {
            log::info!("No config at {}, using defaults", path.display());
            ToolbarConfig::default()
        };
        config.apply_overrides(|var| std::env::var(var).ok());
        Ok(config)
    }

    /// Write atomically (tmp file, fsync, rename)
    pub fn save(&self, path: &Path) -> ToolbarResult<()> {
        file_io::save_json(self, path)
    }

    /// Apply `ELTER_*` overrides from `lookup`; blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("ELTER_DEIMS_URL") {
            log::debug!("DEIMS URL overridden by environment");
            self.deims_url = url;
        }
        if let Some(url) = get("ELTER_COMPUTE_URL") {
            log::debug!("Compute URL overridden by environment");
            self.compute_url = url;
        }
        if let Some(token) = get("ELTER_COMPUTE_TOKEN") {
            self.compute_token = Some(token);
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;

    #[test]
    fn test_defaults() {
        let config = ToolbarConfig::default();
        assert_eq!(config.export.scale, 30.0);
        assert_eq!(config.export.crs, "4326");
        assert!(config.show_featured_sites);
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = temp_dir().join("elter_config_does_not_exist.json");
        let config = ToolbarConfig::load(&path).unwrap();
        assert_eq!(config.version, CONFIG_SCHEMA_VERSION);
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_dir().join(format!("elter_config_{}.json", std::process::id()));
        let mut config = ToolbarConfig::default();
        config.timeout_secs = 5;
        config.show_featured_sites = false;
        config.save(&path).unwrap();

        let loaded: ToolbarConfig = file_io::load_json(&path).unwrap();
        assert_eq!(loaded.timeout_secs, 5);
        assert!(!loaded.show_featured_sites);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let path = temp_dir().join(format!("elter_config_future_{}.json", std::process::id()));
        std::fs::write(&path, r#"{"version": "0.9.0"}"#).unwrap();
        let err = ToolbarConfig::load(&path).unwrap_err();
        assert_eq!(err.error_code(), "VERSION_MISMATCH");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let mut config = ToolbarConfig::default();
        config.apply_overrides(|var| match var {
            "ELTER_DEIMS_URL" => Some("  ".to_string()),
            "ELTER_COMPUTE_TOKEN" => Some("secret".to_string()),
            _ => None,
        });
        assert_eq!(config.deims_url, "https://deims.org");
        assert_eq!(config.compute_token.as_deref(), Some("secret"));
    }
}
