//! # DEIMS-SDR Client
//!
//! [`SiteDirectory`] backed by the DEIMS-SDR REST API and its GeoServer:
//! - `GET {base}/api/sites?network={id}` lists the sites of a network
//! - `GET {base}/api/sites/{id}` gives the site record (title)
//! - the `deims:deims_sites_boundaries` WFS layer gives the boundary
//!
//! ## Example
//!
//! ```rust,no_run
//! use elter_core::catalog::NetworkId;
//! use elter_core::config::ToolbarConfig;
//! use elter_core::deims::DeimsClient;
//! use elter_core::sites::SiteDirectory;
//!
//! let deims = DeimsClient::from_config(&ToolbarConfig::default()).unwrap();
//! let ids = deims.list_sites(&NetworkId::new("2b70f1fb-f7d9-4615-a1a3-33fc6fa44600")).unwrap();
//! println!("{} Spanish sites", ids.len());
//! ```

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::catalog::NetworkId;
use crate::config::ToolbarConfig;
use crate::errors::{ToolbarError, ToolbarResult};
use crate::geometry::SiteBoundary;
use crate::sites::{SiteDirectory, SiteId, SiteRecord};

const SERVICE: &str = "DEIMS";

/// Prefix DEIMS uses for site identifiers in the WFS `deimsid` column
const SITE_URI_PREFIX: &str = "https://deims.org/";

pub struct DeimsClient {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SiteListItem {
    id: SiteListId,
}

#[derive(Debug, Deserialize)]
struct SiteListId {
    suffix: String,
}

#[derive(Debug, Deserialize)]
struct SiteDetail {
    title: String,
}

impl DeimsClient {
    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> ToolbarResult<Self> {
        let http = Client::builder()
            .user_agent(format!("elter-toolbar/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ToolbarError::service(SERVICE, format!("Failed to create HTTP client: {}", e)))?;
        Ok(DeimsClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ToolbarConfig) -> ToolbarResult<Self> {
        Self::new(config.deims_url.clone(), config.timeout())
    }

    fn get_text(&self, url: &str, query: &[(&str, String)]) -> ToolbarResult<String> {
        log::debug!("GET {} {:?}", url, query);
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .map_err(|e| ToolbarError::service(SERVICE, e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ToolbarError::not_found("DEIMS resource", url));
        }
        if !status.is_success() {
            return Err(ToolbarError::rejected(
                SERVICE,
                status.as_u16(),
                status.canonical_reason().unwrap_or("request failed"),
            ));
        }
        response
            .text()
            .map_err(|e| ToolbarError::service(SERVICE, e.to_string()))
    }

    fn boundary(&self, site: &SiteId) -> ToolbarResult<SiteBoundary> {
        let url = format!("{}/geoserver/deims/ows", self.base_url);
        let query = boundary_query(site);
        let body = self.get_text(&url, &query)?;
        SiteBoundary::from_geojson_str(&body)
    }
}

fn boundary_query(site: &SiteId) -> Vec<(&'static str, String)> {
    vec![
        ("service", "WFS".to_string()),
        ("version", "2.0.0".to_string()),
        ("request", "GetFeature".to_string()),
        ("typeName", "deims:deims_sites_boundaries".to_string()),
        ("outputFormat", "application/json".to_string()),
        ("CQL_FILTER", format!("deimsid='{}{}'", SITE_URI_PREFIX, site)),
    ]
}

fn parse_site_list(body: &str) -> ToolbarResult<Vec<SiteId>> {
    let items: Vec<SiteListItem> = serde_json::from_str(body)
        .map_err(|e| ToolbarError::serialization(format!("Invalid DEIMS site list: {}", e)))?;
    Ok(items.into_iter().map(|item| SiteId::new(item.id.suffix)).collect())
}

impl SiteDirectory for DeimsClient {
    fn list_sites(&self, network: &NetworkId) -> ToolbarResult<Vec<SiteId>> {
        let url = format!("{}/api/sites", self.base_url);
        let body = self.get_text(&url, &[("network", network.to_string())])?;
        parse_site_list(&body)
    }

    fn get_site(&self, site: &SiteId) -> ToolbarResult<SiteRecord> {
        let url = format!("{}/api/sites/{}", self.base_url, site);
        let body = self.get_text(&url, &[])?;
        let detail: SiteDetail = serde_json::from_str(&body)
            .map_err(|e| ToolbarError::serialization(format!("Invalid DEIMS site record: {}", e)))?;

        // An unmapped site is an empty feature collection, not an error
        let boundary = self.boundary(site)?;
        if boundary.is_empty() {
            log::debug!("{} ({}) has no boundary", detail.title, site);
        }

        Ok(SiteRecord {
            title: detail.title,
            boundary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_site_list() {
        let body = r#"[
            {"title": "Doñana LTSER - Spain", "id": {"prefix": "https://deims.org/", "suffix": "bcbc866c-3f4f-47a8-bbbc-0a93df6de7b2"}, "changed": "2023-01-01"},
            {"title": "Sierra Nevada - Spain", "id": {"prefix": "https://deims.org/", "suffix": "e1f9a7b0-0000-4000-8000-000000000001"}}
        ]"#;
        let ids = parse_site_list(body).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].as_str(), "bcbc866c-3f4f-47a8-bbbc-0a93df6de7b2");
    }

    #[test]
    fn test_parse_site_list_rejects_garbage() {
        assert_eq!(
            parse_site_list("<html>").unwrap_err().error_code(),
            "SERIALIZATION_ERROR"
        );
    }

    #[test]
    fn test_boundary_filter_uses_site_uri() {
        let query = boundary_query(&SiteId::new("abc"));
        let filter = query.iter().find(|(k, _)| *k == "CQL_FILTER").unwrap();
        assert_eq!(filter.1, "deimsid='https://deims.org/abc'");
    }
}
