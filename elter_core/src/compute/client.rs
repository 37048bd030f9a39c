//! HTTP client for the raster compute service.
//!
//! JSON over HTTP with an optional bearer token:
//! - `POST {base}/v1/products` - [`ProductRequest`] -> [`RasterHandle`]
//! - `POST {base}/v1/tiles` - handle + [`VisParams`] -> [`TileSource`]
//! - `POST {base}/v1/exports` - [`ExportRequest`] -> [`ExportTicket`]
//! - `GET {base}/v1/exports/{task_id}` - current [`ExportTicket`]

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{ExportRequest, ExportTicket, ProductRequest, RasterCompute, RasterHandle, TileSource, VisParams};
use crate::config::ToolbarConfig;
use crate::errors::{ToolbarError, ToolbarResult};

const SERVICE: &str = "Compute";

pub struct ComputeClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct TileRequest<'a> {
    handle: &'a RasterHandle,
    vis: &'a VisParams,
}

/// Error body the service sends with non-2xx answers
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl ComputeClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: std::time::Duration) -> ToolbarResult<Self> {
        let http = Client::builder()
            .user_agent(format!("elter-toolbar/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ToolbarError::service(SERVICE, format!("Failed to create HTTP client: {}", e)))?;
        Ok(ComputeClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(config: &ToolbarConfig) -> ToolbarResult<Self> {
        Self::new(config.compute_url.clone(), config.compute_token.clone(), config.timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ToolbarResult<T> {
        let url = self.url(path);
        log::debug!("POST {}", url);
        let response = self
            .authorized(self.http.post(&url).json(body))
            .send()
            .map_err(|e| ToolbarError::service(SERVICE, e.to_string()))?;
        decode(response)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> ToolbarResult<T> {
        let url = self.url(path);
        log::debug!("GET {}", url);
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .map_err(|e| ToolbarError::service(SERVICE, e.to_string()))?;
        decode(response)
    }
}

fn decode<T: DeserializeOwned>(response: Response) -> ToolbarResult<T> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().unwrap_or_default();
        let reason = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);
        return Err(ToolbarError::rejected(SERVICE, status.as_u16(), reason));
    }
    response
        .json()
        .map_err(|e| ToolbarError::service(SERVICE, format!("Unexpected response: {}", e)))
}

impl RasterCompute for ComputeClient {
    fn build_product(&self, request: &ProductRequest) -> ToolbarResult<RasterHandle> {
        let handle: RasterHandle = self.post("products", request)?;
        log::info!("Compute built raster {}", handle.id);
        Ok(handle)
    }

    fn render(&self, handle: &RasterHandle, vis: &VisParams) -> ToolbarResult<TileSource> {
        self.post("tiles", &TileRequest { handle, vis })
    }

    fn export_raster(&self, request: &ExportRequest) -> ToolbarResult<ExportTicket> {
        let ticket: ExportTicket = self.post("exports", request)?;
        log::info!("Export {} queued as task {}", request.file_name, ticket.task_id);
        Ok(ticket)
    }

    fn export_status(&self, task_id: &str) -> ToolbarResult<ExportTicket> {
        self.get(&format!("exports/{}", task_id))
    }
}
