//! # Raster Compute Service
//!
//! All raster math runs remotely. This module holds the request/response
//! types exchanged with the compute service and the [`RasterCompute`] trait
//! panels talk to. [`client::ComputeClient`] is the HTTP implementation.
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use elter_core::compute::{DateRange, ProductQuery, ProductRequest};
//! use elter_core::geometry::{BoundingBox, SiteBoundary};
//!
//! let request = ProductRequest {
//!     region: SiteBoundary::from_bbox(&BoundingBox::new(-6.5, 36.8, -6.2, 37.1)),
//!     date_range: DateRange::year(2020).unwrap(),
//!     query: ProductQuery::Asset {
//!         asset_id: "projects/ee-digdgeografo/assets/Donana_2020_SOSD".to_string(),
//!     },
//! };
//!
//! let json = serde_json::to_value(&request).unwrap();
//! assert_eq!(json["query"]["kind"], "asset");
//! assert_eq!(json["date_range"]["start"], "2020-01-01");
//! ```

pub mod client;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{ToolbarError, ToolbarResult};
use crate::geometry::SiteBoundary;

/// Opaque reference to a raster living on the compute service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RasterHandle {
    pub id: String,
    /// Human-readable summary from the service, for logs
    #[serde(default)]
    pub description: String,
}

impl RasterHandle {
    /// Context raster the service keeps next to a spectral index product
    /// built with `context_bands`
    pub fn context(&self) -> RasterHandle {
        RasterHandle {
            id: format!("{}/context", self.id),
            description: format!("context of {}", self.id),
        }
    }
}

/// XYZ tile endpoint for a rendered raster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSource {
    /// Template with `{z}`, `{x}` and `{y}` placeholders
    pub url_template: String,
}

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ToolbarResult<Self> {
        if start > end {
            return Err(ToolbarError::invalid_input(
                "date range",
                format!("{} .. {}", start, end),
                "Start date must not be after end date",
            ));
        }
        Ok(DateRange { start, end })
    }

    /// January 1st to December 31st of `year`
    pub fn year(year: i32) -> ToolbarResult<Self> {
        Self::years(year, year)
    }

    /// January 1st of `first` to December 31st of `last`
    pub fn years(first: i32, last: i32) -> ToolbarResult<Self> {
        let start = NaiveDate::from_ymd_opt(first, 1, 1)
            .ok_or_else(|| ToolbarError::invalid_input("year", first.to_string(), "Year out of range"))?;
        let end = NaiveDate::from_ymd_opt(last, 12, 31)
            .ok_or_else(|| ToolbarError::invalid_input("year", last.to_string(), "Year out of range"))?;
        Self::new(start, end)
    }
}

/// Per-pixel reduction over an image collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Max,
    Min,
    Mean,
    #[default]
    Median,
    Percentile(u8),
}

impl Statistic {
    /// All statistics offered in the panels
    pub const ALL: [Statistic; 8] = [
        Statistic::Max,
        Statistic::Min,
        Statistic::Mean,
        Statistic::Median,
        Statistic::Percentile(10),
        Statistic::Percentile(20),
        Statistic::Percentile(90),
        Statistic::Percentile(95),
    ];

    pub fn display_name(&self) -> String {
        match self {
            Statistic::Max => "Max".to_string(),
            Statistic::Min => "Min".to_string(),
            Statistic::Mean => "Mean".to_string(),
            Statistic::Median => "Median".to_string(),
            Statistic::Percentile(p) => format!("Percentile {}", p),
        }
    }

    /// Inverse of [`Statistic::display_name`]
    pub fn from_display_name(name: &str) -> Option<Statistic> {
        Self::ALL.iter().copied().find(|s| s.display_name() == name)
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Linear rescale applied to raw digital numbers: `value * scale + offset`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rescale {
    pub scale: f64,
    pub offset: f64,
}

/// One input image collection, with its native band names mapped to the
/// common names used in index formulas (`Blue`, `Green`, `Nir`, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCollection {
    pub id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bands: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rescale: Option<Rescale>,
}

impl SourceCollection {
    pub fn new(id: impl Into<String>) -> Self {
        SourceCollection {
            id: id.into(),
            bands: BTreeMap::new(),
            rescale: None,
        }
    }

    pub fn with_bands(mut self, pairs: &[(&str, &str)]) -> Self {
        self.bands = pairs
            .iter()
            .map(|(common, native)| (common.to_string(), native.to_string()))
            .collect();
        self
    }

    pub fn with_rescale(mut self, scale: f64, offset: f64) -> Self {
        self.rescale = Some(Rescale { scale, offset });
        self
    }
}

/// Drop scenes whose cloud metadata exceeds `max_percent`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudFilter {
    pub property: String,
    pub max_percent: f64,
}

/// Which side of the threshold survives masking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskKeep {
    AtLeast,
    AtMost,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdMask {
    pub threshold: f64,
    pub keep: MaskKeep,
}

/// What to compute. Every variant is clipped to the request region and
/// restricted to its date range on the service side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProductQuery {
    /// One band of the first image in a collection
    FirstImageBand { collection: String, band: String },

    /// A precomputed image asset
    Asset { asset_id: String },

    /// A band-math index evaluated per scene, then reduced per pixel
    SpectralIndex {
        sources: Vec<SourceCollection>,
        /// Output band name
        index: String,
        /// Expression over common band names
        expression: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cloud_filter: Option<CloudFilter>,
        statistic: Statistic,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mask: Option<ThresholdMask>,
        /// Index bands added to the per-pixel median of the scenes, kept
        /// as the context raster of the product. None when empty.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        context_bands: Vec<IndexBand>,
    },

    /// One native band reduced per pixel
    BandReduce {
        sources: Vec<SourceCollection>,
        band: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cloud_filter: Option<CloudFilter>,
        statistic: Statistic,
    },

    /// Seasonal vegetation composite, one band per season, averaged over
    /// the years of the date range
    SeasonalComposite {
        satellite: String,
        index: String,
        statistic: Statistic,
        periods: u32,
    },
}

/// Named band-math expression over common band names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexBand {
    pub name: String,
    pub expression: String,
}

impl IndexBand {
    pub fn new(name: &str, expression: &str) -> Self {
        IndexBand {
            name: name.to_string(),
            expression: expression.to_string(),
        }
    }
}

/// Input to [`RasterCompute::build_product`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRequest {
    pub region: SiteBoundary,
    pub date_range: DateRange,
    pub query: ProductQuery,
}

/// How a raster is turned into colours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VisParams {
    pub min: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub palette: Vec<String>,
    /// RGB band triple for multi-band rasters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bands: Vec<String>,
}

impl VisParams {
    pub fn palette(min: f64, max: f64, colors: &[&str]) -> Self {
        VisParams {
            min,
            max,
            palette: colors.iter().map(|c| c.to_string()).collect(),
            bands: Vec::new(),
        }
    }

    pub fn rgb(min: f64, max: f64, bands: [&str; 3]) -> Self {
        VisParams {
            min,
            max,
            palette: Vec::new(),
            bands: bands.iter().map(|b| b.to_string()).collect(),
        }
    }
}

/// Input to [`RasterCompute::export_raster`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub handle: RasterHandle,
    pub region: SiteBoundary,
    /// Pixel size in metres
    pub scale: f64,
    /// `EPSG:<code>`
    pub crs: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportState {
    Queued,
    Running,
    Completed,
    Failed,
}

impl ExportState {
    pub fn is_finished(&self) -> bool {
        matches!(self, ExportState::Completed | ExportState::Failed)
    }
}

/// Server-side export task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportTicket {
    pub task_id: String,
    pub state: ExportState,
    /// Download location once completed
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Remote geospatial compute service.
pub trait RasterCompute {
    fn build_product(&self, request: &ProductRequest) -> ToolbarResult<RasterHandle>;

    fn render(&self, handle: &RasterHandle, vis: &VisParams) -> ToolbarResult<TileSource>;

    /// Start an export. Returns as soon as the service has queued the task.
    fn export_raster(&self, request: &ExportRequest) -> ToolbarResult<ExportTicket>;

    fn export_status(&self, task_id: &str) -> ToolbarResult<ExportTicket>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_rejects_reversed_dates() {
        let a = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        assert!(DateRange::new(b, a).is_ok());
        assert_eq!(DateRange::new(a, b).unwrap_err().error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_year_ranges() {
        let range = DateRange::years(2018, 2022).unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2018, 1, 1).unwrap());
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2022, 12, 31).unwrap());
    }

    #[test]
    fn test_statistic_names() {
        assert_eq!(Statistic::Percentile(90).display_name(), "Percentile 90");
        assert_eq!(Statistic::from_display_name("Mean"), Some(Statistic::Mean));
        assert_eq!(Statistic::from_display_name("Mode"), None);
        assert_eq!(Statistic::default(), Statistic::Median);
    }

    #[test]
    fn test_query_wire_format() {
        let query = ProductQuery::BandReduce {
            sources: vec![SourceCollection::new("MODIS/061/MOD11A1").with_rescale(0.02, -273.15)],
            band: "LST_Day_1km".to_string(),
            cloud_filter: None,
            statistic: Statistic::Percentile(90),
        };
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["kind"], "band_reduce");
        assert_eq!(json["statistic"]["percentile"], 90);
        assert!(json.get("cloud_filter").is_none());
        assert_eq!(json["sources"][0]["rescale"]["scale"], 0.02);
    }
}
