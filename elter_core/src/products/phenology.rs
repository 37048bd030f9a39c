//! Phenology metrics: start (SOS), peak (MOS) and end (EOS) of season, as
//! day of year or as the vegetation index value on that day.
//!
//! MODIS metrics come straight from the MCD12Q2 collection. Sentinel-2
//! metrics are precomputed per site and year and stored as assets named
//! `{site_key}_{year}_{SOS|MAX|EOS}{D|V}`.

use chrono::NaiveDate;

use super::{
    common_flags, legend_entries, ParamSpec, ParamValues, ParamWidget, PanelSpec, ProductContext,
    ProductKind, ProductPlan, ProductStrategy,
};
use crate::compute::{DateRange, ProductQuery, ProductRequest, VisParams};
use crate::errors::{ToolbarError, ToolbarResult};
use crate::map::LegendSpec;
use crate::sites::Site;

pub const HRVPP: &str = "Sentinel 2 HR-VPP Phenology Products";
pub const PHENOPY: &str = "Sentinel-2AB Phenopy";
pub const MODIS: &str = "MODIS MCD12Q2.006";

const MODIS_COLLECTION: &str = "MODIS/006/MCD12Q2";

/// First year with Sentinel-2 phenology
const SENTINEL_FIRST_YEAR: i32 = 2017;

const MONTH_PALETTE: [&str; 12] = [
    "#54478C", "#2C699A", "#048BA8", "#EFEA5A", "#F1C453", "#F29E4C", "#d00000", "#9d0208", "#B9E769",
    "#83E377", "#16DB93", "#0DB39E",
];

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September", "October",
    "November", "December",
];

const NDVI_PALETTE: [&str; 9] = [
    "f5cb5c", "fee440", "9ef01a", "70e000", "38b000", "008000", "007200", "006400", "004b23",
];

const NDVI_KEYS: [f64; 9] = [-1.0, -0.7, -0.5, -0.3, 0.0, 0.3, 0.5, 0.7, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Sos,
    Mos,
    Eos,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Sos, Metric::Mos, Metric::Eos];

    pub fn display_name(&self) -> &'static str {
        match self {
            Metric::Sos => "SOS",
            Metric::Mos => "MOS",
            Metric::Eos => "EOS",
        }
    }

    pub fn from_display_name(name: &str) -> Option<Metric> {
        Self::ALL.iter().copied().find(|m| m.display_name() == name)
    }

    /// MCD12Q2 band
    fn modis_band(&self) -> &'static str {
        match self {
            Metric::Sos => "Greenup_1",
            Metric::Mos => "Peak_1",
            Metric::Eos => "Senescence_1",
        }
    }

    /// Tag used in Sentinel asset names
    fn asset_tag(&self) -> &'static str {
        match self {
            Metric::Sos => "SOS",
            Metric::Mos => "MAX",
            Metric::Eos => "EOS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricValue {
    /// Day of year
    Doy,
    /// Index value on that day
    Value,
}

impl MetricValue {
    pub fn display_name(&self) -> &'static str {
        match self {
            MetricValue::Doy => "Doy",
            MetricValue::Value => "Value",
        }
    }

    pub fn from_display_name(name: &str) -> Option<MetricValue> {
        match name {
            "Doy" => Some(MetricValue::Doy),
            "Value" => Some(MetricValue::Value),
            _ => None,
        }
    }
}

/// Days from 1970-01-01 to January 1st of `year` (MCD12Q2 stores dates
/// as days since epoch)
fn days_since_epoch(year: i32) -> ToolbarResult<i64> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .ok_or_else(|| ToolbarError::Internal { message: "epoch date".to_string() })?;
    let jan_first = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| ToolbarError::invalid_input("year", year.to_string(), "Year out of range"))?;
    Ok((jan_first - epoch).num_days())
}

/// Sentinel DOY rasters encode dates as `yyDDD`
fn yy_doy_base(year: i32) -> f64 {
    f64::from(year.rem_euclid(100) * 1000)
}

pub struct PhenologyProduct;

impl PhenologyProduct {
    fn selections(params: &ParamValues) -> ToolbarResult<(String, i32, Metric, MetricValue)> {
        let collection = params.required_text("collection", "a collection")?.to_string();
        let year = params
            .int("year")
            .ok_or_else(|| ToolbarError::missing_selection("a year"))?;
        let metric = params.required_text("metric", "a phenometric")?;
        let metric = Metric::from_display_name(metric)
            .ok_or_else(|| ToolbarError::invalid_input("metric", metric, "Unknown phenometric"))?;
        let value = params.required_text("value", "a metric value")?;
        let value = MetricValue::from_display_name(value)
            .ok_or_else(|| ToolbarError::invalid_input("value", value, "Expected Doy or Value"))?;
        Ok((collection, year, metric, value))
    }
}

impl ProductStrategy for PhenologyProduct {
    fn kind(&self) -> ProductKind {
        ProductKind::Phenology
    }

    fn panel_spec(&self) -> PanelSpec {
        let mut params = vec![
            ParamSpec::choice("collection", "Collection", &[HRVPP, PHENOPY, MODIS], Some(PHENOPY)),
            ParamSpec::new(
                "year",
                "Year",
                ParamWidget::IntSlider {
                    min: 2001,
                    max: 2021,
                    default: 2017,
                },
            ),
            ParamSpec::radio("metric", "Metric", &["SOS", "MOS", "EOS"], "SOS"),
            ParamSpec::radio("value", "Metric Value", &["Doy", "Value"], "Doy"),
        ];
        params.extend(common_flags());
        PanelSpec {
            title: "Phenology".to_string(),
            icon: "🌿".to_string(),
            accent: "#2E7D32".to_string(),
            params,
        }
    }

    fn plan(&self, params: &ParamValues, site: &Site, ctx: &ProductContext<'_>) -> ToolbarResult<ProductPlan> {
        let (collection, year, metric, value) = Self::selections(params)?;
        let layer_name = format!("{} {} {}", metric.display_name(), value.display_name(), year);
        let date_range = DateRange::year(year)?;

        let (query, vis) = if collection == MODIS {
            let min = days_since_epoch(year)? as f64;
            let query = ProductQuery::FirstImageBand {
                collection: MODIS_COLLECTION.to_string(),
                band: metric.modis_band().to_string(),
            };
            (query, VisParams::palette(min, min + 365.0, &MONTH_PALETTE))
        } else {
            if year < SENTINEL_FIRST_YEAR {
                return Err(ToolbarError::product_unavailable(
                    collection,
                    "Sentinel 2 data is only available since 2017",
                ));
            }
            let site_key = ctx.catalog.phenology_asset_key(&site.name);
            let asset_id = format!(
                "{}{}_{}_{}{}",
                ctx.config.phenology_asset_root,
                site_key,
                year,
                metric.asset_tag(),
                &value.display_name()[..1]
            );
            let vis = match value {
                MetricValue::Doy => {
                    let base = yy_doy_base(year);
                    VisParams::palette(base, base + 365.0, &MONTH_PALETTE)
                }
                MetricValue::Value => VisParams::palette(0.0, 10000.0, &NDVI_PALETTE),
            };
            (ProductQuery::Asset { asset_id }, vis)
        };

        Ok(ProductPlan {
            layer_name,
            request: ProductRequest {
                region: site.boundary.clone(),
                date_range,
                query,
            },
            vis,
            companions: Vec::new(),
        })
    }

    fn legend(&self, params: &ParamValues) -> LegendSpec {
        match params.text("value") {
            Some("Value") => LegendSpec::new("NDVI", legend_entries(&NDVI_KEYS, &NDVI_PALETTE)),
            _ => LegendSpec::new("Month", legend_entries(&MONTHS, &MONTH_PALETTE)),
        }
    }
}
