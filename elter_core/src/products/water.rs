//! Water indices over Landsat or Sentinel-2, reduced per pixel over a date
//! range and optionally masked at a threshold.

use super::{
    common_flags, legend_entries, CompanionLayer, ParamSpec, ParamValues, ParamWidget, PanelSpec, ProductContext,
    ProductKind, ProductPlan, ProductStrategy,
};
use crate::compute::{
    CloudFilter, IndexBand, MaskKeep, ProductQuery, ProductRequest, SourceCollection, Statistic, ThresholdMask,
    VisParams,
};
use crate::errors::{ToolbarError, ToolbarResult};
use crate::map::LegendSpec;
use crate::sites::Site;

pub const LANDSAT: &str = "Landsat";
pub const SENTINEL_2: &str = "Sentinel 2";

const WATER_PALETTE: [&str; 9] = [
    "FAFBFF", "DDE3FB", "C1CCF7", "A4B4F3", "889CEF", "6B84EB", "4E6DE7ff", "3255E3ff", "153DDFff",
];

const LEGEND_COLORS: [&str; 11] = [
    "#FFFFFF", "#E0E4F1", "#C1C9E4", "#A1ADD6", "#8292C8", "#6377BA", "#445CAD", "#24409F", "#052591",
    "#031C6C", "#000B2F",
];

const LEGEND_KEYS: [f64; 11] = [0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

/// Bare soil index
const BSI_EXPRESSION: &str = "((Swir2 + Red) - (Nir + Blue)) / ((Swir2 + Red) + (Nir + Blue))";
const NDVI_EXPRESSION: &str = "(Nir - Red) / (Nir + Red)";

pub const COMPOSITE_RGB_LAYER: &str = "Composite RGB";
pub const COMPOSITE_INDEXES_LAYER: &str = "Composite Indexes";

/// Collection 2 Level 2 surface reflectance scale
const LANDSAT_SR_SCALE: f64 = 0.0000275;
const LANDSAT_SR_OFFSET: f64 = -0.2;

const OLI_BANDS: [(&str, &str); 6] = [
    ("Blue", "SR_B2"),
    ("Green", "SR_B3"),
    ("Red", "SR_B4"),
    ("Nir", "SR_B5"),
    ("Swir1", "SR_B6"),
    ("Swir2", "SR_B7"),
];

const TM_BANDS: [(&str, &str); 6] = [
    ("Blue", "SR_B1"),
    ("Green", "SR_B2"),
    ("Red", "SR_B3"),
    ("Nir", "SR_B4"),
    ("Swir1", "SR_B5"),
    ("Swir2", "SR_B7"),
];

const S2_BANDS: [(&str, &str); 6] = [
    ("Blue", "B2"),
    ("Green", "B3"),
    ("Red", "B4"),
    ("Nir", "B8"),
    ("Swir1", "B11"),
    ("Swir2", "B12"),
];

/// Landsat 4-9 merged into one collection
pub fn landsat_sources() -> Vec<SourceCollection> {
    let oli = ["LANDSAT/LC09/C02/T1_L2", "LANDSAT/LC08/C02/T1_L2"];
    let tm = ["LANDSAT/LE07/C02/T1_L2", "LANDSAT/LT05/C02/T1_L2", "LANDSAT/LT04/C02/T1_L2"];

    oli.iter()
        .map(|id| SourceCollection::new(*id).with_bands(&OLI_BANDS))
        .chain(tm.iter().map(|id| SourceCollection::new(*id).with_bands(&TM_BANDS)))
        .map(|source| source.with_rescale(LANDSAT_SR_SCALE, LANDSAT_SR_OFFSET))
        .collect()
}

pub fn sentinel2_sources() -> Vec<SourceCollection> {
    vec![SourceCollection::new("COPERNICUS/S2_HARMONIZED").with_bands(&S2_BANDS)]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaterIndex {
    NdwiMcFeeters,
    NdwiGao,
    Mndwi,
    Awei,
    Swir2,
}

impl WaterIndex {
    pub const ALL: [WaterIndex; 5] = [
        WaterIndex::NdwiMcFeeters,
        WaterIndex::NdwiGao,
        WaterIndex::Mndwi,
        WaterIndex::Awei,
        WaterIndex::Swir2,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            WaterIndex::NdwiMcFeeters => "NDWI_McFeeters",
            WaterIndex::NdwiGao => "NDWI_Gao",
            WaterIndex::Mndwi => "MNDWI",
            WaterIndex::Awei => "AWEI",
            WaterIndex::Swir2 => "SWIR2",
        }
    }

    pub fn from_display_name(name: &str) -> Option<WaterIndex> {
        Self::ALL.iter().copied().find(|i| i.display_name() == name)
    }

    /// Band math over common band names. Sentinel-2 SWIR2 is brought
    /// closer to Landsat reflectance by dividing by 1000.
    pub fn expression(&self, collection: &str) -> &'static str {
        match self {
            WaterIndex::NdwiMcFeeters => "(Green - Nir) / (Green + Nir)",
            WaterIndex::NdwiGao => "(Nir - Swir1) / (Nir + Swir1)",
            WaterIndex::Mndwi => "(Green - Swir1) / (Green + Swir1)",
            WaterIndex::Awei => "Blue + 2.5 * Green - 1.5 * (Nir + Swir1) - 0.25 * Swir2",
            WaterIndex::Swir2 if collection == SENTINEL_2 => "Swir2 / 1000",
            WaterIndex::Swir2 => "Swir2",
        }
    }

    /// Bands of the context raster: BSI, NDVI and MNDWI over the scene median
    pub fn context_bands() -> Vec<IndexBand> {
        vec![
            IndexBand::new("BSI", BSI_EXPRESSION),
            IndexBand::new("NDVI", NDVI_EXPRESSION),
            IndexBand::new("MNDWI", WaterIndex::Mndwi.expression(SENTINEL_2)),
        ]
    }

    /// Water is bright in every index except raw SWIR2, where it is dark
    pub fn water_is_low(&self) -> bool {
        matches!(self, WaterIndex::Swir2)
    }
}

pub struct WaterProduct;

impl ProductStrategy for WaterProduct {
    fn kind(&self) -> ProductKind {
        ProductKind::Water
    }

    fn panel_spec(&self) -> PanelSpec {
        let statistics: Vec<String> = Statistic::ALL.iter().map(|s| s.display_name()).collect();
        let statistics: Vec<&str> = statistics.iter().map(String::as_str).collect();
        let indices: Vec<&str> = WaterIndex::ALL.iter().map(|i| i.display_name()).collect();

        let mut params = vec![
            ParamSpec::choice("collection", "Collection", &[LANDSAT, SENTINEL_2], Some(SENTINEL_2)),
            ParamSpec::new("start_date", "Start date", ParamWidget::Date),
            ParamSpec::new("end_date", "End date", ParamWidget::Date),
            ParamSpec::new(
                "clouds",
                "Clouds",
                ParamWidget::IntSlider {
                    min: 0,
                    max: 100,
                    default: 10,
                },
            ),
            ParamSpec::choice("index", "Water Index", &indices, Some(WaterIndex::Mndwi.display_name())),
            ParamSpec::choice("statistic", "Statistics Per Pixel", &statistics, None),
            ParamSpec::new(
                "threshold",
                "Threshold",
                ParamWidget::FloatSlider {
                    min: -1.0,
                    max: 1.0,
                    step: 0.01,
                    default: 0.0,
                },
            ),
            ParamSpec::new("mask", "Apply threshold mask", ParamWidget::Flag { default: false }),
        ];
        params.extend(common_flags());
        PanelSpec {
            title: "Water Index".to_string(),
            icon: "💧".to_string(),
            accent: "#1565C0".to_string(),
            params,
        }
    }

    fn plan(&self, params: &ParamValues, site: &Site, _ctx: &ProductContext<'_>) -> ToolbarResult<ProductPlan> {
        let collection = params.required_text("collection", "a collection")?;
        let (sources, cloud_property) = match collection {
            LANDSAT => (landsat_sources(), "CLOUD_COVER"),
            SENTINEL_2 => (sentinel2_sources(), "CLOUDY_PIXEL_PERCENTAGE"),
            other => return Err(ToolbarError::invalid_input("collection", other, "Unknown collection")),
        };
        let date_range = params.date_range("start_date", "end_date")?;
        let index_name = params.required_text("index", "a water index")?;
        let index = WaterIndex::from_display_name(index_name)
            .ok_or_else(|| ToolbarError::invalid_input("index", index_name, "Unknown water index"))?;
        let statistic = params.statistic("statistic")?;
        let clouds = params.int("clouds").unwrap_or(10);

        let mask = if params.flag("mask") {
            let keep = if index.water_is_low() {
                MaskKeep::AtMost
            } else {
                MaskKeep::AtLeast
            };
            Some(ThresholdMask {
                threshold: params.float("threshold").unwrap_or(0.0),
                keep,
            })
        } else {
            None
        };

        let mut layer_name = format!("{} {} {}", index.display_name(), collection, statistic.display_name());
        if mask.is_some() {
            layer_name.push_str(" Masked");
        }

        let vis = if index.water_is_low() {
            let reversed: Vec<&str> = WATER_PALETTE.iter().rev().copied().collect();
            VisParams::palette(0.0, 1.0, &reversed)
        } else {
            VisParams::palette(0.0, 1.0, &WATER_PALETTE)
        };

        Ok(ProductPlan {
            layer_name,
            request: ProductRequest {
                region: site.boundary.clone(),
                date_range,
                query: ProductQuery::SpectralIndex {
                    sources,
                    index: index.display_name().to_string(),
                    expression: index.expression(collection).to_string(),
                    cloud_filter: Some(CloudFilter {
                        property: cloud_property.to_string(),
                        max_percent: f64::from(clouds),
                    }),
                    statistic,
                    mask,
                    context_bands: WaterIndex::context_bands(),
                },
            },
            vis,
            companions: companion_layers(),
        })
    }

    fn legend(&self, params: &ParamValues) -> LegendSpec {
        let title = params.text("index").unwrap_or("Water Index");
        LegendSpec::new(title, legend_entries(&LEGEND_KEYS, &LEGEND_COLORS))
    }
}

/// False-colour scene median and an index composite, drawn hidden next to
/// every water product
fn companion_layers() -> Vec<CompanionLayer> {
    vec![
        CompanionLayer {
            name: COMPOSITE_RGB_LAYER.to_string(),
            vis: VisParams::rgb(0.0, 3000.0, ["Swir1", "Nir", "Blue"]),
        },
        CompanionLayer {
            name: COMPOSITE_INDEXES_LAYER.to_string(),
            vis: VisParams::rgb(-0.5, 0.8, ["BSI", "NDVI", "MNDWI"]),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::ToolbarConfig;
    use crate::geometry::{BoundingBox, SiteBoundary};
    use crate::products::ParamValue;
    use crate::sites::SiteId;
    use chrono::NaiveDate;

    fn plan_with(changes: &[(&str, ParamValue)]) -> ToolbarResult<ProductPlan> {
        let product = WaterProduct;
        let mut params = product.panel_spec().defaults();
        params.set("start_date", ParamValue::Date(NaiveDate::from_ymd_opt(2021, 3, 1)));
        params.set("end_date", ParamValue::Date(NaiveDate::from_ymd_opt(2021, 6, 30)));
        for (key, value) in changes {
            params.set(key, value.clone());
        }
        let site = Site {
            id: SiteId::new("s1"),
            name: "Doñana".to_string(),
            title: "Doñana - Spain".to_string(),
            boundary: SiteBoundary::from_bbox(&BoundingBox::new(-6.5, 36.8, -6.2, 37.1)),
        };
        let catalog = Catalog::default();
        let config = ToolbarConfig::default();
        product.plan(&params, &site, &ProductContext { catalog: &catalog, config: &config })
    }

    #[test]
    fn test_default_name_uses_median() {
        let plan = plan_with(&[]).unwrap();
        assert_eq!(plan.layer_name, "MNDWI Sentinel 2 Median");
        match plan.request.query {
            ProductQuery::SpectralIndex {
                cloud_filter, statistic, mask, ..
            } => {
                let filter = cloud_filter.unwrap();
                assert_eq!(filter.property, "CLOUDY_PIXEL_PERCENTAGE");
                assert_eq!(filter.max_percent, 10.0);
                assert_eq!(statistic, Statistic::Median);
                assert!(mask.is_none());
            }
            other => panic!("unexpected query {:?}", other),
        }
    }

    #[test]
    fn test_plan_carries_context_composites() {
        let plan = plan_with(&[]).unwrap();
        let names: Vec<&str> = plan.companions.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec![COMPOSITE_RGB_LAYER, COMPOSITE_INDEXES_LAYER]);
        assert_eq!(plan.companions[0].vis.bands, vec!["Swir1", "Nir", "Blue"]);
        assert_eq!(plan.companions[1].vis.min, -0.5);
        match plan.request.query {
            ProductQuery::SpectralIndex { context_bands, .. } => {
                let names: Vec<&str> = context_bands.iter().map(|b| b.name.as_str()).collect();
                assert_eq!(names, vec!["BSI", "NDVI", "MNDWI"]);
                assert_eq!(context_bands[0].expression, BSI_EXPRESSION);
            }
            other => panic!("unexpected query {:?}", other),
        }
    }

    #[test]
    fn test_masked_landsat() {
        let plan = plan_with(&[
            ("collection", ParamValue::text(LANDSAT)),
            ("statistic", ParamValue::text("Percentile 90")),
            ("mask", ParamValue::Flag(true)),
            ("threshold", ParamValue::Float(0.2)),
        ])
        .unwrap();
        assert_eq!(plan.layer_name, "MNDWI Landsat Percentile 90 Masked");
        match plan.request.query {
            ProductQuery::SpectralIndex {
                sources, cloud_filter, mask, ..
            } => {
                assert_eq!(sources.len(), 5);
                assert_eq!(sources[0].bands["Nir"], "SR_B5");
                assert_eq!(sources[2].bands["Nir"], "SR_B4");
                assert_eq!(cloud_filter.unwrap().property, "CLOUD_COVER");
                assert_eq!(
                    mask,
                    Some(ThresholdMask {
                        threshold: 0.2,
                        keep: MaskKeep::AtLeast
                    })
                );
            }
            other => panic!("unexpected query {:?}", other),
        }
    }

    #[test]
    fn test_swir2_masks_below_and_reverses_palette() {
        let plan = plan_with(&[("index", ParamValue::text("SWIR2")), ("mask", ParamValue::Flag(true))]).unwrap();
        assert_eq!(plan.vis.palette.first().map(String::as_str), Some("153DDFff"));
        match plan.request.query {
            ProductQuery::SpectralIndex { expression, mask, .. } => {
                assert_eq!(expression, "Swir2 / 1000");
                assert_eq!(mask.unwrap().keep, MaskKeep::AtMost);
            }
            other => panic!("unexpected query {:?}", other),
        }
    }

    #[test]
    fn test_dates_are_required_and_ordered() {
        let err = plan_with(&[("end_date", ParamValue::Date(None))]).unwrap_err();
        assert_eq!(err.error_code(), "MISSING_SELECTION");

        let err = plan_with(&[("end_date", ParamValue::Date(NaiveDate::from_ymd_opt(2020, 1, 1)))]).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_legend_title_is_index() {
        let product = WaterProduct;
        let legend = product.legend(&product.panel_spec().defaults());
        assert_eq!(legend.title, "MNDWI");
        assert_eq!(legend.entries.len(), 11);
        assert_eq!(legend.entries[10], ("1".to_string(), "#000B2F".to_string()));
    }
}
