//! Land-surface temperature in °C from Landsat 8/9 thermal band or the
//! daily MODIS LST product.

use super::{
    common_flags, legend_entries, ParamSpec, ParamValues, ParamWidget, PanelSpec, ProductContext, ProductKind,
    ProductPlan, ProductStrategy,
};
use crate::compute::{CloudFilter, ProductQuery, ProductRequest, SourceCollection, Statistic, VisParams};
use crate::errors::{ToolbarError, ToolbarResult};
use crate::map::LegendSpec;
use crate::sites::Site;

pub const LANDSAT: &str = "Landsat";
pub const MODIS: &str = "MODIS";

const KELVIN: f64 = 273.15;

const LANDSAT_BANDS: [&str; 1] = ["ST_B10"];
const MODIS_BANDS: [&str; 2] = ["LST_Day_1km", "LST_Night_1km"];

pub const LST_PALETTE: [&str; 29] = [
    "040274", "040281", "0502a3", "0502b8", "0502ce", "0502e6", "0602ff", "235cb1", "307ef3", "269db1",
    "30c8e2", "32d3ef", "3be285", "3ff38f", "86e26f", "3ae237", "b5e22e", "d6e21f", "fff705", "ffd611",
    "ffb613", "ff8b13", "ff6e08", "ff500d", "ff0000", "de0101", "c21301", "a71001", "911003",
];

/// Landsat 8/9 surface temperature, rescaled to °C
fn landsat_sources() -> Vec<SourceCollection> {
    ["LANDSAT/LC08/C02/T1_L2", "LANDSAT/LC09/C02/T1_L2"]
        .iter()
        .map(|id| SourceCollection::new(*id).with_rescale(0.00341802, 149.0 - KELVIN))
        .collect()
}

/// MOD11A1 daily LST, rescaled to °C
fn modis_sources() -> Vec<SourceCollection> {
    vec![SourceCollection::new("MODIS/061/MOD11A1").with_rescale(0.02, -KELVIN)]
}

pub struct TemperatureProduct;

impl ProductStrategy for TemperatureProduct {
    fn kind(&self) -> ProductKind {
        ProductKind::Temperature
    }

    fn panel_spec(&self) -> PanelSpec {
        let statistics: Vec<String> = Statistic::ALL.iter().map(|s| s.display_name()).collect();
        let statistics: Vec<&str> = statistics.iter().map(String::as_str).collect();

        let mut params = vec![
            ParamSpec::choice("collection", "Collection", &[LANDSAT, MODIS], Some(MODIS)),
            ParamSpec::new("start_date", "Start date", ParamWidget::Date),
            ParamSpec::new("end_date", "End date", ParamWidget::Date),
            ParamSpec::new(
                "clouds",
                "Clouds (Landsat)",
                ParamWidget::IntSlider {
                    min: 0,
                    max: 100,
                    default: 10,
                },
            ),
            ParamSpec::choice(
                "band",
                "LST Band",
                &["ST_B10", "LST_Day_1km", "LST_Night_1km"],
                Some("LST_Day_1km"),
            ),
            ParamSpec::choice("statistic", "Statistics Per Pixel", &statistics, None),
        ];
        params.extend(common_flags());
        PanelSpec {
            title: "Land Surface Temperature".to_string(),
            icon: "🌡".to_string(),
            accent: "#E65100".to_string(),
            params,
        }
    }

    fn plan(&self, params: &ParamValues, site: &Site, _ctx: &ProductContext<'_>) -> ToolbarResult<ProductPlan> {
        let collection = params.required_text("collection", "a collection")?;
        let band = params.required_text("band", "an LST band")?;
        let (sources, valid_bands, cloud_filter) = match collection {
            LANDSAT => (
                landsat_sources(),
                &LANDSAT_BANDS[..],
                Some(CloudFilter {
                    property: "CLOUD_COVER".to_string(),
                    max_percent: f64::from(params.int("clouds").unwrap_or(10)),
                }),
            ),
            MODIS => (modis_sources(), &MODIS_BANDS[..], None),
            other => return Err(ToolbarError::invalid_input("collection", other, "Unknown collection")),
        };
        if !valid_bands.contains(&band) {
            return Err(ToolbarError::invalid_input(
                "band",
                band,
                format!("{} offers only {}", collection, valid_bands.join(", ")),
            ));
        }
        let date_range = params.date_range("start_date", "end_date")?;
        let statistic = params.statistic("statistic")?;

        Ok(ProductPlan {
            layer_name: format!("{} {} {}", band, collection, statistic.display_name()),
            request: ProductRequest {
                region: site.boundary.clone(),
                date_range,
                query: ProductQuery::BandReduce {
                    sources,
                    band: band.to_string(),
                    cloud_filter,
                    statistic,
                },
            },
            vis: VisParams::palette(-10.0, 40.0, &LST_PALETTE),
            companions: Vec::new(),
        })
    }

    fn legend(&self, _params: &ParamValues) -> LegendSpec {
        let keys: Vec<i32> = (-18..40).step_by(2).collect();
        LegendSpec::new("Degrees ºC", legend_entries(&keys, &LST_PALETTE))
    }
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
        let product = TemperatureProduct;
        let mut params = product.panel_spec().defaults();
        params.set("start_date", ParamValue::Date(NaiveDate::from_ymd_opt(2022, 6, 1)));
        params.set("end_date", ParamValue::Date(NaiveDate::from_ymd_opt(2022, 8, 31)));
        for (key, value) in changes {
            params.set(key, value.clone());
        }
        let site = Site {
            id: SiteId::new("s1"),
            name: "Veluwe".to_string(),
            title: "LTSER Veluwe - Netherlands".to_string(),
            boundary: SiteBoundary::from_bbox(&BoundingBox::new(5.6, 52.0, 6.0, 52.4)),
        };
        let catalog = Catalog::default();
        let config = ToolbarConfig::default();
        product.plan(&params, &site, &ProductContext { catalog: &catalog, config: &config })
    }

    #[test]
    fn test_modis_default() {
        let plan = plan_with(&[]).unwrap();
        assert_eq!(plan.layer_name, "LST_Day_1km MODIS Median");
        assert_eq!((plan.vis.min, plan.vis.max), (-10.0, 40.0));
        match plan.request.query {
            ProductQuery::BandReduce {
                sources, cloud_filter, ..
            } => {
                assert_eq!(sources[0].id, "MODIS/061/MOD11A1");
                assert!(cloud_filter.is_none());
            }
            other => panic!("unexpected query {:?}", other),
        }
    }

    #[test]
    fn test_landsat_needs_landsat_band() {
        let err = plan_with(&[("collection", ParamValue::text(LANDSAT))]).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");

        let plan = plan_with(&[
            ("collection", ParamValue::text(LANDSAT)),
            ("band", ParamValue::text("ST_B10")),
            ("statistic", ParamValue::text("Max")),
            ("clouds", ParamValue::Int(30)),
        ])
        .unwrap();
        assert_eq!(plan.layer_name, "ST_B10 Landsat Max");
        match plan.request.query {
            ProductQuery::BandReduce { cloud_filter, .. } => {
                assert_eq!(cloud_filter.unwrap().max_percent, 30.0);
            }
            other => panic!("unexpected query {:?}", other),
        }
    }

    #[test]
    fn test_legend_covers_palette() {
        let legend = TemperatureProduct.legend(&ParamValues::default());
        assert_eq!(legend.title, "Degrees ºC");
        assert_eq!(legend.entries.len(), 29);
        assert_eq!(legend.entries[0].0, "-18");
        assert_eq!(legend.entries[28].0, "38");
    }
}
