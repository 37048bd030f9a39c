//! Seasonal NDVI composite drawn under a freshly selected site: Sentinel-2,
//! 90th percentile per season, averaged over 2018-2022, shown as a
//! spring/autumn/winter false-colour image.

use crate::compute::{DateRange, ProductQuery, ProductRequest, Statistic, VisParams};
use crate::errors::ToolbarResult;
use crate::geometry::SiteBoundary;

/// Map layer name of the composite
pub const COMPOSITE_LAYER: &str = "perc_90";

const FIRST_YEAR: i32 = 2018;
const LAST_YEAR: i32 = 2022;
const SEASONS: u32 = 4;

pub fn composite_request(region: &SiteBoundary) -> ToolbarResult<ProductRequest> {
    Ok(ProductRequest {
        region: region.clone(),
        date_range: DateRange::years(FIRST_YEAR, LAST_YEAR)?,
        query: ProductQuery::SeasonalComposite {
            satellite: "S2".to_string(),
            index: "ndvi".to_string(),
            statistic: Statistic::Percentile(90),
            periods: SEASONS,
        },
    })
}

pub fn composite_vis() -> VisParams {
    VisParams::rgb(0.15, 0.8, ["spring", "autumn", "winter"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_request() {
        let request = composite_request(&SiteBoundary::empty()).unwrap();
        assert_eq!(request.date_range, DateRange::years(2018, 2022).unwrap());
        let json = serde_json::to_value(&request.query).unwrap();
        assert_eq!(json["kind"], "seasonal_composite");
        assert_eq!(json["periods"], 4);
        assert_eq!(composite_vis().bands, vec!["spring", "autumn", "winter"]);
    }
}
