//! # Raster Products
//!
//! Every toolbar panel is the same controller driven by a different
//! [`ProductStrategy`]. A strategy declares its parameter widgets
//! ([`PanelSpec`]), turns parameter values into a compute request
//! ([`ProductPlan`]) and describes its legend. Front-ends render the widgets
//! generically from the `PanelSpec`.
//!
//! - [`phenology::PhenologyProduct`] - start/peak/end of season
//! - [`water::WaterProduct`] - water indices
//! - [`temperature::TemperatureProduct`] - land-surface temperature
//! - [`composite`] - the seasonal NDVI composite shown on site selection
//!
//! ## Example
//!
//! ```rust
//! use elter_core::products::{strategy_for, ProductKind, ParamValue};
//!
//! let strategy = strategy_for(ProductKind::Phenology);
//! let spec = strategy.panel_spec();
//! let mut values = spec.defaults();
//! assert_eq!(values.int("year"), Some(2017));
//!
//! let year = spec.param("year").unwrap().check(&ParamValue::Int(2020)).unwrap();
//! values.set("year", year);
//! assert_eq!(values.int("year"), Some(2020));
//! ```

pub mod composite;
pub mod phenology;
pub mod temperature;
pub mod water;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::compute::{DateRange, ProductRequest, Statistic, VisParams};
use crate::config::ToolbarConfig;
use crate::errors::{ToolbarError, ToolbarResult};
use crate::map::LegendSpec;
use crate::sites::Site;

/// Flag: add the seasonal composite layer when a site is selected
pub const COMPOSITE_KEY: &str = "composite";
/// Flag: show the product legend
pub const LEGEND_KEY: &str = "legend";

/// Which workflow a panel runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductKind {
    Phenology,
    Water,
    Temperature,
}

impl ProductKind {
    pub const ALL: [ProductKind; 3] = [ProductKind::Phenology, ProductKind::Water, ProductKind::Temperature];

    pub fn display_name(&self) -> &'static str {
        match self {
            ProductKind::Phenology => "Phenology",
            ProductKind::Water => "Water Index",
            ProductKind::Temperature => "Land Surface Temperature",
        }
    }

    /// Name used on the command line
    pub fn slug(&self) -> &'static str {
        match self {
            ProductKind::Phenology => "phenology",
            ProductKind::Water => "water",
            ProductKind::Temperature => "lst",
        }
    }

    pub fn from_slug(slug: &str) -> Option<ProductKind> {
        Self::ALL.iter().copied().find(|k| k.slug() == slug)
    }
}

impl std::fmt::Display for ProductKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// The strategy for `kind`
pub fn strategy_for(kind: ProductKind) -> Box<dyn ProductStrategy> {
    match kind {
        ProductKind::Phenology => Box::new(phenology::PhenologyProduct),
        ProductKind::Water => Box::new(water::WaterProduct),
        ProductKind::Temperature => Box::new(temperature::TemperatureProduct),
    }
}

/// Input widget for one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamWidget {
    /// Dropdown; `None` default means nothing selected
    Choice { options: Vec<String>, default: Option<String> },
    /// Radio buttons, always one selected
    Radio { options: Vec<String>, default: String },
    IntSlider { min: i32, max: i32, default: i32 },
    FloatSlider { min: f64, max: f64, step: f64, default: f64 },
    /// Date picker, empty by default
    Date,
    Flag { default: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub key: String,
    pub label: String,
    pub widget: ParamWidget,
}

impl ParamSpec {
    pub fn new(key: &str, label: &str, widget: ParamWidget) -> Self {
        ParamSpec {
            key: key.to_string(),
            label: label.to_string(),
            widget,
        }
    }

    pub fn choice(key: &str, label: &str, options: &[&str], default: Option<&str>) -> Self {
        Self::new(
            key,
            label,
            ParamWidget::Choice {
                options: options.iter().map(|o| o.to_string()).collect(),
                default: default.map(str::to_string),
            },
        )
    }

    pub fn radio(key: &str, label: &str, options: &[&str], default: &str) -> Self {
        Self::new(
            key,
            label,
            ParamWidget::Radio {
                options: options.iter().map(|o| o.to_string()).collect(),
                default: default.to_string(),
            },
        )
    }

    pub fn default_value(&self) -> ParamValue {
        match &self.widget {
            ParamWidget::Choice { default, .. } => ParamValue::Text(default.clone()),
            ParamWidget::Radio { default, .. } => ParamValue::Text(Some(default.clone())),
            ParamWidget::IntSlider { default, .. } => ParamValue::Int(*default),
            ParamWidget::FloatSlider { default, .. } => ParamValue::Float(*default),
            ParamWidget::Date => ParamValue::Date(None),
            ParamWidget::Flag { default } => ParamValue::Flag(*default),
        }
    }

    /// Accept `value` if it has this widget's type and lies in its range.
    pub fn check(&self, value: &ParamValue) -> ToolbarResult<ParamValue> {
        let reject = |reason: String| ToolbarError::invalid_input(self.label.clone(), value.to_string(), reason);

        match (&self.widget, value) {
            (ParamWidget::Choice { .. }, ParamValue::Text(None)) => Ok(value.clone()),
            (ParamWidget::Choice { options, .. }, ParamValue::Text(Some(v)))
            | (ParamWidget::Radio { options, .. }, ParamValue::Text(Some(v))) => {
                if options.iter().any(|o| o == v) {
                    Ok(value.clone())
                } else {
                    Err(reject(format!("Expected one of: {}", options.join(", "))))
                }
            }
            (ParamWidget::IntSlider { min, max, .. }, ParamValue::Int(v)) => {
                if (*min..=*max).contains(v) {
                    Ok(value.clone())
                } else {
                    Err(reject(format!("Must be between {} and {}", min, max)))
                }
            }
            (ParamWidget::FloatSlider { min, max, .. }, ParamValue::Float(v)) => {
                if v.is_finite() && *v >= *min && *v <= *max {
                    Ok(value.clone())
                } else {
                    Err(reject(format!("Must be between {} and {}", min, max)))
                }
            }
            (ParamWidget::Date, ParamValue::Date(_)) | (ParamWidget::Flag { .. }, ParamValue::Flag(_)) => {
                Ok(value.clone())
            }
            _ => Err(reject("Wrong kind of value for this field".to_string())),
        }
    }
}

/// Everything a front-end needs to draw a panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelSpec {
    pub title: String,
    /// Launcher glyph
    pub icon: String,
    /// Border colour, `#rrggbb`
    pub accent: String,
    pub params: Vec<ParamSpec>,
}

impl PanelSpec {
    pub fn param(&self, key: &str) -> ToolbarResult<&ParamSpec> {
        self.params
            .iter()
            .find(|p| p.key == key)
            .ok_or_else(|| ToolbarError::not_found("Parameter", key))
    }

    pub fn defaults(&self) -> ParamValues {
        let mut values = ParamValues::default();
        for spec in &self.params {
            values.set(&spec.key, spec.default_value());
        }
        values
    }
}

/// The two flags every panel carries
pub fn common_flags() -> Vec<ParamSpec> {
    vec![
        ParamSpec::new(COMPOSITE_KEY, "Show NDVI seasonal composite", ParamWidget::Flag { default: true }),
        ParamSpec::new(LEGEND_KEY, "Show raster legend", ParamWidget::Flag { default: false }),
    ]
}

/// Current value of one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Text(Option<String>),
    Int(i32),
    Float(f64),
    Date(Option<NaiveDate>),
    Flag(bool),
}

impl ParamValue {
    pub fn text(value: &str) -> Self {
        ParamValue::Text(Some(value.to_string()))
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Text(Some(v)) => write!(f, "{}", v),
            ParamValue::Text(None) | ParamValue::Date(None) => write!(f, "(none)"),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Date(Some(d)) => write!(f, "{}", d),
            ParamValue::Flag(v) => write!(f, "{}", v),
        }
    }
}

/// Parameter values of one panel, by key
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParamValues {
    values: BTreeMap<String, ParamValue>,
}

impl ParamValues {
    pub fn set(&mut self, key: &str, value: ParamValue) {
        self.values.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(ParamValue::Text(Some(v))) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn int(&self, key: &str) -> Option<i32> {
        match self.values.get(key) {
            Some(ParamValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        match self.values.get(key) {
            Some(ParamValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn date(&self, key: &str) -> Option<NaiveDate> {
        match self.values.get(key) {
            Some(ParamValue::Date(v)) => *v,
            _ => None,
        }
    }

    /// Unset flags read as false
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(ParamValue::Flag(true)))
    }

    /// A selection that must be present
    pub fn required_text(&self, key: &str, what: &str) -> ToolbarResult<&str> {
        self.text(key).ok_or_else(|| ToolbarError::missing_selection(what))
    }

    /// Start and end date pickers as a validated range
    pub fn date_range(&self, start_key: &str, end_key: &str) -> ToolbarResult<DateRange> {
        let start = self.date(start_key).ok_or_else(|| ToolbarError::missing_selection("a start date"))?;
        let end = self.date(end_key).ok_or_else(|| ToolbarError::missing_selection("an end date"))?;
        DateRange::new(start, end)
    }

    /// Per-pixel statistic; nothing selected means median
    pub fn statistic(&self, key: &str) -> ToolbarResult<Statistic> {
        match self.text(key) {
            None => Ok(Statistic::Median),
            Some(name) => Statistic::from_display_name(name)
                .ok_or_else(|| ToolbarError::invalid_input("statistic", name, "Unknown statistic")),
        }
    }
}

/// Read-only context a strategy may consult
pub struct ProductContext<'a> {
    pub catalog: &'a Catalog,
    pub config: &'a ToolbarConfig,
}

/// A fully specified compute call plus how to display its result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPlan {
    /// Registry key and map layer name
    pub layer_name: String,
    pub request: ProductRequest,
    pub vis: VisParams,
    /// Hidden layers rendered from the product's context raster
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub companions: Vec<CompanionLayer>,
}

/// Extra map layer drawn from [`RasterHandle::context`], added hidden and
/// never registered for export
///
/// [`RasterHandle::context`]: crate::compute::RasterHandle::context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanionLayer {
    pub name: String,
    pub vis: VisParams,
}

/// One kind of toolbar panel.
pub trait ProductStrategy {
    fn kind(&self) -> ProductKind;

    fn panel_spec(&self) -> PanelSpec;

    /// Validate `params` and build the request for `site`. Must not touch
    /// any service.
    fn plan(&self, params: &ParamValues, site: &Site, ctx: &ProductContext<'_>) -> ToolbarResult<ProductPlan>;

    /// Legend for the current parameters
    fn legend(&self, params: &ParamValues) -> LegendSpec;
}

/// Pair labels with colours, prefixing bare hex colours with `#`
pub(crate) fn legend_entries<L: ToString>(labels: &[L], colors: &[&str]) -> Vec<(String, String)> {
    labels
        .iter()
        .zip(colors.iter())
        .map(|(label, color)| {
            let color = if color.starts_with('#') {
                color.to_string()
            } else {
                format!("#{}", color)
            };
            (label.to_string(), color)
        })
        .collect()
}
