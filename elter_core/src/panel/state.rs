//! Selection state of one panel.

use serde::{Deserialize, Serialize};

use crate::catalog::Network;
use crate::products::ParamValues;
use crate::sites::Site;

/// Lifecycle of the cascading selectors.
///
/// `Idle -> NetworkChosen -> SiteChosen -> ParametersSet -> Applied`,
/// with `Applied -> ParametersSet` on reset or a failed re-apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PanelPhase {
    #[default]
    Idle,
    NetworkChosen,
    SiteChosen,
    ParametersSet,
    Applied,
}

impl PanelPhase {
    pub fn display_name(&self) -> &'static str {
        match self {
            PanelPhase::Idle => "Idle",
            PanelPhase::NetworkChosen => "Network chosen",
            PanelPhase::SiteChosen => "Site chosen",
            PanelPhase::ParametersSet => "Parameters set",
            PanelPhase::Applied => "Applied",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PanelState {
    pub phase: PanelPhase,
    pub network: Option<Network>,
    pub site: Option<Site>,
    pub params: ParamValues,
}

impl PanelState {
    pub fn new(params: ParamValues) -> Self {
        PanelState {
            params,
            ..Default::default()
        }
    }
}
