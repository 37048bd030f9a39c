//! The services and reference data every panel works with, bundled so a
//! panel is constructed from one value instead of globals.
//!
//! ## Example
//!
//! ```rust
//! use elter_core::map::MapHost;
//! use elter_core::memory::{InMemoryDirectory, RecordingCompute, RecordingMap};
//! use elter_core::products::ProductKind;
//! use elter_core::session::Session;
//! use elter_core::catalog::Catalog;
//! use elter_core::config::ToolbarConfig;
//! use std::rc::Rc;
//!
//! let session = Session::new(
//!     Rc::new(InMemoryDirectory::new()),
//!     Rc::new(RecordingCompute::new()),
//!     ToolbarConfig::default(),
//!     Catalog::builtin().unwrap(),
//! );
//! let mut map = RecordingMap::new();
//! let panel = session.open_panel(ProductKind::Phenology, &mut map);
//! assert!(map.has_control(panel.control_id()));
//! ```

use std::rc::Rc;

use crate::catalog::Catalog;
use crate::compute::client::ComputeClient;
use crate::compute::RasterCompute;
use crate::config::ToolbarConfig;
use crate::deims::DeimsClient;
use crate::errors::ToolbarResult;
use crate::map::MapHost;
use crate::panel::PanelController;
use crate::products::{strategy_for, ProductKind};
use crate::sites::SiteDirectory;

#[derive(Clone)]
pub struct Session {
    pub directory: Rc<dyn SiteDirectory>,
    pub compute: Rc<dyn RasterCompute>,
    pub config: Rc<ToolbarConfig>,
    pub catalog: Rc<Catalog>,
}

impl Session {
    pub fn new(
        directory: Rc<dyn SiteDirectory>,
        compute: Rc<dyn RasterCompute>,
        config: ToolbarConfig,
        catalog: Catalog,
    ) -> Self {
        Session {
            directory,
            compute,
            config: Rc::new(config),
            catalog: Rc::new(catalog),
        }
    }

    /// Session against the real DEIMS and compute services
    pub fn connect(config: ToolbarConfig) -> ToolbarResult<Self> {
        let directory = DeimsClient::from_config(&config)?;
        let compute = ComputeClient::from_config(&config)?;
        let catalog = Catalog::builtin()?;
        log::info!("Session: DEIMS {} / compute {}", config.deims_url, config.compute_url);
        Ok(Session::new(Rc::new(directory), Rc::new(compute), config, catalog))
    }

    pub fn open_panel(&self, kind: ProductKind, map: &mut dyn MapHost) -> PanelController {
        PanelController::open(self.clone(), strategy_for(kind), map)
    }
}
