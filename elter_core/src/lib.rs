//! # elter_core - eLTER Site Map Toolbar Engine
//!
//! `elter_core` drives the toolbar panels of the eLTER site map: pick a
//! national network, pick one of its research sites, request a
//! satellite-derived raster (phenology, water index, land-surface
//! temperature), show it on the map and export it. The raster work runs on
//! a remote compute service and site metadata comes from DEIMS; this crate
//! owns the panel state machine and the requests it sends.
//!
//! ## Design Philosophy
//!
//! - **Front-end agnostic**: panels talk to the map through [`map::MapHost`]
//! - **Services behind traits**: [`sites::SiteDirectory`] and
//!   [`compute::RasterCompute`] have HTTP clients and in-memory fakes
//! - **Errors are output**: panel events never fail, they write to the
//!   panel's output area
//! - **JSON-First**: requests, config and reference data are serde types
//!
//! ## Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//! use elter_core::memory::{InMemoryDirectory, RecordingCompute, RecordingMap};
//! use elter_core::{Catalog, ProductKind, Session, ToolbarConfig};
//!
//! let catalog = Catalog::builtin().unwrap();
//! let session = Session::new(
//!     Rc::new(InMemoryDirectory::demo(&catalog)),
//!     Rc::new(RecordingCompute::new()),
//!     ToolbarConfig::default(),
//!     catalog,
//! );
//!
//! let mut map = RecordingMap::new();
//! let mut panel = session.open_panel(ProductKind::Water, &mut map);
//! panel.select_network("Spain");
//! assert_eq!(panel.site_names().len(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`panel`] - Panel controller, visibility and output area
//! - [`products`] - Phenology, water and temperature product strategies
//! - [`session`] - Services and reference data shared by panels
//! - [`sites`] / [`deims`] - Site directory and its DEIMS client
//! - [`compute`] - Compute service types and HTTP client
//! - [`map`] - Map host surface
//! - [`registry`] - Rasters available for export
//! - [`catalog`] - Built-in networks and featured sites
//! - [`geometry`] - Site boundaries
//! - [`config`] - Toolbar configuration
//! - [`feedback`] - Field feedback form
//! - [`memory`] - In-memory services for tests and dry runs
//! - [`errors`] - Structured error types
//! - [`file_io`] - Atomic saves and file locking

pub mod catalog;
pub mod compute;
pub mod config;
pub mod deims;
pub mod errors;
pub mod feedback;
pub mod file_io;
pub mod geometry;
pub mod map;
pub mod memory;
pub mod panel;
pub mod products;
pub mod registry;
pub mod session;
pub mod sites;

// Re-export commonly used types at crate root for convenience
pub use catalog::{Catalog, Network};
pub use config::ToolbarConfig;
pub use errors::{ToolbarError, ToolbarResult};
pub use map::MapHost;
pub use panel::{ExportOptions, PanelController, PanelPhase};
pub use products::{ParamValue, ProductKind};
pub use session::Session;
