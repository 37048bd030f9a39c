//! End-to-end panel workflows against the in-memory services.

use std::rc::Rc;

use elter_core::catalog::{Catalog, FeaturedSite, Network};
use elter_core::compute::ProductQuery;
use elter_core::config::ToolbarConfig;
use elter_core::geometry::{BoundingBox, SiteBoundary};
use elter_core::memory::{InMemoryDirectory, RecordingCompute, RecordingMap};
use elter_core::panel::{ExportOptions, PanelPhase};
use elter_core::products::{ParamValue, ProductKind, COMPOSITE_KEY};
use elter_core::sites::SiteId;
use elter_core::{MapHost, Session};

fn donana() -> SiteBoundary {
    SiteBoundary::from_bbox(&BoundingBox::new(-6.55, 36.8, -6.15, 37.15))
}

fn spain_session(config: ToolbarConfig) -> (Session, Rc<RecordingCompute>) {
    let spain = Network::new("2b70f1fb-f7d9-4615-a1a3-33fc6fa44600", "Spain");
    let directory = InMemoryDirectory::new()
        .with_site(
            &spain.id,
            "bcbc866c-3f4f-47a8-bbbc-0a93df6de7b2",
            "Doñana Long-Term Socio-ecological Research Platform - Spain",
            donana(),
        )
        .with_site(
            &spain.id,
            "sierra",
            "Sierra Nevada - Spain",
            SiteBoundary::from_bbox(&BoundingBox::new(-3.6, 36.9, -2.6, 37.3)),
        );
    let compute = Rc::new(RecordingCompute::new());
    let mut catalog = Catalog::builtin().unwrap();
    catalog.networks = vec![spain];
    let session = Session::new(Rc::new(directory), compute.clone(), config, catalog);
    (session, compute)
}

fn quiet_config() -> ToolbarConfig {
    ToolbarConfig {
        show_featured_sites: false,
        ..ToolbarConfig::default()
    }
}

#[test]
fn test_spain_donana_phenology_scenario() {
    let (session, compute) = spain_session(quiet_config());
    let mut map = RecordingMap::new();
    let mut panel = session.open_panel(ProductKind::Phenology, &mut map);
    panel.set_param(&mut map, COMPOSITE_KEY, ParamValue::Flag(false));

    panel.select_network("Spain");
    assert_eq!(
        panel.site_names(),
        vec!["Doñana Long-Term Socio-ecological Research Platform", "Sierra Nevada"]
    );

    panel.select_site(&mut map, "Doñana Long-Term Socio-ecological Research Platform");
    let center = map.last_center().unwrap();
    assert!(center.contains(-6.35, 36.95));

    panel.set_param(&mut map, "year", ParamValue::Int(2020));
    panel.set_param(&mut map, "metric", ParamValue::text("SOS"));
    assert_eq!(panel.phase(), PanelPhase::ParametersSet);

    let name = panel.apply(&mut map);
    assert_eq!(name.as_deref(), Some("SOS Doy 2020"));
    assert_eq!(compute.build_calls(), 1);
    assert_eq!(panel.registry().names(), vec!["SOS Doy 2020"]);
    assert_eq!(map.layer_names(), vec!["SOS Doy 2020"]);

    let request = compute.last_build().unwrap();
    assert_eq!(
        request.query,
        ProductQuery::Asset {
            asset_id: "projects/ee-digdgeografo/assets/Donana_2020_SOSD".to_string()
        }
    );
    assert_eq!(request.region, donana());
}

#[test]
fn test_apply_without_site_never_calls_compute() {
    let (session, compute) = spain_session(quiet_config());
    let mut map = RecordingMap::new();
    let mut panel = session.open_panel(ProductKind::Temperature, &mut map);

    assert!(panel.apply(&mut map).is_none());
    panel.select_network("Spain");
    assert!(panel.apply(&mut map).is_none());

    assert_eq!(compute.build_calls(), 0);
    assert!(panel.output().has_errors());
    assert!(map.layers().is_empty());
}

#[test]
fn test_water_apply_then_export_then_close() {
    let (session, compute) = spain_session(quiet_config());
    let mut map = RecordingMap::new();
    let mut panel = session.open_panel(ProductKind::Water, &mut map);
    let control = panel.control_id();

    panel.select_network("Spain");
    panel.select_site(&mut map, "Sierra Nevada");
    panel.set_param_text(&mut map, "start_date", "2021-01-01");
    panel.set_param_text(&mut map, "end_date", "2021-12-31");
    panel.set_param(&mut map, "statistic", ParamValue::text("Percentile 90"));
    let name = panel.apply(&mut map).unwrap();
    assert_eq!(name, "MNDWI Sentinel 2 Percentile 90");
    assert!(map.has_layer("perc_90"));

    let ticket = panel
        .export(&ExportOptions {
            raster: Some(name.clone()),
            scale: "10".to_string(),
            crs: "EPSG:32630".to_string(),
            file_name: "sierra_mndwi".to_string(),
        })
        .unwrap();
    compute.complete_export(&ticket.task_id, "https://downloads.example.org/sierra_mndwi.tif");
    panel.refresh_exports();
    assert_eq!(compute.last_export().unwrap().crs, "EPSG:32630");

    panel.close(&mut map);
    assert!(!map.has_control(control));
    assert!(panel.registry().is_empty());
    assert_eq!(panel.phase(), PanelPhase::Idle);
}

#[test]
fn test_featured_sites_are_outlined_on_open() {
    let mut config = quiet_config();
    config.show_featured_sites = true;
    config.featured_sites = Some(vec![FeaturedSite {
        key: "Donana".to_string(),
        id: SiteId::new("bcbc866c-3f4f-47a8-bbbc-0a93df6de7b2"),
    }, FeaturedSite {
        key: "Missing".to_string(),
        id: SiteId::new("not-in-directory"),
    }]);
    let (session, _compute) = spain_session(config);
    let mut map = RecordingMap::new();
    let panel = session.open_panel(ProductKind::Temperature, &mut map);

    assert_eq!(map.boundary_names(), vec!["Donana"]);
    assert_eq!(map.boundary_style("Donana").unwrap().color, panel.spec().accent);
    assert!(map.last_center().unwrap().contains(-6.35, 36.95));
}
