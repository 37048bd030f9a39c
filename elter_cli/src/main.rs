//! # eLTER Toolbar CLI
//!
//! Headless front-end to the toolbar panels: list networks and sites, apply
//! a product for a site, export it, and record field feedback. Each command
//! drives the same panel controller the GUI uses, against a recording map.
//!
//! `--dry-run` swaps the DEIMS and compute clients for in-memory services.

use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::{Parser, Subcommand};

use elter_core::config::DEFAULT_CONFIG_FILE;
use elter_core::feedback::FeedbackForm;
use elter_core::memory::{InMemoryDirectory, RecordingCompute, RecordingMap};
use elter_core::panel::OutputLevel;
use elter_core::products::ProductKind;
use elter_core::{Catalog, ExportOptions, PanelController, Session, ToolbarConfig, ToolbarResult};

#[derive(Parser)]
#[command(name = "elter")]
#[command(author, version, about = "eLTER site map toolbar, headless", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Use in-memory services instead of DEIMS and the compute service
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the national eLTER networks
    Networks,
    /// List the mapped sites of a network
    Sites {
        /// Network name, e.g. "Spain"
        network: String,
    },
    /// Build a product for a site and show where it was rendered
    Apply {
        /// phenology, water or lst
        product: String,
        #[arg(short, long)]
        network: String,
        #[arg(short, long)]
        site: String,
        /// Parameter as key=value, repeatable (e.g. -p year=2020)
        #[arg(short, long = "param")]
        params: Vec<String>,
    },
    /// Build a product and start a server-side export of it
    Export {
        /// phenology, water or lst
        product: String,
        #[arg(short, long)]
        network: String,
        #[arg(short, long)]
        site: String,
        #[arg(short, long = "param")]
        params: Vec<String>,
        /// Pixel size in metres
        #[arg(long, default_value = "30")]
        scale: String,
        /// EPSG code, with or without the "EPSG:" prefix
        #[arg(long, default_value = "4326")]
        crs: String,
        /// Output file name (defaults to the raster name)
        #[arg(long, default_value = "")]
        name: String,
    },
    /// Record a field observation
    Feedback {
        #[arg(long)]
        collector: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long)]
        site: String,
        #[arg(long, default_value = "2017")]
        year: i32,
        /// SOS, MOS or EOS
        #[arg(long)]
        metric: Option<String>,
        #[arg(long, default_value = "162")]
        doy: u16,
        #[arg(long)]
        water: bool,
        #[arg(long, default_value = "5.0")]
        depth_min: f64,
        #[arg(long, default_value = "7.5")]
        depth_max: f64,
        #[arg(long, default_value = "25.5", allow_hyphen_values = true)]
        temperature: f64,
        #[arg(long, default_value = "37.8756", allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, default_value = "-6.8756", allow_hyphen_values = true)]
        lon: f64,
        /// CSV file to attach
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Base name of the copied CSV
        #[arg(long, default_value = "")]
        csv_name: String,
    },
    /// Write a configuration file with the defaults
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            if cli.json {
                if let Ok(json) = serde_json::to_string_pretty(&e) {
                    eprintln!("{}", json);
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn session(cli: &Cli) -> ToolbarResult<Session> {
    let config = ToolbarConfig::load(&cli.config)?;
    if cli.dry_run {
        log::info!("Dry run: in-memory site directory and compute service");
        let catalog = Catalog::builtin()?;
        return Ok(Session::new(
            Rc::new(InMemoryDirectory::demo(&catalog)),
            Rc::new(RecordingCompute::new()),
            config,
            catalog,
        ));
    }
    Session::connect(config)
}

/// Returns `Ok(false)` when the panel reported an error
fn run(cli: &Cli) -> ToolbarResult<bool> {
    match &cli.command {
        Commands::Networks => {
            let catalog = Catalog::builtin()?;
            if cli.json {
                print_json(&catalog.networks);
            } else {
                for network in &catalog.networks {
                    println!("{:<14} {}", network.name, network.id);
                }
            }
            Ok(true)
        }
        Commands::Sites { network } => {
            let session = session(cli)?;
            let mut map = RecordingMap::new();
            let mut panel = session.open_panel(ProductKind::Phenology, &mut map);
            panel.select_network(network);
            if cli.json {
                print_json(&panel.site_names());
            } else {
                for name in panel.site_names() {
                    println!("{}", name);
                }
            }
            Ok(finish(&panel, cli.json))
        }
        Commands::Apply {
            product,
            network,
            site,
            params,
        } => {
            let session = session(cli)?;
            let mut map = RecordingMap::new();
            let (panel, _) = applied_panel(&session, &mut map, product, network, site, params)?;
            if cli.json {
                print_json(&map.layers());
            } else {
                for layer in map.layers() {
                    println!("{}  {}", layer.name, layer.tiles.url_template);
                }
            }
            Ok(finish(&panel, cli.json))
        }
        Commands::Export {
            product,
            network,
            site,
            params,
            scale,
            crs,
            name,
        } => {
            let session = session(cli)?;
            let mut map = RecordingMap::new();
            let (mut panel, raster) = applied_panel(&session, &mut map, product, network, site, params)?;
            if raster.is_some() {
                let ticket = panel.export(&ExportOptions {
                    raster,
                    scale: scale.clone(),
                    crs: crs.clone(),
                    file_name: name.clone(),
                });
                if let (Some(ticket), true) = (ticket, cli.json) {
                    print_json(&ticket);
                }
            }
            Ok(finish(&panel, cli.json))
        }
        Commands::Feedback {
            collector,
            email,
            site,
            year,
            metric,
            doy,
            water,
            depth_min,
            depth_max,
            temperature,
            lat,
            lon,
            csv,
            csv_name,
        } => {
            let config = ToolbarConfig::load(&cli.config)?;
            let form = FeedbackForm {
                collector_name: collector.clone(),
                collector_email: email.clone(),
                site: site.clone(),
                year: *year,
                phenometric: metric.as_ref().map(|m| m.to_uppercase()),
                day_of_year: *doy,
                water_presence: *water,
                depth: (*depth_min, *depth_max),
                temperature: *temperature,
                latitude: *lat,
                longitude: *lon,
                attachment: csv.clone(),
                file_base_name: csv_name.clone(),
            };
            let user = std::env::var("USER").unwrap_or_else(|_| collector.clone());
            let receipt = form.submit(&config.data_dir, &user)?;
            println!("{}", receipt.message);
            if let Some(copy) = receipt.csv_copy {
                println!("CSV saved to {}", copy.display());
            }
            Ok(true)
        }
        Commands::InitConfig { force } => {
            if cli.config.exists() && !force {
                eprintln!("{} already exists (use --force to overwrite)", cli.config.display());
                return Ok(false);
            }
            ToolbarConfig::default().save(&cli.config)?;
            println!("Wrote {}", cli.config.display());
            Ok(true)
        }
    }
}

/// Open a panel, select network and site, set params and apply
fn applied_panel(
    session: &Session,
    map: &mut RecordingMap,
    product: &str,
    network: &str,
    site: &str,
    params: &[String],
) -> ToolbarResult<(PanelController, Option<String>)> {
    let kind = ProductKind::from_slug(product).ok_or_else(|| {
        elter_core::ToolbarError::invalid_input("product", product, "Expected phenology, water or lst")
    })?;

    let mut panel = session.open_panel(kind, map);
    panel.select_network(network);
    panel.select_site(map, site);
    for param in params {
        match param.split_once('=') {
            Some((key, value)) => panel.set_param_text(map, key.trim(), value),
            None => {
                return Err(elter_core::ToolbarError::invalid_input(
                    "param",
                    param.as_str(),
                    "Expected key=value",
                ))
            }
        }
    }
    let raster = panel.apply(map);
    Ok((panel, raster))
}

/// Print the panel output; false if it holds an error
fn finish(panel: &PanelController, json: bool) -> bool {
    for line in panel.output().lines() {
        match line.level {
            OutputLevel::Info if json => {}
            OutputLevel::Info => println!("{}", line),
            _ => eprintln!("{}", line),
        }
    }
    !panel.output().has_errors()
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Could not serialize output: {}", e),
    }
}
