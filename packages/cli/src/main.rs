#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI for the AirAware assignment pipeline.
//!
//! `assign` resolves every school in a `GeoJSON` file against the sensor
//! networks and the LAEI grid, writing a per-school CSV and a JSON
//! summary. `probe` resolves a single point, for spot-checking individual
//! locations.

mod report;

use std::path::PathBuf;

use airaware_resolver::{DEFAULT_THRESHOLD_M, Resolver, ResolverConfig};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "airaware", about = "School air-quality source assignment")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign every school its best available data source
    Assign {
        /// `GeoJSON` file of school locations
        #[arg(long)]
        schools: PathBuf,
        /// CSV file of sensors across both networks
        #[arg(long)]
        sensors: PathBuf,
        /// Directory holding the LAEI `.asc` rasters
        #[arg(long)]
        laei_dir: PathBuf,
        /// Sensor match threshold in meters
        #[arg(long, default_value_t = DEFAULT_THRESHOLD_M)]
        threshold: f64,
        /// Write per-school assignments to this CSV file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Write the bucket summary to this JSON file
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// Resolve a single point and print the result as JSON
    Probe {
        /// CSV file of sensors across both networks
        #[arg(long)]
        sensors: PathBuf,
        /// Directory holding the LAEI `.asc` rasters
        #[arg(long)]
        laei_dir: PathBuf,
        /// Longitude (WGS84)
        #[arg(long)]
        lon: f64,
        /// Latitude (WGS84)
        #[arg(long)]
        lat: f64,
        /// Sensor match threshold in meters
        #[arg(long, default_value_t = DEFAULT_THRESHOLD_M)]
        threshold: f64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Assign {
            schools,
            sensors,
            laei_dir,
            threshold,
            output,
            summary,
        } => run_assign(&schools, &sensors, &laei_dir, threshold, output.as_deref(), summary.as_deref()),
        Commands::Probe {
            sensors,
            laei_dir,
            lon,
            lat,
            threshold,
        } => run_probe(&sensors, &laei_dir, lon, lat, threshold),
    }
}

fn run_assign(
    schools_path: &std::path::Path,
    sensors_path: &std::path::Path,
    laei_dir: &std::path::Path,
    threshold: f64,
    output: Option<&std::path::Path>,
    summary_path: Option<&std::path::Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let schools = airaware_ingest::load_schools(schools_path)?;
    let sensors = airaware_ingest::load_sensors(sensors_path)?;
    let grid = airaware_grid::PollutionGrid::load_laei_dir(laei_dir)?;

    let resolver = Resolver::new(&sensors, &grid, ResolverConfig { threshold_m: threshold });
    let outcome = resolver.resolve_all(&schools)?;
    let counts = outcome.summary();

    log::info!("Data source breakdown (threshold {threshold} m):");
    log::info!(
        "  REFERENCE: {:4} ({:.1}%)",
        counts.reference,
        counts.share(counts.reference)
    );
    log::info!(
        "  LOW_COST:  {:4} ({:.1}%)",
        counts.low_cost,
        counts.share(counts.low_cost)
    );
    log::info!(
        "  MODELLED:  {:4} ({:.1}%)",
        counts.modelled,
        counts.share(counts.modelled)
    );
    log::info!(
        "  UNRESOLVED:{:4} ({:.1}%)",
        counts.unresolved,
        counts.share(counts.unresolved)
    );

    if let Some(path) = output {
        report::write_assignments(path, &outcome)?;
    }
    if let Some(path) = summary_path {
        report::write_summary(path, &report::SummaryReport::new(threshold, counts))?;
    }

    Ok(())
}

fn run_probe(
    sensors_path: &std::path::Path,
    laei_dir: &std::path::Path,
    lon: f64,
    lat: f64,
    threshold: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let sensors = airaware_ingest::load_sensors(sensors_path)?;
    let grid = airaware_grid::PollutionGrid::load_laei_dir(laei_dir)?;

    let resolver = Resolver::new(&sensors, &grid, ResolverConfig { threshold_m: threshold });
    let resolution = resolver.resolve_at(lon, lat)?;

    let json = serde_json::json!({
        "source": resolution.source,
        "siteCode": resolution.sensor.map(|s| s.site_code.clone()),
        "network": resolution.sensor.map(|s| s.network),
        "distanceM": resolution.distance_m,
        "baseline": resolution.baseline,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);

    Ok(())
}
