#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hierarchical data-source resolution for school locations.
//!
//! Each school resolves against three tiers in strict priority order,
//! short-circuiting on the first match:
//!
//! 1. reference-grade (LAQN) sensors within the threshold distance,
//! 2. low-cost (Breathe London) sensors within the threshold,
//! 3. the LAEI modelled grid at the school's coordinates.
//!
//! The tier order is load-bearing: a nearby low-cost sensor must never
//! shadow a reference station, and the grid is only consulted as a source
//! of record when no sensor is in range. The modelled value is still
//! attached to every resolution as a baseline for cross-comparison.

pub mod batch;

use airaware_grid::{GridError, PollutionGrid};
use airaware_models::{DataSource, GridCell, School, Sensor};
use airaware_spatial::SensorIndex;

pub use batch::{Assignment, BatchError, BatchOutcome, BatchSummary};

/// Default sensor match threshold (meters).
pub const DEFAULT_THRESHOLD_M: f64 = 500.0;

/// Tunable parameters for a resolution run.
#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    /// Maximum distance at which a sensor is considered representative of
    /// a school (meters). A match requires `distance <= threshold_m`.
    pub threshold_m: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            threshold_m: DEFAULT_THRESHOLD_M,
        }
    }
}

/// The outcome of resolving one school.
#[derive(Debug, Clone)]
pub struct Resolution<'a> {
    /// Which tier won.
    pub source: DataSource,
    /// The matched sensor, for sensor-tier resolutions.
    pub sensor: Option<&'a Sensor>,
    /// Distance to the matched sensor (meters). Only sensor matches have
    /// a distance.
    pub distance_m: Option<f64>,
    /// The modelled grid cell at the school's location, attached
    /// regardless of the winning tier. `None` only when a sensor matched
    /// a school outside the modelled extent.
    pub baseline: Option<GridCell>,
}

/// Errors from per-school resolution.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    /// No sensor within threshold and no grid coverage. Surfaced
    /// explicitly so no school silently disappears from a run.
    #[error(
        "No data source at ({longitude}, {latitude}): no sensor within {threshold_m} m and no grid coverage"
    )]
    Unresolvable {
        /// Query longitude (WGS84).
        longitude: f64,
        /// Query latitude (WGS84).
        latitude: f64,
        /// Threshold the sensor tiers were searched with (meters).
        threshold_m: f64,
    },
}

/// The resolution engine: a sensor index and a grid, shared read-only,
/// plus the threshold configuration.
pub struct Resolver<'a> {
    index: SensorIndex<'a>,
    grid: &'a PollutionGrid,
    config: ResolverConfig,
}

impl<'a> Resolver<'a> {
    /// Builds a resolver over loaded inputs. The sensor index is built
    /// here, once, and reused by every resolution.
    #[must_use]
    pub fn new(sensors: &'a [Sensor], grid: &'a PollutionGrid, config: ResolverConfig) -> Self {
        Self {
            index: SensorIndex::build(sensors),
            grid,
            config,
        }
    }

    /// The threshold this resolver matches sensors within (meters).
    #[must_use]
    pub const fn threshold_m(&self) -> f64 {
        self.config.threshold_m
    }

    /// Resolves a single school.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Unresolvable`] when no tier matches.
    pub fn resolve(&self, school: &School) -> Result<Resolution<'a>, ResolveError> {
        self.resolve_at(school.longitude, school.latitude)
    }

    /// Resolves an arbitrary WGS84 point through the tier hierarchy.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Unresolvable`] when no sensor is within
    /// the threshold and the point has no grid coverage.
    pub fn resolve_at(&self, longitude: f64, latitude: f64) -> Result<Resolution<'a>, ResolveError> {
        let threshold_m = self.config.threshold_m;

        // The grid is consulted for every resolution: as the baseline for
        // sensor matches and as the terminal tier otherwise.
        let baseline = match self.grid.lookup(longitude, latitude) {
            Ok(cell) => Some(cell),
            Err(GridError::NoGridCoverage { .. }) => None,
            Err(GridError::Coordinate(e)) => {
                log::warn!("Grid lookup skipped at ({longitude}, {latitude}): {e}");
                None
            }
            // Load-time error kinds cannot occur during lookup.
            Err(e) => {
                log::warn!("Grid lookup failed at ({longitude}, {latitude}): {e}");
                None
            }
        };

        if let Some(nearest) = self
            .index
            .reference_within(longitude, latitude, threshold_m)
            .first()
        {
            return Ok(Resolution {
                source: DataSource::Reference,
                sensor: Some(nearest.sensor),
                distance_m: Some(nearest.distance_m),
                baseline,
            });
        }

        if let Some(nearest) = self
            .index
            .low_cost_within(longitude, latitude, threshold_m)
            .first()
        {
            return Ok(Resolution {
                source: DataSource::LowCost,
                sensor: Some(nearest.sensor),
                distance_m: Some(nearest.distance_m),
                baseline,
            });
        }

        match baseline {
            Some(cell) => Ok(Resolution {
                source: DataSource::Modelled,
                sensor: None,
                distance_m: None,
                baseline: Some(cell),
            }),
            None => Err(ResolveError::Unresolvable {
                longitude,
                latitude,
                threshold_m,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use airaware_geo::bng_to_wgs84;
    use airaware_grid::AsciiGrid;
    use airaware_models::{Pollutant, SchoolPhase, SensorNetwork, SiteType};

    use super::*;

    pub(crate) fn sensor(
        site_code: &str,
        network: SensorNetwork,
        lon: f64,
        lat: f64,
    ) -> Sensor {
        Sensor {
            site_code: site_code.to_string(),
            name: format!("Test site {site_code}"),
            network,
            site_type: SiteType::UrbanBackground,
            borough: Some("Lambeth".to_string()),
            longitude: lon,
            latitude: lat,
            is_active: true,
            date_opened: None,
            date_closed: None,
        }
    }

    pub(crate) fn school(urn: u32, lon: f64, lat: f64) -> School {
        School {
            urn,
            name: format!("Test school {urn}"),
            phase: SchoolPhase::Primary,
            postcode: "SW9 9ZZ".to_string(),
            local_authority: "Lambeth".to_string(),
            longitude: lon,
            latitude: lat,
        }
    }

    /// 10x10 cells of 20 m covering BNG 529900..530100 / 179900..180100,
    /// NO2 = 31.4 everywhere.
    pub(crate) fn fixture_grid() -> PollutionGrid {
        let mut grids = BTreeMap::new();
        grids.insert(
            Pollutant::No2,
            AsciiGrid::from_parts(10, 10, 529_900.0, 179_900.0, 20.0, -9999.0, vec![31.4; 100])
                .unwrap(),
        );
        PollutionGrid::from_grids(grids).unwrap()
    }

    /// A WGS84 point whose enclosing fixture cell is centred on
    /// (530010, 180010).
    pub(crate) fn covered_point() -> (f64, f64) {
        bng_to_wgs84(530_010.0, 180_010.0).unwrap()
    }

    #[test]
    fn reference_sensor_at_zero_distance_always_wins() {
        let (lon, lat) = covered_point();
        let sensors = vec![
            sensor("REF1", SensorNetwork::Laqn, lon, lat),
            sensor("LOW1", SensorNetwork::BreatheLondon, lon, lat),
        ];
        let grid = fixture_grid();
        let resolver = Resolver::new(&sensors, &grid, ResolverConfig::default());

        let resolution = resolver.resolve_at(lon, lat).unwrap();
        assert_eq!(resolution.source, DataSource::Reference);
        assert_eq!(resolution.sensor.unwrap().site_code, "REF1");
        assert!(resolution.distance_m.unwrap() < 1.0);
        // Baseline is attached even though a sensor won.
        assert!(resolution.baseline.is_some());
    }

    #[test]
    fn low_cost_fills_in_when_no_reference_is_in_range() {
        let (lon, lat) = covered_point();
        let sensors = vec![sensor("LOW1", SensorNetwork::BreatheLondon, lon, lat)];
        let grid = fixture_grid();
        let resolver = Resolver::new(&sensors, &grid, ResolverConfig::default());

        let resolution = resolver.resolve_at(lon, lat).unwrap();
        assert_eq!(resolution.source, DataSource::LowCost);
        assert_eq!(resolution.sensor.unwrap().site_code, "LOW1");
    }

    #[test]
    fn out_of_range_low_cost_falls_through_to_modelled() {
        let (lon, lat) = covered_point();
        // ~600 m north of the school: outside the default 500 m threshold.
        let sensors = vec![sensor(
            "LOW1",
            SensorNetwork::BreatheLondon,
            lon,
            lat + 0.0054,
        )];
        let grid = fixture_grid();
        let resolver = Resolver::new(&sensors, &grid, ResolverConfig::default());

        let resolution = resolver.resolve_at(lon, lat).unwrap();
        assert_eq!(resolution.source, DataSource::Modelled);
        assert!(resolution.sensor.is_none());
        assert!(resolution.distance_m.is_none());
    }

    #[test]
    fn threshold_is_configurable() {
        let (lon, lat) = covered_point();
        let sensors = vec![sensor(
            "LOW1",
            SensorNetwork::BreatheLondon,
            lon,
            lat + 0.0054,
        )];
        let grid = fixture_grid();
        let resolver = Resolver::new(&sensors, &grid, ResolverConfig { threshold_m: 1_000.0 });

        let resolution = resolver.resolve_at(lon, lat).unwrap();
        assert_eq!(resolution.source, DataSource::LowCost);
        let d = resolution.distance_m.unwrap();
        assert!((500.0..700.0).contains(&d), "distance was {d}");
    }

    #[test]
    fn modelled_resolution_matches_a_direct_grid_lookup() {
        let (lon, lat) = covered_point();
        let grid = fixture_grid();
        let resolver = Resolver::new(&[], &grid, ResolverConfig::default());

        let resolution = resolver.resolve_at(lon, lat).unwrap();
        assert_eq!(resolution.source, DataSource::Modelled);

        let direct = grid.lookup(lon, lat).unwrap();
        assert_eq!(resolution.baseline.unwrap(), direct);
    }

    #[test]
    fn sensor_match_outside_grid_coverage_has_no_baseline() {
        // Well inside the National Grid domain, far from the fixture tile.
        let (lon, lat) = bng_to_wgs84(600_000.0, 250_000.0).unwrap();
        let sensors = vec![sensor("REF1", SensorNetwork::Laqn, lon, lat)];
        let grid = fixture_grid();
        let resolver = Resolver::new(&sensors, &grid, ResolverConfig::default());

        let resolution = resolver.resolve_at(lon, lat).unwrap();
        assert_eq!(resolution.source, DataSource::Reference);
        assert!(resolution.baseline.is_none());
    }

    #[test]
    fn nothing_in_range_anywhere_is_unresolvable() {
        let (lon, lat) = bng_to_wgs84(600_000.0, 250_000.0).unwrap();
        let grid = fixture_grid();
        let resolver = Resolver::new(&[], &grid, ResolverConfig::default());

        assert!(matches!(
            resolver.resolve_at(lon, lat),
            Err(ResolveError::Unresolvable { .. })
        ));
    }

    #[test]
    fn equidistant_reference_sensors_resolve_to_the_lower_site_code() {
        let (lon, lat) = covered_point();
        let sensors = vec![
            sensor("ZZ9", SensorNetwork::Laqn, lon + 0.001, lat),
            sensor("AA1", SensorNetwork::Laqn, lon - 0.001, lat),
        ];
        let grid = fixture_grid();
        let resolver = Resolver::new(&sensors, &grid, ResolverConfig::default());

        let resolution = resolver.resolve_at(lon, lat).unwrap();
        assert_eq!(resolution.sensor.unwrap().site_code, "AA1");
    }
}
