#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Modelled concentration grid: LAEI raster loading and point lookup.
//!
//! The rasters stay in native British National Grid coordinates in memory;
//! a lookup reprojects the WGS84 query point once, floor-divides into the
//! enclosing cell, and materializes a [`GridCell`] carrying every
//! pollutant modelled at that location plus the cell's derived WGS84
//! centroid.

pub mod ascii;

use std::collections::BTreeMap;
use std::path::Path;

use airaware_geo::{GeoError, bng_to_wgs84, wgs84_to_bng};
use airaware_models::{GridCell, Pollutant};

pub use ascii::AsciiGrid;

/// LAEI 2022 raster file name for each pollutant.
const LAEI_FILES: &[(Pollutant, &str)] = &[
    (Pollutant::No2, "LAEI2022_V1_NO2.asc"),
    (Pollutant::Nox, "LAEI2022_V1_NOx.asc"),
    (Pollutant::Pm25, "LAEI2022_V1_PM25.asc"),
    (Pollutant::Pm10Mean, "LAEI2022_V1_PM10m.asc"),
    (Pollutant::Pm10Days, "LAEI2022_V1_PM10d.asc"),
];

/// Errors from grid loading and lookup.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// I/O error reading a raster file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Malformed raster header or body.
    #[error("Parse error in {path}: {message}")]
    Parse {
        /// Path to the raster file.
        path: String,
        /// Description of what was malformed.
        message: String,
    },

    /// Pollutant rasters in one grid set must share extent and resolution.
    #[error("Raster for {pollutant} does not match the grid set's geometry")]
    GeometryMismatch {
        /// Pollutant whose raster disagrees.
        pollutant: Pollutant,
    },

    /// No raster files were found where the grid set was expected.
    #[error("No LAEI rasters found under {dir}")]
    NoRasters {
        /// Directory that was searched.
        dir: String,
    },

    /// The point lies outside the modelled region (or on NODATA in every
    /// raster). There is no tier below the grid, so the caller must treat
    /// this as a hard failure for the point.
    #[error("No grid coverage at easting/northing ({easting}, {northing})")]
    NoGridCoverage {
        /// Query easting (BNG meters).
        easting: f64,
        /// Query northing (BNG meters).
        northing: f64,
    },

    /// Coordinate conversion failed for the query point.
    #[error(transparent)]
    Coordinate(#[from] GeoError),
}

/// The full set of pollutant rasters for one modelled-grid release.
///
/// All rasters are validated to share the same geometry, so a single cell
/// index addresses every pollutant.
pub struct PollutionGrid {
    grids: BTreeMap<Pollutant, AsciiGrid>,
}

impl PollutionGrid {
    /// Assembles a grid set from per-pollutant rasters.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::NoRasters`] when `grids` is empty and
    /// [`GridError::GeometryMismatch`] when the rasters disagree on extent
    /// or resolution.
    pub fn from_grids(grids: BTreeMap<Pollutant, AsciiGrid>) -> Result<Self, GridError> {
        let Some(first) = grids.values().next() else {
            return Err(GridError::NoRasters {
                dir: "<memory>".to_string(),
            });
        };

        for (pollutant, grid) in &grids {
            if !grid.same_geometry(first) {
                return Err(GridError::GeometryMismatch {
                    pollutant: *pollutant,
                });
            }
        }

        Ok(Self { grids })
    }

    /// Loads the LAEI raster set from a directory using the release's file
    /// naming. Missing pollutant files are skipped with a warning; at
    /// least one raster must be present.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::NoRasters`] when no raster file is found, or
    /// a read/parse error from the individual rasters.
    pub fn load_laei_dir(dir: impl AsRef<Path>) -> Result<Self, GridError> {
        let dir = dir.as_ref();
        let mut grids = BTreeMap::new();

        for (pollutant, file_name) in LAEI_FILES {
            let path = dir.join(file_name);
            if !path.exists() {
                log::warn!("Raster not found, skipping {pollutant}: {}", path.display());
                continue;
            }
            grids.insert(*pollutant, AsciiGrid::read(&path)?);
        }

        if grids.is_empty() {
            return Err(GridError::NoRasters {
                dir: dir.display().to_string(),
            });
        }

        log::info!("Loaded {} pollutant rasters from {}", grids.len(), dir.display());
        Self::from_grids(grids)
    }

    /// Pollutants present in this grid set.
    pub fn pollutants(&self) -> impl Iterator<Item = Pollutant> + '_ {
        self.grids.keys().copied()
    }

    /// Resolves a WGS84 point to its enclosing modelled cell.
    ///
    /// A cell resolves when at least one pollutant has data there;
    /// pollutants with NODATA at the cell are absent from the result's
    /// concentration map.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::NoGridCoverage`] when the point falls outside
    /// the modelled region, or a coordinate error when the query point
    /// cannot be projected.
    pub fn lookup(&self, longitude: f64, latitude: f64) -> Result<GridCell, GridError> {
        let (easting, northing) = wgs84_to_bng(longitude, latitude)?;

        let mut concentrations = BTreeMap::new();
        for (pollutant, grid) in &self.grids {
            if let Some(value) = grid.sample(easting, northing) {
                concentrations.insert(*pollutant, value);
            }
        }

        if concentrations.is_empty() {
            return Err(GridError::NoGridCoverage { easting, northing });
        }

        // Geometry is shared, so any raster can snap the cell centre; one
        // of them produced a value, so the index is in range.
        let (cell_e, cell_n) = self
            .grids
            .values()
            .next()
            .and_then(|grid| grid.cell_centre(easting, northing))
            .ok_or(GridError::NoGridCoverage { easting, northing })?;

        let (cell_lon, cell_lat) = bng_to_wgs84(cell_e, cell_n)?;

        Ok(GridCell {
            easting: cell_e,
            northing: cell_n,
            longitude: cell_lon,
            latitude: cell_lat,
            concentrations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_grid(value: f64) -> AsciiGrid {
        // 10x10 cells of 20 m covering BNG 529900..530100 / 179900..180100.
        AsciiGrid::from_parts(10, 10, 529_900.0, 179_900.0, 20.0, -9999.0, vec![value; 100])
            .unwrap()
    }

    fn fixture() -> PollutionGrid {
        let mut grids = BTreeMap::new();
        grids.insert(Pollutant::No2, uniform_grid(31.4));
        grids.insert(Pollutant::Pm25, uniform_grid(11.2));
        PollutionGrid::from_grids(grids).unwrap()
    }

    #[test]
    fn lookup_returns_the_enclosing_cell() {
        let grid = fixture();
        let (lon, lat) = bng_to_wgs84(530_010.0, 180_010.0).unwrap();

        let cell = grid.lookup(lon, lat).unwrap();
        assert!((cell.easting - 530_010.0).abs() < 1.0);
        assert!((cell.northing - 180_010.0).abs() < 1.0);
        assert_eq!(cell.concentration(Pollutant::No2), Some(31.4));
        assert_eq!(cell.concentration(Pollutant::Pm25), Some(11.2));
    }

    #[test]
    fn cell_centroid_round_trips_to_wgs84() {
        let grid = fixture();
        let (lon, lat) = bng_to_wgs84(530_010.0, 180_010.0).unwrap();

        let cell = grid.lookup(lon, lat).unwrap();
        let (e, n) = wgs84_to_bng(cell.longitude, cell.latitude).unwrap();
        assert!((e - cell.easting).abs() < 1.0);
        assert!((n - cell.northing).abs() < 1.0);
    }

    #[test]
    fn outside_the_extent_is_no_coverage() {
        let grid = fixture();
        // Well inside the National Grid domain, far from the fixture tile.
        let (lon, lat) = bng_to_wgs84(600_000.0, 250_000.0).unwrap();

        assert!(matches!(
            grid.lookup(lon, lat),
            Err(GridError::NoGridCoverage { .. })
        ));
    }

    #[test]
    fn partial_nodata_keeps_remaining_pollutants() {
        let nodata_everywhere = AsciiGrid::from_parts(
            10,
            10,
            529_900.0,
            179_900.0,
            20.0,
            -9999.0,
            vec![-9999.0; 100],
        )
        .unwrap();

        let mut grids = BTreeMap::new();
        grids.insert(Pollutant::No2, uniform_grid(31.4));
        grids.insert(Pollutant::Nox, nodata_everywhere);
        let grid = PollutionGrid::from_grids(grids).unwrap();

        let (lon, lat) = bng_to_wgs84(530_010.0, 180_010.0).unwrap();
        let cell = grid.lookup(lon, lat).unwrap();
        assert_eq!(cell.concentration(Pollutant::No2), Some(31.4));
        assert_eq!(cell.concentration(Pollutant::Nox), None);
    }

    #[test]
    fn mismatched_rasters_are_rejected() {
        let mut grids = BTreeMap::new();
        grids.insert(Pollutant::No2, uniform_grid(31.4));
        grids.insert(
            Pollutant::Pm25,
            AsciiGrid::from_parts(5, 5, 529_900.0, 179_900.0, 20.0, -9999.0, vec![1.0; 25])
                .unwrap(),
        );

        assert!(matches!(
            PollutionGrid::from_grids(grids),
            Err(GridError::GeometryMismatch { .. })
        ));
    }

    #[test]
    fn empty_grid_set_is_rejected() {
        assert!(matches!(
            PollutionGrid::from_grids(BTreeMap::new()),
            Err(GridError::NoRasters { .. })
        ));
    }
}
