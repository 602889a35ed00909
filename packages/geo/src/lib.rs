#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate normalization and great-circle distance.
//!
//! Everything upstream of the resolver speaks one of two frames: British
//! National Grid (easting/northing in meters, used by the LAEI rasters and
//! GIAS school exports) and WGS84 (used by both sensor networks). This
//! crate converts between the two and measures distance, so that frame
//! mixing is confined here and never leaks into comparison logic.

pub mod bng;
pub mod distance;

pub use bng::{bng_to_wgs84, wgs84_to_bng};
pub use distance::{EARTH_RADIUS_M, haversine_m};

/// Errors from coordinate conversion.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoError {
    /// Easting/northing outside the National Grid domain, or non-finite.
    #[error("easting/northing ({easting}, {northing}) outside the National Grid domain")]
    InvalidCoordinate {
        /// Offending easting (meters).
        easting: f64,
        /// Offending northing (meters).
        northing: f64,
    },

    /// Longitude/latitude outside the region the projection covers, or
    /// non-finite.
    #[error("lon/lat ({longitude}, {latitude}) outside the projected region")]
    InvalidPosition {
        /// Offending longitude (degrees).
        longitude: f64,
        /// Offending latitude (degrees).
        latitude: f64,
    },
}
