#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Loaders for the resolver's input files.
//!
//! Schools arrive as a `GeoJSON` `FeatureCollection` of Point features
//! (the GIAS processing step's output); sensors arrive as a combined CSV
//! covering both networks. Records that fail validation are skipped with
//! a warning rather than failing the load; a handful of malformed rows
//! must not abort a run.

pub mod schools;
pub mod sensors;

pub use schools::load_schools;
pub use sensors::load_sensors;

/// Errors from input loading.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// I/O error reading an input file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// CSV parsing error.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Path to the CSV file.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// `GeoJSON` parsing error.
    #[error("GeoJSON error in {path}: {source}")]
    GeoJson {
        /// Path to the `GeoJSON` file.
        path: String,
        /// Underlying `GeoJSON` error.
        source: geojson::Error,
    },

    /// The file parsed but is not the expected shape.
    #[error("Unexpected format in {path}: {message}")]
    Format {
        /// Path to the offending file.
        path: String,
        /// Description of the mismatch.
        message: String,
    },
}
