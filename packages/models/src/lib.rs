#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared entity types for the AirAware resolution pipeline.
//!
//! Three data providers feed the system: the LAQN reference network, the
//! Breathe London low-cost network, and the LAEI modelled concentration
//! grid. These types are the normalized shapes every crate works with,
//! loaded once per run and treated as read-only inputs.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The monitoring network a sensor belongs to.
///
/// Declaration order is priority order: reference-grade LAQN stations are
/// always preferred over calibrated low-cost Breathe London sensors.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorNetwork {
    /// London Air Quality Network: reference-grade monitoring stations.
    Laqn,
    /// Breathe London: calibrated low-cost sensor network.
    BreatheLondon,
}

impl SensorNetwork {
    /// LAQN stations are reference-grade instruments.
    #[must_use]
    pub const fn is_reference_grade(self) -> bool {
        matches!(self, Self::Laqn)
    }
}

/// Site classification for a monitoring location.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SiteType {
    Roadside,
    UrbanBackground,
    Suburban,
    Industrial,
    Kerbside,
    Rural,
}

/// An air quality monitoring sensor, geolocated in WGS84.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    /// Unique site code within the combined networks (e.g. "MY1", "CLDP0452").
    pub site_code: String,
    /// Human-readable site name.
    pub name: String,
    /// Which network operates this sensor.
    pub network: SensorNetwork,
    /// Site classification (roadside, urban background, ...).
    pub site_type: SiteType,
    /// Borough the sensor is located in.
    pub borough: Option<String>,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Whether the sensor is currently operating. Inactive sensors are
    /// excluded from matching.
    pub is_active: bool,
    /// Date the site was commissioned, when known.
    pub date_opened: Option<NaiveDate>,
    /// Date the site was decommissioned, when known.
    pub date_closed: Option<NaiveDate>,
}

/// GIAS phase of education for a school.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(serialize_all = "title_case")]
pub enum SchoolPhase {
    Nursery,
    Primary,
    #[strum(serialize = "All-through")]
    #[serde(rename = "All-through")]
    AllThrough,
}

/// A school location, the point of interest each resolution runs against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct School {
    /// GIAS unique reference number.
    pub urn: u32,
    /// School name.
    pub name: String,
    /// Phase of education.
    pub phase: SchoolPhase,
    /// Postcode.
    pub postcode: String,
    /// Local authority (borough) the school falls under.
    pub local_authority: String,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Latitude (WGS84).
    pub latitude: f64,
}

/// Pollutants carried by the LAEI modelled grids.
///
/// Serialized with the LAEI 2022 column keys (`NO2`, `NOx`, `PM25`,
/// `PM10_mean`, `PM10_days`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Pollutant {
    /// Nitrogen dioxide, annual mean µg/m³.
    #[strum(serialize = "NO2")]
    #[serde(rename = "NO2")]
    No2,
    /// Oxides of nitrogen, annual mean µg/m³.
    #[strum(serialize = "NOx")]
    #[serde(rename = "NOx")]
    Nox,
    /// Fine particulate matter, annual mean µg/m³.
    #[strum(serialize = "PM25")]
    #[serde(rename = "PM25")]
    Pm25,
    /// Coarse particulate matter, annual mean µg/m³.
    #[strum(serialize = "PM10_mean")]
    #[serde(rename = "PM10_mean")]
    Pm10Mean,
    /// Days per year exceeding the PM10 daily limit.
    #[strum(serialize = "PM10_days")]
    #[serde(rename = "PM10_days")]
    Pm10Days,
}

/// One cell of the modelled concentration grid.
///
/// Native coordinates are British National Grid (meters); the WGS84
/// centroid is derived when the cell is materialized so distance logic
/// never sees easting/northing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    /// Easting of the cell centre (BNG, meters).
    pub easting: f64,
    /// Northing of the cell centre (BNG, meters).
    pub northing: f64,
    /// Longitude of the cell centroid (WGS84).
    pub longitude: f64,
    /// Latitude of the cell centroid (WGS84).
    pub latitude: f64,
    /// Modelled annual-mean concentration per pollutant (µg/m³).
    ///
    /// Pollutants with NODATA at this cell are absent from the map.
    pub concentrations: BTreeMap<Pollutant, f64>,
}

impl GridCell {
    /// Concentration for a single pollutant, if modelled at this cell.
    #[must_use]
    pub fn concentration(&self, pollutant: Pollutant) -> Option<f64> {
        self.concentrations.get(&pollutant).copied()
    }
}

/// Which tier of the source hierarchy a school resolved to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSource {
    /// Matched a reference-grade (LAQN) sensor within threshold.
    Reference,
    /// Matched a low-cost (Breathe London) sensor within threshold.
    LowCost,
    /// No sensor within threshold; modelled grid value used.
    Modelled,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn network_priority_order() {
        assert!(SensorNetwork::Laqn < SensorNetwork::BreatheLondon);
        assert!(SensorNetwork::Laqn.is_reference_grade());
        assert!(!SensorNetwork::BreatheLondon.is_reference_grade());
    }

    #[test]
    fn network_round_trips_through_strings() {
        assert_eq!(SensorNetwork::Laqn.to_string(), "LAQN");
        assert_eq!(SensorNetwork::BreatheLondon.to_string(), "BREATHE_LONDON");
        assert_eq!(
            SensorNetwork::from_str("LAQN").unwrap(),
            SensorNetwork::Laqn
        );
    }

    #[test]
    fn site_type_parses_snake_case() {
        assert_eq!(
            SiteType::from_str("urban_background").unwrap(),
            SiteType::UrbanBackground
        );
        assert_eq!(SiteType::Kerbside.to_string(), "kerbside");
    }

    #[test]
    fn pollutant_uses_laei_keys() {
        assert_eq!(Pollutant::No2.to_string(), "NO2");
        assert_eq!(Pollutant::Nox.to_string(), "NOx");
        assert_eq!(Pollutant::Pm10Mean.to_string(), "PM10_mean");
        assert_eq!(Pollutant::from_str("PM10_days").unwrap(), Pollutant::Pm10Days);
    }

    #[test]
    fn grid_cell_concentration_lookup() {
        let mut concentrations = BTreeMap::new();
        concentrations.insert(Pollutant::No2, 31.4);

        let cell = GridCell {
            easting: 530_010.0,
            northing: 180_010.0,
            longitude: -0.128,
            latitude: 51.504,
            concentrations,
        };

        assert_eq!(cell.concentration(Pollutant::No2), Some(31.4));
        assert_eq!(cell.concentration(Pollutant::Pm25), None);
    }
}
