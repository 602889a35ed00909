//! Sensor loading from CSV.
//!
//! One file covers both networks, one row per site. Rows are deserialized
//! into a raw shape first, then validated and converted; rows that fail
//! validation are skipped with a warning. Site codes are unique, so later
//! duplicates are dropped.

use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr as _;

use airaware_models::{Sensor, SensorNetwork, SiteType};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::IngestError;

/// A sensor row as it appears in the CSV, before validation.
#[derive(Debug, Deserialize)]
struct RawSensor {
    site_code: String,
    name: String,
    network: String,
    site_type: String,
    #[serde(default)]
    borough: Option<String>,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    is_active: Option<bool>,
    #[serde(default)]
    date_opened: Option<NaiveDate>,
    #[serde(default)]
    date_closed: Option<NaiveDate>,
}

impl RawSensor {
    /// Validates and converts a raw row. `None` means the row should be
    /// skipped.
    fn into_sensor(self) -> Option<Sensor> {
        let site_code = self.site_code.trim().to_string();
        if site_code.is_empty() {
            return None;
        }
        if !self.longitude.is_finite() || !self.latitude.is_finite() {
            return None;
        }

        let network = SensorNetwork::from_str(self.network.trim()).ok()?;
        let site_type = SiteType::from_str(self.site_type.trim()).ok()?;

        Some(Sensor {
            site_code,
            name: self.name.trim().to_string(),
            network,
            site_type,
            borough: self
                .borough
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            longitude: self.longitude,
            latitude: self.latitude,
            is_active: self.is_active.unwrap_or(true),
            date_opened: self.date_opened,
            date_closed: self.date_closed,
        })
    }
}

/// Loads the combined sensor list from a CSV file.
///
/// # Errors
///
/// Returns an error when the file cannot be read or a row cannot be
/// deserialized at all; rows that deserialize but fail validation are
/// skipped with a warning.
pub fn load_sensors(path: impl AsRef<Path>) -> Result<Vec<Sensor>, IngestError> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).map_err(|e| IngestError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut sensors = Vec::new();
    let mut seen = BTreeSet::new();
    let mut skipped = 0_usize;

    for record in reader.deserialize::<RawSensor>() {
        let raw = record.map_err(|e| IngestError::Csv {
            path: path.display().to_string(),
            source: e,
        })?;

        let code = raw.site_code.trim().to_string();
        let Some(sensor) = raw.into_sensor() else {
            log::warn!("Skipping invalid sensor row (site code {code:?})");
            skipped += 1;
            continue;
        };

        if !seen.insert(sensor.site_code.clone()) {
            log::warn!("Duplicate site code {}, keeping the first", sensor.site_code);
            skipped += 1;
            continue;
        }

        sensors.push(sensor);
    }

    log::info!(
        "Loaded {} sensors from {} ({} rows skipped)",
        sensors.len(),
        path.display(),
        skipped
    );

    Ok(sensors)
}
