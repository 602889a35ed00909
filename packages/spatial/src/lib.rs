#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index over the sensor networks.
//!
//! Builds one R-tree per network tier from the loaded sensor list and
//! answers "all reference/low-cost sensors within R meters of a point"
//! without scanning the full set per query. Built once per run; queries
//! share the index read-only.

use airaware_geo::haversine_m;
use airaware_models::Sensor;
use rstar::{AABB, RTree, RTreeObject};

/// Conservative meters-per-degree used to pad the query envelope. Smaller
/// than the true value at any British latitude, so the envelope is always
/// a superset of the radius circle; the haversine refinement trims it.
const M_PER_DEG: f64 = 110_000.0;

/// A sensor stored in the R-tree: its index into the source slice plus its
/// WGS84 position.
struct SensorEntry {
    index: usize,
    position: [f64; 2],
}

impl RTreeObject for SensorEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// A sensor matched by a radius query.
#[derive(Debug, Clone, Copy)]
pub struct SensorMatch<'a> {
    /// The matched sensor.
    pub sensor: &'a Sensor,
    /// Great-circle distance from the query point (meters).
    pub distance_m: f64,
}

/// Pre-built R-tree indexes over the active sensors, one per network tier.
///
/// Constructed once per run and shared read-only across all resolutions.
pub struct SensorIndex<'a> {
    sensors: &'a [Sensor],
    reference: RTree<SensorEntry>,
    low_cost: RTree<SensorEntry>,
}

impl<'a> SensorIndex<'a> {
    /// Builds the index from a loaded sensor list.
    ///
    /// Inactive sensors are excluded here so no query ever sees them.
    #[must_use]
    pub fn build(sensors: &'a [Sensor]) -> Self {
        let mut reference = Vec::new();
        let mut low_cost = Vec::new();

        for (index, sensor) in sensors.iter().enumerate() {
            if !sensor.is_active {
                continue;
            }
            let entry = SensorEntry {
                index,
                position: [sensor.longitude, sensor.latitude],
            };
            if sensor.network.is_reference_grade() {
                reference.push(entry);
            } else {
                low_cost.push(entry);
            }
        }

        log::info!(
            "Built sensor index: {} reference, {} low-cost ({} inactive excluded)",
            reference.len(),
            low_cost.len(),
            sensors.len() - reference.len() - low_cost.len()
        );

        Self {
            sensors,
            reference: RTree::bulk_load(reference),
            low_cost: RTree::bulk_load(low_cost),
        }
    }

    /// All active reference-grade sensors within `radius_m` of the point,
    /// sorted by ascending distance, ties broken by ascending site code.
    ///
    /// An empty result means no sensor is in range; it is not an error.
    #[must_use]
    pub fn reference_within(
        &self,
        longitude: f64,
        latitude: f64,
        radius_m: f64,
    ) -> Vec<SensorMatch<'a>> {
        self.within(&self.reference, longitude, latitude, radius_m)
    }

    /// All active low-cost sensors within `radius_m` of the point, with
    /// the same ordering guarantees as [`Self::reference_within`].
    #[must_use]
    pub fn low_cost_within(
        &self,
        longitude: f64,
        latitude: f64,
        radius_m: f64,
    ) -> Vec<SensorMatch<'a>> {
        self.within(&self.low_cost, longitude, latitude, radius_m)
    }

    fn within(
        &self,
        tree: &RTree<SensorEntry>,
        longitude: f64,
        latitude: f64,
        radius_m: f64,
    ) -> Vec<SensorMatch<'a>> {
        let pad_lat = radius_m / M_PER_DEG;
        let pad_lon = radius_m / (M_PER_DEG * latitude.to_radians().cos().max(0.01));
        let envelope = AABB::from_corners(
            [longitude - pad_lon, latitude - pad_lat],
            [longitude + pad_lon, latitude + pad_lat],
        );

        let mut matches: Vec<SensorMatch<'a>> = tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|entry| {
                let sensor = &self.sensors[entry.index];
                let distance_m = haversine_m(latitude, longitude, sensor.latitude, sensor.longitude);
                (distance_m <= radius_m).then_some(SensorMatch { sensor, distance_m })
            })
            .collect();

        matches.sort_unstable_by(|a, b| {
            a.distance_m
                .total_cmp(&b.distance_m)
                .then_with(|| a.sensor.site_code.cmp(&b.sensor.site_code))
        });

        matches
    }
}
