//! School loading from `GeoJSON`.
//!
//! Each feature is a Point with `urn`, `name`, `phase`, `postcode`, and
//! `local_authority` properties. Features missing a geometry or with
//! unparseable properties are skipped with a warning.

use std::path::Path;
use std::str::FromStr as _;

use airaware_models::{School, SchoolPhase};
use geojson::{Feature, GeoJson, Value};

use crate::IngestError;

/// Loads the school list from a `GeoJSON` `FeatureCollection`.
///
/// # Errors
///
/// Returns an error when the file cannot be read or is not a
/// `FeatureCollection`; malformed individual features are skipped.
pub fn load_schools(path: impl AsRef<Path>) -> Result<Vec<School>, IngestError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let geojson: GeoJson = raw.parse().map_err(|e| IngestError::GeoJson {
        path: path.display().to_string(),
        source: e,
    })?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(IngestError::Format {
            path: path.display().to_string(),
            message: "expected a FeatureCollection".to_string(),
        });
    };

    let total = collection.features.len();
    let schools: Vec<School> = collection
        .features
        .iter()
        .filter_map(|feature| {
            let school = parse_feature(feature);
            if school.is_none() {
                log::warn!(
                    "Skipping malformed school feature: {}",
                    feature
                        .property("name")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or("<unnamed>")
                );
            }
            school
        })
        .collect();

    log::info!(
        "Loaded {} schools from {} ({} features skipped)",
        schools.len(),
        path.display(),
        total - schools.len()
    );

    Ok(schools)
}

fn parse_feature(feature: &Feature) -> Option<School> {
    let geometry = feature.geometry.as_ref()?;
    let Value::Point(coords) = &geometry.value else {
        return None;
    };
    let longitude = *coords.first()?;
    let latitude = *coords.get(1)?;
    if !longitude.is_finite() || !latitude.is_finite() {
        return None;
    }

    let urn = match feature.property("urn")? {
        serde_json::Value::Number(n) => u32::try_from(n.as_u64()?).ok()?,
        serde_json::Value::String(s) => s.parse().ok()?,
        _ => return None,
    };

    let text = |key: &str| -> Option<String> {
        feature
            .property(key)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let phase = SchoolPhase::from_str(&text("phase")?).ok()?;

    Some(School {
        urn,
        name: text("name")?,
        phase,
        postcode: text("postcode")?,
        local_authority: text("local_authority")?,
        longitude,
        latitude,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    const FIXTURE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [-0.1150, 51.4620] },
                "properties": {
                    "urn": 100001,
                    "name": "Hill Mead Primary School",
                    "phase": "Primary",
                    "postcode": "SW9 7QR",
                    "local_authority": "Lambeth"
                }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [-0.0888, 51.4741] },
                "properties": {
                    "urn": "100002",
                    "name": "Crawford Primary School",
                    "phase": "All-through",
                    "postcode": "SE5 9NF",
                    "local_authority": "Southwark"
                }
            },
            {
                "type": "Feature",
                "geometry": null,
                "properties": {
                    "urn": 100003,
                    "name": "No Geometry School",
                    "phase": "Primary",
                    "postcode": "SW2 1AA",
                    "local_authority": "Lambeth"
                }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [-0.12, 51.46] },
                "properties": {
                    "urn": 100004,
                    "name": "Bad Phase School",
                    "phase": "Sixth form",
                    "postcode": "SW2 1AB",
                    "local_authority": "Lambeth"
                }
            }
        ]
    }"#;

    #[test]
    fn loads_valid_features_and_skips_the_rest() {
        let tmp = std::env::temp_dir().join("airaware_schools_test");
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(&tmp).unwrap();
        let path = tmp.join("schools.geojson");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(FIXTURE.as_bytes())
            .unwrap();

        let schools = load_schools(&path).unwrap();
        let _ = std::fs::remove_dir_all(&tmp);

        assert_eq!(schools.len(), 2);
        assert_eq!(schools[0].urn, 100_001);
        assert_eq!(schools[0].phase, SchoolPhase::Primary);
        assert!((schools[0].latitude - 51.4620).abs() < 1e-9);
        // URN given as a string still parses.
        assert_eq!(schools[1].urn, 100_002);
        assert_eq!(schools[1].phase, SchoolPhase::AllThrough);
    }

    #[test]
    fn rejects_non_feature_collections() {
        let tmp = std::env::temp_dir().join("airaware_schools_bad_test");
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(&tmp).unwrap();
        let path = tmp.join("point.geojson");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(br#"{ "type": "Point", "coordinates": [0.0, 51.0] }"#)
            .unwrap();

        let result = load_schools(&path);
        let _ = std::fs::remove_dir_all(&tmp);

        assert!(matches!(result, Err(IngestError::Format { .. })));
    }
}
