//! Assignment report writing: per-school CSV rows and the JSON summary.

use std::path::Path;

use airaware_models::{Pollutant, School};
use airaware_resolver::{Assignment, BatchOutcome, BatchSummary};
use serde::Serialize;

/// One row of the assignment CSV. Pollutant columns carry the modelled
/// baseline with the LAEI column keys.
#[derive(Debug, Serialize)]
pub struct AssignmentRow<'a> {
    pub urn: u32,
    pub name: &'a str,
    pub local_authority: &'a str,
    pub data_source: &'a str,
    pub site_code: Option<&'a str>,
    pub network: Option<&'a str>,
    pub distance_m: Option<f64>,
    #[serde(rename = "NO2")]
    pub no2: Option<f64>,
    #[serde(rename = "NOx")]
    pub nox: Option<f64>,
    #[serde(rename = "PM25")]
    pub pm25: Option<f64>,
    #[serde(rename = "PM10_mean")]
    pub pm10_mean: Option<f64>,
    #[serde(rename = "PM10_days")]
    pub pm10_days: Option<f64>,
}

impl<'a> AssignmentRow<'a> {
    fn from_assignment(assignment: &'a Assignment<'a>) -> Self {
        let resolution = &assignment.resolution;
        let baseline = resolution.baseline.as_ref();
        let value = |p: Pollutant| baseline.and_then(|cell| cell.concentration(p));

        Self {
            urn: assignment.school.urn,
            name: &assignment.school.name,
            local_authority: &assignment.school.local_authority,
            data_source: resolution.source.as_ref(),
            site_code: resolution.sensor.map(|s| s.site_code.as_str()),
            network: resolution.sensor.map(|s| s.network.as_ref()),
            distance_m: resolution.distance_m.map(|d| (d * 10.0).round() / 10.0),
            no2: value(Pollutant::No2),
            nox: value(Pollutant::Nox),
            pm25: value(Pollutant::Pm25),
            pm10_mean: value(Pollutant::Pm10Mean),
            pm10_days: value(Pollutant::Pm10Days),
        }
    }

    fn unresolved(school: &'a School) -> Self {
        Self {
            urn: school.urn,
            name: &school.name,
            local_authority: &school.local_authority,
            data_source: "UNRESOLVED",
            site_code: None,
            network: None,
            distance_m: None,
            no2: None,
            nox: None,
            pm25: None,
            pm10_mean: None,
            pm10_days: None,
        }
    }
}

/// Writes one CSV row per school, bucket by bucket (reference, low-cost,
/// modelled, unresolved), so output order is deterministic.
///
/// # Errors
///
/// Returns an error when the file cannot be written.
pub fn write_assignments(path: &Path, outcome: &BatchOutcome<'_>) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;

    for assignment in outcome
        .reference
        .iter()
        .chain(&outcome.low_cost)
        .chain(&outcome.modelled)
    {
        writer.serialize(AssignmentRow::from_assignment(assignment))?;
    }
    for school in outcome.unresolved.iter().copied() {
        writer.serialize(AssignmentRow::unresolved(school))?;
    }

    writer.flush()?;
    log::info!("Wrote {} assignment rows to {}", outcome.total(), path.display());

    Ok(())
}

/// The JSON summary document for one run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub threshold_m: f64,
    #[serde(flatten)]
    pub counts: BatchSummary,
    pub reference_pct: f64,
    pub low_cost_pct: f64,
    pub modelled_pct: f64,
    pub unresolved_pct: f64,
}

impl SummaryReport {
    #[must_use]
    pub fn new(threshold_m: f64, counts: BatchSummary) -> Self {
        let pct = |count: usize| (counts.share(count) * 10.0).round() / 10.0;
        Self {
            threshold_m,
            counts,
            reference_pct: pct(counts.reference),
            low_cost_pct: pct(counts.low_cost),
            modelled_pct: pct(counts.modelled),
            unresolved_pct: pct(counts.unresolved),
        }
    }
}

/// Writes the JSON summary.
///
/// # Errors
///
/// Returns an error when serialization or the write fails.
pub fn write_summary(path: &Path, report: &SummaryReport) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    log::info!("Wrote summary to {}", path.display());
    Ok(())
}
