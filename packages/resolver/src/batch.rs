//! Batch resolution across a full school list.
//!
//! Per-school resolutions are independent, so the batch fans out across a
//! rayon pool; the indexed collect keeps results in input order, which
//! makes sequential and parallel runs produce identical outcomes.

use airaware_models::{DataSource, School};
use rayon::prelude::*;
use serde::Serialize;

use crate::{Resolution, Resolver};

/// One school paired with its resolution.
#[derive(Debug, Clone)]
pub struct Assignment<'a> {
    /// The school that was resolved.
    pub school: &'a School,
    /// Its resolution.
    pub resolution: Resolution<'a>,
}

/// The aggregate of a batch run: three source buckets plus the schools
/// that resolved to nothing.
///
/// Every input school lands in exactly one bucket; see
/// [`BatchOutcome::total`].
#[derive(Debug, Default)]
pub struct BatchOutcome<'a> {
    /// Schools matched to a reference-grade sensor.
    pub reference: Vec<Assignment<'a>>,
    /// Schools matched to a low-cost sensor.
    pub low_cost: Vec<Assignment<'a>>,
    /// Schools resolved from the modelled grid.
    pub modelled: Vec<Assignment<'a>>,
    /// Schools that matched nothing at any tier.
    pub unresolved: Vec<&'a School>,
}

impl BatchOutcome<'_> {
    /// Total schools across all buckets; always equals the input count.
    #[must_use]
    pub fn total(&self) -> usize {
        self.reference.len() + self.low_cost.len() + self.modelled.len() + self.unresolved.len()
    }

    /// Bucket counts for reporting.
    #[must_use]
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total: self.total(),
            reference: self.reference.len(),
            low_cost: self.low_cost.len(),
            modelled: self.modelled.len(),
            unresolved: self.unresolved.len(),
        }
    }
}

/// Bucket counts for one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Total schools resolved (all buckets).
    pub total: usize,
    /// Reference-sensor matches.
    pub reference: usize,
    /// Low-cost-sensor matches.
    pub low_cost: usize,
    /// Modelled-grid resolutions.
    pub modelled: usize,
    /// Schools that resolved to nothing.
    pub unresolved: usize,
}

impl BatchSummary {
    /// A bucket count as a percentage of the total.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn share(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * count as f64 / self.total as f64
        }
    }
}

/// Errors from batch resolution. Reported once per batch, not per school.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    /// The input school list was empty.
    #[error("No schools to resolve")]
    NoSchools,
}

impl<'a> Resolver<'a> {
    /// Resolves every school and buckets the outcomes by source tier.
    ///
    /// Identical inputs and threshold always produce an identical outcome,
    /// whether this runs on one thread or many.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::NoSchools`] for an empty input list.
    pub fn resolve_all(&self, schools: &'a [School]) -> Result<BatchOutcome<'a>, BatchError> {
        if schools.is_empty() {
            return Err(BatchError::NoSchools);
        }

        let results: Vec<_> = schools
            .par_iter()
            .map(|school| self.resolve(school))
            .collect();

        let mut outcome = BatchOutcome::default();
        for (school, result) in schools.iter().zip(results) {
            match result {
                Ok(resolution) => {
                    let assignment = Assignment { school, resolution };
                    match assignment.resolution.source {
                        DataSource::Reference => outcome.reference.push(assignment),
                        DataSource::LowCost => outcome.low_cost.push(assignment),
                        DataSource::Modelled => outcome.modelled.push(assignment),
                    }
                }
                Err(e) => {
                    log::warn!("School {} ({}) unresolved: {e}", school.urn, school.name);
                    outcome.unresolved.push(school);
                }
            }
        }

        let summary = outcome.summary();
        log::info!(
            "Resolved {} schools: {} reference, {} low-cost, {} modelled, {} unresolved",
            summary.total,
            summary.reference,
            summary.low_cost,
            summary.modelled,
            summary.unresolved
        );

        Ok(outcome)
    }
}
