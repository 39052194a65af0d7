//! Assignment records and metric observations
//!
//! One [`AssignmentRecord`] exists per `(experiment_id, user_id)` pair; the
//! store enforces that pair as a uniqueness constraint. The `variant` is
//! sticky once set, while `metrics` is an append-only time series.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A single named metric observation.
///
/// Observations with the same name accumulate as a time series; they are
/// never deduplicated or overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricObservation {
    name: String,
    value: f64,
    recorded_at: DateTime<Utc>,
}

impl MetricObservation {
    /// Create an observation stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            recorded_at: Utc::now(),
        }
    }

    /// Get the metric name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the observed value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Get the observation timestamp.
    #[must_use]
    pub const fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

/// Per-user assignment state for one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    experiment_id: String,
    user_id: String,
    variant: Option<String>,
    metrics: Vec<MetricObservation>,
    created_at: DateTime<Utc>,
}

impl AssignmentRecord {
    /// Create a bare record with no variant assigned yet.
    ///
    /// A bare record exists when a metric arrives before the first
    /// resolution; the variant is filled in by the first assignment write.
    #[must_use]
    pub fn bare(experiment_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            user_id: user_id.into(),
            variant: None,
            metrics: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Get the experiment id.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the user id.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Get the assigned variant name, if one has been set.
    #[must_use]
    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    /// Get the recorded metric observations, in arrival order.
    #[must_use]
    pub fn metrics(&self) -> &[MetricObservation] {
        &self.metrics
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Set the variant if none is set yet. Returns whether this call won.
    ///
    /// Sticky semantics: a second call with a different variant is a no-op.
    pub fn assign_if_unset(&mut self, variant: impl Into<String>) -> bool {
        if self.variant.is_some() {
            return false;
        }
        self.variant = Some(variant.into());
        true
    }

    /// Append a metric observation.
    pub fn push_metric(&mut self, observation: MetricObservation) {
        self.metrics.push(observation);
    }
}

/// Summary statistics for one metric name within a variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Number of observations.
    pub count: u64,
    /// Sum of observed values.
    pub sum: f64,
    /// Mean observed value.
    pub mean: f64,
}

/// Per-variant aggregation of assignment results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantAggregate {
    /// Variant name.
    pub variant: String,
    /// Number of users assigned to the variant.
    pub user_count: u64,
    /// Metric summaries keyed by metric name.
    pub metrics: FxHashMap<String, MetricSummary>,
}
