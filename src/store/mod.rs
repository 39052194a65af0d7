//! Experiment Store - persistence boundary for experiments and assignments
//!
//! The engine talks to persistence only through [`ExperimentStore`]. The
//! trait is async-first; every method is a suspension point and the only
//! I/O the engine performs.
//!
//! The store, not the engine, owns the `(experiment_id, user_id)` uniqueness
//! constraint: [`ExperimentStore::upsert_result`] must be an atomic
//! insert-if-absent so that concurrent first-time resolutions of the same
//! pair converge on a single stored variant.
//!
//! # Example
//!
//! ```rust
//! use abgate::model::{ExperimentDefinition, ExperimentType, Variant};
//! use abgate::store::{ExperimentStore, MemoryExperimentStore};
//!
//! # async fn example() -> abgate::Result<()> {
//! let store = MemoryExperimentStore::new();
//!
//! let definition = ExperimentDefinition::builder("onboarding_v2", ExperimentType::AbTest)
//!     .variant(Variant::new("control", 50.0))
//!     .variant(Variant::new("treatment", 50.0))
//!     .build();
//! let experiment = store.create_experiment(definition).await?;
//!
//! let record = store.upsert_result(experiment.id(), "user-1", "control").await?;
//! assert_eq!(record.variant(), Some("control"));
//! # Ok(())
//! # }
//! ```

mod memory;

pub use memory::MemoryExperimentStore;

use std::future::Future;

use crate::model::{
    AssignmentRecord, Experiment, ExperimentDefinition, ExperimentPatch, MetricObservation,
    VariantAggregate,
};
use crate::Result;

/// Persistence boundary for experiment definitions and assignment results.
pub trait ExperimentStore: Send + Sync {
    /// Find an experiment by unique name with `Active` status.
    ///
    /// Date-window checking is the engine's job; the store filters on
    /// status only.
    fn find_active_experiment(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Experiment>>> + Send;

    /// Find the assignment record for a `(experiment_id, user_id)` pair.
    fn find_result(
        &self,
        experiment_id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<AssignmentRecord>>> + Send;

    /// Atomically record an assignment: set the variant only if not already
    /// set, and return the authoritative stored record.
    ///
    /// First write wins. A caller whose variant lost the race observes the
    /// winner in the returned record rather than its own value.
    fn upsert_result(
        &self,
        experiment_id: &str,
        user_id: &str,
        variant: &str,
    ) -> impl Future<Output = Result<AssignmentRecord>> + Send;

    /// Append a metric observation, creating a bare record if none exists.
    ///
    /// Upsert-on-write so a metric recorded before the first resolution is
    /// not dropped.
    fn append_metric(
        &self,
        experiment_id: &str,
        user_id: &str,
        observation: MetricObservation,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Create an experiment, assigning it an id. Names are unique; a
    /// duplicate fails with [`Error::Store`](crate::Error::Store).
    fn create_experiment(
        &self,
        definition: ExperimentDefinition,
    ) -> impl Future<Output = Result<Experiment>> + Send;

    /// Apply a partial update to an experiment by id and return the updated
    /// definition. Unknown ids fail with
    /// [`Error::NotFound`](crate::Error::NotFound).
    fn update_experiment(
        &self,
        id: &str,
        patch: ExperimentPatch,
    ) -> impl Future<Output = Result<Experiment>> + Send;

    /// List all experiments.
    fn list_experiments(&self) -> impl Future<Output = Result<Vec<Experiment>>> + Send;

    /// Aggregate assignment results for an experiment by variant.
    ///
    /// Bare records that never received a variant are excluded.
    fn aggregate_results(
        &self,
        experiment_id: &str,
    ) -> impl Future<Output = Result<Vec<VariantAggregate>>> + Send;
}
