//! In-memory store implementation using `DashMap`.
//!
//! The reference backend and test double. Data is lost on process restart;
//! a production deployment would put a document database behind the same
//! trait with a unique index on `(experiment_id, user_id)`.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use super::ExperimentStore;
use crate::model::{
    AssignmentRecord, Experiment, ExperimentDefinition, ExperimentPatch, ExperimentStatus,
    MetricObservation, MetricSummary, VariantAggregate,
};
use crate::{Error, Result};

/// Key for one user's assignment within one experiment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResultKey {
    experiment_id: String,
    user_id: String,
}

impl ResultKey {
    fn new(experiment_id: &str, user_id: &str) -> Self {
        Self {
            experiment_id: experiment_id.to_string(),
            user_id: user_id.to_string(),
        }
    }
}

/// In-memory experiment store backed by lock-free concurrent hashmaps.
///
/// The `DashMap` entry API provides the atomic insert-if-absent semantics
/// the assignment race requires: concurrent
/// [`upsert_result`](ExperimentStore::upsert_result) calls for the same
/// `(experiment_id, user_id)` pair serialize on the entry, and the first
/// variant written is the one every caller gets back.
#[derive(Debug, Default)]
pub struct MemoryExperimentStore {
    experiments: DashMap<String, Experiment>,
    name_index: DashMap<String, String>,
    results: DashMap<ResultKey, AssignmentRecord>,
    id_seq: AtomicU64,
}

impl MemoryExperimentStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of experiments in the store.
    #[must_use]
    pub fn experiment_count(&self) -> usize {
        self.experiments.len()
    }

    /// Get the number of assignment records in the store.
    #[must_use]
    pub fn result_count(&self) -> usize {
        self.results.len()
    }

    /// Check if the store holds no experiments and no results.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty() && self.results.is_empty()
    }

    /// Remove all experiments and results.
    pub fn clear(&self) {
        self.experiments.clear();
        self.name_index.clear();
        self.results.clear();
    }
}

impl ExperimentStore for MemoryExperimentStore {
    async fn find_active_experiment(&self, name: &str) -> Result<Option<Experiment>> {
        let Some(id) = self.name_index.get(name).map(|entry| entry.value().clone()) else {
            return Ok(None);
        };
        Ok(self
            .experiments
            .get(&id)
            .filter(|experiment| experiment.status() == ExperimentStatus::Active)
            .map(|experiment| experiment.value().clone()))
    }

    async fn find_result(
        &self,
        experiment_id: &str,
        user_id: &str,
    ) -> Result<Option<AssignmentRecord>> {
        let key = ResultKey::new(experiment_id, user_id);
        Ok(self.results.get(&key).map(|entry| entry.value().clone()))
    }

    async fn upsert_result(
        &self,
        experiment_id: &str,
        user_id: &str,
        variant: &str,
    ) -> Result<AssignmentRecord> {
        let key = ResultKey::new(experiment_id, user_id);
        let mut entry = self
            .results
            .entry(key)
            .or_insert_with(|| AssignmentRecord::bare(experiment_id, user_id));
        if entry.assign_if_unset(variant) {
            debug!(experiment_id, user_id, variant, "assignment persisted");
        }
        Ok(entry.value().clone())
    }

    async fn append_metric(
        &self,
        experiment_id: &str,
        user_id: &str,
        observation: MetricObservation,
    ) -> Result<()> {
        let key = ResultKey::new(experiment_id, user_id);
        self.results
            .entry(key)
            .or_insert_with(|| AssignmentRecord::bare(experiment_id, user_id))
            .push_metric(observation);
        Ok(())
    }

    async fn create_experiment(&self, definition: ExperimentDefinition) -> Result<Experiment> {
        use dashmap::mapref::entry::Entry;

        let name = definition.name().to_string();
        match self.name_index.entry(name.clone()) {
            Entry::Occupied(_) => Err(Error::Store(format!(
                "experiment name '{name}' already exists"
            ))),
            Entry::Vacant(slot) => {
                let id = format!("exp-{}", self.id_seq.fetch_add(1, Ordering::Relaxed) + 1);
                slot.insert(id.clone());
                let experiment = definition.into_experiment(&id, Utc::now());
                self.experiments.insert(id.clone(), experiment.clone());
                info!(id, name, "experiment created");
                Ok(experiment)
            }
        }
    }

    async fn update_experiment(&self, id: &str, patch: ExperimentPatch) -> Result<Experiment> {
        let mut entry = self.experiments.get_mut(id).ok_or_else(|| Error::NotFound {
            name: id.to_string(),
        })?;
        patch.apply(entry.value_mut());
        entry.stamp_updated(Utc::now());
        Ok(entry.value().clone())
    }

    async fn list_experiments(&self) -> Result<Vec<Experiment>> {
        Ok(self
            .experiments
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn aggregate_results(&self, experiment_id: &str) -> Result<Vec<VariantAggregate>> {
        // variant -> (user count, metric name -> (count, sum))
        let mut groups: FxHashMap<String, (u64, FxHashMap<String, (u64, f64)>)> =
            FxHashMap::default();

        for entry in self.results.iter() {
            if entry.experiment_id() != experiment_id {
                continue;
            }
            let Some(variant) = entry.variant() else {
                continue;
            };
            let (users, metrics) = groups.entry(variant.to_string()).or_default();
            *users += 1;
            for observation in entry.metrics() {
                let (count, sum) = metrics.entry(observation.name().to_string()).or_default();
                *count += 1;
                *sum += observation.value();
            }
        }

        let mut aggregates: Vec<VariantAggregate> = groups
            .into_iter()
            .map(|(variant, (user_count, metrics))| VariantAggregate {
                variant,
                user_count,
                metrics: metrics
                    .into_iter()
                    .map(|(name, (count, sum))| {
                        #[allow(clippy::cast_precision_loss)]
                        let mean = sum / count as f64;
                        (name, MetricSummary { count, sum, mean })
                    })
                    .collect(),
            })
            .collect();

        // Deterministic output order for callers and tests
        aggregates.sort_by(|a, b| a.variant.cmp(&b.variant));
        Ok(aggregates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExperimentType, Variant};

    fn ab_definition(name: &str) -> ExperimentDefinition {
        ExperimentDefinition::builder(name, ExperimentType::AbTest)
            .variant(Variant::new("control", 50.0))
            .variant(Variant::new("treatment", 50.0))
            .build()
    }

    #[tokio::test]
    async fn test_create_and_find_active() {
        let store = MemoryExperimentStore::new();
        let created = store.create_experiment(ab_definition("exp")).await.unwrap();

        let found = store.find_active_experiment("exp").await.unwrap().unwrap();
        assert_eq!(found.id(), created.id());
        assert!(store.find_active_experiment("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let store = MemoryExperimentStore::new();
        store.create_experiment(ab_definition("exp")).await.unwrap();

        let err = store
            .create_experiment(ab_definition("exp"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert_eq!(store.experiment_count(), 1);
    }

    #[tokio::test]
    async fn test_paused_experiment_not_found_as_active() {
        let store = MemoryExperimentStore::new();
        let created = store.create_experiment(ab_definition("exp")).await.unwrap();

        let patch = ExperimentPatch {
            status: Some(ExperimentStatus::Paused),
            ..ExperimentPatch::default()
        };
        store.update_experiment(created.id(), patch).await.unwrap();

        assert!(store.find_active_experiment("exp").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let store = MemoryExperimentStore::new();
        let err = store
            .update_experiment("exp-404", ExperimentPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_stamps_updated_at() {
        let store = MemoryExperimentStore::new();
        let created = store.create_experiment(ab_definition("exp")).await.unwrap();

        let updated = store
            .update_experiment(created.id(), ExperimentPatch::default())
            .await
            .unwrap();
        assert!(updated.updated_at() >= created.updated_at());
    }

    #[tokio::test]
    async fn test_upsert_first_write_wins() {
        let store = MemoryExperimentStore::new();

        let first = store.upsert_result("exp-1", "user-1", "control").await.unwrap();
        assert_eq!(first.variant(), Some("control"));

        let second = store
            .upsert_result("exp-1", "user-1", "treatment")
            .await
            .unwrap();
        assert_eq!(second.variant(), Some("control"));
        assert_eq!(store.result_count(), 1);
    }

    #[tokio::test]
    async fn test_append_metric_creates_bare_record() {
        let store = MemoryExperimentStore::new();
        store
            .append_metric("exp-1", "user-1", MetricObservation::new("click", 1.0))
            .await
            .unwrap();

        let record = store.find_result("exp-1", "user-1").await.unwrap().unwrap();
        assert!(record.variant().is_none());
        assert_eq!(record.metrics().len(), 1);

        // A later assignment fills the variant without losing the metric
        let record = store.upsert_result("exp-1", "user-1", "control").await.unwrap();
        assert_eq!(record.variant(), Some("control"));
        assert_eq!(record.metrics().len(), 1);
    }

    #[tokio::test]
    async fn test_aggregate_results_by_variant() {
        let store = MemoryExperimentStore::new();
        store.upsert_result("exp-1", "user-1", "control").await.unwrap();
        store.upsert_result("exp-1", "user-2", "control").await.unwrap();
        store.upsert_result("exp-1", "user-3", "treatment").await.unwrap();
        store.upsert_result("exp-other", "user-4", "control").await.unwrap();

        store
            .append_metric("exp-1", "user-1", MetricObservation::new("click", 1.0))
            .await
            .unwrap();
        store
            .append_metric("exp-1", "user-2", MetricObservation::new("click", 3.0))
            .await
            .unwrap();

        let aggregates = store.aggregate_results("exp-1").await.unwrap();
        assert_eq!(aggregates.len(), 2);

        let control = &aggregates[0];
        assert_eq!(control.variant, "control");
        assert_eq!(control.user_count, 2);
        let clicks = &control.metrics["click"];
        assert_eq!(clicks.count, 2);
        assert!((clicks.sum - 4.0).abs() < f64::EPSILON);
        assert!((clicks.mean - 2.0).abs() < f64::EPSILON);

        let treatment = &aggregates[1];
        assert_eq!(treatment.variant, "treatment");
        assert_eq!(treatment.user_count, 1);
        assert!(treatment.metrics.is_empty());
    }

    #[tokio::test]
    async fn test_aggregate_skips_bare_records() {
        let store = MemoryExperimentStore::new();
        store
            .append_metric("exp-1", "user-1", MetricObservation::new("click", 1.0))
            .await
            .unwrap();

        let aggregates = store.aggregate_results("exp-1").await.unwrap();
        assert!(aggregates.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_upserts_converge() {
        use std::sync::Arc;

        let store = Arc::new(MemoryExperimentStore::new());
        let mut handles = vec![];

        for i in 0..50 {
            let store = Arc::clone(&store);
            let variant = if i % 2 == 0 { "control" } else { "treatment" };
            handles.push(tokio::spawn(async move {
                store
                    .upsert_result("exp-1", "user-1", variant)
                    .await
                    .unwrap()
                    .variant()
                    .unwrap()
                    .to_string()
            }));
        }

        let mut observed = std::collections::HashSet::new();
        for handle in handles {
            observed.insert(handle.await.unwrap());
        }

        // Every racer observed the single winning variant
        assert_eq!(observed.len(), 1);
        assert_eq!(store.result_count(), 1);
    }

    #[tokio::test]
    async fn test_clear_and_counts() {
        let store = MemoryExperimentStore::new();
        assert!(store.is_empty());

        store.create_experiment(ab_definition("exp")).await.unwrap();
        store.upsert_result("exp-1", "user-1", "control").await.unwrap();
        assert!(!store.is_empty());

        store.clear();
        assert!(store.is_empty());
        assert!(store.find_active_experiment("exp").await.unwrap().is_none());
    }
}
