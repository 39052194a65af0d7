//! Assignment Engine - sticky variant resolution and rollout gating
//!
//! The engine is stateless: every call is a short-lived unit of work whose
//! only suspension points are store I/O, and all assignment state lives in
//! the [`ExperimentStore`]. Given the same store contents, calls are
//! referentially independent.
//!
//! # Example
//!
//! ```rust
//! use abgate::engine::AssignmentEngine;
//! use abgate::model::{ExperimentDefinition, ExperimentType, UserContext, Variant};
//! use abgate::store::{ExperimentStore, MemoryExperimentStore};
//!
//! # async fn example() -> abgate::Result<()> {
//! let store = MemoryExperimentStore::new();
//! store
//!     .create_experiment(
//!         ExperimentDefinition::builder("onboarding_v2", ExperimentType::AbTest)
//!             .variant(Variant::new("control", 50.0))
//!             .variant(Variant::new("treatment", 50.0))
//!             .build(),
//!     )
//!     .await?;
//!
//! let engine = AssignmentEngine::new(store);
//! let user = UserContext::new("user-1");
//!
//! let first = engine.resolve_variant(&user, "onboarding_v2").await?;
//! let second = engine.resolve_variant(&user, "onboarding_v2").await?;
//! assert_eq!(first.name(), second.name()); // sticky
//! # Ok(())
//! # }
//! ```

pub mod bucket;
pub mod selection;

use chrono::Utc;
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::model::{Experiment, ExperimentType, MetricObservation, UserContext, Variant};
use crate::store::ExperimentStore;
use crate::{Error, Result};

/// Experiment assignment engine over an abstract store.
#[derive(Debug)]
pub struct AssignmentEngine<S> {
    store: S,
    config: EngineConfig,
}

impl<S> AssignmentEngine<S> {
    /// Create an engine with the default configuration.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    /// Create an engine with an explicit configuration.
    #[must_use]
    pub const fn with_config(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Get the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Get the engine configuration.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl<S: ExperimentStore> AssignmentEngine<S> {
    /// Resolve the user's variant for a named experiment.
    ///
    /// Assignment is sticky: the first resolution persists a variant and
    /// every later call returns it unchanged, even if variant weights are
    /// mutated afterwards. A/B tests assign by weighted random draw;
    /// gradual rollouts assign by deterministic hash bucketing, so
    /// concurrent first resolutions agree without coordination.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] when no active, in-window experiment has the
    ///   given name.
    /// - [`Error::InvalidExperiment`] when the experiment has no variants or
    ///   a zero/invalid total weight.
    /// - [`Error::Store`] on persistence failures.
    pub async fn resolve_variant(
        &self,
        user: &UserContext,
        experiment_name: &str,
    ) -> Result<Variant> {
        let experiment = self
            .store
            .find_active_experiment(experiment_name)
            .await?
            .filter(|experiment| experiment.is_in_window(Utc::now()))
            .ok_or_else(|| Error::NotFound {
                name: experiment_name.to_string(),
            })?;

        if let Some(record) = self
            .store
            .find_result(experiment.id(), user.user_id())
            .await?
        {
            if let Some(assigned) = record.variant() {
                debug!(
                    experiment = experiment_name,
                    user = user.user_id(),
                    variant = assigned,
                    "sticky assignment"
                );
                return Ok(Self::variant_for_label(&experiment, assigned));
            }
        }

        let label = match experiment.experiment_type() {
            ExperimentType::AbTest => {
                selection::select_weighted(experiment.name(), experiment.variants())?
                    .name()
                    .to_string()
            }
            ExperimentType::GradualRollout => {
                if self.rollout_decision(&experiment, user) {
                    self.config.enabled_label().to_string()
                } else {
                    self.config.disabled_label().to_string()
                }
            }
        };

        // The store is authoritative: a concurrent racer may have won the
        // insert, in which case its variant comes back instead of ours.
        let stored = self
            .store
            .upsert_result(experiment.id(), user.user_id(), &label)
            .await?;
        let assigned = stored.variant().unwrap_or(label.as_str()).to_string();
        info!(
            experiment = experiment_name,
            user = user.user_id(),
            variant = assigned.as_str(),
            "variant assigned"
        );
        Ok(Self::variant_for_label(&experiment, &assigned))
    }

    /// Whether a gradually-rolled-out feature is enabled for the user.
    ///
    /// Fail-closed: an unknown feature name, a non-rollout experiment, a
    /// paused experiment, or one outside its date window all answer `false`
    /// without error. The first check persists the decision; later checks
    /// read it back, so a user never flaps when the rollout percentage
    /// changes mid-experiment.
    ///
    /// # Errors
    ///
    /// [`Error::Store`] on persistence failures.
    pub async fn is_enabled(&self, user: &UserContext, feature_name: &str) -> Result<bool> {
        let Some(experiment) = self.store.find_active_experiment(feature_name).await? else {
            return Ok(false);
        };
        if experiment.experiment_type() != ExperimentType::GradualRollout
            || !experiment.is_in_window(Utc::now())
        {
            return Ok(false);
        }

        if let Some(record) = self
            .store
            .find_result(experiment.id(), user.user_id())
            .await?
        {
            if let Some(assigned) = record.variant() {
                debug!(
                    feature = feature_name,
                    user = user.user_id(),
                    variant = assigned,
                    "sticky rollout decision"
                );
                return Ok(assigned == self.config.enabled_label());
            }
        }

        let enabled = self.rollout_decision(&experiment, user);
        let label = if enabled {
            self.config.enabled_label()
        } else {
            self.config.disabled_label()
        };
        let stored = self
            .store
            .upsert_result(experiment.id(), user.user_id(), label)
            .await?;
        info!(
            feature = feature_name,
            user = user.user_id(),
            enabled,
            "rollout decision persisted"
        );
        Ok(stored
            .variant()
            .map_or(enabled, |assigned| assigned == self.config.enabled_label()))
    }

    /// Batched [`is_enabled`](Self::is_enabled): one answer per feature name.
    ///
    /// # Errors
    ///
    /// [`Error::Store`] on persistence failures; a missing experiment is
    /// still just `false`.
    pub async fn check_feature_flags(
        &self,
        user: &UserContext,
        feature_names: &[&str],
    ) -> Result<FxHashMap<String, bool>> {
        let mut flags = FxHashMap::default();
        for name in feature_names {
            let enabled = self.is_enabled(user, name).await?;
            flags.insert((*name).to_string(), enabled);
        }
        Ok(flags)
    }

    /// Append a named metric observation to the user's assignment record.
    ///
    /// Upsert-on-write: a metric arriving before the first resolution
    /// creates a bare record rather than being dropped. Repeated names
    /// accumulate as a time series.
    ///
    /// # Errors
    ///
    /// [`Error::Store`] on persistence failures.
    pub async fn record_metric(
        &self,
        experiment_id: &str,
        user_id: &str,
        metric_name: &str,
        value: f64,
    ) -> Result<()> {
        self.store
            .append_metric(
                experiment_id,
                user_id,
                MetricObservation::new(metric_name, value),
            )
            .await?;
        debug!(experiment_id, user_id, metric = metric_name, value, "metric recorded");
        Ok(())
    }

    /// Deterministic rollout decision: hash bucket vs percentage, then
    /// target groups.
    fn rollout_decision(&self, experiment: &Experiment, user: &UserContext) -> bool {
        let bucket = bucket::bucket_for(user.user_id(), experiment.name());
        let percentage = experiment.rollout_percentage(self.config.rollout_variant_names());
        let in_rollout = f64::from(bucket) < percentage;
        debug!(
            experiment = experiment.name(),
            user = user.user_id(),
            bucket,
            percentage,
            "rollout bucket computed"
        );
        in_rollout && selection::matches_target_groups(experiment, user, &self.config)
    }

    /// Resolve a stored label back to the experiment's variant, keeping the
    /// current config payload when the variant still exists. Rollout labels
    /// and variants removed by later edits come back as bare zero-weight
    /// variants.
    fn variant_for_label(experiment: &Experiment, label: &str) -> Variant {
        experiment
            .variant(label)
            .cloned()
            .unwrap_or_else(|| Variant::new(label, 0.0))
    }
}
