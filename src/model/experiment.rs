//! Experiment definitions: A/B tests and gradual rollouts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentType {
    /// Weighted random split across variants, sticky per user.
    AbTest,
    /// Percentage-based feature rollout with deterministic bucketing.
    ///
    /// The legacy wire value `gray_release` maps here.
    #[serde(alias = "gray_release")]
    GradualRollout,
}

/// Lifecycle status of an experiment. Only `Active` experiments assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    /// Eligible for assignment.
    Active,
    /// Temporarily suspended.
    Paused,
    /// Finished; retained for reporting only.
    Completed,
}

/// Audience filter for a gradual rollout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetGroup {
    /// Every user matches.
    All,
    /// Accounts younger than the configured new-user window.
    NewUsers,
    /// Users on the premium tier.
    PremiumUsers,
    /// Users listed in the experiment's allow-list.
    SpecificUsers,
    /// Any group name this version does not recognize. Never matches.
    #[serde(other)]
    Unknown,
}

/// One arm of an experiment.
///
/// Weights are relative, not percentages; they need not sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    name: String,
    weight: f64,
    config: Option<serde_json::Value>,
}

impl Variant {
    /// Create a variant with no attached config.
    #[must_use]
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            config: None,
        }
    }

    /// Create a variant carrying an opaque config payload.
    #[must_use]
    pub fn with_config(name: impl Into<String>, weight: f64, config: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            weight,
            config: Some(config),
        }
    }

    /// Get the variant name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the relative weight.
    #[must_use]
    pub const fn weight(&self) -> f64 {
        self.weight
    }

    /// Get the opaque config payload, if any.
    #[must_use]
    pub const fn config(&self) -> Option<&serde_json::Value> {
        self.config.as_ref()
    }
}

/// A named experiment: an A/B test or a gradual rollout.
///
/// `name` is globally unique; `id` is assigned by the store on creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    id: String,
    name: String,
    description: Option<String>,
    experiment_type: ExperimentType,
    status: ExperimentStatus,
    variants: Vec<Variant>,
    rollout_percentage: Option<f64>,
    target_groups: Vec<TargetGroup>,
    allowed_user_ids: Vec<String>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Experiment {
    /// Get the store-assigned identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the unique experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Get the experiment type.
    #[must_use]
    pub const fn experiment_type(&self) -> ExperimentType {
        self.experiment_type
    }

    /// Get the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> ExperimentStatus {
        self.status
    }

    /// Get the ordered variant list.
    #[must_use]
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Get the target groups. Empty means unrestricted.
    #[must_use]
    pub fn target_groups(&self) -> &[TargetGroup] {
        &self.target_groups
    }

    /// Get the explicit allow-list used by `specific_users`.
    #[must_use]
    pub fn allowed_user_ids(&self) -> &[String] {
        &self.allowed_user_ids
    }

    /// Get the window start, if any.
    #[must_use]
    pub const fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    /// Get the window end, if any.
    #[must_use]
    pub const fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the last-update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Find a variant by name.
    #[must_use]
    pub fn variant(&self, name: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.name() == name)
    }

    /// Whether `now` falls inside the experiment's date window.
    ///
    /// In-window iff `now >= start_date` (or unset) and `end_date` is unset
    /// or `now < end_date`.
    #[must_use]
    pub fn is_in_window(&self, now: DateTime<Utc>) -> bool {
        let started = self.start_date.map_or(true, |start| now >= start);
        let not_ended = self.end_date.map_or(true, |end| now < end);
        started && not_ended
    }

    /// Rollout percentage for a gradual rollout.
    ///
    /// The top-level `rollout_percentage` field wins; otherwise the weight of
    /// the first variant whose name appears in `designated_names`; otherwise
    /// 0 (fail closed).
    #[must_use]
    pub fn rollout_percentage(&self, designated_names: &[String]) -> f64 {
        if let Some(percentage) = self.rollout_percentage {
            return percentage;
        }
        designated_names
            .iter()
            .find_map(|name| self.variant(name))
            .map_or(0.0, Variant::weight)
    }

    pub(crate) fn stamp_updated(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// Creation payload for an experiment: everything the caller supplies.
///
/// The store assigns `id`, `created_at`, and `updated_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentDefinition {
    name: String,
    description: Option<String>,
    experiment_type: ExperimentType,
    status: ExperimentStatus,
    variants: Vec<Variant>,
    rollout_percentage: Option<f64>,
    target_groups: Vec<TargetGroup>,
    allowed_user_ids: Vec<String>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
}

impl ExperimentDefinition {
    /// Create a builder for an experiment definition.
    #[must_use]
    pub fn builder(
        name: impl Into<String>,
        experiment_type: ExperimentType,
    ) -> ExperimentDefinitionBuilder {
        ExperimentDefinitionBuilder::new(name, experiment_type)
    }

    /// Get the experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Materialize an [`Experiment`] with a store-assigned id.
    ///
    /// Intended for [`ExperimentStore`](crate::store::ExperimentStore)
    /// implementations.
    #[must_use]
    pub fn into_experiment(self, id: impl Into<String>, now: DateTime<Utc>) -> Experiment {
        Experiment {
            id: id.into(),
            name: self.name,
            description: self.description,
            experiment_type: self.experiment_type,
            status: self.status,
            variants: self.variants,
            rollout_percentage: self.rollout_percentage,
            target_groups: self.target_groups,
            allowed_user_ids: self.allowed_user_ids,
            start_date: self.start_date,
            end_date: self.end_date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Builder for [`ExperimentDefinition`].
#[derive(Debug)]
pub struct ExperimentDefinitionBuilder {
    definition: ExperimentDefinition,
}

impl ExperimentDefinitionBuilder {
    /// Create a builder with required fields; status defaults to `Active`.
    #[must_use]
    pub fn new(name: impl Into<String>, experiment_type: ExperimentType) -> Self {
        Self {
            definition: ExperimentDefinition {
                name: name.into(),
                description: None,
                experiment_type,
                status: ExperimentStatus::Active,
                variants: Vec::new(),
                rollout_percentage: None,
                target_groups: Vec::new(),
                allowed_user_ids: Vec::new(),
                start_date: None,
                end_date: None,
            },
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.definition.description = Some(description.into());
        self
    }

    /// Set the initial status.
    #[must_use]
    pub fn status(mut self, status: ExperimentStatus) -> Self {
        self.definition.status = status;
        self
    }

    /// Append a variant. Order is significant for weighted selection.
    #[must_use]
    pub fn variant(mut self, variant: Variant) -> Self {
        self.definition.variants.push(variant);
        self
    }

    /// Set the top-level rollout percentage.
    #[must_use]
    pub fn rollout_percentage(mut self, percentage: f64) -> Self {
        self.definition.rollout_percentage = Some(percentage);
        self
    }

    /// Append a target group.
    #[must_use]
    pub fn target_group(mut self, group: TargetGroup) -> Self {
        self.definition.target_groups.push(group);
        self
    }

    /// Replace the `specific_users` allow-list.
    #[must_use]
    pub fn allowed_user_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.definition.allowed_user_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Set the window start.
    #[must_use]
    pub const fn start_date(mut self, start: DateTime<Utc>) -> Self {
        self.definition.start_date = Some(start);
        self
    }

    /// Set the window end (exclusive).
    #[must_use]
    pub const fn end_date(mut self, end: DateTime<Utc>) -> Self {
        self.definition.end_date = Some(end);
        self
    }

    /// Build the [`ExperimentDefinition`].
    #[must_use]
    pub fn build(self) -> ExperimentDefinition {
        self.definition
    }
}

/// Partial update for an experiment. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentPatch {
    /// New description.
    pub description: Option<String>,
    /// New lifecycle status.
    pub status: Option<ExperimentStatus>,
    /// Replacement variant list.
    pub variants: Option<Vec<Variant>>,
    /// New top-level rollout percentage.
    pub rollout_percentage: Option<f64>,
    /// Replacement target groups.
    pub target_groups: Option<Vec<TargetGroup>>,
    /// Replacement allow-list.
    pub allowed_user_ids: Option<Vec<String>>,
    /// New window start.
    pub start_date: Option<DateTime<Utc>>,
    /// New window end.
    pub end_date: Option<DateTime<Utc>>,
}

impl ExperimentPatch {
    /// Apply the patch in place. The store stamps `updated_at` separately.
    pub fn apply(self, experiment: &mut Experiment) {
        if let Some(description) = self.description {
            experiment.description = Some(description);
        }
        if let Some(status) = self.status {
            experiment.status = status;
        }
        if let Some(variants) = self.variants {
            experiment.variants = variants;
        }
        if let Some(percentage) = self.rollout_percentage {
            experiment.rollout_percentage = Some(percentage);
        }
        if let Some(groups) = self.target_groups {
            experiment.target_groups = groups;
        }
        if let Some(ids) = self.allowed_user_ids {
            experiment.allowed_user_ids = ids;
        }
        if let Some(start) = self.start_date {
            experiment.start_date = Some(start);
        }
        if let Some(end) = self.end_date {
            experiment.end_date = Some(end);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ab_definition() -> ExperimentDefinition {
        ExperimentDefinition::builder("button_color", ExperimentType::AbTest)
            .variant(Variant::new("control", 50.0))
            .variant(Variant::new("treatment", 50.0))
            .build()
    }

    #[test]
    fn test_definition_into_experiment() {
        let now = Utc::now();
        let experiment = ab_definition().into_experiment("exp-1", now);

        assert_eq!(experiment.id(), "exp-1");
        assert_eq!(experiment.name(), "button_color");
        assert_eq!(experiment.status(), ExperimentStatus::Active);
        assert_eq!(experiment.variants().len(), 2);
        assert_eq!(experiment.created_at(), now);
        assert_eq!(experiment.updated_at(), now);
    }

    #[test]
    fn test_window_unset_dates_always_in() {
        let experiment = ab_definition().into_experiment("exp-1", Utc::now());
        assert!(experiment.is_in_window(Utc::now()));
    }

    #[test]
    fn test_window_end_is_exclusive() {
        let now = Utc::now();
        let experiment = ExperimentDefinition::builder("windowed", ExperimentType::AbTest)
            .variant(Variant::new("only", 1.0))
            .start_date(now - Duration::days(1))
            .end_date(now)
            .build()
            .into_experiment("exp-1", now);

        assert!(experiment.is_in_window(now - Duration::seconds(1)));
        assert!(!experiment.is_in_window(now));
    }

    #[test]
    fn test_window_before_start() {
        let now = Utc::now();
        let experiment = ExperimentDefinition::builder("future", ExperimentType::AbTest)
            .variant(Variant::new("only", 1.0))
            .start_date(now + Duration::days(1))
            .build()
            .into_experiment("exp-1", now);

        assert!(!experiment.is_in_window(now));
    }

    #[test]
    fn test_gray_release_alias_deserializes_as_gradual_rollout() {
        let parsed: ExperimentType = serde_json::from_str("\"gray_release\"").unwrap();
        assert_eq!(parsed, ExperimentType::GradualRollout);
    }

    #[test]
    fn test_unknown_target_group_deserializes_to_unknown() {
        let parsed: TargetGroup = serde_json::from_str("\"beta_cohort\"").unwrap();
        assert_eq!(parsed, TargetGroup::Unknown);
    }

    #[test]
    fn test_rollout_percentage_top_level_wins() {
        let experiment = ExperimentDefinition::builder("flag", ExperimentType::GradualRollout)
            .variant(Variant::new("new_feature", 25.0))
            .rollout_percentage(80.0)
            .build()
            .into_experiment("exp-1", Utc::now());

        let names = vec!["new_feature".to_string()];
        assert!((experiment.rollout_percentage(&names) - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rollout_percentage_from_designated_variant() {
        let experiment = ExperimentDefinition::builder("flag", ExperimentType::GradualRollout)
            .variant(Variant::new("original", 75.0))
            .variant(Variant::new("enabled", 25.0))
            .build()
            .into_experiment("exp-1", Utc::now());

        let names = vec!["new_feature".to_string(), "enabled".to_string()];
        assert!((experiment.rollout_percentage(&names) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rollout_percentage_defaults_to_zero() {
        let experiment = ExperimentDefinition::builder("flag", ExperimentType::GradualRollout)
            .variant(Variant::new("misc", 50.0))
            .build()
            .into_experiment("exp-1", Utc::now());

        let names = vec!["new_feature".to_string()];
        assert!(experiment.rollout_percentage(&names).abs() < f64::EPSILON);
    }

    #[test]
    fn test_patch_replaces_only_set_fields() {
        let mut experiment = ab_definition().into_experiment("exp-1", Utc::now());
        let patch = ExperimentPatch {
            status: Some(ExperimentStatus::Paused),
            ..ExperimentPatch::default()
        };
        patch.apply(&mut experiment);

        assert_eq!(experiment.status(), ExperimentStatus::Paused);
        assert_eq!(experiment.variants().len(), 2);
        assert_eq!(experiment.name(), "button_color");
    }

    #[test]
    fn test_experiment_serialization_round_trip() {
        let experiment = ab_definition().into_experiment("exp-1", Utc::now());
        let json = serde_json::to_string(&experiment).expect("serialization failed");
        let parsed: Experiment = serde_json::from_str(&json).expect("deserialization failed");
        assert_eq!(experiment, parsed);
    }
}
