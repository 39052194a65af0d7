//! Engine configuration
//!
//! One `EngineConfig` is built at process start and injected into the
//! engine; nothing in the crate reads ambient global state.

use chrono::Duration;

/// Process-wide configuration for the assignment engine.
///
/// Covers the knobs that differ between deployments: how recent an account
/// must be to count as a "new user", which variant names carry a rollout
/// percentage when the experiment has no top-level one, and the labels
/// persisted for gradual-rollout assignments.
///
/// # Example
///
/// ```rust
/// use abgate::config::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .new_user_window_days(14)
///     .build();
/// assert_eq!(config.new_user_window().num_days(), 14);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    new_user_window: Duration,
    rollout_variant_names: Vec<String>,
    enabled_label: String,
    disabled_label: String,
}

impl EngineConfig {
    /// Create a builder with the default settings.
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Account age below which a user matches the `new_users` target group.
    #[must_use]
    pub const fn new_user_window(&self) -> Duration {
        self.new_user_window
    }

    /// Variant names checked, in order, for a rollout percentage when the
    /// experiment carries none at the top level.
    #[must_use]
    pub fn rollout_variant_names(&self) -> &[String] {
        &self.rollout_variant_names
    }

    /// Variant label persisted for users inside a gradual rollout.
    #[must_use]
    pub fn enabled_label(&self) -> &str {
        &self.enabled_label
    }

    /// Variant label persisted for users outside a gradual rollout.
    #[must_use]
    pub fn disabled_label(&self) -> &str {
        &self.disabled_label
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug)]
pub struct EngineConfigBuilder {
    new_user_window: Duration,
    rollout_variant_names: Vec<String>,
    enabled_label: String,
    disabled_label: String,
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self {
            new_user_window: Duration::days(7),
            rollout_variant_names: vec![
                "new_feature".to_string(),
                "enabled".to_string(),
                "new".to_string(),
            ],
            enabled_label: "new".to_string(),
            disabled_label: "original".to_string(),
        }
    }
}

impl EngineConfigBuilder {
    /// Set the `new_users` account-age window in days.
    #[must_use]
    pub fn new_user_window_days(mut self, days: i64) -> Self {
        self.new_user_window = Duration::days(days);
        self
    }

    /// Replace the list of variant names that carry a rollout percentage.
    #[must_use]
    pub fn rollout_variant_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rollout_variant_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the labels persisted for enabled / disabled rollout assignments.
    #[must_use]
    pub fn assignment_labels(
        mut self,
        enabled: impl Into<String>,
        disabled: impl Into<String>,
    ) -> Self {
        self.enabled_label = enabled.into();
        self.disabled_label = disabled.into();
        self
    }

    /// Build the [`EngineConfig`].
    #[must_use]
    pub fn build(self) -> EngineConfig {
        EngineConfig {
            new_user_window: self.new_user_window,
            rollout_variant_names: self.rollout_variant_names,
            enabled_label: self.enabled_label,
            disabled_label: self.disabled_label,
        }
    }
}
