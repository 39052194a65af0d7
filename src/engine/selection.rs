//! Variant selection and audience matching

use chrono::Utc;
use rand::Rng;

use crate::config::EngineConfig;
use crate::model::{Experiment, TargetGroup, UserContext, Variant};
use crate::{Error, Result};

/// Pick the first variant whose cumulative weight exceeds `draw`.
///
/// `draw` must come from `[0, total_weight)`. Zero-weight variants occupy an
/// empty interval and are never picked. Returns `None` when the draw falls
/// past the total (possible only through float accumulation error), in which
/// case the caller falls back to the last positively-weighted variant.
#[must_use]
pub fn pick_by_cumulative_weight(variants: &[Variant], draw: f64) -> Option<&Variant> {
    let mut cumulative = 0.0;
    variants.iter().find(|variant| {
        cumulative += variant.weight();
        draw < cumulative
    })
}

/// Sum variant weights, rejecting unusable weight lists.
///
/// # Errors
///
/// [`Error::InvalidExperiment`] when the list is empty, any weight is
/// negative or non-finite, or the total is zero.
pub fn total_weight(experiment_name: &str, variants: &[Variant]) -> Result<f64> {
    if variants.is_empty() {
        return Err(Error::InvalidExperiment {
            name: experiment_name.to_string(),
            reason: "experiment has no variants".to_string(),
        });
    }
    let mut total = 0.0;
    for variant in variants {
        let weight = variant.weight();
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::InvalidExperiment {
                name: experiment_name.to_string(),
                reason: format!("variant '{}' has invalid weight {weight}", variant.name()),
            });
        }
        total += weight;
    }
    if total <= 0.0 {
        return Err(Error::InvalidExperiment {
            name: experiment_name.to_string(),
            reason: "total variant weight is zero".to_string(),
        });
    }
    Ok(total)
}

/// Weighted random selection for an A/B test.
///
/// Draws uniformly from `[0, total)` and picks by cumulative weight, so each
/// variant is chosen in proportion to its relative weight.
pub(crate) fn select_weighted<'a>(
    experiment_name: &str,
    variants: &'a [Variant],
) -> Result<&'a Variant> {
    let total = total_weight(experiment_name, variants)?;
    let draw = rand::thread_rng().gen_range(0.0..total);
    pick_by_cumulative_weight(variants, draw)
        .or_else(|| variants.iter().rev().find(|v| v.weight() > 0.0))
        .ok_or_else(|| Error::InvalidExperiment {
            name: experiment_name.to_string(),
            reason: "no selectable variant".to_string(),
        })
}

/// Whether the user matches at least one of the experiment's target groups.
///
/// An empty group list means unrestricted. Unrecognized groups never match.
pub(crate) fn matches_target_groups(
    experiment: &Experiment,
    user: &UserContext,
    config: &EngineConfig,
) -> bool {
    let groups = experiment.target_groups();
    if groups.is_empty() {
        return true;
    }
    groups.iter().any(|group| match group {
        TargetGroup::All => true,
        TargetGroup::NewUsers => user
            .account_created_at()
            .map_or(false, |created| Utc::now() - created < config.new_user_window()),
        TargetGroup::PremiumUsers => user.is_premium(),
        TargetGroup::SpecificUsers => experiment
            .allowed_user_ids()
            .iter()
            .any(|id| id == user.user_id()),
        TargetGroup::Unknown => false,
    })
}
