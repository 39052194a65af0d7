//! Experiment data model
//!
//! ## Schema Overview
//!
//! ```text
//! Experiment (1) ──< AssignmentRecord (N, one per user)
//!                        └──< MetricObservation (N) [time-series]
//! ```
//!
//! An [`Experiment`] describes either an A/B test or a gradual rollout. The
//! first resolution of a user against an experiment creates an
//! [`AssignmentRecord`] whose variant is sticky for the experiment's life;
//! metric observations append to that record over time.

mod experiment;
mod result;
mod user;

pub use experiment::{
    Experiment, ExperimentDefinition, ExperimentDefinitionBuilder, ExperimentPatch,
    ExperimentStatus, ExperimentType, TargetGroup, Variant,
};
pub use result::{AssignmentRecord, MetricObservation, MetricSummary, VariantAggregate};
pub use user::UserContext;
