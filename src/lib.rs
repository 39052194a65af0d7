//! # abgate: Experiment Assignment Engine
//!
//! Sticky A/B variant assignment, percentage-based gradual rollout gating,
//! and per-user metric recording over an abstract experiment store.
//!
//! ## Design
//!
//! - **Sticky assignment**: the first resolution of a `(user, experiment)`
//!   pair persists a variant; every later call returns it unchanged, even if
//!   variant weights are edited mid-experiment.
//! - **Deterministic rollout bucketing**: gradual rollouts hash the user into
//!   a percentile bucket (0–99), so concurrent first checks agree without
//!   coordination and re-computation is idempotent.
//! - **Store-resolved races**: the store's atomic insert-if-absent upsert,
//!   not engine logic, decides which concurrent first-time assignment wins;
//!   every racer observes the winner.
//! - **Fail-closed gating**: checking an unknown feature name returns
//!   `false`; resolving an unknown experiment is an error.
//!
//! ## Example
//!
//! ```rust
//! use abgate::engine::AssignmentEngine;
//! use abgate::model::{ExperimentDefinition, ExperimentType, UserContext};
//! use abgate::store::{ExperimentStore, MemoryExperimentStore};
//!
//! # async fn example() -> abgate::Result<()> {
//! let store = MemoryExperimentStore::new();
//! store
//!     .create_experiment(
//!         ExperimentDefinition::builder("dark_mode", ExperimentType::GradualRollout)
//!             .rollout_percentage(25.0)
//!             .build(),
//!     )
//!     .await?;
//!
//! let engine = AssignmentEngine::new(store);
//! let enabled = engine.is_enabled(&UserContext::new("user-1"), "dark_mode").await?;
//! println!("dark_mode enabled: {enabled}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod store;

pub use error::{Error, Result};
