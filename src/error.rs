//! Error types for abgate
//!
//! The engine surfaces three failure kinds and never retries internally;
//! the caller (typically an HTTP route layer) decides how to present them.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Engine error types
#[derive(Error, Debug)]
pub enum Error {
    /// No active, in-window experiment with the given name.
    ///
    /// Raised by the resolver only; the rollout gate treats a missing
    /// experiment as "disabled" rather than an error.
    #[error("experiment not found: no active experiment named '{name}'")]
    NotFound {
        /// Name the lookup was performed with
        name: String,
    },

    /// Experiment exists but can never assign a variant.
    #[error("invalid experiment '{name}': {reason}")]
    InvalidExperiment {
        /// Experiment name
        name: String,
        /// Why no variant can be assigned (empty variants, zero total weight, ...)
        reason: String,
    },

    /// Failure in the underlying persistence layer, propagated unchanged.
    #[error("store error: {0}")]
    Store(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_the_experiment() {
        let error = Error::NotFound {
            name: "checkout_redesign".to_string(),
        };
        assert!(format!("{error}").contains("checkout_redesign"));
    }

    #[test]
    fn test_invalid_experiment_carries_reason() {
        let error = Error::InvalidExperiment {
            name: "exp".to_string(),
            reason: "total weight is zero".to_string(),
        };
        let text = format!("{error}");
        assert!(text.contains("exp"));
        assert!(text.contains("total weight is zero"));
    }
}
