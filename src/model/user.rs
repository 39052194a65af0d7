//! Caller-supplied user identity
//!
//! The engine accepts a plain value type at its boundary; no HTTP or
//! session types cross into the crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity and audience attributes for the user a call is made on behalf of.
///
/// Only `user_id` is required. Account creation time feeds the `new_users`
/// target group; a user with no known creation time never matches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    user_id: String,
    created_at: Option<DateTime<Utc>>,
    premium: bool,
}

impl UserContext {
    /// Create a context with only an id.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            created_at: None,
            premium: false,
        }
    }

    /// Attach the account creation timestamp.
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Mark the user as a premium-tier member.
    #[must_use]
    pub const fn premium(mut self, premium: bool) -> Self {
        self.premium = premium;
        self
    }

    /// Get the user id.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Get the account creation time, if known.
    #[must_use]
    pub const fn account_created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Whether the user is on the premium tier.
    #[must_use]
    pub const fn is_premium(&self) -> bool {
        self.premium
    }
}
