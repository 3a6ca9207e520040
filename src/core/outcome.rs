//! Structured results returned by mutations.
//!
//! Expected failures (not logged in, not found, stock exceeded, quota reached)
//! are values, not errors: every mutation resolves to one of these shapes with
//! `success: false` and a message. Only infrastructure faults surface as `Err`.

use crate::errors::{Error, Result};
use sea_orm::prelude::Uuid;
use serde::Serialize;
use tracing::warn;

/// Result of a mutation that creates, changes or removes one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    /// Whether the mutation took effect
    pub success: bool,
    /// Human-readable result or failure reason
    pub message: String,
    /// Id of the affected row, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
}

impl MutationOutcome {
    /// Successful mutation that affected row `id`.
    pub fn ok(message: impl Into<String>, id: Uuid) -> Self {
        Self {
            success: true,
            message: message.into(),
            id: Some(id),
        }
    }

    /// Successful mutation with no single affected row.
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            id: None,
        }
    }

    /// Rejected mutation.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            id: None,
        }
    }

    /// Converts a business-rule error into a failed outcome.
    ///
    /// # Errors
    /// Infrastructure errors are handed back unchanged so the request fails.
    pub fn rejected(err: Error) -> Result<Self> {
        if err.is_business() {
            warn!(reason = %err, "Mutation rejected");
            Ok(Self::fail(err.to_string()))
        } else {
            Err(err)
        }
    }
}

/// Result of a bulk delete such as clearing a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearOutcome {
    /// Whether the delete ran
    pub success: bool,
    /// Human-readable result
    pub message: String,
    /// Number of rows removed
    pub deleted_count: u64,
}

impl ClearOutcome {
    /// Failed clear, typically because the caller is not logged in.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            deleted_count: 0,
        }
    }
}
