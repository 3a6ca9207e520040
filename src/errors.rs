//! Unified error types and result handling.
//!
//! Infrastructure faults (database, I/O, HTTP) and business-rule failures share
//! one enum. Business failures are turned into structured `{success: false}`
//! outcomes at the operation boundary; see [`Error::is_business`].

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong with the configuration
        message: String,
    },

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem or socket failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Required environment variable missing or not unicode
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Order notification request could not be sent
    #[error("Notification error: {0}")]
    Notification(#[from] reqwest::Error),

    /// Notification endpoint answered but refused the delivery
    #[error("Notification delivery failed: {message}")]
    DeliveryFailed {
        /// What the endpoint reported
        message: String,
    },

    /// Caller has no identity
    #[error("You must be logged in to {action}")]
    Unauthenticated {
        /// Action the caller attempted, phrased to complete the sentence
        action: &'static str,
    },

    /// Referenced row is missing or belongs to someone else
    #[error("{entity} not found")]
    NotFound {
        /// Kind of row that was looked up
        entity: &'static str,
    },

    /// Quantity was zero or negative
    #[error("Quantity must be greater than 0")]
    InvalidQuantity {
        /// The rejected quantity
        quantity: i32,
    },

    /// Requested quantity exceeds tracked stock
    #[error("Only {available} items available in stock")]
    StockExceeded {
        /// Units currently in stock
        available: i32,
    },

    /// Selected cart rows span more than one shop
    #[error("All items must be from the same shop")]
    CrossShopOrder,

    /// No cart rows were selected for the order
    #[error("No items to order")]
    EmptyOrder,

    /// Subscription plan limit reached
    #[error("{message}")]
    QuotaExceeded {
        /// Reason reported by the quota check
        message: String,
    },

    /// A package with this name already exists
    #[error("Subscription package '{name}' already exists")]
    DuplicatePackage {
        /// The duplicated package name
        name: String,
    },

    /// Input failed a business validation rule
    #[error("{message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },
}

impl Error {
    /// Returns true for expected business-rule failures that are reported to
    /// the caller as `{success: false}` rather than failing the request.
    #[must_use]
    pub const fn is_business(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated { .. }
                | Self::NotFound { .. }
                | Self::InvalidQuantity { .. }
                | Self::StockExceeded { .. }
                | Self::CrossShopOrder
                | Self::EmptyOrder
                | Self::QuotaExceeded { .. }
                | Self::DuplicatePackage { .. }
                | Self::Validation { .. }
        )
    }

    /// Reports a `NotFound` as a missing `entity` instead; other errors pass through.
    ///
    /// Used where a foreign parent row must look like a missing child row.
    #[must_use]
    pub fn renamed_not_found(self, entity: &'static str) -> Self {
        match self {
            Self::NotFound { .. } => Self::NotFound { entity },
            other => other,
        }
    }

    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
