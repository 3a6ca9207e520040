//! HTTP surface exposing every core operation as a named procedure.
//!
//! `POST /api/query/{name}` runs a read, `POST /api/mutation/{name}` runs a
//! write. Both take a JSON argument object (an empty body counts as `{}`)
//! and return the operation's JSON result. The caller is read from the
//! `x-user-id` header; a missing or malformed header means "not logged in".

pub mod handlers;

use crate::{core::subscription::NewPackage, errors::Error, notify::OrderNotifier};
use axum::{
    Json, Router,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use sea_orm::{DatabaseConnection, prelude::Uuid};
use serde_json::json;
use std::{convert::Infallible, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::error;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Where order notifications go
    pub notifier: Arc<dyn OrderNotifier>,
    /// Package assigned to newly synced users
    pub default_package: Option<String>,
    /// Package definitions used by `initializeSubscriptionPackages`
    pub seed_packages: Arc<Vec<NewPackage>>,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/query/{name}", post(handlers::query))
        .route("/api/mutation/{name}", post(handlers::mutation))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The resolved caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub Option<Uuid>);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let caller = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok());
        Ok(Self(caller))
    }
}

/// Request-level failures.
#[derive(Debug)]
pub enum ApiError {
    /// No procedure with this name
    UnknownProcedure(String),
    /// Arguments did not match the procedure
    BadRequest(String),
    /// Infrastructure fault inside the operation
    Internal(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::UnknownProcedure(name) => {
                (StatusCode::NOT_FOUND, format!("Unknown procedure: {name}"))
            }
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Internal(err) => {
                error!(error = %err, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
