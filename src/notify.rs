//! Order notifications to shop owners.
//!
//! Notifications are sent after the order transaction commits, on a detached
//! task that nobody awaits. Delivery is at most once: a failure is logged and
//! dropped, never retried, and never affects the order.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use sea_orm::prelude::Uuid;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Payload describing a newly placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNotification {
    /// Order id
    pub order_id: Uuid,
    /// Human-readable order number
    pub order_number: String,
    /// Shop fulfilling the order
    pub shop_id: Uuid,
    /// Shop name
    pub shop_name: String,
    /// Owner to notify
    pub shop_owner_id: Uuid,
    /// Owner email, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_owner_email: Option<String>,
    /// Customer contact name
    pub customer_name: String,
    /// Number of line items
    pub item_count: usize,
    /// Amount due in minor units
    pub total_amount: i64,
}

/// Delivers order notifications somewhere.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    /// Sends one notification.
    async fn notify(&self, notification: &OrderNotification) -> Result<()>;
}

/// POSTs notifications as JSON to a webhook endpoint.
pub struct HttpNotifier {
    client: Client,
    endpoint: String,
}

impl HttpNotifier {
    /// Creates a notifier for `endpoint` with a per-request timeout.
    ///
    /// # Errors
    /// Returns `Error::Notification` if the HTTP client cannot be built.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl OrderNotifier for HttpNotifier {
    async fn notify(&self, notification: &OrderNotification) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(notification)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::DeliveryFailed {
                message: format!("endpoint returned {status}"),
            });
        }

        info!(order_number = %notification.order_number, "Delivered order notification");
        Ok(())
    }
}

/// Writes notifications to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl OrderNotifier for LogNotifier {
    async fn notify(&self, notification: &OrderNotification) -> Result<()> {
        info!(
            order_number = %notification.order_number,
            shop_id = %notification.shop_id,
            owner_id = %notification.shop_owner_id,
            total_amount = notification.total_amount,
            "New order for shop"
        );
        Ok(())
    }
}

/// Sends `notification` on a detached task.
///
/// The handle is returned for tests; callers normally drop it. Errors are
/// logged inside the task.
pub fn dispatch_detached(
    notifier: Arc<dyn OrderNotifier>,
    notification: OrderNotification,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&notification).await {
            error!(
                order_number = %notification.order_number,
                error = %e,
                "Failed to send order notification"
            );
        }
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{FailingNotifier, RecordingNotifier};

    fn sample() -> OrderNotification {
        OrderNotification {
            order_id: Uuid::new_v4(),
            order_number: "ORD-20261019-042".to_string(),
            shop_id: Uuid::new_v4(),
            shop_name: "Bakery".to_string(),
            shop_owner_id: Uuid::new_v4(),
            shop_owner_email: None,
            customer_name: "Ada".to_string(),
            item_count: 2,
            total_amount: 4500,
        }
    }

    #[test]
    fn test_payload_uses_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["orderNumber"], "ORD-20261019-042");
        assert_eq!(json["totalAmount"], 4500);
        assert!(json.get("shopOwnerEmail").is_none());
    }

    #[tokio::test]
    async fn test_log_notifier_succeeds() {
        assert!(LogNotifier.notify(&sample()).await.is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_detached_delivers() {
        let recorder = Arc::new(RecordingNotifier::default());
        dispatch_detached(recorder.clone(), sample()).await.unwrap();
        assert_eq!(recorder.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_detached_swallows_failures() {
        let failing = Arc::new(FailingNotifier::default());
        let handle = dispatch_detached(failing.clone(), sample());
        // the task completes normally even though the notifier errored
        assert!(handle.await.is_ok());
        assert_eq!(failing.attempts(), 1);
    }

    #[tokio::test]
    async fn test_http_notifier_reports_unreachable_endpoint() {
        let notifier =
            HttpNotifier::new("http://127.0.0.1:9/orders", Duration::from_secs(1)).unwrap();
        let result = notifier.notify(&sample()).await;
        assert!(matches!(result, Err(Error::Notification(_))));
    }

    #[tokio::test]
    async fn test_http_notifier_reports_refused_delivery() {
        use axum::{Router, http::StatusCode, routing::post};

        let app = Router::new().route("/orders", post(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let notifier =
            HttpNotifier::new(&format!("http://{addr}/orders"), Duration::from_secs(5)).unwrap();
        let err = notifier.notify(&sample()).await.unwrap_err();
        assert!(matches!(err, Error::DeliveryFailed { .. }));
        assert_eq!(
            err.to_string(),
            "Notification delivery failed: endpoint returned 503 Service Unavailable"
        );
    }
}
