//! Shared test utilities for the marketplace.
//!
//! This module provides helpers for setting up in-memory test databases and
//! creating test entities with sensible defaults. Fixture builders insert rows
//! directly and bypass quota checks.

use crate::{
    config::packages::default_packages,
    core::subscription::initialize_subscription_packages,
    entities::{product, service, shelf, shop, user},
    errors::{Error, Result},
    notify::{OrderNotification, OrderNotifier},
};
use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, prelude::Uuid};
use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

/// Creates an in-memory `SQLite` database with all tables and no data.
pub async fn setup_empty_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates an in-memory `SQLite` database with all tables and the built-in
/// `free`, `basic` and `premium` packages.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = setup_empty_db().await?;
    initialize_subscription_packages(&db, &default_packages()).await?;
    Ok(db)
}

async fn insert_user(
    db: &DatabaseConnection,
    name: &str,
    package: Option<&str>,
    is_admin: bool,
) -> Result<user::Model> {
    let now = chrono::Utc::now();
    let id = Uuid::new_v4();
    user::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        email: Set(format!("{id}@example.com")),
        phone: Set(None),
        subscription_package: Set(package.map(str::to_string)),
        is_admin: Set(is_admin),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates a regular user on `package` (or on no package).
pub async fn create_test_user(
    db: &DatabaseConnection,
    name: &str,
    package: Option<&str>,
) -> Result<user::Model> {
    insert_user(db, name, package, false).await
}

/// Creates an admin user on the premium package.
pub async fn create_test_admin(db: &DatabaseConnection) -> Result<user::Model> {
    insert_user(db, "Admin", Some("premium"), true).await
}

/// Creates a shop owned by `owner_id`.
pub async fn create_test_shop(
    db: &DatabaseConnection,
    owner_id: Uuid,
    name: &str,
) -> Result<shop::Model> {
    let now = chrono::Utc::now();
    shop::ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner_id),
        name: Set(name.to_string()),
        description: Set(None),
        category: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates a shelf in `shop_id`.
pub async fn create_test_shelf(
    db: &DatabaseConnection,
    shop_id: Uuid,
    name: &str,
) -> Result<shelf::Model> {
    let now = chrono::Utc::now();
    shelf::ActiveModel {
        id: Set(Uuid::new_v4()),
        shop_id: Set(shop_id),
        name: Set(name.to_string()),
        description: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates a product on `shelf` with the given price and stock.
pub async fn create_test_product(
    db: &DatabaseConnection,
    shelf: &shelf::Model,
    name: &str,
    price: i64,
    quantity_available: Option<i32>,
) -> Result<product::Model> {
    let now = chrono::Utc::now();
    product::ActiveModel {
        id: Set(Uuid::new_v4()),
        shop_id: Set(shelf.shop_id),
        shelf_id: Set(shelf.id),
        name: Set(name.to_string()),
        description: Set(None),
        price: Set(price),
        quantity_available: Set(quantity_available),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates a service on `shelf`.
pub async fn create_test_service(
    db: &DatabaseConnection,
    shelf: &shelf::Model,
    name: &str,
) -> Result<service::Model> {
    let now = chrono::Utc::now();
    service::ActiveModel {
        id: Set(Uuid::new_v4()),
        shop_id: Set(shelf.shop_id),
        shelf_id: Set(shelf.id),
        name: Set(name.to_string()),
        description: Set(None),
        pricing: Set(Some("Contact for pricing".to_string())),
        duration: Set(Some("1 hour".to_string())),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// A small marketplace: one vendor shop with a product and a service, and a
/// customer to shop there.
pub struct TestMarket {
    /// Shopper on the free plan
    pub customer: user::Model,
    /// Shop owner on the free plan
    pub vendor: user::Model,
    /// The vendor's shop
    pub shop: shop::Model,
    /// Single shelf in the shop
    pub shelf: shelf::Model,
    /// "Sourdough", price 1000, stock 5
    pub product: product::Model,
    /// "Cake decorating class"
    pub service: service::Model,
}

/// Builds a [`TestMarket`] in `db`.
pub async fn setup_market(db: &DatabaseConnection) -> Result<TestMarket> {
    let customer = create_test_user(db, "Customer", Some("free")).await?;
    let vendor = create_test_user(db, "Vendor", Some("free")).await?;
    let shop = create_test_shop(db, vendor.id, "Corner Bakery").await?;
    let shelf = create_test_shelf(db, shop.id, "Bread").await?;
    let product = create_test_product(db, &shelf, "Sourdough", 1000, Some(5)).await?;
    let service = create_test_service(db, &shelf, "Cake decorating class").await?;
    Ok(TestMarket {
        customer,
        vendor,
        shop,
        shelf,
        product,
        service,
    })
}

/// Notifier that records every notification it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<OrderNotification>>,
}

impl RecordingNotifier {
    /// Notifications received so far.
    #[allow(clippy::unwrap_used)]
    pub fn sent(&self) -> Vec<OrderNotification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderNotifier for RecordingNotifier {
    #[allow(clippy::unwrap_used)]
    async fn notify(&self, notification: &OrderNotification) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Notifier that always fails and counts attempts.
#[derive(Default)]
pub struct FailingNotifier {
    attempts: AtomicUsize,
}

impl FailingNotifier {
    /// Number of delivery attempts so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderNotifier for FailingNotifier {
    async fn notify(&self, _notification: &OrderNotification) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(Error::DeliveryFailed {
            message: "endpoint returned 503 Service Unavailable".to_string(),
        })
    }
}
