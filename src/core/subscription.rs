//! Subscription package management and per-user usage.
//!
//! Packages are global reference data. They are seeded once, edited in place by
//! admins and deactivated rather than deleted.

use crate::{
    core::{
        account::{is_admin, require_admin},
        outcome::MutationOutcome,
    },
    entities::{
        PackageFeatures, Shelf, Shop, SubscriptionPackage, User, shelf, shop,
        subscription_package,
    },
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

const fn default_active() -> bool {
    true
}

/// Definition of a package to create, as read from packages.toml or an admin call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPackage {
    /// Machine name users are assigned by
    #[serde(alias = "package_name")]
    pub package_name: String,
    /// Name shown to users
    #[serde(alias = "display_name")]
    pub display_name: String,
    /// Price in minor currency units
    pub price: i64,
    /// ISO currency code
    pub currency: String,
    /// Maximum shops per user
    #[serde(alias = "max_shops")]
    pub max_shops: i32,
    /// Maximum shelves per shop
    #[serde(alias = "max_shelves_per_shop")]
    pub max_shelves_per_shop: i32,
    /// Maximum products plus services per shelf
    #[serde(alias = "max_items_per_shelf")]
    pub max_items_per_shelf: i32,
    /// Feature lines for display
    #[serde(default)]
    pub features: Vec<String>,
    /// Whether the package can be assigned
    #[serde(default = "default_active", alias = "is_active")]
    pub is_active: bool,
}

impl NewPackage {
    fn validate(&self) -> Result<()> {
        if self.package_name.trim().is_empty() {
            return Err(Error::validation("Package name is required"));
        }
        if self.price < 0 {
            return Err(Error::validation("Price cannot be negative"));
        }
        if self.max_shops < 0 || self.max_shelves_per_shop < 0 || self.max_items_per_shelf < 0 {
            return Err(Error::validation("Limits cannot be negative"));
        }
        Ok(())
    }

    fn into_active_model(self) -> subscription_package::ActiveModel {
        let now = chrono::Utc::now();
        subscription_package::ActiveModel {
            id: Set(Uuid::new_v4()),
            package_name: Set(self.package_name),
            display_name: Set(self.display_name),
            price: Set(self.price),
            currency: Set(self.currency),
            max_shops: Set(self.max_shops),
            max_shelves_per_shop: Set(self.max_shelves_per_shop),
            max_items_per_shelf: Set(self.max_items_per_shelf),
            features: Set(PackageFeatures(self.features)),
            is_active: Set(self.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

/// Partial update of a package; only `Some` fields change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageUpdate {
    /// New display name
    pub display_name: Option<String>,
    /// New price in minor units
    pub price: Option<i64>,
    /// New currency code
    pub currency: Option<String>,
    /// New shop limit
    pub max_shops: Option<i32>,
    /// New shelf limit
    pub max_shelves_per_shop: Option<i32>,
    /// New item limit
    pub max_items_per_shelf: Option<i32>,
    /// Replacement feature list
    pub features: Option<Vec<String>>,
    /// Activate or deactivate
    pub is_active: Option<bool>,
}

/// Shelf usage of one shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopUsage {
    /// Shop id
    pub shop_id: Uuid,
    /// Shop name
    pub shop_name: String,
    /// Shelves currently in the shop
    pub shelf_count: u64,
}

/// A user's package together with what they currently use of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionUsage {
    /// Name stored on the user, if any
    pub package_name: Option<String>,
    /// Resolved package, `None` when the name does not resolve
    pub package: Option<subscription_package::Model>,
    /// Shops owned by the user
    pub shop_count: u64,
    /// Per-shop shelf counts
    pub shops: Vec<ShopUsage>,
}

/// Seeds the package table unless it already holds any package.
///
/// Returns the number of packages inserted; zero when seeding was skipped.
/// Existing packages are never reconciled against `packages`.
pub async fn initialize_subscription_packages(
    db: &DatabaseConnection,
    packages: &[NewPackage],
) -> Result<u64> {
    let txn = db.begin().await?;

    if SubscriptionPackage::find().count(&txn).await? > 0 {
        info!("Subscription packages already present, skipping seed");
        return Ok(0);
    }

    let mut inserted = 0;
    for package in packages {
        package.validate()?;
        package.clone().into_active_model().insert(&txn).await?;
        inserted += 1;
    }

    txn.commit().await?;
    info!(inserted, "Seeded subscription packages");
    Ok(inserted)
}

async fn insert_package(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    package: NewPackage,
) -> Result<subscription_package::Model> {
    let txn = db.begin().await?;
    require_admin(&txn, caller, "create subscription packages").await?;
    package.validate()?;

    let existing = SubscriptionPackage::find()
        .filter(subscription_package::Column::PackageName.eq(package.package_name.as_str()))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(Error::DuplicatePackage {
            name: package.package_name,
        });
    }

    let created = package.into_active_model().insert(&txn).await?;
    txn.commit().await?;
    Ok(created)
}

/// Creates a custom package. Admin only; rejects a duplicate `package_name`.
#[instrument(skip(db, package), fields(package_name = %package.package_name))]
pub async fn create_subscription_package(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    package: NewPackage,
) -> Result<MutationOutcome> {
    match insert_package(db, caller, package).await {
        Ok(created) => {
            info!(package_id = %created.id, "Created subscription package");
            Ok(MutationOutcome::ok("Subscription package created", created.id))
        }
        Err(e) => MutationOutcome::rejected(e),
    }
}

async fn patch_package(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    package_id: Uuid,
    update: PackageUpdate,
) -> Result<()> {
    let txn = db.begin().await?;
    require_admin(&txn, caller, "update subscription packages").await?;

    let package = SubscriptionPackage::find_by_id(package_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "Subscription package",
        })?;

    if update.price.is_some_and(|p| p < 0) {
        return Err(Error::validation("Price cannot be negative"));
    }
    let limits = [
        update.max_shops,
        update.max_shelves_per_shop,
        update.max_items_per_shelf,
    ];
    if limits.iter().flatten().any(|&limit| limit < 0) {
        return Err(Error::validation("Limits cannot be negative"));
    }

    let mut active: subscription_package::ActiveModel = package.into();
    if let Some(display_name) = update.display_name {
        active.display_name = Set(display_name);
    }
    if let Some(price) = update.price {
        active.price = Set(price);
    }
    if let Some(currency) = update.currency {
        active.currency = Set(currency);
    }
    if let Some(max_shops) = update.max_shops {
        active.max_shops = Set(max_shops);
    }
    if let Some(max_shelves) = update.max_shelves_per_shop {
        active.max_shelves_per_shop = Set(max_shelves);
    }
    if let Some(max_items) = update.max_items_per_shelf {
        active.max_items_per_shelf = Set(max_items);
    }
    if let Some(features) = update.features {
        active.features = Set(PackageFeatures(features));
    }
    if let Some(is_active) = update.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(chrono::Utc::now());
    active.update(&txn).await?;

    txn.commit().await?;
    Ok(())
}

/// Applies a partial update to a package. Admin only.
#[instrument(skip(db, update))]
pub async fn update_subscription_package(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    package_id: Uuid,
    update: PackageUpdate,
) -> Result<MutationOutcome> {
    match patch_package(db, caller, package_id, update).await {
        Ok(()) => {
            info!("Updated subscription package");
            Ok(MutationOutcome::ok("Subscription package updated", package_id))
        }
        Err(e) => MutationOutcome::rejected(e),
    }
}

/// Active packages, cheapest first.
pub async fn get_subscription_packages(
    db: &DatabaseConnection,
) -> Result<Vec<subscription_package::Model>> {
    SubscriptionPackage::find()
        .filter(subscription_package::Column::IsActive.eq(true))
        .order_by_asc(subscription_package::Column::Price)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Every package including inactive ones; empty for non-admin callers.
pub async fn get_all_subscription_packages(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
) -> Result<Vec<subscription_package::Model>> {
    if !is_admin(db, caller).await? {
        return Ok(Vec::new());
    }
    SubscriptionPackage::find()
        .order_by_asc(subscription_package::Column::Price)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Looks up a package by its machine name.
pub async fn get_subscription_package_by_name(
    db: &DatabaseConnection,
    package_name: &str,
) -> Result<Option<subscription_package::Model>> {
    SubscriptionPackage::find()
        .filter(subscription_package::Column::PackageName.eq(package_name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Package and current usage of `user_id`.
///
/// Visible to the user themselves and to admins; `None` for anyone else or
/// for an unknown user.
pub async fn get_user_subscription_usage(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    user_id: Uuid,
) -> Result<Option<SubscriptionUsage>> {
    if caller != Some(user_id) && !is_admin(db, caller).await? {
        return Ok(None);
    }
    let Some(user) = User::find_by_id(user_id).one(db).await? else {
        return Ok(None);
    };

    let package = match user.subscription_package.as_deref() {
        Some(name) => get_subscription_package_by_name(db, name).await?,
        None => None,
    };

    let owned_shops = Shop::find()
        .filter(shop::Column::OwnerId.eq(user_id))
        .order_by_asc(shop::Column::CreatedAt)
        .all(db)
        .await?;

    let mut shops = Vec::with_capacity(owned_shops.len());
    for owned in owned_shops {
        let shelf_count = Shelf::find()
            .filter(shelf::Column::ShopId.eq(owned.id))
            .count(db)
            .await?;
        shops.push(ShopUsage {
            shop_id: owned.id,
            shop_name: owned.name,
            shelf_count,
        });
    }

    Ok(Some(SubscriptionUsage {
        package_name: user.subscription_package,
        package,
        shop_count: shops.len() as u64,
        shops,
    }))
}

async fn assign_package(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    user_id: Uuid,
    package_name: &str,
) -> Result<()> {
    let txn = db.begin().await?;
    require_admin(&txn, caller, "change subscriptions").await?;

    let package = SubscriptionPackage::find()
        .filter(subscription_package::Column::PackageName.eq(package_name))
        .one(&txn)
        .await?
        .filter(|p| p.is_active)
        .ok_or(Error::NotFound {
            entity: "Subscription package",
        })?;

    let user = User::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound { entity: "User" })?;

    let mut active: crate::entities::user::ActiveModel = user.into();
    active.subscription_package = Set(Some(package.package_name));
    active.updated_at = Set(chrono::Utc::now());
    active.update(&txn).await?;

    txn.commit().await?;
    Ok(())
}

/// Assigns an active package to a user. Admin only.
#[instrument(skip(db))]
pub async fn update_user_subscription(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    user_id: Uuid,
    package_name: &str,
) -> Result<MutationOutcome> {
    match assign_package(db, caller, user_id, package_name).await {
        Ok(()) => {
            info!("Updated user subscription");
            Ok(MutationOutcome::ok("Subscription updated", user_id))
        }
        Err(e) => MutationOutcome::rejected(e),
    }
}
