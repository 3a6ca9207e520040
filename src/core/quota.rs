//! Subscription quota checks.
//!
//! Each check walks the ownership chain to the owner's subscription package,
//! counts the live rows the plan limits, and allows creation only while
//! `count < limit`. A missing link anywhere in the chain (user, package, shop,
//! shelf) denies the request: unresolved state never grants extra quota.
//!
//! The checks only read. The catalog mutations call them inside their own
//! transaction and refuse the insert when a check denies it.

use crate::{
    entities::{
        Product, Service, Shelf, Shop, SubscriptionPackage, User, product, service, shelf, shop,
        subscription_package,
    },
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, prelude::*};
use serde::Serialize;
use tracing::debug;

/// Outcome of a quota check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaCheck {
    /// Whether one more row may be created
    pub allowed: bool,
    /// Rows currently counted against the limit
    pub current_count: u64,
    /// Plan limit, absent when the chain could not be resolved
    pub limit: Option<i32>,
    /// Package the limit came from
    pub package_name: Option<String>,
    /// Why creation is denied
    pub reason: Option<String>,
}

impl QuotaCheck {
    /// Compares a live count with a plan limit.
    ///
    /// `what` names the limited rows in the denial message (e.g. "shops").
    #[must_use]
    pub fn against_limit(current_count: u64, limit: i32, package_name: &str, what: &str) -> Self {
        let allowed = i64::try_from(current_count).is_ok_and(|count| count < i64::from(limit));
        let reason = (!allowed).then(|| {
            format!(
                "Your {package_name} plan allows {limit} {what}. Upgrade your subscription to add more."
            )
        });
        Self {
            allowed,
            current_count,
            limit: Some(limit),
            package_name: Some(package_name.to_string()),
            reason,
        }
    }

    /// Denial for an unresolved ownership chain.
    #[must_use]
    pub fn denied(reason: &str) -> Self {
        Self {
            allowed: false,
            current_count: 0,
            limit: None,
            package_name: None,
            reason: Some(reason.to_string()),
        }
    }

    /// Turns a denial into `Error::QuotaExceeded`.
    ///
    /// # Errors
    /// Returns `Error::QuotaExceeded` when the check did not allow creation.
    pub fn enforce(&self) -> Result<()> {
        if self.allowed {
            Ok(())
        } else {
            Err(Error::QuotaExceeded {
                message: self
                    .reason
                    .clone()
                    .unwrap_or_else(|| "Subscription limit reached".to_string()),
            })
        }
    }
}

/// Resolves the package of `user_id`, or the denial explaining which link is missing.
async fn package_for_user<C>(
    conn: &C,
    user_id: Uuid,
) -> Result<std::result::Result<subscription_package::Model, QuotaCheck>>
where
    C: ConnectionTrait,
{
    let Some(user) = User::find_by_id(user_id).one(conn).await? else {
        return Ok(Err(QuotaCheck::denied("User not found")));
    };
    let Some(package_name) = user.subscription_package else {
        return Ok(Err(QuotaCheck::denied("No subscription package")));
    };

    let package = SubscriptionPackage::find()
        .filter(subscription_package::Column::PackageName.eq(package_name.as_str()))
        .one(conn)
        .await?;
    Ok(package.ok_or_else(|| QuotaCheck::denied("Subscription package not found")))
}

/// Checks whether `user_id` may open another shop.
pub async fn can_user_create_shop<C>(conn: &C, user_id: Uuid) -> Result<QuotaCheck>
where
    C: ConnectionTrait,
{
    let package = match package_for_user(conn, user_id).await? {
        Ok(package) => package,
        Err(denied) => return Ok(denied),
    };

    let shop_count = Shop::find()
        .filter(shop::Column::OwnerId.eq(user_id))
        .count(conn)
        .await?;

    debug!(%user_id, shop_count, limit = package.max_shops, "Checked shop quota");
    Ok(QuotaCheck::against_limit(
        shop_count,
        package.max_shops,
        &package.package_name,
        "shops",
    ))
}

/// Checks whether `shop_id` may get another shelf under its owner's plan.
pub async fn can_shop_create_shelf<C>(conn: &C, shop_id: Uuid) -> Result<QuotaCheck>
where
    C: ConnectionTrait,
{
    let Some(shop) = Shop::find_by_id(shop_id).one(conn).await? else {
        return Ok(QuotaCheck::denied("Shop not found"));
    };
    let package = match package_for_user(conn, shop.owner_id).await? {
        Ok(package) => package,
        Err(denied) => return Ok(denied),
    };

    let shelf_count = Shelf::find()
        .filter(shelf::Column::ShopId.eq(shop_id))
        .count(conn)
        .await?;

    debug!(%shop_id, shelf_count, limit = package.max_shelves_per_shop, "Checked shelf quota");
    Ok(QuotaCheck::against_limit(
        shelf_count,
        package.max_shelves_per_shop,
        &package.package_name,
        "shelves per shop",
    ))
}

/// Checks whether `shelf_id` may hold another product or service.
pub async fn can_shelf_add_item<C>(conn: &C, shelf_id: Uuid) -> Result<QuotaCheck>
where
    C: ConnectionTrait,
{
    let Some(shelf) = Shelf::find_by_id(shelf_id).one(conn).await? else {
        return Ok(QuotaCheck::denied("Shelf not found"));
    };
    let Some(shop) = Shop::find_by_id(shelf.shop_id).one(conn).await? else {
        return Ok(QuotaCheck::denied("Shop not found"));
    };
    let package = match package_for_user(conn, shop.owner_id).await? {
        Ok(package) => package,
        Err(denied) => return Ok(denied),
    };

    let product_count = Product::find()
        .filter(product::Column::ShelfId.eq(shelf_id))
        .count(conn)
        .await?;
    let service_count = Service::find()
        .filter(service::Column::ShelfId.eq(shelf_id))
        .count(conn)
        .await?;
    let item_count = product_count + service_count;

    debug!(%shelf_id, item_count, limit = package.max_items_per_shelf, "Checked item quota");
    Ok(QuotaCheck::against_limit(
        item_count,
        package.max_items_per_shelf,
        &package.package_name,
        "items per shelf",
    ))
}
