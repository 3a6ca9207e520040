//! Procedure handlers - decode arguments, call core, encode the result.

use super::{ApiError, AppState, Caller};
use crate::{
    core::{
        account, cart, catalog,
        outcome::MutationOutcome,
        order,
        quota::{self, QuotaCheck},
        subscription, wishlist,
    },
    entities::{OrderStatus, PaymentStatus},
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};
use sea_orm::prelude::Uuid;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::debug;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartIdArgs {
    cart_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartQuantityArgs {
    cart_id: Uuid,
    quantity: i32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemIdArgs {
    item_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveToCartArgs {
    item_id: Uuid,
    #[serde(default = "one")]
    quantity: i32,
}

const fn one() -> i32 {
    1
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderIdArgs {
    order_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderStatusArgs {
    order_id: Uuid,
    status: OrderStatus,
    #[serde(default)]
    shop_notes: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentStatusArgs {
    order_id: Uuid,
    payment_status: PaymentStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShopIdArgs {
    shop_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShelfIdArgs {
    shelf_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserIdArgs {
    user_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductIdArgs {
    product_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceIdArgs {
    service_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageNameArgs {
    package_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageUpdateArgs {
    package_id: Uuid,
    #[serde(flatten)]
    update: subscription::PackageUpdate,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserSubscriptionArgs {
    user_id: Uuid,
    package_name: String,
}

/// Parses the request body, treating an empty body as `{}`.
fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {e}")))
}

fn args<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::BadRequest(format!("Invalid arguments: {e}")))
}

fn reply<T: Serialize>(value: T) -> Result<Json<Value>, ApiError> {
    let value = serde_json::to_value(value).map_err(crate::errors::Error::from)?;
    Ok(Json(value))
}

/// Quota results are reported with the verb the caller asked about
/// (`canCreate` or `canAdd`) alongside the full check.
fn quota_reply(check: QuotaCheck, key: &str) -> Result<Json<Value>, ApiError> {
    let allowed = check.allowed;
    let mut value = serde_json::to_value(check).map_err(crate::errors::Error::from)?;
    if let Some(fields) = value.as_object_mut() {
        fields.insert(key.to_string(), Value::Bool(allowed));
    }
    Ok(Json(value))
}

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Runs a read-only procedure.
#[allow(clippy::too_many_lines)]
pub async fn query(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let input = parse_body(&body)?;
    let db = &state.db;
    debug!(procedure = %name, authenticated = caller.is_some(), "Query");

    match name.as_str() {
        "getCurrentUser" => match caller {
            Some(user_id) => reply(account::get_user(db, user_id).await?),
            None => reply(Value::Null),
        },

        "getUserCart" => reply(cart::get_user_cart(db, caller).await?),
        "getCartSummary" => reply(cart::get_cart_summary(db, caller).await?),

        "getUserWishlist" => reply(wishlist::get_user_wishlist(db, caller).await?),
        "isInWishlist" => {
            let a: ItemIdArgs = args(input)?;
            reply(wishlist::is_in_wishlist(db, caller, a.item_id).await?)
        }

        "getOrderById" => {
            let a: OrderIdArgs = args(input)?;
            reply(order::get_order_by_id(db, caller, a.order_id).await?)
        }
        "getUserOrders" => reply(order::get_user_orders(db, caller).await?),
        "getShopOrders" => {
            let a: ShopIdArgs = args(input)?;
            reply(order::get_shop_orders(db, caller, a.shop_id).await?)
        }
        "getAllVendorOrders" => reply(order::get_all_vendor_orders(db, caller).await?),
        "getOrderStats" => {
            let a: ShopIdArgs = args(input)?;
            reply(order::get_order_stats(db, caller, a.shop_id).await?)
        }

        "getSubscriptionPackages" => reply(subscription::get_subscription_packages(db).await?),
        "getAllSubscriptionPackages" => {
            reply(subscription::get_all_subscription_packages(db, caller).await?)
        }
        "getSubscriptionPackageByName" => {
            let a: PackageNameArgs = args(input)?;
            reply(subscription::get_subscription_package_by_name(db, &a.package_name).await?)
        }
        "getUserSubscriptionUsage" => {
            let a: UserIdArgs = args(input)?;
            reply(subscription::get_user_subscription_usage(db, caller, a.user_id).await?)
        }

        "canUserCreateShop" => {
            let a: UserIdArgs = args(input)?;
            quota_reply(quota::can_user_create_shop(db, a.user_id).await?, "canCreate")
        }
        "canShopCreateShelf" => {
            let a: ShopIdArgs = args(input)?;
            quota_reply(quota::can_shop_create_shelf(db, a.shop_id).await?, "canCreate")
        }
        "canShelfAddItem" => {
            let a: ShelfIdArgs = args(input)?;
            quota_reply(quota::can_shelf_add_item(db, a.shelf_id).await?, "canAdd")
        }

        _ => Err(ApiError::UnknownProcedure(name)),
    }
}

/// Runs a read-write procedure.
#[allow(clippy::too_many_lines)]
pub async fn mutation(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let input = parse_body(&body)?;
    let db = &state.db;
    debug!(procedure = %name, authenticated = caller.is_some(), "Mutation");

    match name.as_str() {
        "syncUser" => reply(
            account::sync_user(db, caller, state.default_package.as_deref(), args(input)?).await?,
        ),

        "addToCart" => reply(cart::add_to_cart(db, caller, args(input)?).await?),
        "updateCartQuantity" => {
            let a: CartQuantityArgs = args(input)?;
            reply(cart::update_cart_quantity(db, caller, a.cart_id, a.quantity).await?)
        }
        "removeFromCart" => {
            let a: CartIdArgs = args(input)?;
            reply(cart::remove_from_cart(db, caller, a.cart_id).await?)
        }
        "clearCart" => reply(cart::clear_cart(db, caller).await?),
        "moveToWishlist" => {
            let a: CartIdArgs = args(input)?;
            reply(cart::move_to_wishlist(db, caller, a.cart_id).await?)
        }

        "addToWishlist" => reply(wishlist::add_to_wishlist(db, caller, args(input)?).await?),
        "removeFromWishlist" => {
            let a: ItemIdArgs = args(input)?;
            reply(wishlist::remove_from_wishlist(db, caller, a.item_id).await?)
        }
        "clearWishlist" => reply(wishlist::clear_wishlist(db, caller).await?),
        "moveToCart" => {
            let a: MoveToCartArgs = args(input)?;
            reply(wishlist::move_to_cart(db, caller, a.item_id, a.quantity).await?)
        }

        "createOrder" => reply(
            order::create_order(db, state.notifier.clone(), caller, args(input)?).await?,
        ),
        "updateOrderStatus" => {
            let a: OrderStatusArgs = args(input)?;
            reply(order::update_order_status(db, caller, a.order_id, a.status, a.shop_notes).await?)
        }
        "updatePaymentStatus" => {
            let a: PaymentStatusArgs = args(input)?;
            reply(order::update_payment_status(db, caller, a.order_id, a.payment_status).await?)
        }
        "cancelOrder" => {
            let a: OrderIdArgs = args(input)?;
            reply(order::cancel_order(db, caller, a.order_id).await?)
        }

        "createShop" => reply(catalog::create_shop(db, caller, args(input)?).await?),
        "createShelf" => reply(catalog::create_shelf(db, caller, args(input)?).await?),
        "createProduct" => reply(catalog::create_product(db, caller, args(input)?).await?),
        "createService" => reply(catalog::create_service(db, caller, args(input)?).await?),
        "deleteProduct" => {
            let a: ProductIdArgs = args(input)?;
            reply(catalog::delete_product(db, caller, a.product_id).await?)
        }
        "deleteService" => {
            let a: ServiceIdArgs = args(input)?;
            reply(catalog::delete_service(db, caller, a.service_id).await?)
        }

        "initializeSubscriptionPackages" => {
            if !account::is_admin(db, caller).await? {
                return reply(MutationOutcome::fail("Admin access required"));
            }
            let inserted =
                subscription::initialize_subscription_packages(db, &state.seed_packages).await?;
            let message = if inserted == 0 {
                "Subscription packages already initialized".to_string()
            } else {
                format!("Initialized {inserted} subscription packages")
            };
            reply(MutationOutcome::done(message))
        }
        "createSubscriptionPackage" => reply(
            subscription::create_subscription_package(db, caller, args(input)?).await?,
        ),
        "updateSubscriptionPackage" => {
            let a: PackageUpdateArgs = args(input)?;
            reply(
                subscription::update_subscription_package(db, caller, a.package_id, a.update)
                    .await?,
            )
        }
        "updateUserSubscription" => {
            let a: UserSubscriptionArgs = args(input)?;
            reply(
                subscription::update_user_subscription(db, caller, a.user_id, &a.package_name)
                    .await?,
            )
        }

        _ => Err(ApiError::UnknownProcedure(name)),
    }
}
