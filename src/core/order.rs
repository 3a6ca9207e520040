//! Order business logic - Turns selected cart rows into an immutable order.
//!
//! [`create_order`] runs in a single transaction: it validates every selected
//! cart row (ownership, same shop, live item), snapshots names and prices into
//! the order, inserts it and deletes exactly the consumed cart rows. Any
//! failure rolls the whole thing back, so a partial order is never stored.
//! The shop owner is notified after commit on a detached task.
//!
//! Orders are readable by the purchasing customer and by the owner of the
//! shop. Anyone else sees nothing rather than an error.

use crate::{
    core::{account::require_caller, catalog::resolve_items, outcome::MutationOutcome},
    entities::{
        CartItem, ItemType, Order, OrderItem, OrderItems, OrderStatus, PaymentStatus, Shop, User,
        cart_item, order, shop,
    },
    errors::{Error, Result},
    notify::{OrderNotification, OrderNotifier, dispatch_detached},
};
use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, sync::Arc};
use tracing::{info, instrument, warn};

/// Attempts at drawing an unused order number before giving up.
const ORDER_NUMBER_ATTEMPTS: usize = 5;

/// Arguments for [`create_order`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderInput {
    /// Shop every selected cart row must belong to
    pub shop_id: Uuid,
    /// Customer contact name
    pub customer_name: String,
    /// Customer contact email
    pub customer_email: String,
    /// Customer contact phone
    pub customer_phone: String,
    /// Delivery street address
    pub delivery_address: String,
    /// Delivery city
    pub delivery_city: String,
    /// Optional delivery instructions
    #[serde(default)]
    pub delivery_notes: Option<String>,
    /// Optional payment method
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Optional notes for the shop
    #[serde(default)]
    pub customer_notes: Option<String>,
    /// Cart rows to order
    pub cart_item_ids: Vec<Uuid>,
}

/// Result of [`create_order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderOutcome {
    /// Whether the order was placed
    pub success: bool,
    /// Id of the new order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    /// Number of the new order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    /// Why the order was rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OrderOutcome {
    fn placed(order: &order::Model) -> Self {
        Self {
            success: true,
            order_id: Some(order.id),
            order_number: Some(order.order_number.clone()),
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            order_id: None,
            order_number: None,
            error: Some(error),
        }
    }
}

/// Order counts per status and delivered revenue for one shop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    /// All orders
    pub total_orders: u64,
    /// Orders awaiting the shop
    pub pending: u64,
    /// Accepted orders
    pub confirmed: u64,
    /// Orders being prepared
    pub processing: u64,
    /// Orders handed to delivery
    pub shipped: u64,
    /// Received orders
    pub delivered: u64,
    /// Cancelled orders
    pub cancelled: u64,
    /// Sum of `total_amount` over delivered orders
    pub total_revenue: i64,
}

impl OrderStats {
    /// Tallies a shop's orders.
    #[must_use]
    pub fn from_orders(orders: &[order::Model]) -> Self {
        let mut stats = Self {
            total_orders: orders.len() as u64,
            ..Self::default()
        };
        for o in orders {
            match o.status {
                OrderStatus::Pending => stats.pending += 1,
                OrderStatus::Confirmed => stats.confirmed += 1,
                OrderStatus::Processing => stats.processing += 1,
                OrderStatus::Shipped => stats.shipped += 1,
                OrderStatus::Delivered => {
                    stats.delivered += 1;
                    stats.total_revenue = stats.total_revenue.saturating_add(o.total_amount);
                }
                OrderStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }
}

/// Formats an order number as `ORD-YYYYMMDD-NNN`.
#[must_use]
pub fn format_order_number(placed_at: DateTime<Utc>, suffix: u16) -> String {
    format!("ORD-{}-{:03}", placed_at.format("%Y%m%d"), suffix % 1000)
}

/// Draws order numbers until one is unused.
async fn allocate_order_number<C>(conn: &C, placed_at: DateTime<Utc>) -> Result<String>
where
    C: ConnectionTrait,
{
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let candidate = format_order_number(placed_at, rand::rng().random_range(0..1000));
        let taken = Order::find()
            .filter(order::Column::OrderNumber.eq(candidate.as_str()))
            .count(conn)
            .await?;
        if taken == 0 {
            return Ok(candidate);
        }
        warn!(%candidate, "Order number already taken, drawing another");
    }
    Err(Error::Database(DbErr::Custom(format!(
        "no free order number after {ORDER_NUMBER_ATTEMPTS} attempts"
    ))))
}

fn validate_contact(input: &CreateOrderInput) -> Result<()> {
    let required = [
        &input.customer_name,
        &input.customer_email,
        &input.customer_phone,
        &input.delivery_address,
        &input.delivery_city,
    ];
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err(Error::validation(
            "Customer name, email, phone and delivery address are required",
        ));
    }
    Ok(())
}

async fn place_order(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    input: CreateOrderInput,
) -> Result<(order::Model, OrderNotification)> {
    let user_id = require_caller(caller, "place an order")?;
    validate_contact(&input)?;

    let mut seen = HashSet::new();
    let cart_ids: Vec<Uuid> = input
        .cart_item_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();

    let txn = db.begin().await?;

    let shop = Shop::find_by_id(input.shop_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound { entity: "Shop" })?;

    let mut rows = Vec::with_capacity(cart_ids.len());
    for cart_id in &cart_ids {
        let row = CartItem::find_by_id(*cart_id)
            .one(&txn)
            .await?
            .filter(|r| r.user_id == user_id)
            .ok_or(Error::NotFound { entity: "Cart item" })?;
        if row.shop_id != shop.id {
            return Err(Error::CrossShopOrder);
        }
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(Error::EmptyOrder);
    }

    let refs: Vec<(ItemType, Uuid)> = rows.iter().map(|r| (r.item_type, r.item_id)).collect();
    let items = resolve_items(&txn, &refs).await?;

    let mut snapshot = Vec::with_capacity(rows.len());
    let mut subtotal: i64 = 0;
    for row in rows {
        let item = items
            .get(&row.item_id)
            .filter(|i| i.item_type == row.item_type)
            .ok_or(Error::NotFound { entity: "Item" })?;
        let total = item.price.saturating_mul(i64::from(row.quantity));
        subtotal = subtotal.saturating_add(total);
        snapshot.push(OrderItem {
            item_type: row.item_type,
            item_id: row.item_id,
            item_name: item.name.clone(),
            quantity: row.quantity,
            price: item.price,
            total,
            service_details: row.service_details,
        });
    }

    let now = Utc::now();
    let order_number = allocate_order_number(&txn, now).await?;
    let item_count = snapshot.len();

    let order = order::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        shop_id: Set(shop.id),
        order_number: Set(order_number),
        status: Set(OrderStatus::Pending),
        customer_name: Set(input.customer_name),
        customer_email: Set(input.customer_email),
        customer_phone: Set(input.customer_phone),
        delivery_address: Set(input.delivery_address),
        delivery_city: Set(input.delivery_city),
        delivery_notes: Set(input.delivery_notes),
        items: Set(OrderItems(snapshot)),
        subtotal: Set(subtotal),
        total_amount: Set(subtotal),
        payment_method: Set(input.payment_method),
        payment_status: Set(PaymentStatus::Pending),
        customer_notes: Set(input.customer_notes),
        shop_notes: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    CartItem::delete_many()
        .filter(cart_item::Column::Id.is_in(cart_ids))
        .exec(&txn)
        .await?;

    let owner_email = User::find_by_id(shop.owner_id)
        .one(&txn)
        .await?
        .map(|owner| owner.email);

    txn.commit().await?;

    let notification = OrderNotification {
        order_id: order.id,
        order_number: order.order_number.clone(),
        shop_id: shop.id,
        shop_name: shop.name,
        shop_owner_id: shop.owner_id,
        shop_owner_email: owner_email,
        customer_name: order.customer_name.clone(),
        item_count,
        total_amount: order.total_amount,
    };
    Ok((order, notification))
}

/// Places an order for the selected cart rows of one shop.
///
/// Every selected row must belong to the caller and to `input.shop_id`; a row
/// from another shop fails the whole order. Item names and prices are copied
/// into the order at this moment (services at price 0), the subtotal becomes
/// the total, and the consumed cart rows are deleted in the same transaction
/// as the insert. The shop owner is notified after commit on a detached task;
/// a failed notification does not affect the result.
///
/// # Arguments
/// * `notifier` - Destination for the new-order notification
/// * `caller` - Resolved caller; must own every selected cart row
/// * `input` - Target shop, customer contact and delivery fields, and the cart
///   row ids to consume
///
/// # Errors
/// Only store failures are returned as `Err`. Business rule violations come
/// back as `OrderOutcome { success: false, error }`.
#[instrument(skip(db, notifier, input), fields(shop_id = %input.shop_id, rows = input.cart_item_ids.len()))]
pub async fn create_order(
    db: &DatabaseConnection,
    notifier: Arc<dyn OrderNotifier>,
    caller: Option<Uuid>,
    input: CreateOrderInput,
) -> Result<OrderOutcome> {
    match place_order(db, caller, input).await {
        Ok((order, notification)) => {
            info!(
                order_number = %order.order_number,
                total_amount = order.total_amount,
                "Order placed"
            );
            // detached: the response never waits on delivery
            drop(dispatch_detached(notifier, notification));
            Ok(OrderOutcome::placed(&order))
        }
        Err(e) if e.is_business() => {
            warn!(reason = %e, "Order rejected");
            Ok(OrderOutcome::failed(e.to_string()))
        }
        Err(e) => Err(e),
    }
}

/// Whether `user_id` owns `shop_id`.
async fn owns_shop<C>(conn: &C, user_id: Uuid, shop_id: Uuid) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(Shop::find_by_id(shop_id)
        .one(conn)
        .await?
        .is_some_and(|s| s.owner_id == user_id))
}

/// Loads an order whose shop is owned by `owner_id`.
async fn order_for_owner<C>(conn: &C, owner_id: Uuid, order_id: Uuid) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    let order = Order::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or(Error::NotFound { entity: "Order" })?;
    if owns_shop(conn, owner_id, order.shop_id).await? {
        Ok(order)
    } else {
        Err(Error::NotFound { entity: "Order" })
    }
}

async fn set_status(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    order_id: Uuid,
    status: OrderStatus,
    shop_notes: Option<String>,
) -> Result<()> {
    let owner_id = require_caller(caller, "update orders")?;

    let txn = db.begin().await?;
    let order = order_for_owner(&txn, owner_id, order_id).await?;

    let mut active: order::ActiveModel = order.into();
    active.status = Set(status);
    if shop_notes.is_some() {
        active.shop_notes = Set(shop_notes);
    }
    active.updated_at = Set(Utc::now());
    active.update(&txn).await?;

    txn.commit().await?;
    Ok(())
}

/// Sets the status of an order, optionally with shop notes. Shop owner only.
///
/// Any status may follow any other.
#[instrument(skip(db, shop_notes))]
pub async fn update_order_status(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    order_id: Uuid,
    status: OrderStatus,
    shop_notes: Option<String>,
) -> Result<MutationOutcome> {
    match set_status(db, caller, order_id, status, shop_notes).await {
        Ok(()) => {
            info!("Order status updated");
            Ok(MutationOutcome::ok("Order status updated", order_id))
        }
        Err(e) => MutationOutcome::rejected(e),
    }
}

async fn set_payment_status(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    order_id: Uuid,
    payment_status: PaymentStatus,
) -> Result<()> {
    let owner_id = require_caller(caller, "update orders")?;

    let txn = db.begin().await?;
    let order = order_for_owner(&txn, owner_id, order_id).await?;

    let mut active: order::ActiveModel = order.into();
    active.payment_status = Set(payment_status);
    active.updated_at = Set(Utc::now());
    active.update(&txn).await?;

    txn.commit().await?;
    Ok(())
}

/// Sets the payment status of an order. Shop owner only.
#[instrument(skip(db))]
pub async fn update_payment_status(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    order_id: Uuid,
    payment_status: PaymentStatus,
) -> Result<MutationOutcome> {
    match set_payment_status(db, caller, order_id, payment_status).await {
        Ok(()) => {
            info!("Payment status updated");
            Ok(MutationOutcome::ok("Payment status updated", order_id))
        }
        Err(e) => MutationOutcome::rejected(e),
    }
}

async fn cancel_pending(db: &DatabaseConnection, caller: Option<Uuid>, order_id: Uuid) -> Result<()> {
    let user_id = require_caller(caller, "cancel orders")?;

    let txn = db.begin().await?;
    let order = Order::find_by_id(order_id)
        .one(&txn)
        .await?
        .filter(|o| o.user_id == user_id)
        .ok_or(Error::NotFound { entity: "Order" })?;
    if order.status != OrderStatus::Pending {
        return Err(Error::validation("Only pending orders can be cancelled"));
    }

    let mut active: order::ActiveModel = order.into();
    active.status = Set(OrderStatus::Cancelled);
    active.updated_at = Set(Utc::now());
    active.update(&txn).await?;

    txn.commit().await?;
    Ok(())
}

/// Cancels one of the caller's own orders while it is still pending.
#[instrument(skip(db))]
pub async fn cancel_order(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    order_id: Uuid,
) -> Result<MutationOutcome> {
    match cancel_pending(db, caller, order_id).await {
        Ok(()) => {
            info!("Order cancelled by customer");
            Ok(MutationOutcome::ok("Order cancelled", order_id))
        }
        Err(e) => MutationOutcome::rejected(e),
    }
}

/// An order visible to the caller as customer or shop owner.
pub async fn get_order_by_id(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    order_id: Uuid,
) -> Result<Option<order::Model>> {
    let Some(user_id) = caller else {
        return Ok(None);
    };
    let Some(order) = Order::find_by_id(order_id).one(db).await? else {
        return Ok(None);
    };
    if order.user_id == user_id || owns_shop(db, user_id, order.shop_id).await? {
        Ok(Some(order))
    } else {
        Ok(None)
    }
}

/// Orders the caller placed, newest first.
pub async fn get_user_orders(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
) -> Result<Vec<order::Model>> {
    let Some(user_id) = caller else {
        return Ok(Vec::new());
    };
    Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .order_by_desc(order::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Orders of one of the caller's shops, newest first; empty for other shops.
pub async fn get_shop_orders(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    shop_id: Uuid,
) -> Result<Vec<order::Model>> {
    let Some(user_id) = caller else {
        return Ok(Vec::new());
    };
    if !owns_shop(db, user_id, shop_id).await? {
        return Ok(Vec::new());
    }
    Order::find()
        .filter(order::Column::ShopId.eq(shop_id))
        .order_by_desc(order::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Orders across every shop the caller owns, newest first.
pub async fn get_all_vendor_orders(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
) -> Result<Vec<order::Model>> {
    let Some(user_id) = caller else {
        return Ok(Vec::new());
    };
    let shop_ids: Vec<Uuid> = Shop::find()
        .filter(shop::Column::OwnerId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();
    if shop_ids.is_empty() {
        return Ok(Vec::new());
    }
    Order::find()
        .filter(order::Column::ShopId.is_in(shop_ids))
        .order_by_desc(order::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Order statistics for one of the caller's shops; `None` for other shops.
pub async fn get_order_stats(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    shop_id: Uuid,
) -> Result<Option<OrderStats>> {
    let Some(user_id) = caller else {
        return Ok(None);
    };
    if !owns_shop(db, user_id, shop_id).await? {
        return Ok(None);
    }
    let orders = Order::find()
        .filter(order::Column::ShopId.eq(shop_id))
        .all(db)
        .await?;
    Ok(Some(OrderStats::from_orders(&orders)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::cart::{AddToCartInput, add_to_cart, get_user_cart};
    use crate::entities::{Product, product};
    use crate::notify::LogNotifier;
    use crate::test_utils::*;
    use chrono::TimeZone;
    use std::time::Duration;

    async fn add(
        db: &DatabaseConnection,
        user_id: Uuid,
        item_type: ItemType,
        item_id: Uuid,
        shop_id: Uuid,
        quantity: i32,
    ) -> Result<Uuid> {
        let outcome = add_to_cart(
            db,
            Some(user_id),
            AddToCartInput {
                item_type,
                item_id,
                shop_id,
                quantity,
                service_details: None,
            },
        )
        .await?;
        assert!(outcome.success, "{}", outcome.message);
        Ok(outcome.id.unwrap())
    }

    fn order_input(shop_id: Uuid, cart_item_ids: Vec<Uuid>) -> CreateOrderInput {
        CreateOrderInput {
            shop_id,
            customer_name: "Ada Lovelace".to_string(),
            customer_email: "ada@example.com".to_string(),
            customer_phone: "555-0100".to_string(),
            delivery_address: "12 Engine St".to_string(),
            delivery_city: "London".to_string(),
            delivery_notes: None,
            payment_method: Some("cash".to_string()),
            customer_notes: None,
            cart_item_ids,
        }
    }

    fn log_notifier() -> Arc<dyn OrderNotifier> {
        Arc::new(LogNotifier)
    }

    async fn order_count(db: &DatabaseConnection) -> Result<u64> {
        Ok(Order::find().count(db).await?)
    }

    /// Places a one-product order and returns its id.
    async fn place_simple_order(db: &DatabaseConnection, market: &TestMarket) -> Result<Uuid> {
        let cart_id = add(
            db,
            market.customer.id,
            ItemType::Product,
            market.product.id,
            market.shop.id,
            1,
        )
        .await?;
        let outcome = create_order(
            db,
            log_notifier(),
            Some(market.customer.id),
            order_input(market.shop.id, vec![cart_id]),
        )
        .await?;
        assert!(outcome.success);
        Ok(outcome.order_id.unwrap())
    }

    #[test]
    fn test_format_order_number() {
        let placed_at = Utc.with_ymd_and_hms(2026, 3, 7, 12, 0, 0).unwrap();
        assert_eq!(format_order_number(placed_at, 7), "ORD-20260307-007");
        assert_eq!(format_order_number(placed_at, 999), "ORD-20260307-999");
    }

    #[test]
    fn test_outcome_serializes_without_empty_fields() {
        let json = serde_json::to_value(OrderOutcome::failed("No items to order".to_string())).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "No items to order");
        assert!(json.get("orderId").is_none());
    }

    #[tokio::test]
    async fn test_create_order_snapshots_and_consumes_selected_rows() -> Result<()> {
        let db = setup_test_db().await?;
        let market = setup_market(&db).await?;
        let customer = market.customer.id;

        let product_row = add(&db, customer, ItemType::Product, market.product.id, market.shop.id, 2).await?;
        let service_row = add(&db, customer, ItemType::Service, market.service.id, market.shop.id, 1).await?;
        let extra = create_test_product(&db, &market.shelf, "Baguette", 250, None).await?;
        let kept_row = add(&db, customer, ItemType::Product, extra.id, market.shop.id, 1).await?;

        let outcome = create_order(
            &db,
            log_notifier(),
            Some(customer),
            order_input(market.shop.id, vec![product_row, service_row]),
        )
        .await?;
        assert!(outcome.success);
        assert!(outcome.order_number.as_ref().unwrap().starts_with("ORD-"));

        let order = Order::find_by_id(outcome.order_id.unwrap()).one(&db).await?.unwrap();
        assert_eq!(order.items.0.len(), 2);
        assert_eq!(order.subtotal, 2000);
        assert_eq!(order.total_amount, order.subtotal);
        let sum: i64 = order.items.0.iter().map(|i| i.total).sum();
        assert_eq!(order.subtotal, sum);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);

        let service_item = order
            .items
            .0
            .iter()
            .find(|i| i.item_type == ItemType::Service)
            .unwrap();
        assert_eq!(service_item.price, 0);
        assert_eq!(service_item.total, 0);

        let remaining: Vec<Uuid> = get_user_cart(&db, Some(customer))
            .await?
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(remaining, vec![kept_row]);
        Ok(())
    }

    #[tokio::test]
    async fn test_snapshot_ignores_later_price_changes() -> Result<()> {
        let db = setup_test_db().await?;
        let market = setup_market(&db).await?;
        let order_id = place_simple_order(&db, &market).await?;

        let mut repriced: product::ActiveModel = market.product.clone().into();
        repriced.price = Set(9999);
        repriced.name = Set("Renamed".to_string());
        repriced.update(&db).await?;

        let order = Order::find_by_id(order_id).one(&db).await?.unwrap();
        assert_eq!(order.items.0[0].price, 1000);
        assert_eq!(order.items.0[0].item_name, market.product.name);
        Ok(())
    }

    #[tokio::test]
    async fn test_cross_shop_order_changes_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let market = setup_market(&db).await?;
        let other_vendor = create_test_user(&db, "Other Vendor", Some("free")).await?;
        let other_shop = create_test_shop(&db, other_vendor.id, "Butcher").await?;
        let other_shelf = create_test_shelf(&db, other_shop.id, "Meat").await?;
        let sausage = create_test_product(&db, &other_shelf, "Sausage", 400, None).await?;

        let customer = market.customer.id;
        let ours = add(&db, customer, ItemType::Product, market.product.id, market.shop.id, 1).await?;
        let theirs = add(&db, customer, ItemType::Product, sausage.id, other_shop.id, 1).await?;

        let outcome = create_order(
            &db,
            log_notifier(),
            Some(customer),
            order_input(market.shop.id, vec![ours, theirs]),
        )
        .await?;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("All items must be from the same shop"));
        assert_eq!(order_count(&db).await?, 0);
        assert_eq!(get_user_cart(&db, Some(customer)).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_order_rejections() -> Result<()> {
        let db = setup_test_db().await?;
        let market = setup_market(&db).await?;
        let customer = Some(market.customer.id);
        let cart_id = add(&db, market.customer.id, ItemType::Product, market.product.id, market.shop.id, 1).await?;

        let empty = create_order(&db, log_notifier(), customer, order_input(market.shop.id, vec![])).await?;
        assert_eq!(empty.error.as_deref(), Some("No items to order"));

        let anonymous = create_order(&db, log_notifier(), None, order_input(market.shop.id, vec![cart_id])).await?;
        assert!(!anonymous.success);

        let foreign = create_order(
            &db,
            log_notifier(),
            Some(market.vendor.id),
            order_input(market.shop.id, vec![cart_id]),
        )
        .await?;
        assert_eq!(foreign.error.as_deref(), Some("Cart item not found"));

        let no_shop = create_order(&db, log_notifier(), customer, order_input(Uuid::new_v4(), vec![cart_id])).await?;
        assert_eq!(no_shop.error.as_deref(), Some("Shop not found"));

        let mut missing_contact = order_input(market.shop.id, vec![cart_id]);
        missing_contact.delivery_city = "  ".to_string();
        assert!(!create_order(&db, log_notifier(), customer, missing_contact).await?.success);

        assert_eq!(order_count(&db).await?, 0);
        assert_eq!(get_user_cart(&db, customer).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_deleted_item_fails_whole_order() -> Result<()> {
        let db = setup_test_db().await?;
        let market = setup_market(&db).await?;
        let customer = market.customer.id;
        let product_row = add(&db, customer, ItemType::Product, market.product.id, market.shop.id, 1).await?;
        let service_row = add(&db, customer, ItemType::Service, market.service.id, market.shop.id, 1).await?;
        Product::delete_by_id(market.product.id).exec(&db).await?;

        let outcome = create_order(
            &db,
            log_notifier(),
            Some(customer),
            order_input(market.shop.id, vec![product_row, service_row]),
        )
        .await?;
        assert_eq!(outcome.error.as_deref(), Some("Item not found"));
        assert_eq!(order_count(&db).await?, 0);
        assert_eq!(CartItem::find().count(&db).await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_cart_ids_are_ordered_once() -> Result<()> {
        let db = setup_test_db().await?;
        let market = setup_market(&db).await?;
        let cart_id = add(&db, market.customer.id, ItemType::Product, market.product.id, market.shop.id, 2).await?;

        let outcome = create_order(
            &db,
            log_notifier(),
            Some(market.customer.id),
            order_input(market.shop.id, vec![cart_id, cart_id]),
        )
        .await?;
        let order = Order::find_by_id(outcome.order_id.unwrap()).one(&db).await?.unwrap();
        assert_eq!(order.items.0.len(), 1);
        assert_eq!(order.subtotal, 2000);
        Ok(())
    }

    #[tokio::test]
    async fn test_failing_notifier_does_not_fail_order() -> Result<()> {
        let db = setup_test_db().await?;
        let market = setup_market(&db).await?;
        let cart_id = add(&db, market.customer.id, ItemType::Product, market.product.id, market.shop.id, 1).await?;
        let failing = Arc::new(FailingNotifier::default());

        let outcome = create_order(
            &db,
            failing.clone(),
            Some(market.customer.id),
            order_input(market.shop.id, vec![cart_id]),
        )
        .await?;
        assert!(outcome.success);
        assert_eq!(order_count(&db).await?, 1);

        // the detached task runs after the response
        tokio::time::timeout(Duration::from_secs(5), async {
            while failing.attempts() == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(failing.attempts(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_owner_is_notified() -> Result<()> {
        let db = setup_test_db().await?;
        let market = setup_market(&db).await?;
        let cart_id = add(&db, market.customer.id, ItemType::Product, market.product.id, market.shop.id, 3).await?;
        let recorder = Arc::new(RecordingNotifier::default());

        let outcome = create_order(
            &db,
            recorder.clone(),
            Some(market.customer.id),
            order_input(market.shop.id, vec![cart_id]),
        )
        .await?;

        tokio::time::timeout(Duration::from_secs(5), async {
            while recorder.sent().is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        let sent = recorder.sent();
        assert_eq!(sent[0].order_number, outcome.order_number.unwrap());
        assert_eq!(sent[0].shop_owner_id, market.vendor.id);
        assert_eq!(sent[0].shop_owner_email.as_deref(), Some(market.vendor.email.as_str()));
        assert_eq!(sent[0].total_amount, 3000);
        Ok(())
    }

    #[tokio::test]
    async fn test_status_updates_are_owner_only() -> Result<()> {
        let db = setup_test_db().await?;
        let market = setup_market(&db).await?;
        let order_id = place_simple_order(&db, &market).await?;

        let by_customer = update_order_status(&db, Some(market.customer.id), order_id, OrderStatus::Delivered, None).await?;
        assert!(!by_customer.success);
        assert_eq!(by_customer.message, "Order not found");

        let shipped = update_order_status(
            &db,
            Some(market.vendor.id),
            order_id,
            OrderStatus::Shipped,
            Some("Left at the door".to_string()),
        )
        .await?;
        assert!(shipped.success);
        // no transition table: going back is accepted
        let back = update_order_status(&db, Some(market.vendor.id), order_id, OrderStatus::Pending, None).await?;
        assert!(back.success);

        let paid = update_payment_status(&db, Some(market.vendor.id), order_id, PaymentStatus::Paid).await?;
        assert!(paid.success);

        let order = Order::find_by_id(order_id).one(&db).await?.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.shop_notes.as_deref(), Some("Left at the door"));
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_order_only_while_pending() -> Result<()> {
        let db = setup_test_db().await?;
        let market = setup_market(&db).await?;
        let first = place_simple_order(&db, &market).await?;
        let second = place_simple_order(&db, &market).await?;

        assert!(!cancel_order(&db, Some(market.vendor.id), first).await?.success);
        assert!(cancel_order(&db, Some(market.customer.id), first).await?.success);

        update_order_status(&db, Some(market.vendor.id), second, OrderStatus::Confirmed, None).await?;
        let late = cancel_order(&db, Some(market.customer.id), second).await?;
        assert_eq!(late.message, "Only pending orders can be cancelled");
        Ok(())
    }

    #[tokio::test]
    async fn test_order_reads_are_dual_actor() -> Result<()> {
        let db = setup_test_db().await?;
        let market = setup_market(&db).await?;
        let stranger = create_test_user(&db, "Stranger", Some("free")).await?;
        let order_id = place_simple_order(&db, &market).await?;

        assert!(get_order_by_id(&db, Some(market.customer.id), order_id).await?.is_some());
        assert!(get_order_by_id(&db, Some(market.vendor.id), order_id).await?.is_some());
        assert!(get_order_by_id(&db, Some(stranger.id), order_id).await?.is_none());
        assert!(get_order_by_id(&db, None, order_id).await?.is_none());

        assert_eq!(get_user_orders(&db, Some(market.customer.id)).await?.len(), 1);
        assert!(get_user_orders(&db, Some(stranger.id)).await?.is_empty());
        assert_eq!(get_shop_orders(&db, Some(market.vendor.id), market.shop.id).await?.len(), 1);
        assert!(get_shop_orders(&db, Some(market.customer.id), market.shop.id).await?.is_empty());
        assert_eq!(get_all_vendor_orders(&db, Some(market.vendor.id)).await?.len(), 1);
        assert!(get_all_vendor_orders(&db, Some(market.customer.id)).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_order_stats_count_statuses_and_delivered_revenue() -> Result<()> {
        let db = setup_test_db().await?;
        let market = setup_market(&db).await?;
        let delivered = place_simple_order(&db, &market).await?;
        let cancelled = place_simple_order(&db, &market).await?;
        place_simple_order(&db, &market).await?;

        update_order_status(&db, Some(market.vendor.id), delivered, OrderStatus::Delivered, None).await?;
        cancel_order(&db, Some(market.customer.id), cancelled).await?;

        let stats = get_order_stats(&db, Some(market.vendor.id), market.shop.id)
            .await?
            .unwrap();
        assert_eq!(stats.total_orders, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.total_revenue, 1000);

        assert!(get_order_stats(&db, Some(market.customer.id), market.shop.id).await?.is_none());
        Ok(())
    }
}
