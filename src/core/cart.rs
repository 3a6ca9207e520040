//! Cart business logic - One row per (user, item), priced live at read time.
//!
//! Adding an item that is already in the cart merges into the existing row by
//! summing quantities. Stock is checked against the resulting total, so a merge
//! that would exceed `quantity_available` is rejected and leaves the row as it
//! was. Prices are never stored on cart rows: [`get_user_cart`] and
//! [`get_cart_summary`] join against the current product records and silently
//! drop rows whose item or shop no longer exists.

use crate::{
    core::{
        account::require_caller,
        catalog::{ResolvedItem, resolve_item, resolve_items, shop_names},
        outcome::{ClearOutcome, MutationOutcome},
        wishlist::save_to_wishlist,
    },
    entities::{CartItem, ItemType, ServiceDetails, cart_item},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Arguments for [`add_to_cart`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartInput {
    /// Product or service
    pub item_type: ItemType,
    /// Item to add
    pub item_id: Uuid,
    /// Shop the caller believes sells the item
    pub shop_id: Uuid,
    /// Units to add, must be positive
    pub quantity: i32,
    /// Booking details for services
    #[serde(default)]
    pub service_details: Option<ServiceDetails>,
}

/// A cart row joined with its live item and shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Cart row id
    pub id: Uuid,
    /// Product or service
    pub item_type: ItemType,
    /// Item id
    pub item_id: Uuid,
    /// Current item name
    pub item_name: String,
    /// Shop id
    pub shop_id: Uuid,
    /// Current shop name
    pub shop_name: String,
    /// Current unit price; 0 for services
    pub price: i64,
    /// Quantity in the cart
    pub quantity: i32,
    /// `price * quantity` for products, 0 for services
    pub item_total: i64,
    /// Tracked stock, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_available: Option<i32>,
    /// Booking details for services
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_details: Option<ServiceDetails>,
    /// When the row was first added
    pub created_at: DateTimeUtc,
}

/// Totals over a user's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    /// Sum of quantities over all rows
    pub total_items: i64,
    /// Number of product rows
    pub total_products: u64,
    /// Number of service rows
    pub total_services: u64,
    /// Sum of product line totals
    pub total_amount: i64,
    /// Number of distinct shops
    pub shop_count: u64,
}

impl CartSummary {
    /// Aggregates already joined cart lines.
    #[must_use]
    pub fn from_lines(lines: &[CartLine]) -> Self {
        let mut summary = Self::default();
        let mut shops = HashSet::new();
        for line in lines {
            summary.total_items += i64::from(line.quantity);
            match line.item_type {
                ItemType::Product => {
                    summary.total_products += 1;
                    summary.total_amount += line.item_total;
                }
                ItemType::Service => summary.total_services += 1,
            }
            shops.insert(line.shop_id);
        }
        summary.shop_count = shops.len() as u64;
        summary
    }
}

/// Units times price for products; services are priced by arrangement.
fn line_total(item_type: ItemType, price: i64, quantity: i32) -> i64 {
    match item_type {
        ItemType::Product => price.saturating_mul(i64::from(quantity)),
        ItemType::Service => 0,
    }
}

fn check_quantity(quantity: i32) -> Result<()> {
    if quantity > 0 {
        Ok(())
    } else {
        Err(Error::InvalidQuantity { quantity })
    }
}

/// Loads a cart row owned by `user_id`; foreign rows are reported as missing.
async fn owned_cart_row<C>(conn: &C, user_id: Uuid, cart_id: Uuid) -> Result<cart_item::Model>
where
    C: ConnectionTrait,
{
    CartItem::find_by_id(cart_id)
        .one(conn)
        .await?
        .filter(|row| row.user_id == user_id)
        .ok_or(Error::NotFound { entity: "Cart item" })
}

/// Adds `input` to the user's cart, merging into an existing row for the same item.
///
/// Returns the cart row id and whether an existing row was merged into.
/// Callers supply the transaction.
pub(crate) async fn merge_into_cart<C>(
    conn: &C,
    user_id: Uuid,
    input: AddToCartInput,
) -> Result<(Uuid, bool)>
where
    C: ConnectionTrait,
{
    check_quantity(input.quantity)?;

    let item: ResolvedItem = resolve_item(conn, input.item_type, input.item_id)
        .await?
        .ok_or(Error::NotFound { entity: "Item" })?;
    if item.shop_id != input.shop_id {
        return Err(Error::validation("Item does not belong to this shop"));
    }

    let existing = CartItem::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .filter(cart_item::Column::ItemId.eq(input.item_id))
        .one(conn)
        .await?;

    let now = chrono::Utc::now();
    if let Some(row) = existing {
        let new_total = row
            .quantity
            .checked_add(input.quantity)
            .ok_or_else(|| Error::validation("Quantity is too large"))?;
        item.check_stock(new_total)?;

        let row_id = row.id;
        let mut active: cart_item::ActiveModel = row.into();
        active.quantity = Set(new_total);
        active.service_details = Set(input.service_details);
        active.updated_at = Set(now);
        active.update(conn).await?;
        return Ok((row_id, true));
    }

    item.check_stock(input.quantity)?;
    let created = cart_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        item_type: Set(input.item_type),
        item_id: Set(input.item_id),
        shop_id: Set(item.shop_id),
        quantity: Set(input.quantity),
        service_details: Set(input.service_details),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;
    Ok((created.id, false))
}

async fn add_in_txn(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    input: AddToCartInput,
) -> Result<(Uuid, bool)> {
    let user_id = require_caller(caller, "add items to cart")?;
    check_quantity(input.quantity)?;

    let txn = db.begin().await?;
    let result = merge_into_cart(&txn, user_id, input).await?;
    txn.commit().await?;
    Ok(result)
}

/// Adds an item to the caller's cart.
///
/// The item is resolved by type and must belong to the given shop. Products with
/// tracked stock are checked against the quantity the row would hold after the
/// add. A repeat add for the same item sums quantities into the existing row and
/// overwrites its service details with this call's value, so a user never holds
/// two rows for one item. Lookup, stock check and write share one transaction.
///
/// # Arguments
/// * `caller` - Resolved caller; `None` fails with a login message
/// * `input` - Item type and id, owning shop, quantity (> 0) and optional
///   service booking details
#[instrument(skip(db, input), fields(item_type = input.item_type.as_str(), item_id = %input.item_id, quantity = input.quantity))]
pub async fn add_to_cart(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    input: AddToCartInput,
) -> Result<MutationOutcome> {
    match add_in_txn(db, caller, input).await {
        Ok((cart_id, merged)) => {
            info!(%cart_id, merged, "Added item to cart");
            let message = if merged {
                "Cart quantity updated"
            } else {
                "Item added to cart"
            };
            Ok(MutationOutcome::ok(message, cart_id))
        }
        Err(e) => MutationOutcome::rejected(e),
    }
}

async fn set_quantity(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    cart_id: Uuid,
    quantity: i32,
) -> Result<()> {
    let user_id = require_caller(caller, "update your cart")?;
    check_quantity(quantity)?;

    let txn = db.begin().await?;
    let row = owned_cart_row(&txn, user_id, cart_id).await?;
    let item = resolve_item(&txn, row.item_type, row.item_id)
        .await?
        .ok_or(Error::NotFound { entity: "Item" })?;
    item.check_stock(quantity)?;

    let mut active: cart_item::ActiveModel = row.into();
    active.quantity = Set(quantity);
    active.updated_at = Set(chrono::Utc::now());
    active.update(&txn).await?;

    txn.commit().await?;
    Ok(())
}

/// Sets the quantity of one of the caller's cart rows.
///
/// Stock is checked against the new absolute quantity.
#[instrument(skip(db))]
pub async fn update_cart_quantity(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    cart_id: Uuid,
    quantity: i32,
) -> Result<MutationOutcome> {
    match set_quantity(db, caller, cart_id, quantity).await {
        Ok(()) => {
            info!("Updated cart quantity");
            Ok(MutationOutcome::ok("Cart updated", cart_id))
        }
        Err(e) => MutationOutcome::rejected(e),
    }
}

async fn delete_row(db: &DatabaseConnection, caller: Option<Uuid>, cart_id: Uuid) -> Result<()> {
    let user_id = require_caller(caller, "update your cart")?;
    let txn = db.begin().await?;
    owned_cart_row(&txn, user_id, cart_id).await?;
    CartItem::delete_by_id(cart_id).exec(&txn).await?;
    txn.commit().await?;
    Ok(())
}

/// Removes one of the caller's cart rows.
#[instrument(skip(db))]
pub async fn remove_from_cart(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    cart_id: Uuid,
) -> Result<MutationOutcome> {
    match delete_row(db, caller, cart_id).await {
        Ok(()) => {
            info!("Removed item from cart");
            Ok(MutationOutcome::ok("Item removed from cart", cart_id))
        }
        Err(e) => MutationOutcome::rejected(e),
    }
}

/// Joins the user's cart rows with live items and shops, oldest first.
///
/// Rows whose item or shop is gone are dropped.
async fn cart_lines<C>(conn: &C, user_id: Uuid) -> Result<Vec<CartLine>>
where
    C: ConnectionTrait,
{
    let rows = CartItem::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .order_by_asc(cart_item::Column::CreatedAt)
        .all(conn)
        .await?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let refs: Vec<(ItemType, Uuid)> = rows.iter().map(|r| (r.item_type, r.item_id)).collect();
    let items = resolve_items(conn, &refs).await?;
    let shops = shop_names(conn, rows.iter().map(|r| r.shop_id).collect()).await?;

    let total_rows = rows.len();
    let lines: Vec<CartLine> = rows
        .into_iter()
        .filter_map(|row| {
            let item = items.get(&row.item_id).filter(|i| i.item_type == row.item_type)?;
            let shop_name = shops.get(&row.shop_id)?;
            Some(CartLine {
                id: row.id,
                item_type: row.item_type,
                item_id: row.item_id,
                item_name: item.name.clone(),
                shop_id: row.shop_id,
                shop_name: shop_name.clone(),
                price: item.price,
                quantity: row.quantity,
                item_total: line_total(row.item_type, item.price, row.quantity),
                quantity_available: item.quantity_available,
                service_details: row.service_details,
                created_at: row.created_at,
            })
        })
        .collect();

    if lines.len() < total_rows {
        debug!(%user_id, dropped = total_rows - lines.len(), "Dropped stale cart rows");
    }
    Ok(lines)
}

/// The caller's cart joined with live prices; empty when not logged in.
pub async fn get_user_cart(db: &DatabaseConnection, caller: Option<Uuid>) -> Result<Vec<CartLine>> {
    match caller {
        Some(user_id) => cart_lines(db, user_id).await,
        None => Ok(Vec::new()),
    }
}

/// Totals over the caller's cart; all zero when not logged in.
///
/// Re-reads the cart with the same join and stale-row policy as
/// [`get_user_cart`], so both agree for the same data.
pub async fn get_cart_summary(db: &DatabaseConnection, caller: Option<Uuid>) -> Result<CartSummary> {
    let Some(user_id) = caller else {
        return Ok(CartSummary::default());
    };
    let lines = cart_lines(db, user_id).await?;
    Ok(CartSummary::from_lines(&lines))
}

/// Empties the caller's cart.
#[instrument(skip(db))]
pub async fn clear_cart(db: &DatabaseConnection, caller: Option<Uuid>) -> Result<ClearOutcome> {
    let Some(user_id) = caller else {
        return Ok(ClearOutcome::fail("You must be logged in to clear your cart"));
    };

    let result = CartItem::delete_many()
        .filter(cart_item::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    info!(deleted = result.rows_affected, "Cleared cart");
    Ok(ClearOutcome {
        success: true,
        message: "Cart cleared".to_string(),
        deleted_count: result.rows_affected,
    })
}

async fn move_row_to_wishlist(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    cart_id: Uuid,
) -> Result<(Uuid, bool)> {
    let user_id = require_caller(caller, "manage your wishlist")?;

    let txn = db.begin().await?;
    let row = owned_cart_row(&txn, user_id, cart_id).await?;
    let saved = save_to_wishlist(&txn, user_id, row.item_type, row.item_id, row.shop_id).await?;
    CartItem::delete_by_id(row.id).exec(&txn).await?;
    txn.commit().await?;

    Ok(saved)
}

/// Moves a cart row to the caller's wishlist.
///
/// When the item is already wishlisted only the cart row is removed. Both
/// steps commit together.
#[instrument(skip(db))]
pub async fn move_to_wishlist(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    cart_id: Uuid,
) -> Result<MutationOutcome> {
    match move_row_to_wishlist(db, caller, cart_id).await {
        Ok((wishlist_id, created)) => {
            info!(%wishlist_id, created, "Moved cart item to wishlist");
            Ok(MutationOutcome::ok("Item moved to wishlist", wishlist_id))
        }
        Err(e) => MutationOutcome::rejected(e),
    }
}
