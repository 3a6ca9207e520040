//! Wishlist business logic - A saved-item set per user.
//!
//! A user has at most one wishlist row per item. Adding an item that is already
//! saved succeeds without a second row. Unlike cart rows, wishlist rows are
//! addressed by `(user, item_id)` rather than by row id.

use crate::{
    core::{
        account::require_caller,
        cart::{AddToCartInput, merge_into_cart},
        catalog::{resolve_item, resolve_items, shop_names},
        outcome::{ClearOutcome, MutationOutcome},
    },
    entities::{ItemType, WishlistItem, wishlist_item},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Arguments for [`add_to_wishlist`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToWishlistInput {
    /// Product or service
    pub item_type: ItemType,
    /// Item to save
    pub item_id: Uuid,
    /// Shop the caller believes sells the item
    pub shop_id: Uuid,
}

/// A wishlist row joined with its live item and shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistLine {
    /// Wishlist row id
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
    /// When the item was saved
    pub created_at: DateTimeUtc,
}

async fn find_saved<C>(conn: &C, user_id: Uuid, item_id: Uuid) -> Result<Option<wishlist_item::Model>>
where
    C: ConnectionTrait,
{
    WishlistItem::find()
        .filter(wishlist_item::Column::UserId.eq(user_id))
        .filter(wishlist_item::Column::ItemId.eq(item_id))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Saves an item unless the user already has it.
///
/// Returns the wishlist row id and whether a row was created.
pub(crate) async fn save_to_wishlist<C>(
    conn: &C,
    user_id: Uuid,
    item_type: ItemType,
    item_id: Uuid,
    shop_id: Uuid,
) -> Result<(Uuid, bool)>
where
    C: ConnectionTrait,
{
    if let Some(existing) = find_saved(conn, user_id, item_id).await? {
        return Ok((existing.id, false));
    }

    let created = wishlist_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        item_type: Set(item_type),
        item_id: Set(item_id),
        shop_id: Set(shop_id),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(conn)
    .await?;
    Ok((created.id, true))
}

async fn save_in_txn(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    input: AddToWishlistInput,
) -> Result<(Uuid, bool)> {
    let user_id = require_caller(caller, "add items to your wishlist")?;

    let txn = db.begin().await?;
    let item = resolve_item(&txn, input.item_type, input.item_id)
        .await?
        .ok_or(Error::NotFound { entity: "Item" })?;
    if item.shop_id != input.shop_id {
        return Err(Error::validation("Item does not belong to this shop"));
    }
    let saved = save_to_wishlist(&txn, user_id, item.item_type, item.id, item.shop_id).await?;
    txn.commit().await?;
    Ok(saved)
}

/// Saves an item to the caller's wishlist; saving it again is a successful no-op.
#[instrument(skip(db, input), fields(item_type = input.item_type.as_str(), item_id = %input.item_id))]
pub async fn add_to_wishlist(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    input: AddToWishlistInput,
) -> Result<MutationOutcome> {
    match save_in_txn(db, caller, input).await {
        Ok((wishlist_id, true)) => {
            info!(%wishlist_id, "Added item to wishlist");
            Ok(MutationOutcome::ok("Added to wishlist", wishlist_id))
        }
        Ok((wishlist_id, false)) => Ok(MutationOutcome::ok("Already in wishlist", wishlist_id)),
        Err(e) => MutationOutcome::rejected(e),
    }
}

async fn delete_saved(db: &DatabaseConnection, caller: Option<Uuid>, item_id: Uuid) -> Result<()> {
    let user_id = require_caller(caller, "update your wishlist")?;
    let result = WishlistItem::delete_many()
        .filter(wishlist_item::Column::UserId.eq(user_id))
        .filter(wishlist_item::Column::ItemId.eq(item_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "Wishlist item",
        });
    }
    Ok(())
}

/// Removes an item from the caller's wishlist, keyed by item id.
#[instrument(skip(db))]
pub async fn remove_from_wishlist(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    item_id: Uuid,
) -> Result<MutationOutcome> {
    match delete_saved(db, caller, item_id).await {
        Ok(()) => {
            info!("Removed item from wishlist");
            Ok(MutationOutcome::done("Removed from wishlist"))
        }
        Err(e) => MutationOutcome::rejected(e),
    }
}

/// The caller's wishlist with live item data, newest first; empty when not logged in.
///
/// Rows whose item or shop no longer exists are dropped.
pub async fn get_user_wishlist(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
) -> Result<Vec<WishlistLine>> {
    let Some(user_id) = caller else {
        return Ok(Vec::new());
    };

    let rows = WishlistItem::find()
        .filter(wishlist_item::Column::UserId.eq(user_id))
        .order_by_desc(wishlist_item::Column::CreatedAt)
        .all(db)
        .await?;

    let refs: Vec<(ItemType, Uuid)> = rows.iter().map(|r| (r.item_type, r.item_id)).collect();
    let items = resolve_items(db, &refs).await?;
    let shops = shop_names(db, rows.iter().map(|r| r.shop_id).collect()).await?;

    let total_rows = rows.len();
    let lines: Vec<WishlistLine> = rows
        .into_iter()
        .filter_map(|row| {
            let item = items.get(&row.item_id).filter(|i| i.item_type == row.item_type)?;
            Some(WishlistLine {
                id: row.id,
                item_type: row.item_type,
                item_id: row.item_id,
                item_name: item.name.clone(),
                shop_id: row.shop_id,
                shop_name: shops.get(&row.shop_id)?.clone(),
                price: item.price,
                created_at: row.created_at,
            })
        })
        .collect();

    if lines.len() < total_rows {
        debug!(%user_id, dropped = total_rows - lines.len(), "Dropped stale wishlist rows");
    }
    Ok(lines)
}

/// Whether the caller has saved `item_id`; false when not logged in.
pub async fn is_in_wishlist(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    item_id: Uuid,
) -> Result<bool> {
    match caller {
        Some(user_id) => Ok(find_saved(db, user_id, item_id).await?.is_some()),
        None => Ok(false),
    }
}

/// Empties the caller's wishlist.
#[instrument(skip(db))]
pub async fn clear_wishlist(db: &DatabaseConnection, caller: Option<Uuid>) -> Result<ClearOutcome> {
    let Some(user_id) = caller else {
        return Ok(ClearOutcome::fail(
            "You must be logged in to clear your wishlist",
        ));
    };

    let result = WishlistItem::delete_many()
        .filter(wishlist_item::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    info!(deleted = result.rows_affected, "Cleared wishlist");
    Ok(ClearOutcome {
        success: true,
        message: "Wishlist cleared".to_string(),
        deleted_count: result.rows_affected,
    })
}

async fn move_saved_to_cart(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    item_id: Uuid,
    quantity: i32,
) -> Result<Uuid> {
    let user_id = require_caller(caller, "add items to cart")?;

    let txn = db.begin().await?;
    let saved = find_saved(&txn, user_id, item_id)
        .await?
        .ok_or(Error::NotFound {
            entity: "Wishlist item",
        })?;

    let input = AddToCartInput {
        item_type: saved.item_type,
        item_id: saved.item_id,
        shop_id: saved.shop_id,
        quantity,
        service_details: None,
    };
    let (cart_id, _) = merge_into_cart(&txn, user_id, input).await?;
    WishlistItem::delete_by_id(saved.id).exec(&txn).await?;

    txn.commit().await?;
    Ok(cart_id)
}

/// Adds a saved item to the cart and removes it from the wishlist.
///
/// The add follows every cart rule (quantity, stock, merge); if it fails the
/// wishlist row stays.
#[instrument(skip(db))]
pub async fn move_to_cart(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    item_id: Uuid,
    quantity: i32,
) -> Result<MutationOutcome> {
    match move_saved_to_cart(db, caller, item_id, quantity).await {
        Ok(cart_id) => {
            info!(%cart_id, "Moved wishlist item to cart");
            Ok(MutationOutcome::ok("Moved to cart", cart_id))
        }
        Err(e) => MutationOutcome::rejected(e),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::cart::get_user_cart;
    use crate::entities::Service;
    use crate::test_utils::*;

    fn save_product(market: &TestMarket) -> AddToWishlistInput {
        AddToWishlistInput {
            item_type: ItemType::Product,
            item_id: market.product.id,
            shop_id: market.shop.id,
        }
    }

    async fn saved_count(db: &DatabaseConnection, user_id: Uuid) -> Result<usize> {
        Ok(WishlistItem::find()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .all(db)
            .await?
            .len())
    }

    #[tokio::test]
    async fn test_add_to_wishlist_is_deduplicated() -> Result<()> {
        let db = setup_test_db().await?;
        let market = setup_market(&db).await?;
        let customer = Some(market.customer.id);

        let first = add_to_wishlist(&db, customer, save_product(&market)).await?;
        let second = add_to_wishlist(&db, customer, save_product(&market)).await?;
        assert!(first.success);
        assert!(second.success);
        assert_eq!(second.message, "Already in wishlist");
        assert_eq!(first.id, second.id);
        assert_eq!(saved_count(&db, market.customer.id).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_to_wishlist_requires_login_and_item() -> Result<()> {
        let db = setup_test_db().await?;
        let market = setup_market(&db).await?;

        let anonymous = add_to_wishlist(&db, None, save_product(&market)).await?;
        assert!(!anonymous.success);

        let mut missing = save_product(&market);
        missing.item_id = Uuid::new_v4();
        let outcome = add_to_wishlist(&db, Some(market.customer.id), missing).await?;
        assert_eq!(outcome.message, "Item not found");
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_is_keyed_by_item_id() -> Result<()> {
        let db = setup_test_db().await?;
        let market = setup_market(&db).await?;
        let customer = Some(market.customer.id);
        let saved = add_to_wishlist(&db, customer, save_product(&market)).await?;

        // the wishlist row id is not a valid key
        let by_row = remove_from_wishlist(&db, customer, saved.id.unwrap()).await?;
        assert!(!by_row.success);

        assert!(is_in_wishlist(&db, customer, market.product.id).await?);
        let by_item = remove_from_wishlist(&db, customer, market.product.id).await?;
        assert!(by_item.success);
        assert!(!is_in_wishlist(&db, customer, market.product.id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_user_wishlist_drops_stale_rows() -> Result<()> {
        let db = setup_test_db().await?;
        let market = setup_market(&db).await?;
        let customer = Some(market.customer.id);
        add_to_wishlist(&db, customer, save_product(&market)).await?;
        add_to_wishlist(
            &db,
            customer,
            AddToWishlistInput {
                item_type: ItemType::Service,
                item_id: market.service.id,
                shop_id: market.shop.id,
            },
        )
        .await?;

        assert_eq!(get_user_wishlist(&db, customer).await?.len(), 2);

        Service::delete_by_id(market.service.id).exec(&db).await?;
        let lines = get_user_wishlist(&db, customer).await?;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].item_id, market.product.id);
        assert_eq!(lines[0].price, market.product.price);

        assert!(get_user_wishlist(&db, None).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_wishlist_returns_count() -> Result<()> {
        let db = setup_test_db().await?;
        let market = setup_market(&db).await?;
        let customer = Some(market.customer.id);
        add_to_wishlist(&db, customer, save_product(&market)).await?;

        let cleared = clear_wishlist(&db, customer).await?;
        assert!(cleared.success);
        assert_eq!(cleared.deleted_count, 1);
        assert_eq!(saved_count(&db, market.customer.id).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_move_to_cart_merges_and_removes_saved_row() -> Result<()> {
        let db = setup_test_db().await?;
        let market = setup_market(&db).await?;
        let customer = Some(market.customer.id);
        add_to_wishlist(&db, customer, save_product(&market)).await?;

        let moved = move_to_cart(&db, customer, market.product.id, 2).await?;
        assert!(moved.success);
        assert_eq!(saved_count(&db, market.customer.id).await?, 0);

        let cart = get_user_cart(&db, customer).await?;
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].quantity, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_move_keeps_wishlist_row() -> Result<()> {
        let db = setup_test_db().await?;
        // product stock is 5
        let market = setup_market(&db).await?;
        let customer = Some(market.customer.id);
        add_to_wishlist(&db, customer, save_product(&market)).await?;

        let moved = move_to_cart(&db, customer, market.product.id, 6).await?;
        assert!(!moved.success);
        assert_eq!(moved.message, "Only 5 items available in stock");
        assert!(is_in_wishlist(&db, customer, market.product.id).await?);
        assert!(get_user_cart(&db, customer).await?.is_empty());
        Ok(())
    }
}
