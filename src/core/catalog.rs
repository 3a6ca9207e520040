//! Shop, shelf, product and service management.
//!
//! Every create runs its quota check and the insert in one transaction, so two
//! concurrent creates cannot both slip under the same limit. Callers must own
//! the shop they are adding to; a foreign shop is reported as not found.

use crate::{
    core::{
        account::require_caller,
        outcome::MutationOutcome,
        quota::{can_shelf_add_item, can_shop_create_shelf, can_user_create_shop},
    },
    entities::{ItemType, Product, Service, Shelf, Shop, product, service, shelf, shop},
    errors::{Error, Result},
};
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument};

/// Live view of a product or service, as needed by carts, wishlists and orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    /// Product or service
    pub item_type: ItemType,
    /// Item id
    pub id: Uuid,
    /// Shop selling the item
    pub shop_id: Uuid,
    /// Current name
    pub name: String,
    /// Unit price; 0 for services
    pub price: i64,
    /// Tracked stock for products, `None` when untracked or a service
    pub quantity_available: Option<i32>,
}

impl From<product::Model> for ResolvedItem {
    fn from(p: product::Model) -> Self {
        Self {
            item_type: ItemType::Product,
            id: p.id,
            shop_id: p.shop_id,
            name: p.name,
            price: p.price,
            quantity_available: p.quantity_available,
        }
    }
}

impl From<service::Model> for ResolvedItem {
    fn from(s: service::Model) -> Self {
        Self {
            item_type: ItemType::Service,
            id: s.id,
            shop_id: s.shop_id,
            name: s.name,
            price: 0,
            quantity_available: None,
        }
    }
}

impl ResolvedItem {
    /// Checks `quantity` against tracked stock.
    ///
    /// # Errors
    /// Returns `Error::StockExceeded` when the item tracks stock and
    /// `quantity` is larger than it.
    pub fn check_stock(&self, quantity: i32) -> Result<()> {
        match self.quantity_available {
            Some(available) if quantity > available => Err(Error::StockExceeded { available }),
            _ => Ok(()),
        }
    }
}

/// Loads the live record for `(item_type, item_id)`.
pub async fn resolve_item<C>(
    conn: &C,
    item_type: ItemType,
    item_id: Uuid,
) -> Result<Option<ResolvedItem>>
where
    C: ConnectionTrait,
{
    let item = match item_type {
        ItemType::Product => Product::find_by_id(item_id)
            .one(conn)
            .await?
            .map(ResolvedItem::from),
        ItemType::Service => Service::find_by_id(item_id)
            .one(conn)
            .await?
            .map(ResolvedItem::from),
    };
    Ok(item)
}

/// Loads the live records for many `(item_type, item_id)` references at once.
///
/// References whose item is gone, or whose id belongs to the other item type,
/// are absent from the returned map.
pub async fn resolve_items<C>(
    conn: &C,
    refs: &[(ItemType, Uuid)],
) -> Result<HashMap<Uuid, ResolvedItem>>
where
    C: ConnectionTrait,
{
    let ids_of = |wanted: ItemType| -> Vec<Uuid> {
        refs.iter()
            .filter(|(item_type, _)| *item_type == wanted)
            .map(|(_, id)| *id)
            .collect()
    };
    let product_ids = ids_of(ItemType::Product);
    let service_ids = ids_of(ItemType::Service);

    let mut items = HashMap::with_capacity(refs.len());
    if !product_ids.is_empty() {
        for p in Product::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(conn)
            .await?
        {
            items.insert(p.id, ResolvedItem::from(p));
        }
    }
    if !service_ids.is_empty() {
        for s in Service::find()
            .filter(service::Column::Id.is_in(service_ids))
            .all(conn)
            .await?
        {
            items.insert(s.id, ResolvedItem::from(s));
        }
    }
    Ok(items)
}

/// Names of the given shops that still exist.
pub async fn shop_names<C>(conn: &C, shop_ids: HashSet<Uuid>) -> Result<HashMap<Uuid, String>>
where
    C: ConnectionTrait,
{
    if shop_ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(Shop::find()
        .filter(shop::Column::Id.is_in(shop_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect())
}

/// Loads a shop owned by `owner_id`; foreign shops are reported as missing.
async fn owned_shop<C>(conn: &C, owner_id: Uuid, shop_id: Uuid) -> Result<shop::Model>
where
    C: ConnectionTrait,
{
    Shop::find_by_id(shop_id)
        .one(conn)
        .await?
        .filter(|s| s.owner_id == owner_id)
        .ok_or(Error::NotFound { entity: "Shop" })
}

/// Loads a shelf whose shop is owned by `owner_id`.
async fn owned_shelf<C>(conn: &C, owner_id: Uuid, shelf_id: Uuid) -> Result<shelf::Model>
where
    C: ConnectionTrait,
{
    let shelf = Shelf::find_by_id(shelf_id)
        .one(conn)
        .await?
        .ok_or(Error::NotFound { entity: "Shelf" })?;
    owned_shop(conn, owner_id, shelf.shop_id)
        .await
        .map_err(|e| e.renamed_not_found("Shelf"))?;
    Ok(shelf)
}

fn require_name(name: &str, what: &str) -> Result<()> {
    if name.trim().is_empty() {
        Err(Error::validation(format!("{what} name is required")))
    } else {
        Ok(())
    }
}

/// Arguments for [`create_shop`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShop {
    /// Shop name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Optional category
    #[serde(default)]
    pub category: Option<String>,
}

async fn insert_shop(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    input: NewShop,
) -> Result<Uuid> {
    let owner_id = require_caller(caller, "create a shop")?;
    require_name(&input.name, "Shop")?;

    let txn = db.begin().await?;
    can_user_create_shop(&txn, owner_id).await?.enforce()?;

    let now = chrono::Utc::now();
    let created = shop::ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner_id),
        name: Set(input.name),
        description: Set(input.description),
        category: Set(input.category),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(created.id)
}

/// Opens a new shop for the caller, subject to the shop quota.
#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create_shop(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    input: NewShop,
) -> Result<MutationOutcome> {
    match insert_shop(db, caller, input).await {
        Ok(id) => {
            info!(shop_id = %id, "Created shop");
            Ok(MutationOutcome::ok("Shop created", id))
        }
        Err(e) => MutationOutcome::rejected(e),
    }
}

/// Arguments for [`create_shelf`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShelf {
    /// Shop to add the shelf to
    pub shop_id: Uuid,
    /// Shelf name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
}

async fn insert_shelf(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    input: NewShelf,
) -> Result<Uuid> {
    let owner_id = require_caller(caller, "create a shelf")?;
    require_name(&input.name, "Shelf")?;

    let txn = db.begin().await?;
    owned_shop(&txn, owner_id, input.shop_id).await?;
    can_shop_create_shelf(&txn, input.shop_id).await?.enforce()?;

    let now = chrono::Utc::now();
    let created = shelf::ActiveModel {
        id: Set(Uuid::new_v4()),
        shop_id: Set(input.shop_id),
        name: Set(input.name),
        description: Set(input.description),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(created.id)
}

/// Adds a shelf to one of the caller's shops, subject to the shelf quota.
#[instrument(skip(db, input), fields(shop_id = %input.shop_id))]
pub async fn create_shelf(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    input: NewShelf,
) -> Result<MutationOutcome> {
    match insert_shelf(db, caller, input).await {
        Ok(id) => {
            info!(shelf_id = %id, "Created shelf");
            Ok(MutationOutcome::ok("Shelf created", id))
        }
        Err(e) => MutationOutcome::rejected(e),
    }
}

/// Arguments for [`create_product`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    /// Shelf to place the product on
    pub shelf_id: Uuid,
    /// Product name
    pub name: String,
    /// Unit price in minor currency units
    pub price: i64,
    /// Units in stock; omit to leave stock untracked
    #[serde(default)]
    pub quantity_available: Option<i32>,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
}

async fn insert_product(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    input: NewProduct,
) -> Result<Uuid> {
    let owner_id = require_caller(caller, "create a product")?;
    require_name(&input.name, "Product")?;
    if input.price < 0 {
        return Err(Error::validation("Price cannot be negative"));
    }
    if input.quantity_available.is_some_and(|q| q < 0) {
        return Err(Error::validation("Stock cannot be negative"));
    }

    let txn = db.begin().await?;
    let shelf = owned_shelf(&txn, owner_id, input.shelf_id).await?;
    can_shelf_add_item(&txn, shelf.id).await?.enforce()?;

    let now = chrono::Utc::now();
    let created = product::ActiveModel {
        id: Set(Uuid::new_v4()),
        shop_id: Set(shelf.shop_id),
        shelf_id: Set(shelf.id),
        name: Set(input.name),
        description: Set(input.description),
        price: Set(input.price),
        quantity_available: Set(input.quantity_available),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(created.id)
}

/// Places a product on one of the caller's shelves, subject to the item quota.
#[instrument(skip(db, input), fields(shelf_id = %input.shelf_id))]
pub async fn create_product(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    input: NewProduct,
) -> Result<MutationOutcome> {
    match insert_product(db, caller, input).await {
        Ok(id) => {
            info!(product_id = %id, "Created product");
            Ok(MutationOutcome::ok("Product created", id))
        }
        Err(e) => MutationOutcome::rejected(e),
    }
}

/// Arguments for [`create_service`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewService {
    /// Shelf to list the service on
    pub shelf_id: Uuid,
    /// Service name
    pub name: String,
    /// Free-text pricing note
    #[serde(default)]
    pub pricing: Option<String>,
    /// Free-text duration note
    #[serde(default)]
    pub duration: Option<String>,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
}

async fn insert_service(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    input: NewService,
) -> Result<Uuid> {
    let owner_id = require_caller(caller, "create a service")?;
    require_name(&input.name, "Service")?;

    let txn = db.begin().await?;
    let shelf = owned_shelf(&txn, owner_id, input.shelf_id).await?;
    can_shelf_add_item(&txn, shelf.id).await?.enforce()?;

    let now = chrono::Utc::now();
    let created = service::ActiveModel {
        id: Set(Uuid::new_v4()),
        shop_id: Set(shelf.shop_id),
        shelf_id: Set(shelf.id),
        name: Set(input.name),
        description: Set(input.description),
        pricing: Set(input.pricing),
        duration: Set(input.duration),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(created.id)
}

/// Lists a service on one of the caller's shelves, subject to the item quota.
#[instrument(skip(db, input), fields(shelf_id = %input.shelf_id))]
pub async fn create_service(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    input: NewService,
) -> Result<MutationOutcome> {
    match insert_service(db, caller, input).await {
        Ok(id) => {
            info!(service_id = %id, "Created service");
            Ok(MutationOutcome::ok("Service created", id))
        }
        Err(e) => MutationOutcome::rejected(e),
    }
}

async fn remove_item(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    item_type: ItemType,
    item_id: Uuid,
) -> Result<()> {
    let (entity, action) = match item_type {
        ItemType::Product => ("Product", "delete a product"),
        ItemType::Service => ("Service", "delete a service"),
    };
    let owner_id = require_caller(caller, action)?;

    let txn = db.begin().await?;
    let item = resolve_item(&txn, item_type, item_id)
        .await?
        .ok_or(Error::NotFound { entity })?;
    owned_shop(&txn, owner_id, item.shop_id)
        .await
        .map_err(|e| e.renamed_not_found(entity))?;

    match item_type {
        ItemType::Product => Product::delete_by_id(item_id).exec(&txn).await?,
        ItemType::Service => Service::delete_by_id(item_id).exec(&txn).await?,
    };

    txn.commit().await?;
    Ok(())
}

/// Deletes one of the caller's products.
///
/// Cart and wishlist rows pointing at it are left in place; readers drop them.
#[instrument(skip(db))]
pub async fn delete_product(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    product_id: Uuid,
) -> Result<MutationOutcome> {
    match remove_item(db, caller, ItemType::Product, product_id).await {
        Ok(()) => {
            info!("Deleted product");
            Ok(MutationOutcome::ok("Product deleted", product_id))
        }
        Err(e) => MutationOutcome::rejected(e),
    }
}

/// Deletes one of the caller's services.
#[instrument(skip(db))]
pub async fn delete_service(
    db: &DatabaseConnection,
    caller: Option<Uuid>,
    service_id: Uuid,
) -> Result<MutationOutcome> {
    match remove_item(db, caller, ItemType::Service, service_id).await {
        Ok(()) => {
            info!("Deleted service");
            Ok(MutationOutcome::ok("Service deleted", service_id))
        }
        Err(e) => MutationOutcome::rejected(e),
    }
}
