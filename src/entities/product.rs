//! Product entity - A priced item placed on a shelf.
//!
//! `quantity_available` is optional: `None` means stock is not tracked and
//! any quantity may be added to a cart.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Shop selling the product
    pub shop_id: Uuid,
    /// Shelf the product is placed on
    pub shelf_id: Uuid,
    /// Product name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Unit price in minor currency units
    pub price: i64,
    /// Units in stock, `None` when stock is not tracked
    pub quantity_available: Option<i32>,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each product sits on one shelf
    #[sea_orm(
        belongs_to = "super::shelf::Entity",
        from = "Column::ShelfId",
        to = "super::shelf::Column::Id"
    )]
    Shelf,
}

impl Related<super::shelf::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shelf.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
