//! Shelf entity - A grouping of products and services inside a shop.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Shelf database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shelves")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the shelf
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Shop the shelf belongs to
    pub shop_id: Uuid,
    /// Shelf name (e.g. "Bread", "Repairs")
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// When the shelf was created
    pub created_at: DateTimeUtc,
    /// When the shelf was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Shelf and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each shelf belongs to one shop
    #[sea_orm(
        belongs_to = "super::shop::Entity",
        from = "Column::ShopId",
        to = "super::shop::Column::Id"
    )]
    Shop,
}

impl Related<super::shop::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shop.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
