//! Cart item entity - One row per (user, item) pair in a user's cart.
//!
//! The pair is kept unique by the cart logic (lookup then merge), not by a
//! database constraint. Prices are not stored here; they are joined from the
//! live product record whenever the cart is read.

use super::item::{ItemType, ServiceDetails};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cart item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_items")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the cart row
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owner of the cart row
    pub user_id: Uuid,
    /// Whether `item_id` points at a product or a service
    pub item_type: ItemType,
    /// Product or service id
    pub item_id: Uuid,
    /// Shop selling the item
    pub shop_id: Uuid,
    /// Requested quantity, always positive
    pub quantity: i32,
    /// Booking details for services
    #[sea_orm(column_type = "Json", nullable)]
    pub service_details: Option<ServiceDetails>,
    /// When the row was first added
    pub created_at: DateTimeUtc,
    /// When the quantity or details last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `CartItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each cart row belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
