//! Wishlist item entity - Items a user saved for later.

use super::item::ItemType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Wishlist item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wishlist_items")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the wishlist row
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Owner of the wishlist row
    pub user_id: Uuid,
    /// Whether `item_id` points at a product or a service
    pub item_type: ItemType,
    /// Product or service id
    pub item_id: Uuid,
    /// Shop selling the item
    pub shop_id: Uuid,
    /// When the item was saved
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `WishlistItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each wishlist row belongs to one user
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
