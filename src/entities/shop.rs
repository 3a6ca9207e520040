//! Shop entity - A storefront owned by a single user.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Shop database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shops")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the shop
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// User who owns the shop
    pub owner_id: Uuid,
    /// Shop name shown to customers
    pub name: String,
    /// Optional long description
    pub description: Option<String>,
    /// Optional marketplace category (e.g. "bakery")
    pub category: Option<String>,
    /// When the shop was created
    pub created_at: DateTimeUtc,
    /// When the shop was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Shop and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each shop belongs to one owner
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id"
    )]
    Owner,
    /// One shop has many shelves
    #[sea_orm(has_many = "super::shelf::Entity")]
    Shelves,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::shelf::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shelves.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
