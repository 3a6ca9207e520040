//! Service entity - A bookable offering whose price is agreed with the provider.
//!
//! `pricing` and `duration` are free text as entered by the shop owner; they are
//! displayed but never used in arithmetic.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Service database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "services")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the service
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Shop offering the service
    pub shop_id: Uuid,
    /// Shelf the service is listed on
    pub shelf_id: Uuid,
    /// Service name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Pricing note (e.g. "from 50/hour"), opaque text
    pub pricing: Option<String>,
    /// Duration note (e.g. "2 hours"), opaque text
    pub duration: Option<String>,
    /// When the service was created
    pub created_at: DateTimeUtc,
    /// When the service was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Service and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each service is listed on one shelf
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
