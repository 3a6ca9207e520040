//! User entity - Marketplace accounts as mirrored from the identity provider.
//!
//! A user's `subscription_package` names the plan that governs how many shops,
//! shelves and items they may create.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Contact email, unique per user
    #[sea_orm(unique)]
    pub email: String,
    /// Optional contact phone
    pub phone: Option<String>,
    /// Name of the subscription package this user is on, if any
    pub subscription_package: Option<String>,
    /// Whether the user may moderate packages and subscriptions
    pub is_admin: bool,
    /// When the user was created
    pub created_at: DateTimeUtc,
    /// When the user was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user owns many shops
    #[sea_orm(has_many = "super::shop::Entity")]
    Shops,
}

impl Related<super::shop::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shops.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
