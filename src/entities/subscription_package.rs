//! Subscription package entity - Plan tiers that cap shops, shelves and items.
//!
//! Packages are global reference data managed by admins. They are deactivated
//! rather than deleted.

use sea_orm::{FromJsonQueryResult, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// JSON column wrapper for the list of marketing feature lines.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct PackageFeatures(pub Vec<String>);

/// Subscription package database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscription_packages")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the package
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Machine name referenced by `users.subscription_package`
    #[sea_orm(unique)]
    pub package_name: String,
    /// Name shown to users
    pub display_name: String,
    /// Price in minor currency units
    pub price: i64,
    /// ISO currency code
    pub currency: String,
    /// Maximum shops per user
    pub max_shops: i32,
    /// Maximum shelves per shop
    pub max_shelves_per_shop: i32,
    /// Maximum products plus services per shelf
    pub max_items_per_shelf: i32,
    /// Feature lines for display
    #[sea_orm(column_type = "Json")]
    pub features: PackageFeatures,
    /// Whether the package can be assigned to users
    pub is_active: bool,
    /// When the package was created
    pub created_at: DateTimeUtc,
    /// When the package was last modified
    pub updated_at: DateTimeUtc,
}

/// `SubscriptionPackage` is referenced by name and has no foreign keys
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
