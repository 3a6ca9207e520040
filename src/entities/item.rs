//! Shared item vocabulary used by carts, wishlists and order snapshots.
//!
//! Products and services live in separate tables but are addressed through a
//! single `(item_type, item_id)` pair. Item ids are UUIDs, so an `item_id` is
//! unique across both tables.

use sea_orm::{FromJsonQueryResult, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// Kind of sellable item a cart, wishlist or order row points at.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// A priced, optionally stock-limited product
    #[sea_orm(string_value = "product")]
    Product,
    /// A contact-for-pricing service
    #[sea_orm(string_value = "service")]
    Service,
}

impl ItemType {
    /// Returns the lowercase wire name of the item type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Service => "service",
        }
    }
}

/// Booking details attached to a service in a cart or order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDetails {
    /// Requested date, free-form (e.g. `2026-03-14`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_date: Option<String>,
    /// Requested time slot, free-form (e.g. `14:30`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_time: Option<String>,
    /// Customer notes for the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
