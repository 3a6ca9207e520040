//! Order entity - An immutable purchase snapshot taken from a user's cart.
//!
//! Line items are stored as a JSON snapshot so later price or name changes on
//! the catalog never alter a placed order. After creation only `status`,
//! `payment_status`, `shop_notes` and `updated_at` change.

use super::item::{ItemType, ServiceDetails};
use sea_orm::{FromJsonQueryResult, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// Fulfilment status of an order.
///
/// Any status may follow any other; only the set of values is fixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed, waiting for the shop
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Accepted by the shop
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    /// Being prepared
    #[sea_orm(string_value = "processing")]
    Processing,
    /// Handed to delivery
    #[sea_orm(string_value = "shipped")]
    Shipped,
    /// Received by the customer
    #[sea_orm(string_value = "delivered")]
    Delivered,
    /// Cancelled by customer or shop
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Payment status of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Not yet paid
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Payment received
    #[sea_orm(string_value = "paid")]
    Paid,
    /// Payment attempt failed
    #[sea_orm(string_value = "failed")]
    Failed,
    /// Payment returned to the customer
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

/// One snapshotted line of an order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Product or service
    pub item_type: ItemType,
    /// Id of the item at the time of ordering
    pub item_id: Uuid,
    /// Item name at the time of ordering
    pub item_name: String,
    /// Ordered quantity
    pub quantity: i32,
    /// Unit price at the time of ordering (0 for services)
    pub price: i64,
    /// `price * quantity`
    pub total: i64,
    /// Booking details carried over from the cart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_details: Option<ServiceDetails>,
}

/// JSON column wrapper for the line item snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct OrderItems(pub Vec<OrderItem>);

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Purchasing user
    pub user_id: Uuid,
    /// Shop fulfilling the order
    pub shop_id: Uuid,
    /// Human-readable number, `ORD-YYYYMMDD-NNN`
    #[sea_orm(unique)]
    pub order_number: String,
    /// Fulfilment status
    pub status: OrderStatus,
    /// Customer contact name
    pub customer_name: String,
    /// Customer contact email
    pub customer_email: String,
    /// Customer contact phone
    pub customer_phone: String,
    /// Delivery street address
    pub delivery_address: String,
    /// Delivery city
    pub delivery_city: String,
    /// Optional delivery instructions
    pub delivery_notes: Option<String>,
    /// Snapshotted line items
    #[sea_orm(column_type = "Json")]
    pub items: OrderItems,
    /// Sum of line totals
    pub subtotal: i64,
    /// Amount due; equals `subtotal` (no tax or shipping lines)
    pub total_amount: i64,
    /// Payment method chosen by the customer
    pub payment_method: Option<String>,
    /// Payment status
    pub payment_status: PaymentStatus,
    /// Notes from the customer
    pub customer_notes: Option<String>,
    /// Notes from the shop owner
    pub shop_notes: Option<String>,
    /// When the order was placed
    pub created_at: DateTimeUtc,
    /// When the order last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order is fulfilled by one shop
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
