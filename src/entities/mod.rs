//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the marketplace tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod cart_item;
pub mod item;
pub mod order;
pub mod product;
pub mod service;
pub mod shelf;
pub mod shop;
pub mod subscription_package;
pub mod user;
pub mod wishlist_item;

// Re-export specific types to avoid conflicts
pub use cart_item::{Column as CartItemColumn, Entity as CartItem, Model as CartItemModel};
pub use item::{ItemType, ServiceDetails};
pub use order::{
    Column as OrderColumn, Entity as Order, Model as OrderModel, OrderItem, OrderItems,
    OrderStatus, PaymentStatus,
};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use service::{Column as ServiceColumn, Entity as Service, Model as ServiceModel};
pub use shelf::{Column as ShelfColumn, Entity as Shelf, Model as ShelfModel};
pub use shop::{Column as ShopColumn, Entity as Shop, Model as ShopModel};
pub use subscription_package::{
    Column as SubscriptionPackageColumn, Entity as SubscriptionPackage,
    Model as SubscriptionPackageModel, PackageFeatures,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
pub use wishlist_item::{
    Column as WishlistItemColumn, Entity as WishlistItem, Model as WishlistItemModel,
};
