//! Core business logic - framework-agnostic marketplace operations.
//!
//! Every operation takes the database connection and the resolved caller
//! (`Option<Uuid>`, `None` when not logged in). Mutations return structured
//! outcomes for business failures and `Err` only for infrastructure faults.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod order;
pub mod outcome;
pub mod quota;
pub mod subscription;
pub mod wishlist;
