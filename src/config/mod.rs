/// Database connection and table creation
pub mod database;

/// Subscription package seed loading from packages.toml
pub mod packages;

/// Server and collaborator settings from environment variables
pub mod settings;

pub use settings::Settings;
