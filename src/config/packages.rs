//! Subscription package seed loading from packages.toml
//!
//! The packages defined here seed the `subscription_packages` table on first
//! run. Seeding is skipped entirely once any package exists, so editing this
//! file later does not change stored packages; use the admin procedures for
//! that.

use crate::core::subscription::NewPackage;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Configuration structure representing the entire packages.toml file
#[derive(Debug, Deserialize)]
pub struct PackagesFile {
    /// List of package definitions to seed
    pub packages: Vec<NewPackage>,
}

/// Loads package definitions from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_packages<P: AsRef<Path>>(path: P) -> Result<Vec<NewPackage>> {
    let path_ref = path.as_ref();
    debug!("Loading subscription packages from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read packages file {path_ref:?}: {e}"),
    })?;

    let file: PackagesFile = toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse packages file {path_ref:?}: {e}"),
    })?;
    Ok(file.packages)
}

/// Loads package definitions from `path`, falling back to
/// [`default_packages`] when the file does not exist.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_packages_or_default<P: AsRef<Path>>(path: P) -> Result<Vec<NewPackage>> {
    if path.as_ref().exists() {
        load_packages(path)
    } else {
        info!(
            "No packages file at {:?}; using built-in package tiers",
            path.as_ref()
        );
        Ok(default_packages())
    }
}

/// Built-in free, basic and premium tiers.
#[must_use]
pub fn default_packages() -> Vec<NewPackage> {
    vec![
        NewPackage {
            package_name: "free".to_string(),
            display_name: "Free".to_string(),
            price: 0,
            currency: "USD".to_string(),
            max_shops: 1,
            max_shelves_per_shop: 3,
            max_items_per_shelf: 10,
            features: vec![
                "1 shop".to_string(),
                "3 shelves per shop".to_string(),
                "10 items per shelf".to_string(),
            ],
            is_active: true,
        },
        NewPackage {
            package_name: "basic".to_string(),
            display_name: "Basic".to_string(),
            price: 999,
            currency: "USD".to_string(),
            max_shops: 3,
            max_shelves_per_shop: 10,
            max_items_per_shelf: 50,
            features: vec![
                "3 shops".to_string(),
                "10 shelves per shop".to_string(),
                "50 items per shelf".to_string(),
                "Order notifications".to_string(),
            ],
            is_active: true,
        },
        NewPackage {
            package_name: "premium".to_string(),
            display_name: "Premium".to_string(),
            price: 2999,
            currency: "USD".to_string(),
            max_shops: 10,
            max_shelves_per_shop: 50,
            max_items_per_shelf: 200,
            features: vec![
                "10 shops".to_string(),
                "50 shelves per shop".to_string(),
                "200 items per shelf".to_string(),
                "Order notifications".to_string(),
                "Priority support".to_string(),
            ],
            is_active: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_packages_file() {
        let toml_str = r#"
            [[packages]]
            package_name = "starter"
            display_name = "Starter"
            price = 0
            currency = "USD"
            max_shops = 1
            max_shelves_per_shop = 2
            max_items_per_shelf = 5
            features = ["One shop"]

            [[packages]]
            package_name = "pro"
            display_name = "Pro"
            price = 1500
            currency = "USD"
            max_shops = 5
            max_shelves_per_shop = 20
            max_items_per_shelf = 100
            is_active = false
        "#;

        let file: PackagesFile = toml::from_str(toml_str).unwrap();
        assert_eq!(file.packages.len(), 2);
        assert_eq!(file.packages[0].package_name, "starter");
        assert_eq!(file.packages[0].features, vec!["One shop".to_string()]);
        assert!(file.packages[0].is_active);

        assert_eq!(file.packages[1].price, 1500);
        assert!(file.packages[1].features.is_empty());
        assert!(!file.packages[1].is_active);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() -> Result<()> {
        let packages = load_packages_or_default("does/not/exist/packages.toml")?;
        let names: Vec<&str> = packages.iter().map(|p| p.package_name.as_str()).collect();
        assert_eq!(names, vec!["free", "basic", "premium"]);
        Ok(())
    }

    #[test]
    fn test_unreadable_file_is_config_error() {
        let result = load_packages("does/not/exist/packages.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
