//! Fixtures shared by unit tests.

use crate::schema::Catalog;

pub const CATALOG_TOML: &str = include_str!("../tests/fixtures/catalog.toml");

/// The fixture catalog: User, UserProfile, Category, Product, Order, OrderProduct.
pub fn catalog() -> Catalog {
    Catalog::from_toml_str(CATALOG_TOML).expect("fixture catalog parses")
}
