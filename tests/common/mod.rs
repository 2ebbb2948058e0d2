#![allow(dead_code)]

use sqb::schema::Catalog;
use sqb::typed::{Column, Entity};

pub const CATALOG_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/catalog.toml");

pub fn catalog() -> Catalog {
    Catalog::load(CATALOG_PATH).expect("Failed to load fixture catalog")
}

pub struct Product;
impl Entity for Product {
    const NAME: &'static str = "Product";
}

pub struct Category;
impl Entity for Category {
    const NAME: &'static str = "Category";
}

pub struct Order;
impl Entity for Order {
    const NAME: &'static str = "Order";
}

pub struct User;
impl Entity for User {
    const NAME: &'static str = "User";
}

pub mod product {
    use super::*;

    pub const IS_ACTIVE: Column<Product, bool> = Column::new("IsActive");
    pub const NAME: Column<Product, String> = Column::new("Name");
    pub const PRICE: Column<Product, f64> = Column::new("Price");
    pub const STOCK_COUNT: Column<Product, i32> = Column::new("StockCount");
    pub const CATEGORY_ID: Column<Product, i32> = Column::new("CategoryId");
}

pub mod category {
    use super::*;

    pub const NAME: Column<Category, String> = Column::new("Name");
    pub const IS_ACTIVE: Column<Category, bool> = Column::new("IsActive");
    pub const PARENT_CATEGORY_ID: Column<Category, i32> = Column::new("ParentCategoryId");
    pub const CREATED_BY: Column<Category, i32> = Column::new("CreatedBy");
    pub const IS_DELETED: Column<Category, bool> = Column::new("IsDeleted");
}

pub mod order {
    use super::*;

    pub const USER_ID: Column<Order, i32> = Column::new("UserId");
    pub const CREATED_BY: Column<Order, i32> = Column::new("CreatedBy");
    pub const TOTAL_AMOUNT: Column<Order, f64> = Column::new("TotalAmount");
}

pub mod user {
    use super::*;

    pub const USERNAME: Column<User, String> = Column::new("Username");
    pub const EMAIL: Column<User, String> = Column::new("Email");
    pub const CREATED_BY: Column<User, i32> = Column::new("CreatedBy");
}
