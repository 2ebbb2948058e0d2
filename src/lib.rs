//! # SQB — typed SELECT builder
//!
//! > **Describe the query. Get one statement back.**
//!
//! SQB compiles a root entity, a chain of includes (LEFT JOINs along foreign
//! keys) and typed filter predicates into a single aliased SELECT, using an
//! explicit schema catalog instead of runtime introspection.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use sqb::prelude::*;
//!
//! let catalog = Catalog::load("catalog.toml")?;
//! let query = QueryBuilder::new(&catalog, "Order")?
//!     .include(field("Order", "UserId"))?
//!     .filter(and([
//!         gt(field("Order", "TotalAmount"), 100),
//!         contains(field("User", "Email"), "@example.com"),
//!     ]))?
//!     .order_by_desc(field("Order", "CreatedOn"))?
//!     .page(0, 20)
//!     .build()?;
//! ```
//!
//! ## Aliases
//!
//! | Alias | Table                         |
//! |-------|-------------------------------|
//! | `e0`  | Root entity                   |
//! | `eN`  | Target of the N-th include    |
//!
//! Result columns are named `{alias}_{field}`; [`SqlQuery::columns`] maps
//! them back to entity fields.
//!
//! [`SqlQuery::columns`]: transpiler::SqlQuery

pub mod ast;
pub mod builder;
pub mod config;
pub mod error;
pub mod joins;
pub mod parser;
pub mod schema;
pub mod translate;
pub mod transpiler;
pub mod typed;

#[cfg(test)]
mod test_utils;

pub mod prelude {
    pub use crate::ast::{
        CompareOp, Expr, FieldRef, JoinKey, LogicalOp, Predicate, SortDirection, TableAlias, Value,
        and,
        computed, contains, ends_with, eq, field, gt, gte, like, lit, lt, lte, ne, not, or,
        starts_with,
    };
    pub use crate::builder::QueryBuilder;
    pub use crate::config::Settings;
    pub use crate::error::*;
    pub use crate::parser::{parse_field, parse_filter, parse_sort_key};
    pub use crate::schema::{Catalog, EntityDescriptor, FieldType, SchemaCatalog};
    pub use crate::transpiler::{Dialect, Layout, LiteralMode, SqlQuery};
    pub use crate::typed::{Column, Entity};
}

/// Parse a textual filter against `root`.
///
/// # Example
///
/// ```
/// use sqb::parse;
///
/// let expr = parse("User", "IsActive && Email.ends_with('@example.com')").unwrap();
/// assert!(matches!(expr, sqb::ast::Expr::Logical { .. }));
/// ```
pub fn parse(root: &str, input: &str) -> Result<ast::Expr, error::QueryError> {
    parser::parse_filter(root, input)
}
