//! SQL transpiler: clause emitters and dialect generators.
//!
//! [`select::build_select`] assembles the statement in a fixed order:
//! SELECT, FROM, LEFT JOINs, WHERE, GROUP BY, ORDER BY, paging, `;`.

pub mod conditions;
pub mod dialect;
pub mod select;
pub mod sql;
pub mod traits;

pub use dialect::Dialect;
pub use select::{
    Layout, LiteralMode, OrderKey, ResultColumn, ResultColumnMap, SelectPlan, SqlQuery,
    build_select,
};
pub use traits::SqlGenerator;
