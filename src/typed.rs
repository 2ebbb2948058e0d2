//! Type-safe entity and column handles for compile-time checked filters.
//!
//! # Example
//! ```
//! use sqb::typed::{Column, Entity};
//!
//! struct Product;
//! impl Entity for Product {
//!     const NAME: &'static str = "Product";
//! }
//!
//! const STOCK_COUNT: Column<Product, i32> = Column::new("StockCount");
//!
//! // Compiles: i32 matches the column type.
//! let _cond = STOCK_COUNT.gt(50);
//! // STOCK_COUNT.gt("fifty") would not compile.
//! ```

use std::marker::PhantomData;

use crate::ast::{self, Expr, FieldRef, JoinKey, Value};

/// A type that is registered in the schema catalog under `NAME`.
pub trait Entity {
    const NAME: &'static str;
}

/// A typed column of entity `E` whose values are Rust type `T`.
pub struct Column<E, T> {
    name: &'static str,
    _phantom: PhantomData<fn() -> (E, T)>,
}

// Manual impls: derives would require E: Clone etc.
impl<E, T> Clone for Column<E, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, T> Copy for Column<E, T> {}

impl<E, T> std::fmt::Debug for Column<E, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column").field("name", &self.name).finish()
    }
}

impl<E, T> Column<E, T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _phantom: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<E: Entity, T> Column<E, T> {
    /// Untyped reference to this column.
    pub fn field(&self) -> FieldRef {
        FieldRef::new(E::NAME, self.name)
    }

    /// Reference to this column on the table joined through `edge`.
    pub fn via(&self, edge: impl Into<JoinKey>) -> FieldRef {
        self.field().via(edge)
    }
}

impl<E: Entity, T> Column<E, T>
where
    T: Into<Value>,
{
    pub fn eq(&self, value: impl Into<T>) -> Expr {
        ast::eq(self.field(), literal::<T>(value.into()))
    }

    pub fn ne(&self, value: impl Into<T>) -> Expr {
        ast::ne(self.field(), literal::<T>(value.into()))
    }

    pub fn gt(&self, value: impl Into<T>) -> Expr {
        ast::gt(self.field(), literal::<T>(value.into()))
    }

    pub fn gte(&self, value: impl Into<T>) -> Expr {
        ast::gte(self.field(), literal::<T>(value.into()))
    }

    pub fn lt(&self, value: impl Into<T>) -> Expr {
        ast::lt(self.field(), literal::<T>(value.into()))
    }

    pub fn lte(&self, value: impl Into<T>) -> Expr {
        ast::lte(self.field(), literal::<T>(value.into()))
    }

    pub fn is_null(&self) -> Expr {
        ast::eq(self.field(), Value::Null)
    }
}

fn literal<T: Into<Value>>(value: T) -> Expr {
    Expr::Literal(value.into())
}

impl<E: Entity> Column<E, String> {
    pub fn contains(&self, needle: &str) -> Expr {
        ast::contains(self.field(), needle)
    }

    pub fn starts_with(&self, prefix: &str) -> Expr {
        ast::starts_with(self.field(), prefix)
    }

    pub fn ends_with(&self, suffix: &str) -> Expr {
        ast::ends_with(self.field(), suffix)
    }
}

impl<E: Entity> Column<E, bool> {
    /// The bare field used as a condition: `field = 1`.
    pub fn is_true(&self) -> Expr {
        Expr::Field(self.field())
    }

    /// The negated field: `field = 0`.
    pub fn is_false(&self) -> Expr {
        ast::not(self.field())
    }
}

impl<E: Entity, T> From<Column<E, T>> for FieldRef {
    fn from(col: Column<E, T>) -> Self {
        col.field()
    }
}

impl<E: Entity, T> From<Column<E, T>> for JoinKey {
    fn from(col: Column<E, T>) -> Self {
        JoinKey::new(E::NAME, col.name)
    }
}

impl<E: Entity, T> From<Column<E, T>> for Expr {
    fn from(col: Column<E, T>) -> Self {
        Expr::Field(col.field())
    }
}
