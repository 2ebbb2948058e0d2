//! Fluent query builder.
//!
//! Every fluent call validates and resolves its input immediately: includes
//! allocate aliases, filters and sort/group selectors are resolved to table
//! aliases. [`QueryBuilder::build`] only renders and can be called any number
//! of times.
//!
//! # Example
//! ```
//! use sqb::prelude::*;
//!
//! let catalog = Catalog::from_entities([EntityDescriptor::new("User")
//!     .table("Users")
//!     .field("Id", FieldType::Int)
//!     .field("Name", FieldType::Text)
//!     .field("IsActive", FieldType::Bool)])
//! .unwrap();
//!
//! let sql = QueryBuilder::new(&catalog, "User")
//!     .and_then(|q| q.filter(field("User", "IsActive")))
//!     .and_then(|q| q.order_by_asc(field("User", "Id")))
//!     .map(|q| q.skip(10).take(5))
//!     .and_then(|q| q.build_query())
//!     .unwrap();
//!
//! assert!(sql.ends_with(
//!     "WHERE [e0].[IsActive] = 1\nORDER BY [e0].[Id] ASC\nOFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY;"
//! ));
//! ```

use crate::ast::{ColumnRef, Expr, FieldRef, Predicate, SortDirection};
use crate::config::Settings;
use crate::error::{QueryError, SqbResult};
use crate::joins::{IncludeEdge, JoinGraph};
use crate::schema::SchemaCatalog;
use crate::translate::Translator;
use crate::transpiler::{
    Dialect, Layout, LiteralMode, OrderKey, SelectPlan, SqlQuery, build_select,
};

/// Builds one SELECT statement against a borrowed catalog.
#[derive(Debug, Clone)]
pub struct QueryBuilder<'c, C: SchemaCatalog + ?Sized> {
    catalog: &'c C,
    graph: JoinGraph,
    filters: Vec<Predicate>,
    group_by: Vec<ColumnRef>,
    order_by: Vec<OrderKey>,
    skip: Option<i64>,
    take: Option<i64>,
    settings: Settings,
}

impl<'c, C: SchemaCatalog + ?Sized> QueryBuilder<'c, C> {
    /// Start a query rooted at `root`.
    pub fn new(catalog: &'c C, root: &str) -> SqbResult<Self> {
        if root.trim().is_empty() {
            return Err(QueryError::MissingRootEntity);
        }
        let entity = catalog.describe(root)?;
        tracing::debug!("New query rooted at {} ({})", entity.name, entity.table);

        Ok(Self {
            catalog,
            graph: JoinGraph::new(entity.name.clone()),
            filters: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            skip: None,
            take: None,
            settings: Settings::default(),
        })
    }

    /// Start a query seeded with one filter.
    pub fn with_filter(catalog: &'c C, root: &str, filter: impl Into<Expr>) -> SqbResult<Self> {
        Self::new(catalog, root)?.filter(filter)
    }

    /// Add a filter; filters are AND-combined.
    pub fn filter(mut self, filter: impl Into<Expr>) -> SqbResult<Self> {
        let predicate = self.translator().translate(&filter.into())?;
        self.filters.extend(predicate);
        Ok(self)
    }

    /// Join the target of a foreign key on the root entity.
    pub fn include(self, source: impl Into<FieldRef>) -> SqbResult<Self> {
        self.push_edge(IncludeEdge::include(source))
    }

    /// Join the target of a foreign key on an already-included entity.
    pub fn then_include(self, source: impl Into<FieldRef>) -> SqbResult<Self> {
        self.push_edge(IncludeEdge::then_include(source))
    }

    fn push_edge(mut self, edge: IncludeEdge) -> SqbResult<Self> {
        self.graph.push(self.catalog, edge)?;
        Ok(self)
    }

    pub fn order_by_asc(self, field: impl Into<FieldRef>) -> SqbResult<Self> {
        self.order_by(field, SortDirection::Asc)
    }

    pub fn order_by_desc(self, field: impl Into<FieldRef>) -> SqbResult<Self> {
        self.order_by(field, SortDirection::Desc)
    }

    pub fn order_by(
        mut self,
        field: impl Into<FieldRef>,
        direction: SortDirection,
    ) -> SqbResult<Self> {
        let column = self.translator().column(&field.into())?;
        self.order_by.push(OrderKey { column, direction });
        Ok(self)
    }

    /// One ORDER BY key per field, in the given order.
    pub fn order_by_all<I, F>(self, fields: I, direction: SortDirection) -> SqbResult<Self>
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldRef>,
    {
        fields
            .into_iter()
            .try_fold(self, |q, field| q.order_by(field, direction))
    }

    pub fn group_by(mut self, field: impl Into<FieldRef>) -> SqbResult<Self> {
        let column = self.translator().column(&field.into())?;
        self.group_by.push(column);
        Ok(self)
    }

    /// One GROUP BY key per field, in the given order.
    pub fn group_by_all<I, F>(self, fields: I) -> SqbResult<Self>
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldRef>,
    {
        fields.into_iter().try_fold(self, |q, field| q.group_by(field))
    }

    /// Rows to skip. Requires an ORDER BY key at build time.
    pub fn skip(mut self, count: i64) -> Self {
        self.skip = Some(count);
        self
    }

    /// Rows to return. Requires an ORDER BY key at build time.
    pub fn take(mut self, count: i64) -> Self {
        self.take = Some(count);
        self
    }

    /// Zero-based page of `size` rows.
    pub fn page(self, index: i64, size: i64) -> Self {
        self.skip(size.saturating_mul(index)).take(size)
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.settings.dialect = dialect;
        self
    }

    pub fn literal_mode(mut self, mode: LiteralMode) -> Self {
        self.settings.literal_mode = mode;
        self
    }

    pub fn layout(mut self, layout: Layout) -> Self {
        self.settings.layout = layout;
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn graph(&self) -> &JoinGraph {
        &self.graph
    }

    pub fn filters(&self) -> &[Predicate] {
        &self.filters
    }

    pub fn order_keys(&self) -> &[OrderKey] {
        &self.order_by
    }

    pub fn group_keys(&self) -> &[ColumnRef] {
        &self.group_by
    }

    /// Render the statement. Does not modify the builder.
    pub fn build(&self) -> SqbResult<SqlQuery> {
        let plan = SelectPlan {
            graph: &self.graph,
            filters: &self.filters,
            group_by: &self.group_by,
            order_by: &self.order_by,
            skip: self.skip,
            take: self.take,
        };
        tracing::debug!(
            "Building {} query: {} join(s), {} filter(s), {} order key(s)",
            self.graph.root(),
            self.graph.joins().len(),
            self.filters.len(),
            self.order_by.len()
        );
        build_select(
            self.catalog,
            &plan,
            self.settings.dialect,
            self.settings.literal_mode,
            self.settings.layout,
        )
    }

    /// Render the statement text only.
    pub fn build_query(&self) -> SqbResult<String> {
        self.build().map(|q| q.sql)
    }

    fn translator(&self) -> Translator<'_, C> {
        Translator::new(self.catalog, &self.graph)
    }
}
