//! SELECT statement assembly.

use serde::{Deserialize, Serialize};

use crate::ast::{ColumnRef, LogicalOp, Predicate, SortDirection, TableAlias, Value};
use crate::error::{QueryError, SqbResult};
use crate::joins::JoinGraph;
use crate::schema::SchemaCatalog;
use crate::transpiler::conditions::{LiteralWriter, column_sql, render_predicate};
use crate::transpiler::dialect::Dialect;
use crate::transpiler::traits::SqlGenerator;

/// How literal values reach the SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LiteralMode {
    /// Formatted into the statement, quotes doubled.
    #[default]
    Inline,
    /// Replaced by placeholders; values returned in [`SqlQuery::params`].
    Parameterized,
}

/// Whitespace between clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// One clause per line, columns indented under `SELECT`.
    #[default]
    Multiline,
    /// Everything on one line.
    Compact,
}

impl Layout {
    fn separator(self) -> &'static str {
        match self {
            Layout::Multiline => "\n",
            Layout::Compact => " ",
        }
    }
}

/// One selected column: the entity field it came from and its result alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultColumn {
    pub entity: String,
    pub field: String,
    pub alias: String,
}

/// Result columns in SELECT order.
///
/// Field names repeat when two tables share them; [`ResultColumnMap::get`]
/// disambiguates by entity, [`ResultColumnMap::by_field`] returns the first
/// match only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultColumnMap {
    columns: Vec<ResultColumn>,
}

impl ResultColumnMap {
    pub fn push(&mut self, column: ResultColumn) {
        self.columns.push(column);
    }

    /// Alias of the first column selected for `entity.field`.
    pub fn get(&self, entity: &str, field: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.entity == entity && c.field == field)
            .map(|c| c.alias.as_str())
    }

    /// Alias of the first column named `field`, whatever its table.
    pub fn by_field(&self, field: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.field == field)
            .map(|c| c.alias.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResultColumn> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Generated statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlQuery {
    pub sql: String,
    pub columns: ResultColumnMap,
    /// Bound values in placeholder order; empty in [`LiteralMode::Inline`].
    pub params: Vec<Value>,
}

/// A resolved ORDER BY key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub column: ColumnRef,
    pub direction: SortDirection,
}

/// Everything the emitters need, already resolved against the join graph.
#[derive(Debug, Clone, Copy)]
pub struct SelectPlan<'a> {
    pub graph: &'a JoinGraph,
    pub filters: &'a [Predicate],
    pub group_by: &'a [ColumnRef],
    pub order_by: &'a [OrderKey],
    pub skip: Option<i64>,
    pub take: Option<i64>,
}

/// Assemble the statement.
pub fn build_select<C>(
    catalog: &C,
    plan: &SelectPlan<'_>,
    dialect: Dialect,
    mode: LiteralMode,
    layout: Layout,
) -> SqbResult<SqlQuery>
where
    C: SchemaCatalog + ?Sized,
{
    if (plan.skip.is_some() || plan.take.is_some()) && plan.order_by.is_empty() {
        return Err(QueryError::OrderByRequiredForPaging);
    }

    let generator = dialect.generator();
    let generator = generator.as_ref();
    let mut writer = LiteralWriter::new(generator, mode);
    let mut clauses = Vec::new();

    let (select_list, columns) = select_columns(catalog, plan.graph, generator)?;
    clauses.push(match layout {
        Layout::Multiline => format!("SELECT\n    {}", select_list),
        Layout::Compact => format!("SELECT {}", select_list),
    });

    clauses.push(format!(
        "FROM {} AS {}",
        generator.quote_identifier(catalog.table_name(plan.graph.root())?),
        generator.quote_identifier(&TableAlias::ROOT.to_string())
    ));

    for join in plan.graph.joins() {
        clauses.push(format!(
            "LEFT JOIN {} AS {} ON {}.{} = {}.{}",
            generator.quote_identifier(&join.table),
            generator.quote_identifier(&join.alias.to_string()),
            generator.quote_identifier(&join.source_alias.to_string()),
            generator.quote_identifier(&join.fk_column),
            generator.quote_identifier(&join.alias.to_string()),
            generator.quote_identifier(&join.target_pk_column),
        ));
    }

    if let Some(condition) = where_clause(plan.filters, &mut writer) {
        clauses.push(format!("WHERE {}", condition));
    }

    if !plan.group_by.is_empty() {
        let keys: Vec<String> = plan
            .group_by
            .iter()
            .map(|c| column_sql(generator, c))
            .collect();
        clauses.push(format!("GROUP BY {}", keys.join(", ")));
    }

    if !plan.order_by.is_empty() {
        let keys: Vec<String> = plan
            .order_by
            .iter()
            .map(|k| format!("{} {}", column_sql(generator, &k.column), k.direction))
            .collect();
        clauses.push(format!("ORDER BY {}", keys.join(", ")));
    }

    if let Some(paging) = generator.paging(plan.skip, plan.take) {
        clauses.push(paging);
    }

    let sql = format!("{};", clauses.join(layout.separator()));
    tracing::trace!("Generated SQL:\n{}", sql);

    Ok(SqlQuery {
        sql,
        columns,
        params: writer.into_params(),
    })
}

fn select_columns<C>(
    catalog: &C,
    graph: &JoinGraph,
    generator: &dyn SqlGenerator,
) -> SqbResult<(String, ResultColumnMap)>
where
    C: SchemaCatalog + ?Sized,
{
    let mut parts = Vec::new();
    let mut columns = ResultColumnMap::default();

    for (entity, alias) in graph.tables() {
        for field in catalog.scalar_columns(entity)? {
            let result_alias = format!("{}_{}", alias, field.name);
            parts.push(format!(
                "{}.{} AS {}",
                generator.quote_identifier(&alias.to_string()),
                generator.quote_identifier(&field.column),
                generator.quote_identifier(&result_alias)
            ));
            columns.push(ResultColumn {
                entity: entity.to_string(),
                field: field.name.clone(),
                alias: result_alias,
            });
        }
    }

    Ok((parts.join(", "), columns))
}

fn where_clause(filters: &[Predicate], writer: &mut LiteralWriter<'_>) -> Option<String> {
    let sql = match filters {
        [] => return None,
        [single] => render_predicate(single, writer),
        many => render_predicate(
            &Predicate::Group {
                op: LogicalOp::And,
                children: many.to_vec(),
            },
            writer,
        ),
    };
    if sql.is_empty() { None } else { Some(sql) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::CompareOp;
    use crate::test_utils::catalog;
    use pretty_assertions::assert_eq;

    fn empty_plan<'a>(graph: &'a JoinGraph) -> SelectPlan<'a> {
        SelectPlan {
            graph,
            filters: &[],
            group_by: &[],
            order_by: &[],
            skip: None,
            take: None,
        }
    }

    #[test]
    fn test_bare_select() {
        let catalog = catalog();
        let graph = JoinGraph::new("Category");
        let query = build_select(
            &catalog,
            &empty_plan(&graph),
            Dialect::SqlServer,
            LiteralMode::Inline,
            Layout::Multiline,
        )
        .unwrap();

        assert_eq!(query.columns.len(), 10);
        assert!(query.sql.starts_with("SELECT\n    [e0].[Id] AS [e0_Id], "));
        assert!(query.sql.ends_with("\nFROM [Categories] AS [e0];"));
        assert!(!query.sql.contains("WHERE"));
        assert_eq!(query.columns.by_field("Name"), Some("e0_Name"));
    }

    #[test]
    fn test_paging_requires_order() {
        let catalog = catalog();
        let graph = JoinGraph::new("Product");
        for (skip, take) in [(Some(0), None), (None, Some(-1)), (Some(5), Some(5))] {
            let plan = SelectPlan {
                skip,
                take,
                ..empty_plan(&graph)
            };
            let err = build_select(
                &catalog,
                &plan,
                Dialect::SqlServer,
                LiteralMode::Inline,
                Layout::Multiline,
            )
            .unwrap_err();
            assert!(matches!(err, QueryError::OrderByRequiredForPaging));
        }
    }

    #[test]
    fn test_compact_postgres_layout() {
        let catalog = catalog();
        let graph = JoinGraph::new("Product");
        let order = [OrderKey {
            column: ColumnRef {
                alias: TableAlias::ROOT,
                column: "Name".into(),
            },
            direction: SortDirection::Desc,
        }];
        let filters = [Predicate::comparison(
            ColumnRef {
                alias: TableAlias::ROOT,
                column: "Price".into(),
            },
            CompareOp::Lt,
            2000,
        )];
        let plan = SelectPlan {
            filters: &filters,
            order_by: &order,
            take: Some(5),
            ..empty_plan(&graph)
        };
        let query = build_select(
            &catalog,
            &plan,
            Dialect::Postgres,
            LiteralMode::Parameterized,
            Layout::Compact,
        )
        .unwrap();

        assert!(query.sql.contains(
            r#" FROM "Products" AS "e0" WHERE "e0"."Price" < $1 ORDER BY "e0"."Name" DESC LIMIT 5 OFFSET 0;"#
        ));
        assert_eq!(query.params, vec![Value::Int(2000)]);
    }
}
