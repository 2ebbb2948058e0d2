//! Filter translation: [`Expr`] to [`Predicate`].
//!
//! Field selectors are resolved against the join graph as it stands when the
//! filter is added, so a filter on an included entity must come after the
//! include that introduces it.

use std::str::FromStr;

use chrono::SubsecRound;

use crate::ast::{ColumnRef, CompareOp, Expr, FieldRef, LogicalOp, Predicate, Value};
use crate::error::{QueryError, SqbResult};
use crate::joins::JoinGraph;
use crate::schema::{FieldType, SchemaCatalog};

/// String methods that translate to LIKE patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringMethod {
    Contains,
    StartsWith,
    EndsWith,
}

impl StringMethod {
    pub fn pattern(self, text: &str) -> String {
        match self {
            StringMethod::Contains => format!("%{}%", text),
            StringMethod::StartsWith => format!("{}%", text),
            StringMethod::EndsWith => format!("%{}", text),
        }
    }
}

impl FromStr for StringMethod {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contains" | "Contains" => Ok(StringMethod::Contains),
            "starts_with" | "startsWith" | "StartsWith" => Ok(StringMethod::StartsWith),
            "ends_with" | "endsWith" | "EndsWith" => Ok(StringMethod::EndsWith),
            other => Err(QueryError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Resolves filter expressions and selectors against a catalog and join graph.
pub struct Translator<'a, C: SchemaCatalog + ?Sized> {
    catalog: &'a C,
    graph: &'a JoinGraph,
}

impl<'a, C: SchemaCatalog + ?Sized> Translator<'a, C> {
    pub fn new(catalog: &'a C, graph: &'a JoinGraph) -> Self {
        Self { catalog, graph }
    }

    /// Translate one filter.
    ///
    /// Returns `None` when the expression is always true and contributes
    /// nothing to the WHERE clause.
    pub fn translate(&self, expr: &Expr) -> SqbResult<Option<Predicate>> {
        let predicate = match expr {
            Expr::Literal(_) | Expr::Computed(_) => {
                let value = self.constant(expr)?;
                if value == Value::Bool(true) {
                    None
                } else {
                    return Err(QueryError::UnsupportedTopLevel(expr.describe()));
                }
            }
            _ => self.node(expr)?,
        };

        match &predicate {
            Some(p) => tracing::debug!("Translated filter into {} comparison(s)", p.leaf_count()),
            None => tracing::debug!("Filter is always true, nothing to add"),
        }
        Ok(predicate)
    }

    /// Resolve a selector to its table alias and column.
    pub fn column(&self, field: &FieldRef) -> SqbResult<ColumnRef> {
        self.typed_column(field).map(|(column, _)| column)
    }

    fn typed_column(&self, field: &FieldRef) -> SqbResult<(ColumnRef, FieldType)> {
        let descriptor = self.catalog.column_of(&field.entity, &field.field)?;
        let alias = self.graph.resolve_alias(field)?;
        Ok((
            ColumnRef {
                alias,
                column: descriptor.column.clone(),
            },
            descriptor.field_type,
        ))
    }

    fn node(&self, expr: &Expr) -> SqbResult<Option<Predicate>> {
        match expr {
            Expr::Literal(Value::Bool(true)) => Ok(None),
            Expr::Literal(_) | Expr::Computed(_) => Err(QueryError::UnsupportedExpression(
                format!("{} is not a condition", expr.describe()),
            )),
            Expr::Field(field) => self.boolean_field(field, true).map(Some),
            Expr::Not(inner) => match inner.as_ref() {
                Expr::Field(field) => self.boolean_field(field, false).map(Some),
                other => Err(QueryError::UnsupportedExpression(format!(
                    "cannot negate {}",
                    other.describe()
                ))),
            },
            Expr::Compare { op, left, right } => self.comparison(*op, left, right).map(Some),
            Expr::Logical { op, operands } => self.group(*op, operands),
            Expr::Call {
                method,
                target,
                arg,
            } => self.string_call(method, target, arg).map(Some),
        }
    }

    fn group(&self, op: LogicalOp, operands: &[Expr]) -> SqbResult<Option<Predicate>> {
        if operands.is_empty() && op == LogicalOp::Or {
            return Err(QueryError::UnsupportedExpression(
                "OR group without operands".to_string(),
            ));
        }

        let mut children = Vec::with_capacity(operands.len());
        let mut always_true = false;
        for operand in operands {
            match self.node(operand)? {
                Some(child) => children.push(child),
                // A true operand is dropped from AND and absorbs OR.
                None => always_true |= op == LogicalOp::Or,
            }
        }

        if always_true {
            Ok(None)
        } else {
            Ok(Predicate::group(op, children))
        }
    }

    fn boolean_field(&self, field: &FieldRef, expected: bool) -> SqbResult<Predicate> {
        let (column, field_type) = self.typed_column(field)?;
        if field_type != FieldType::Bool {
            return Err(QueryError::UnsupportedExpression(format!(
                "{} is {}, not a boolean condition",
                field, field_type
            )));
        }
        Ok(Predicate::comparison(column, CompareOp::Eq, expected))
    }

    fn comparison(&self, op: CompareOp, left: &Expr, right: &Expr) -> SqbResult<Predicate> {
        let (field, value_side, op) = match (left, right) {
            (Expr::Field(_), Expr::Field(_)) => {
                return Err(QueryError::UnsupportedExpression(
                    "comparison between two fields".to_string(),
                ));
            }
            (Expr::Field(field), value) => (field, value, op),
            (value, Expr::Field(field)) => (field, value, op.flip()),
            _ => {
                return Err(QueryError::UnsupportedExpression(format!(
                    "comparison '{}' between {} and {} has no database field",
                    op,
                    left.describe(),
                    right.describe()
                )));
            }
        };

        let column = self.column(field)?;
        let value = self.constant(value_side)?;
        Ok(Predicate::comparison(column, op, value))
    }

    fn string_call(&self, method: &str, target: &Expr, arg: &Expr) -> SqbResult<Predicate> {
        let field = match target {
            Expr::Field(field) => field,
            other => {
                return Err(QueryError::UnsupportedExpression(format!(
                    "method call must be on a field, got {}",
                    other.describe()
                )));
            }
        };
        let method = method.parse::<StringMethod>()?;

        let (column, field_type) = self.typed_column(field)?;
        if field_type != FieldType::Text {
            return Err(QueryError::UnsupportedExpression(format!(
                "{} is {}, string methods need a text field",
                field, field_type
            )));
        }

        let text = self.constant(arg)?.raw_text();
        Ok(Predicate::comparison(
            column,
            CompareOp::Like,
            method.pattern(&text),
        ))
    }

    fn constant(&self, expr: &Expr) -> SqbResult<Value> {
        let value = match expr {
            Expr::Literal(value) => value.clone(),
            Expr::Computed(thunk) => thunk.eval(),
            other => {
                return Err(QueryError::UnsupportedExpression(format!(
                    "expected a constant value, got {}",
                    other.describe()
                )));
            }
        };
        match value {
            Value::Float(n) if !n.is_finite() => Err(QueryError::UnsupportedExpression(format!(
                "{} has no SQL literal",
                n
            ))),
            Value::DateTime(dt) => Ok(Value::DateTime(dt.trunc_subsecs(6))),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{self, TableAlias, field};
    use crate::joins::IncludeEdge;
    use crate::test_utils;

    fn col(alias: usize, column: &str) -> ColumnRef {
        ColumnRef {
            alias: TableAlias(alias),
            column: column.to_string(),
        }
    }

    fn translate(root: &str, expr: Expr) -> SqbResult<Option<Predicate>> {
        let catalog = test_utils::catalog();
        let graph = JoinGraph::new(root);
        Translator::new(&catalog, &graph).translate(&expr)
    }

    #[test]
    fn test_simple_comparison() {
        let p = translate("Product", ast::gt(field("Product", "StockCount"), 50))
            .unwrap()
            .unwrap();
        assert_eq!(
            p,
            Predicate::comparison(col(0, "StockCount"), CompareOp::Gt, 50)
        );
    }

    #[test]
    fn test_reversed_operands_flip_operator() {
        let forward = translate("Product", ast::gt(field("Product", "StockCount"), 5)).unwrap();
        let reversed = translate("Product", ast::lt(5, field("Product", "StockCount"))).unwrap();
        assert_eq!(forward, reversed);

        let p = translate("Product", ast::gte(10, field("Product", "Price")))
            .unwrap()
            .unwrap();
        assert_eq!(p, Predicate::comparison(col(0, "Price"), CompareOp::Lte, 10));
    }

    #[test]
    fn test_implicit_boolean_and_not() {
        let p = translate("Product", field("Product", "IsActive").into())
            .unwrap()
            .unwrap();
        assert_eq!(p, Predicate::comparison(col(0, "IsActive"), CompareOp::Eq, true));

        let p = translate("Category", ast::not(field("Category", "IsDeleted")))
            .unwrap()
            .unwrap();
        assert_eq!(p, Predicate::comparison(col(0, "IsDeleted"), CompareOp::Eq, false));
    }

    #[test]
    fn test_non_boolean_field_is_not_a_condition() {
        let err = translate("Product", field("Product", "Name").into()).unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedExpression(_)));
    }

    #[test]
    fn test_string_methods() {
        let cases = [
            (ast::contains(field("Category", "Name"), "Book"), "%Book%"),
            (ast::starts_with(field("Category", "Name"), "Smart"), "Smart%"),
            (ast::ends_with(field("Category", "Description"), "..."), "%..."),
        ];
        for (expr, pattern) in cases {
            match translate("Category", expr).unwrap().unwrap() {
                Predicate::Comparison { op, value, .. } => {
                    assert_eq!(op, CompareOp::Like);
                    assert_eq!(value, Value::Text(pattern.to_string()));
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_unsupported_method_and_target() {
        let err = translate(
            "Category",
            ast::call("to_upper", field("Category", "Name"), "x"),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedMethod(ref m) if m == "to_upper"));

        let err = translate("Category", ast::contains(ast::lit("abc"), "b")).unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedExpression(_)));
    }

    #[test]
    fn test_nesting_is_preserved() {
        let expr = ast::and([
            Expr::from(field("User", "IsActive")),
            ast::or([
                ast::gt(field("User", "Id"), 5),
                ast::eq(field("User", "Username"), "root"),
            ]),
        ]);
        let p = translate("User", expr).unwrap().unwrap();
        match p {
            Predicate::Group { op, children } => {
                assert_eq!(op, LogicalOp::And);
                assert_eq!(children.len(), 2);
                assert!(matches!(
                    children[1],
                    Predicate::Group {
                        op: LogicalOp::Or,
                        ..
                    }
                ));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_constant_true() {
        assert_eq!(translate("User", ast::lit(true)).unwrap(), None);

        let p = translate(
            "User",
            ast::and([ast::lit(true), Expr::from(field("User", "IsActive"))]),
        )
        .unwrap()
        .unwrap();
        match p {
            Predicate::Group { children, .. } => assert_eq!(children.len(), 1),
            other => panic!("unexpected {:?}", other),
        }

        let p = translate(
            "User",
            ast::or([ast::lit(true), Expr::from(field("User", "IsActive"))]),
        )
        .unwrap();
        assert_eq!(p, None);
    }

    #[test]
    fn test_other_top_level_constants_are_rejected() {
        let err = translate("User", ast::lit(5)).unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedTopLevel(_)));
    }

    #[test]
    fn test_computed_values_are_evaluated() {
        let p = translate(
            "User",
            ast::eq(field("User", "Id"), ast::computed(|| Value::Int(41 + 1))),
        )
        .unwrap()
        .unwrap();
        assert_eq!(p, Predicate::comparison(col(0, "Id"), CompareOp::Eq, 42));
    }

    #[test]
    fn test_non_finite_floats_are_rejected() {
        for n in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = translate("Product", ast::gt(field("Product", "Price"), n)).unwrap_err();
            assert!(matches!(err, QueryError::UnsupportedExpression(_)));
        }
        assert!(translate("Product", ast::gt(field("Product", "Price"), 9.5)).is_ok());
    }

    #[test]
    fn test_datetimes_stop_at_microseconds() {
        let at = |nano| {
            chrono::NaiveDate::from_ymd_opt(2026, 10, 18)
                .unwrap()
                .and_hms_nano_opt(9, 34, 13, nano)
                .unwrap()
        };
        let p = translate(
            "User",
            ast::lt(field("User", "CreatedOn"), ast::computed(move || at(257_356_438).into())),
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            p,
            Predicate::comparison(col(0, "CreatedOn"), CompareOp::Lt, at(257_356_000))
        );
    }

    #[test]
    fn test_field_side_must_resolve() {
        let err = translate("User", ast::eq(field("User", "Nope"), 1)).unwrap_err();
        assert!(matches!(err, QueryError::UnresolvedField { .. }));

        // Order is not part of a User query until included.
        let err = translate("User", ast::eq(field("Order", "Id"), 1)).unwrap_err();
        assert!(matches!(err, QueryError::UnresolvedField { .. }));

        let err = translate("User", ast::eq(1, 2)).unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedExpression(_)));
    }

    #[test]
    fn test_included_entity_resolves_to_its_alias() {
        let catalog = test_utils::catalog();
        let mut graph = JoinGraph::new("Order");
        graph
            .push(&catalog, IncludeEdge::include(field("Order", "UserId")))
            .unwrap();
        let p = Translator::new(&catalog, &graph)
            .translate(&ast::eq(field("User", "Username"), "ada"))
            .unwrap()
            .unwrap();
        assert_eq!(p, Predicate::comparison(col(1, "Username"), CompareOp::Eq, "ada"));
    }
}
