mod common;

use common::catalog;
use pretty_assertions::assert_eq;
use sqb::prelude::*;

fn where_clause(root: &str, includes: &[&str], filter: &str) -> String {
    let catalog = catalog();
    let mut query = QueryBuilder::new(&catalog, root).unwrap();
    for include in includes {
        query = query.include(parse_field(root, include).unwrap()).unwrap();
    }
    let sql = query
        .filter(parse_filter(root, filter).unwrap())
        .unwrap()
        .layout(Layout::Compact)
        .build_query()
        .unwrap();
    let start = sql.find(" WHERE ").expect("query has a WHERE clause");
    sql[start + 1..sql.len() - 1].to_string()
}

#[test]
fn test_text_filter_matches_expression_api() {
    let catalog = catalog();
    let from_text = QueryBuilder::with_filter(
        &catalog,
        "Product",
        parse_filter("Product", "IsActive && (Price < 2000 || StockCount >= 10)").unwrap(),
    )
    .unwrap()
    .build_query()
    .unwrap();

    let from_api = QueryBuilder::with_filter(
        &catalog,
        "Product",
        and([
            Expr::from(field("Product", "IsActive")),
            or([
                lt(field("Product", "Price"), 2000),
                gte(field("Product", "StockCount"), 10),
            ]),
        ]),
    )
    .unwrap()
    .build_query()
    .unwrap();

    assert_eq!(from_text, from_api);
}

#[test]
fn test_reversed_and_keyword_operators() {
    assert_eq!(
        where_clause("Product", &[], "5 < StockCount AND NOT IsDeleted"),
        "WHERE ([e0].[StockCount] > 5 AND [e0].[IsDeleted] = 0)"
    );
    assert_eq!(
        where_clause("Product", &[], "Name <> 'Widget' or Name like 'W%'"),
        "WHERE ([e0].[Name] != 'Widget' OR [e0].[Name] LIKE 'W%')"
    );
}

#[test]
fn test_included_entity_methods() {
    assert_eq!(
        where_clause(
            "Product",
            &["CategoryId"],
            "Category.Name.StartsWith('Gar') || Category.Description.contains('it''s')"
        ),
        "WHERE ([e1].[Name] LIKE 'Gar%' OR [e1].[Description] LIKE '%it''s%')"
    );
}

#[test]
fn test_edge_qualified_selector() {
    assert_eq!(
        where_clause(
            "Order",
            &["UserId", "CreatedBy"],
            "User.Username@UserId = 'alice' && User.Username = 'bob'"
        ),
        "WHERE ([e1].[Username] = 'alice' AND [e2].[Username] = 'bob')"
    );
}

#[test]
fn test_today_is_evaluated_at_translation() {
    let clause = where_clause("Order", &[], "CreatedOn >= today()");
    let today = chrono::Local::now().date_naive().to_string();
    assert_eq!(clause, format!("WHERE [e0].[CreatedOn] >= '{}'", today));
}

#[test]
fn test_sort_keys_drive_order_by() {
    let catalog = catalog();
    let mut query = QueryBuilder::new(&catalog, "Product")
        .unwrap()
        .include(field("Product", "CategoryId"))
        .unwrap();
    for key in ["Category.Name", "-Price"] {
        let (field, direction) = parse_sort_key("Product", key).unwrap();
        query = query.order_by(field, direction).unwrap();
    }

    let sql = query.layout(Layout::Compact).build_query().unwrap();
    assert!(sql.ends_with(" ORDER BY [e1].[Name] ASC, [e0].[Price] DESC;"));
}

#[test]
fn test_parse_errors() {
    for bad in ["Price >", "(IsActive", "Price > 5 5", "Name.contains()", "&& IsActive"] {
        let err = parse_filter("Product", bad).unwrap_err();
        assert!(matches!(err, QueryError::Parse { .. }), "{}", bad);
    }
}
