//! Transpiler traits and utilities.

use chrono::SubsecRound;

use crate::ast::Value;
use crate::schema::FieldType;

/// Quote a string literal with single quotes, doubling embedded quotes.
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Trait for dialect-specific SQL generation.
pub trait SqlGenerator {
    /// Quote an identifier (table, column or alias).
    fn quote_identifier(&self, name: &str) -> String;
    /// Parameter placeholder for the zero-based parameter `index`.
    fn placeholder(&self, index: usize) -> String;
    /// Boolean literal (1/0 vs TRUE/FALSE).
    fn bool_literal(&self, val: bool) -> String;
    /// Paging clause; `None` when neither skip nor take is set.
    fn paging(&self, skip: Option<i64>, take: Option<i64>) -> Option<String>;
    /// Column type for a logical field type.
    fn sql_type(&self, ty: FieldType) -> &'static str;

    fn quote_string(&self, s: &str) -> String {
        quote_string_single(s)
    }

    /// Inline SQL text of a literal value.
    fn format_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => self.bool_literal(*b),
            Value::Int(n) => n.to_string(),
            // f64 Display never uses exponents or grouping separators.
            Value::Float(n) => n.to_string(),
            Value::Text(s) => self.quote_string(s),
            // datetime2 and timestamp both stop at microseconds.
            Value::DateTime(dt) => self.quote_string(
                &dt.trunc_subsecs(6)
                    .format("%Y-%m-%d %H:%M:%S%.f")
                    .to_string(),
            ),
            Value::Date(_) | Value::Uuid(_) => self.quote_string(&value.to_string()),
        }
    }
}
