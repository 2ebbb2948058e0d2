use crate::schema::FieldType;
use crate::transpiler::traits::SqlGenerator;

pub struct PostgresGenerator;

impl SqlGenerator for PostgresGenerator {
    fn quote_identifier(&self, id: &str) -> String {
        format!("\"{}\"", id.replace('"', "\"\""))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index + 1)
    }

    fn bool_literal(&self, val: bool) -> String {
        if val { "TRUE".to_string() } else { "FALSE".to_string() }
    }

    fn paging(&self, skip: Option<i64>, take: Option<i64>) -> Option<String> {
        match (skip, take) {
            (None, None) => None,
            (Some(off), None) => Some(format!("OFFSET {}", off)),
            (off, Some(lim)) => Some(format!("LIMIT {} OFFSET {}", lim, off.unwrap_or(0))),
        }
    }

    fn sql_type(&self, ty: FieldType) -> &'static str {
        match ty {
            FieldType::Int => "INTEGER",
            FieldType::BigInt => "BIGINT",
            FieldType::SmallInt | FieldType::TinyInt => "SMALLINT",
            FieldType::Text => "TEXT",
            FieldType::DateTime => "TIMESTAMP",
            FieldType::Date => "DATE",
            FieldType::Bool => "BOOLEAN",
            FieldType::Decimal => "NUMERIC(18, 2)",
            FieldType::Float => "REAL",
            FieldType::Double => "DOUBLE PRECISION",
            FieldType::Uuid => "UUID",
        }
    }
}
