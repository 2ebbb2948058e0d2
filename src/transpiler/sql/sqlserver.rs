use crate::schema::FieldType;
use crate::transpiler::traits::SqlGenerator;

pub struct SqlServerGenerator;

impl SqlGenerator for SqlServerGenerator {
    fn quote_identifier(&self, id: &str) -> String {
        format!("[{}]", id.replace(']', "]]"))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@p{}", index)
    }

    fn bool_literal(&self, val: bool) -> String {
        if val { "1".to_string() } else { "0".to_string() }
    }

    fn paging(&self, skip: Option<i64>, take: Option<i64>) -> Option<String> {
        // OFFSET is mandatory once FETCH is present.
        if skip.is_none() && take.is_none() {
            return None;
        }

        let mut sql = format!("OFFSET {} ROWS", skip.unwrap_or(0));
        if let Some(n) = take {
            sql.push_str(&format!(" FETCH NEXT {} ROWS ONLY", n));
        }
        Some(sql)
    }

    fn sql_type(&self, ty: FieldType) -> &'static str {
        match ty {
            FieldType::Int => "INT",
            FieldType::BigInt => "BIGINT",
            FieldType::SmallInt => "SMALLINT",
            FieldType::TinyInt => "TINYINT",
            FieldType::Text => "NVARCHAR(MAX)",
            FieldType::DateTime => "DATETIME2",
            FieldType::Date => "DATE",
            FieldType::Bool => "BIT",
            FieldType::Decimal => "DECIMAL(18, 2)",
            FieldType::Float | FieldType::Double => "FLOAT",
            FieldType::Uuid => "UNIQUEIDENTIFIER",
        }
    }
}
