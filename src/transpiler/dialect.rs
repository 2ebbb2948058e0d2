use serde::{Deserialize, Serialize};

use crate::transpiler::sql::postgres::PostgresGenerator;
use crate::transpiler::sql::sqlserver::SqlServerGenerator;
use crate::transpiler::traits::SqlGenerator;

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// SQL Server: `[ident]`, `1/0`, OFFSET/FETCH paging.
    #[default]
    #[value(name = "sqlserver")]
    SqlServer,
    /// PostgreSQL: `"ident"`, `TRUE/FALSE`, LIMIT/OFFSET paging.
    Postgres,
}

impl Dialect {
    pub fn generator(&self) -> Box<dyn SqlGenerator> {
        match self {
            Dialect::SqlServer => Box::new(SqlServerGenerator),
            Dialect::Postgres => Box::new(PostgresGenerator),
        }
    }
}
