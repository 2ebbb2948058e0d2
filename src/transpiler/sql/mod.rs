pub mod postgres;
pub mod sqlserver;
