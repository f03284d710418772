//! PostgreSQL driver for the ZQLZ procedure adapter
//!
//! Executes compiled call signatures with tokio-postgres: procedures through
//! `CALL`, functions through `SELECT * FROM`, with refcursor outputs fetched
//! inside the call's transaction.

mod call;
mod connection;
mod data_source;
mod type_catalog;
mod value;

pub use connection::PostgresConnection;
pub use data_source::PostgresDataSource;
pub use type_catalog::{POSTGRES_TYPE_CATALOG, PostgresTypeCatalog};
