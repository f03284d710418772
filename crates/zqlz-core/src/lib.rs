//! ZQLZ Core - shared abstractions for calling stored procedures
//!
//! This crate provides the types and traits the procedure adapter and the
//! database drivers agree on:
//!
//! - `DataSource` / `Connection` - Traits for executing procedure calls
//! - `CallSignature` - Driver-facing description of a compiled call
//! - `TypeCatalog` - Lookup of SQL type names to numeric codes
//! - Common types like `Value` and `Row`

mod call;
mod connection;
mod error;
mod type_catalog;
mod types;

pub use call::*;
pub use connection::*;
pub use error::*;
pub use type_catalog::*;
pub use types::*;
