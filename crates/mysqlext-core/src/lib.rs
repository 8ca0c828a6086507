//! Core types and traits for mysqlext.
//!
//! This crate provides the foundational abstractions shared by the MySQL
//! utilities:
//!
//! - `Connection` trait for issuing statements over a synchronous connection
//! - `QueryDescriptor` for queries compiled by an external query layer
//! - `Row` and `Value` for parameters and result rows
//! - `Error` taxonomy shared across crates

pub mod connection;
pub mod error;
pub mod identifiers;
pub mod query;
pub mod row;
pub mod value;

pub use connection::Connection;
pub use error::{
    ConfigError, Error, HandlerError, HandlerErrorKind, QueryError, QueryErrorKind, Result,
    TypeError, ValidationError,
};
pub use identifiers::{MAX_IDENTIFIER_LEN, quote_ident_mysql, unquote_ident_mysql};
pub use query::QueryDescriptor;
pub use row::{ColumnInfo, FromValue, Row};
pub use value::Value;
