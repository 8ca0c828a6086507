//! MySQL-specific statement utilities for mysqlext.
//!
//! Two independent pieces live here:
//!
//! - [`rewrite`]: applies SELECT modifiers, comment labels and index hints
//!   requested through `/*QueryRewrite':...*/` marker comments, so a query
//!   builder that only speaks portable SQL can still ask for them
//! - [`handler`]: scans a table through `HANDLER ... OPEN/READ/CLOSE`,
//!   reading in index order in fixed-size chunks
//!
//! Both work on any [`mysqlext_core::Connection`].
//!
//! # Example
//!
//! ```rust,ignore
//! use mysqlext_mysql::rewrite::{QueryHints, RewritingConnection};
//!
//! let conn = RewritingConnection::new(conn);
//! let sql = QueryHints::new()
//!     .straight_join()
//!     .use_index("author", &["name_idx"], None)
//!     .embed("SELECT * FROM `author` INNER JOIN `book` ON ...");
//!
//! let rows = conn.query(&sql, &[])?;
//! ```

#![allow(clippy::result_large_err)] // Error type is defined in mysqlext-core

pub mod handler;
pub mod rewrite;

pub use handler::{
    HandlerConfig, HandlerIter, HandlerSession, HandlerState, IndexLookup, IndexOp, IterOptions,
    ReadMode, ReadRequest, WhereClause, WhereSource,
};
pub use rewrite::{QueryHints, RewriteConfig, RewritingConnection, rewrite_query};
