//! Table scans through MySQL's `HANDLER` statements.
//!
//! `HANDLER` gives direct, cursor-style access to a storage engine index:
//! a named handle is opened on a table, rows are read in index order
//! relative to the cursor, and the handle is closed again. Chunked reads
//! with `NEXT`/`PREV` stay cheap on large tables where `LIMIT ... OFFSET`
//! paging gets slower with every page.
//!
//! A [`HandlerSession`] wraps one handle:
//!
//! ```text
//! HANDLER `authors` OPEN AS `authors_1234567`
//! HANDLER `authors_1234567` READ `PRIMARY` FIRST WHERE `age` > ? LIMIT 100
//! HANDLER `authors_1234567` READ `PRIMARY` NEXT WHERE `age` > ? LIMIT 100
//! HANDLER `authors_1234567` CLOSE
//! ```
//!
//! Only plain filtered queries over a single table can be mapped onto a
//! handle. Ordering, slicing, joins, projections, grouping and DISTINCT are
//! rejected before any statement is sent.

mod config;
mod iter;
mod read;
mod session;
mod where_clause;

pub use config::HandlerConfig;
pub use iter::{HandlerIter, IterOptions};
pub use read::{IndexLookup, IndexOp, ReadMode, ReadRequest, WhereSource};
pub use session::{HandlerSession, HandlerState};
pub use where_clause::WhereClause;
