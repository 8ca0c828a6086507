//! Database connection trait.
//!
//! mysqlext doesn't speak the wire protocol itself. A driver (or a test
//! double) implements [`Connection`] and the rewriter and HANDLER scanner
//! issue their statements through it.
//!
//! Calls are synchronous: each method is one round trip to the server and
//! blocks until the server answers.

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// A database connection capable of executing statements.
///
/// Parameters are positional and bound to `?` placeholders in order.
/// Methods take `&self` so several HANDLER sessions can share one
/// connection; implementations use interior mutability for their socket
/// state.
///
/// # Example
///
/// ```rust,ignore
/// let rows = conn.query("SELECT * FROM users WHERE id = ?", &[Value::BigInt(1)])?;
/// conn.execute("HANDLER `users` OPEN AS `users_42`", &[])?;
/// ```
pub trait Connection {
    /// Execute a query and return all rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Execute a statement that returns no rows and report rows affected.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;
}

impl<C: Connection + ?Sized> Connection for &C {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        (**self).query(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        (**self).execute(sql, params)
    }
}
