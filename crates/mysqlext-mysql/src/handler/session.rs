//! HANDLER session lifecycle.

use mysqlext_core::{
    Connection, Error, HandlerError, QueryDescriptor, Result, Row, quote_ident_mysql,
};
use rand::Rng;

use super::config::HandlerConfig;
use super::iter::{HandlerIter, IterOptions};
use super::read::ReadRequest;
use super::where_clause::WhereClause;

/// Upper bound of the random handle name suffix.
const MAX_HANDLE_SUFFIX: u64 = 20_000_000_000;

/// Lifecycle of a [`HandlerSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    /// Created, no server handle yet
    Unopened,
    /// `HANDLER ... OPEN` succeeded
    Open,
    /// Closed; terminal
    Closed,
}

/// A named server-side HANDLER over one table.
///
/// The session owns one handle on one connection. `open` and `close` map to
/// `HANDLER ... OPEN AS` and `HANDLER ... CLOSE`; a closed session can't be
/// opened again. Use [`scope`](Self::scope) to guarantee the handle is
/// released, or rely on `Drop`, which closes a handle left open (for
/// example when a panic unwinds through the caller).
///
/// Several sessions may be open on the same table and connection at once;
/// each gets its own handle name and cursor.
///
/// # Example
///
/// ```ignore
/// let query = QueryDescriptor::new("authors")
///     .compiled("SELECT * FROM `authors` WHERE `authors`.`age` > ?", vec![Value::Int(30)]);
///
/// let mut session = HandlerSession::new(&conn, &query)?;
/// let names = session.scope(|handler| {
///     handler
///         .iter(IterOptions::new().chunk_size(500))?
///         .map(|row| row?.get_named::<String>("name"))
///         .collect::<Result<Vec<_>>>()
/// })?;
/// ```
#[derive(Debug)]
pub struct HandlerSession<C: Connection> {
    conn: C,
    table: String,
    handle: String,
    filter: WhereClause,
    config: HandlerConfig,
    state: HandlerState,
}

impl<C: Connection> HandlerSession<C> {
    /// Prepare a session for `query` with the default configuration.
    ///
    /// Nothing is sent to the server until [`open`](Self::open).
    pub fn new(conn: C, query: &QueryDescriptor) -> Result<Self> {
        Self::with_config(conn, query, HandlerConfig::default())
    }

    /// Prepare a session with explicit configuration.
    ///
    /// Fails without touching the connection when the query is ordered,
    /// sliced, joined or otherwise too complex for HANDLER.
    pub fn with_config(conn: C, query: &QueryDescriptor, config: HandlerConfig) -> Result<Self> {
        config.validate()?;
        let filter = WhereClause::from_query(query)?;
        let handle = handle_name(query.table(), config.name_tail);
        tracing::trace!(table = query.table(), handle = %handle, "Prepared handler session");
        Ok(Self {
            conn,
            table: query.table().to_string(),
            handle,
            filter,
            config,
            state: HandlerState::Unopened,
        })
    }

    /// Prepare, open, run `body`, and close a session in one call.
    pub fn run<T>(
        conn: C,
        query: &QueryDescriptor,
        body: impl FnOnce(&Self) -> Result<T>,
    ) -> Result<T> {
        Self::new(conn, query)?.scope(body)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Generated name of the server-side handle.
    pub fn handle_name(&self) -> &str {
        &self.handle
    }

    /// Filter captured from the query the session was built for.
    pub fn filter(&self) -> &WhereClause {
        &self.filter
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn state(&self) -> HandlerState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == HandlerState::Open
    }

    /// Issue `HANDLER <table> OPEN AS <handle>`.
    #[tracing::instrument(level = "debug", skip(self), fields(table = %self.table, handle = %self.handle))]
    pub fn open(&mut self) -> Result<()> {
        match self.state {
            HandlerState::Unopened => {}
            HandlerState::Open => {
                return Err(Error::Handler(HandlerError::state(
                    "Handler is already open, cannot open twice",
                )));
            }
            HandlerState::Closed => {
                return Err(Error::Handler(HandlerError::state(
                    "Handler has been closed and cannot be reopened",
                )));
            }
        }

        let sql = format!(
            "HANDLER {} OPEN AS {}",
            quote_ident_mysql(&self.table),
            quote_ident_mysql(&self.handle)
        );
        self.conn.execute(&sql, &[])?;
        self.state = HandlerState::Open;
        tracing::debug!("Handler opened");
        Ok(())
    }

    /// Issue `HANDLER <handle> CLOSE`.
    ///
    /// The session is closed afterwards even if the server reports an error.
    #[tracing::instrument(level = "debug", skip(self), fields(handle = %self.handle))]
    pub fn close(&mut self) -> Result<()> {
        if self.state != HandlerState::Open {
            return Err(Error::Handler(HandlerError::state(
                "Handler is not open, cannot close unopened",
            )));
        }

        self.state = HandlerState::Closed;
        let sql = format!("HANDLER {} CLOSE", quote_ident_mysql(&self.handle));
        self.conn.execute(&sql, &[])?;
        tracing::debug!("Handler closed");
        Ok(())
    }

    /// Open the handle, run `body`, and close the handle on every exit.
    ///
    /// An error from `body` wins over a failure to close.
    pub fn scope<T>(&mut self, body: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        self.open()?;
        let outcome = body(self);
        let closed = self.close();
        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close_err)) => Err(close_err),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                tracing::warn!(
                    handle = %self.handle,
                    error = %close_err,
                    "Failed to close handler after error in scope"
                );
                Err(e)
            }
        }
    }

    /// Run one `HANDLER ... READ`.
    pub fn read(&self, request: &ReadRequest) -> Result<Vec<Row>> {
        self.ensure_open()?;
        let (sql, params) =
            request.to_sql(&self.handle, &self.config.default_index, &self.filter)?;
        tracing::trace!(sql = %sql, params = params.len(), "HANDLER read");
        self.conn.query(&sql, &params)
    }

    /// Iterate the whole table in chunks.
    ///
    /// Each call starts a fresh scan from the first (or last) index entry.
    /// The server keeps one cursor per handle, so starting a second
    /// iterator on this session while another is still in use moves the
    /// cursor under the first one; its next chunk then continues from
    /// wherever the second iterator left off. Open a separate session for
    /// independent scans.
    pub fn iter(&self, options: IterOptions) -> Result<HandlerIter<'_, C>> {
        HandlerIter::new(self, options)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        match self.state {
            HandlerState::Open => Ok(()),
            HandlerState::Unopened => Err(Error::Handler(HandlerError::not_open(
                "Handler isn't open yet",
            ))),
            HandlerState::Closed => Err(Error::Handler(HandlerError::not_open(
                "Handler has been closed",
            ))),
        }
    }
}

impl<C: Connection> Drop for HandlerSession<C> {
    fn drop(&mut self) {
        if self.state != HandlerState::Open {
            return;
        }
        if let Err(e) = self.close() {
            tracing::warn!(handle = %self.handle, error = %e, "Failed to close handler on drop");
        }
    }
}

/// `<last name_tail chars of table>_<random>`, always a valid identifier length.
fn handle_name(table: &str, name_tail: usize) -> String {
    let skip = table.chars().count().saturating_sub(name_tail);
    let tail: String = table.chars().skip(skip).collect();
    let suffix = rand::thread_rng().gen_range(1..=MAX_HANDLE_SUFFIX);
    format!("{tail}_{suffix}")
}
