//! Chunked iteration over an open handle.

use std::collections::VecDeque;
use std::iter::FusedIterator;

use mysqlext_core::{Connection, Error, HandlerError, QueryDescriptor, Result, Row};

use super::read::{ReadMode, ReadRequest, WhereSource};
use super::session::HandlerSession;
use super::where_clause::WhereClause;

/// Options for [`HandlerSession::iter`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IterOptions {
    index: Option<String>,
    filter: WhereSource,
    chunk_size: Option<usize>,
    reverse: bool,
}

impl IterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk this index instead of the session default.
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn filter(mut self, clause: WhereClause) -> Self {
        self.filter = WhereSource::Clause(clause);
        self
    }

    pub fn filter_query(mut self, query: QueryDescriptor) -> Self {
        self.filter = WhereSource::Query(query);
        self
    }

    /// Rows per `READ`; defaults to the session's configured chunk size.
    pub fn chunk_size(mut self, rows: usize) -> Self {
        self.chunk_size = Some(rows);
        self
    }

    /// Walk the index from its last entry backwards.
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }
}

/// Lazy scan yielding rows in index order, one `READ` per chunk.
///
/// The first chunk reads `FIRST` (or `LAST` when reversed), later chunks
/// `NEXT` (or `PREV`). A chunk shorter than the chunk size ends the scan.
/// A failed read is yielded once and ends the scan.
#[derive(Debug)]
pub struct HandlerIter<'s, C: Connection> {
    session: &'s HandlerSession<C>,
    request: ReadRequest,
    chunk_size: usize,
    reverse: bool,
    buffer: VecDeque<Row>,
    done: bool,
}

impl<'s, C: Connection> HandlerIter<'s, C> {
    pub(crate) fn new(session: &'s HandlerSession<C>, options: IterOptions) -> Result<Self> {
        session.ensure_open()?;

        let chunk_size = options.chunk_size.unwrap_or(session.config().chunk_size);
        if chunk_size == 0 {
            return Err(Error::Handler(HandlerError::invalid(
                "chunk_size must be at least 1",
            )));
        }

        let first = if options.reverse {
            ReadMode::Last
        } else {
            ReadMode::First
        };
        let mut request = ReadRequest::new()
            .mode(first)
            .filter_source(options.filter.resolve()?)
            .limit(u64::try_from(chunk_size).unwrap_or(u64::MAX));
        if let Some(index) = options.index {
            request = request.index(index);
        }

        Ok(Self {
            session,
            request,
            chunk_size,
            reverse: options.reverse,
            buffer: VecDeque::new(),
            done: false,
        })
    }

    fn fetch_chunk(&mut self) -> Result<()> {
        let rows = self.session.read(&self.request)?;
        tracing::trace!(
            handle = self.session.handle_name(),
            rows = rows.len(),
            "Fetched handler chunk"
        );
        if rows.len() < self.chunk_size {
            self.done = true;
        }
        self.request.mode = Some(if self.reverse {
            ReadMode::Prev
        } else {
            ReadMode::Next
        });
        self.buffer.extend(rows);
        Ok(())
    }
}

impl<C: Connection> Iterator for HandlerIter<'_, C> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                return Some(Ok(row));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.fetch_chunk() {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}

impl<C: Connection> FusedIterator for HandlerIter<'_, C> {}
