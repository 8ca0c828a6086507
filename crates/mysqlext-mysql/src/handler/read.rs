//! `HANDLER ... READ` requests.

use std::fmt;
use std::str::FromStr;

use mysqlext_core::{Error, HandlerError, QueryDescriptor, Result, Value, quote_ident_mysql};

use super::where_clause::WhereClause;

/// Cursor movement for a read without a key comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    #[default]
    First,
    Last,
    Next,
    Prev,
}

impl ReadMode {
    pub const ALL: [ReadMode; 4] = [
        ReadMode::First,
        ReadMode::Last,
        ReadMode::Next,
        ReadMode::Prev,
    ];

    /// Keyword used in the READ statement.
    pub const fn as_sql(self) -> &'static str {
        match self {
            ReadMode::First => "FIRST",
            ReadMode::Last => "LAST",
            ReadMode::Next => "NEXT",
            ReadMode::Prev => "PREV",
        }
    }

    /// Name accepted by [`FromStr`].
    pub const fn name(self) -> &'static str {
        match self {
            ReadMode::First => "first",
            ReadMode::Last => "last",
            ReadMode::Next => "next",
            ReadMode::Prev => "prev",
        }
    }
}

impl fmt::Display for ReadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReadMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ReadMode::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| {
                let valid: Vec<_> = ReadMode::ALL.iter().map(|m| m.name()).collect();
                Error::Handler(HandlerError::invalid(format!(
                    "'mode' must be one of: {}, got {s:?}",
                    valid.join(", ")
                )))
            })
    }
}

/// Comparison used to position the cursor on an index value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOp {
    Eq,
    Lt,
    Lte,
    Gte,
    Gt,
}

impl IndexOp {
    const ALL: [IndexOp; 5] = [
        IndexOp::Eq,
        IndexOp::Lt,
        IndexOp::Lte,
        IndexOp::Gte,
        IndexOp::Gt,
    ];

    pub const fn as_sql(self) -> &'static str {
        match self {
            IndexOp::Eq => "=",
            IndexOp::Lt => "<",
            IndexOp::Lte => "<=",
            IndexOp::Gte => ">=",
            IndexOp::Gt => ">",
        }
    }

    /// Lookup suffix naming this operator (`value__<suffix>`).
    pub const fn suffix(self) -> &'static str {
        match self {
            IndexOp::Eq => "exact",
            IndexOp::Lt => "lt",
            IndexOp::Lte => "lte",
            IndexOp::Gte => "gte",
            IndexOp::Gt => "gt",
        }
    }
}

/// A positional comparison against the read index.
///
/// Composite indexes take one value per key part, in index order.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexLookup {
    op: IndexOp,
    key: Vec<Value>,
}

impl IndexLookup {
    pub fn new(op: IndexOp, key: Vec<Value>) -> Self {
        Self { op, key }
    }

    pub fn exact(value: impl Into<Value>) -> Self {
        Self::new(IndexOp::Eq, vec![value.into()])
    }

    pub fn lt(value: impl Into<Value>) -> Self {
        Self::new(IndexOp::Lt, vec![value.into()])
    }

    pub fn lte(value: impl Into<Value>) -> Self {
        Self::new(IndexOp::Lte, vec![value.into()])
    }

    pub fn gte(value: impl Into<Value>) -> Self {
        Self::new(IndexOp::Gte, vec![value.into()])
    }

    pub fn gt(value: impl Into<Value>) -> Self {
        Self::new(IndexOp::Gt, vec![value.into()])
    }

    /// Parse a lookup written as `value` or `value__<op>`.
    ///
    /// `value` alone means `value__exact`.
    pub fn parse(lookup: &str, key: Vec<Value>) -> Result<Self> {
        let Some(rest) = lookup.strip_prefix("value") else {
            return Err(Error::Handler(HandlerError::invalid(format!(
                "'{lookup}' is not an index lookup, expected 'value' or 'value__<operator>'"
            ))));
        };
        if rest.is_empty() {
            return Ok(Self::new(IndexOp::Eq, key));
        }
        let Some(suffix) = rest.strip_prefix("__") else {
            return Err(Error::Handler(HandlerError::invalid(format!(
                "'{lookup}' is not an index lookup, expected 'value' or 'value__<operator>'"
            ))));
        };

        IndexOp::ALL
            .into_iter()
            .find(|op| op.suffix() == suffix)
            .map(|op| Self::new(op, key))
            .ok_or_else(|| {
                let valid: Vec<_> = IndexOp::ALL.iter().map(|op| op.suffix()).collect();
                Error::Handler(HandlerError::invalid(format!(
                    "The operator '{suffix}' is not valid for index value matching. \
                     Valid operators are {}",
                    valid.join(", ")
                )))
            })
    }

    pub fn op(&self) -> IndexOp {
        self.op
    }

    pub fn key(&self) -> &[Value] {
        &self.key
    }
}

/// Which filter a read applies.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum WhereSource {
    /// The clause captured when the session was created.
    #[default]
    Session,
    /// An explicit clause.
    Clause(WhereClause),
    /// The filter of another compiled query over the same table.
    Query(QueryDescriptor),
}

impl WhereSource {
    /// Resolve `Query` into a `Clause`, leaving the other variants alone.
    pub(crate) fn resolve(self) -> Result<Self> {
        match self {
            WhereSource::Query(query) => Ok(WhereSource::Clause(WhereClause::from_query(&query)?)),
            other => Ok(other),
        }
    }
}

/// One `HANDLER ... READ` call.
///
/// Without a mode or lookup the read starts at the `FIRST` index entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadRequest {
    pub(crate) index: Option<String>,
    pub(crate) mode: Option<ReadMode>,
    pub(crate) lookups: Vec<IndexLookup>,
    pub(crate) filter: WhereSource,
    pub(crate) limit: Option<u64>,
}

impl ReadRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read through this index instead of the session default.
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn mode(mut self, mode: ReadMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Position the cursor with a key comparison instead of a mode.
    pub fn lookup(mut self, lookup: IndexLookup) -> Self {
        self.lookups.push(lookup);
        self
    }

    /// Replace the session's filter with `clause`.
    pub fn filter(mut self, clause: WhereClause) -> Self {
        self.filter = WhereSource::Clause(clause);
        self
    }

    /// Replace the session's filter with the one extracted from `query`.
    pub fn filter_query(mut self, query: QueryDescriptor) -> Self {
        self.filter = WhereSource::Query(query);
        self
    }

    pub fn filter_source(mut self, source: WhereSource) -> Self {
        self.filter = source;
        self
    }

    pub fn limit(mut self, rows: u64) -> Self {
        self.limit = Some(rows);
        self
    }

    /// Render the statement for `handle`.
    pub(crate) fn to_sql(
        &self,
        handle: &str,
        default_index: &str,
        session_filter: &WhereClause,
    ) -> Result<(String, Vec<Value>)> {
        if self.lookups.len() > 1 {
            return Err(Error::Handler(HandlerError::invalid(
                "You can't pass more than one value expression",
            )));
        }
        let lookup = self.lookups.first();
        if lookup.is_some() && self.mode.is_some() {
            return Err(Error::Handler(HandlerError::invalid(
                "You can't use a read mode and a value expression together",
            )));
        }

        let index = self.index.as_deref().unwrap_or(default_index);
        let mut sql = format!(
            "HANDLER {} READ {} ",
            quote_ident_mysql(handle),
            quote_ident_mysql(index)
        );
        let mut params = Vec::new();

        match lookup {
            Some(lookup) => {
                if lookup.key.is_empty() {
                    return Err(Error::Handler(HandlerError::invalid(
                        "An index value expression needs at least one value",
                    )));
                }
                let placeholders = vec!["?"; lookup.key.len()].join(",");
                sql.push_str(&format!("{} ({placeholders})", lookup.op.as_sql()));
                params.extend(lookup.key.iter().cloned());
            }
            None => sql.push_str(self.mode.unwrap_or_default().as_sql()),
        }

        let resolved;
        let filter = match &self.filter {
            WhereSource::Session => session_filter,
            WhereSource::Clause(clause) => clause,
            WhereSource::Query(query) => {
                resolved = WhereClause::from_query(query)?;
                &resolved
            }
        };
        if !filter.is_empty() {
            sql.push(' ');
            sql.push_str(filter.sql());
            params.extend(filter.params().iter().cloned());
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        Ok((sql, params))
    }
}
