//! WHERE clauses for HANDLER reads.

use std::sync::OnceLock;

use mysqlext_core::{Error, HandlerError, QueryDescriptor, Result, Value};
use regex::Regex;

fn where_keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bWHERE\s").expect("where pattern is valid"))
}

fn leading_where_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*WHERE\b").expect("where pattern is valid"))
}

/// A filter appended to `HANDLER ... READ`, with its positional parameters.
///
/// The text always starts with `WHERE` unless the clause is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    sql: String,
    params: Vec<Value>,
}

impl WhereClause {
    /// Build a clause from raw text. A missing `WHERE` keyword is added.
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        let sql = sql.into();
        let trimmed = sql.trim();
        let sql = if trimmed.is_empty() || leading_where_re().is_match(trimmed) {
            trimmed.to_string()
        } else {
            format!("WHERE {trimmed}")
        };
        Self { sql, params }
    }

    /// No filtering.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Extract the filter of a compiled query.
    ///
    /// Everything from the first `WHERE` on is kept, with references
    /// qualified by the query's table reduced to bare column names since
    /// HANDLER only resolves columns of the open table. The replacement is
    /// textual and will also touch matching text inside string literals.
    ///
    /// Fails with [`HandlerErrorKind::UnsupportedQuery`] when the query
    /// can't be expressed as a HANDLER read.
    ///
    /// [`HandlerErrorKind::UnsupportedQuery`]: mysqlext_core::HandlerErrorKind::UnsupportedQuery
    pub fn from_query(query: &QueryDescriptor) -> Result<Self> {
        check_simple(query)?;

        let Some(sql) = query.sql() else {
            return Ok(Self::empty());
        };
        let Some(found) = where_keyword_re().find(sql) else {
            return Ok(Self::empty());
        };

        let clause = unqualify_columns(&sql[found.start()..], query.table());
        Ok(Self {
            sql: clause.trim_end().to_string(),
            params: query.params().to_vec(),
        })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Reject queries with anything HANDLER can't express.
pub(crate) fn check_simple(query: &QueryDescriptor) -> Result<()> {
    let mut reasons = Vec::new();
    if query.has_ordering() {
        reasons.push("it is ordered");
    }
    if query.has_slice() {
        reasons.push("it is sliced with a limit or offset");
    }
    if query.source_table_count() != 1 {
        reasons.push("it does not read from exactly one table");
    }
    if query.has_projection() {
        reasons.push("it selects specific columns");
    }
    if query.has_grouping() {
        reasons.push("it is grouped");
    }
    if query.is_distinct() {
        reasons.push("it is DISTINCT");
    }

    if reasons.is_empty() {
        return Ok(());
    }
    Err(Error::Handler(HandlerError::unsupported(format!(
        "The query on `{}` is too complex to be used with HANDLER: {}",
        query.table(),
        reasons.join(", ")
    ))))
}

fn unqualify_columns(clause: &str, table: &str) -> String {
    let pattern = format!(
        r"(?:`{quoted}`|\b{bare}\b)\.(`(?:[^`]|``)+`|\w+)",
        quoted = regex::escape(&table.replace('`', "``")),
        bare = regex::escape(table),
    );
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(clause, "${1}").into_owned(),
        Err(e) => {
            tracing::warn!(table = table, error = %e, "Could not build column qualifier pattern");
            clause.to_string()
        }
    }
}
