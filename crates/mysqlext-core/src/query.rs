//! Query descriptors.
//!
//! A [`QueryDescriptor`] is the compiled form of a caller's query as handed
//! over by a query-building layer: the source table, the SQL that layer
//! would run for it, and the structural facts (ordering, slicing, joins)
//! needed to decide whether the query can be mapped onto lower-level
//! statements such as `HANDLER ... READ`.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Compiled description of a single query.
///
/// The descriptor is read-only input: nothing in mysqlext mutates it.
///
/// # Example
///
/// ```
/// use mysqlext_core::{QueryDescriptor, Value};
///
/// let query = QueryDescriptor::new("authors")
///     .compiled(
///         "SELECT `authors`.`id`, `authors`.`name` FROM `authors` WHERE `authors`.`age` > ?",
///         vec![Value::BigInt(30)],
///     );
///
/// assert_eq!(query.table(), "authors");
/// assert!(!query.has_ordering());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    table: String,
    #[serde(default)]
    sql: Option<String>,
    #[serde(default)]
    params: Vec<Value>,
    #[serde(default)]
    order_by: Vec<String>,
    #[serde(default)]
    limit: Option<u64>,
    #[serde(default)]
    offset: Option<u64>,
    #[serde(default = "one")]
    source_tables: usize,
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    group_by: Vec<String>,
    #[serde(default)]
    distinct: bool,
}

fn one() -> usize {
    1
}

impl QueryDescriptor {
    /// Describe an unfiltered query over `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            sql: None,
            params: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            source_tables: 1,
            columns: Vec::new(),
            group_by: Vec::new(),
            distinct: false,
        }
    }

    /// Attach the compiled SQL and its positional parameters.
    pub fn compiled(mut self, sql: impl Into<String>, params: Vec<Value>) -> Self {
        self.sql = Some(sql.into());
        self.params = params;
        self
    }

    /// Record an explicit ORDER BY term.
    pub fn order_by(mut self, term: impl Into<String>) -> Self {
        self.order_by.push(term.into());
        self
    }

    /// Record a LIMIT applied by the query layer.
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Record an OFFSET applied by the query layer.
    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Record a joined table.
    pub fn join(mut self) -> Self {
        self.source_tables += 1;
        self
    }

    /// Set the number of tables the query reads from.
    pub fn source_tables(mut self, n: usize) -> Self {
        self.source_tables = n;
        self
    }

    /// Record an explicit select list.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols.iter().map(|&c| c.to_string()).collect();
        self
    }

    /// Record GROUP BY columns.
    pub fn group_by(mut self, cols: &[&str]) -> Self {
        self.group_by.extend(cols.iter().map(|&c| c.to_string()));
        self
    }

    /// Mark the query as SELECT DISTINCT.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// The compiled SQL text, if the query layer produced one.
    pub fn sql(&self) -> Option<&str> {
        self.sql.as_deref()
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn has_ordering(&self) -> bool {
        !self.order_by.is_empty()
    }

    /// True when a LIMIT or a non-zero OFFSET has been applied.
    pub fn has_slice(&self) -> bool {
        self.limit.is_some() || self.offset.is_some_and(|o| o > 0)
    }

    pub fn source_table_count(&self) -> usize {
        self.source_tables
    }

    pub fn has_projection(&self) -> bool {
        !self.columns.is_empty()
    }

    pub fn has_grouping(&self) -> bool {
        !self.group_by.is_empty()
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }
}
