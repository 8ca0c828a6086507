//! Building rewrite markers from the query side.

use mysqlext_core::{Result, ValidationError};

use super::directive::{IndexForClause, IndexHint, IndexRule, RewriteDirective, is_valid_label};
use super::hints::SelectHint;

/// Collects rewrite directives for one query and renders them as markers.
///
/// A query layer attaches the rendered markers anywhere in the SQL it
/// generates; [`rewrite_query`](super::rewrite_query) picks them up again
/// before the statement reaches the server.
///
/// # Example
///
/// ```
/// use mysqlext_mysql::rewrite::{IndexForClause, QueryHints};
///
/// let hints = QueryHints::new()
///     .label("author listing")
///     .unwrap()
///     .sql_no_cache()
///     .force_index("author", &["name_idx"], Some(IndexForClause::OrderBy));
///
/// let sql = hints.apply("SELECT `id` FROM `author` ORDER BY `name`");
/// assert_eq!(
///     sql,
///     "SELECT /*author listing*/ SQL_NO_CACHE `id` FROM `author` FORCE INDEX FOR ORDER BY (`name_idx`) ORDER BY `name`"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryHints {
    directives: Vec<RewriteDirective>,
}

impl QueryHints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a comment label. The text must neither open nor close a comment.
    pub fn label(mut self, text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if !is_valid_label(&text) {
            return Err(ValidationError {
                field: "label".to_string(),
                message: format!("{text:?} cannot contain '/*' or '*/'"),
            }
            .into());
        }
        self.directives.push(RewriteDirective::Label(text));
        Ok(self)
    }

    /// Request a SELECT modifier.
    pub fn hint(mut self, hint: SelectHint) -> Self {
        self.directives.push(RewriteDirective::Hint(hint));
        self
    }

    pub fn straight_join(self) -> Self {
        self.hint(SelectHint::StraightJoin)
    }

    pub fn high_priority(self) -> Self {
        self.hint(SelectHint::HighPriority)
    }

    pub fn sql_small_result(self) -> Self {
        self.hint(SelectHint::SqlSmallResult)
    }

    pub fn sql_big_result(self) -> Self {
        self.hint(SelectHint::SqlBigResult)
    }

    pub fn sql_buffer_result(self) -> Self {
        self.hint(SelectHint::SqlBufferResult)
    }

    pub fn sql_cache(self) -> Self {
        self.hint(SelectHint::SqlCache)
    }

    pub fn sql_no_cache(self) -> Self {
        self.hint(SelectHint::SqlNoCache)
    }

    pub fn sql_calc_found_rows(self) -> Self {
        self.hint(SelectHint::SqlCalcFoundRows)
    }

    /// Attach an index hint. An empty `indexes` slice means `NONE`.
    pub fn index_hint(
        mut self,
        rule: IndexRule,
        table: impl Into<String>,
        indexes: &[&str],
        for_clause: Option<IndexForClause>,
    ) -> Self {
        self.directives
            .push(RewriteDirective::IndexHint(IndexHint {
                table: table.into(),
                rule,
                indexes: indexes.iter().map(|&i| i.to_string()).collect(),
                for_clause,
            }));
        self
    }

    pub fn use_index(
        self,
        table: impl Into<String>,
        indexes: &[&str],
        for_clause: Option<IndexForClause>,
    ) -> Self {
        self.index_hint(IndexRule::Use, table, indexes, for_clause)
    }

    pub fn force_index(
        self,
        table: impl Into<String>,
        indexes: &[&str],
        for_clause: Option<IndexForClause>,
    ) -> Self {
        self.index_hint(IndexRule::Force, table, indexes, for_clause)
    }

    pub fn ignore_index(
        self,
        table: impl Into<String>,
        indexes: &[&str],
        for_clause: Option<IndexForClause>,
    ) -> Self {
        self.index_hint(IndexRule::Ignore, table, indexes, for_clause)
    }

    pub fn directives(&self) -> &[RewriteDirective] {
        &self.directives
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// All directives as marker comments separated by spaces.
    pub fn to_markers(&self) -> String {
        self.directives
            .iter()
            .map(RewriteDirective::marker)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Place the markers right after the statement keyword, or at the end
    /// of statements the rewriter doesn't recognise.
    pub fn embed(&self, sql: &str) -> String {
        if self.is_empty() {
            return sql.to_string();
        }
        match super::head_re().captures(sql).and_then(|c| c.name("keyword")) {
            Some(keyword) => format!(
                "{} {}{}",
                &sql[..keyword.end()],
                self.to_markers(),
                &sql[keyword.end()..]
            ),
            None => format!("{sql} {}", self.to_markers()),
        }
    }

    /// Embed the markers and rewrite straight away.
    pub fn apply(&self, sql: &str) -> String {
        super::rewrite_query(&self.embed(sql))
    }
}
