//! SELECT modifier tokens and the groups MySQL's grammar orders them in.
//!
//! MySQL accepts the modifiers between `SELECT` and the select list in a
//! fixed order, and at most one token from each group:
//!
//! ```text
//! SELECT [ALL | DISTINCT | DISTINCTROW]
//!        [HIGH_PRIORITY]
//!        [STRAIGHT_JOIN]
//!        [SQL_SMALL_RESULT] [SQL_BIG_RESULT] [SQL_BUFFER_RESULT]
//!        [SQL_CACHE | SQL_NO_CACHE] [SQL_CALC_FOUND_ROWS]
//! ```

use std::fmt;
use std::str::FromStr;

/// A single SELECT modifier that a rewrite directive may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectHint {
    All,
    Distinct,
    DistinctRow,
    HighPriority,
    StraightJoin,
    SqlSmallResult,
    SqlBigResult,
    SqlBufferResult,
    SqlCache,
    SqlNoCache,
    SqlCalcFoundRows,
}

impl SelectHint {
    /// The SQL keyword for this hint.
    pub const fn as_str(self) -> &'static str {
        match self {
            SelectHint::All => "ALL",
            SelectHint::Distinct => "DISTINCT",
            SelectHint::DistinctRow => "DISTINCTROW",
            SelectHint::HighPriority => "HIGH_PRIORITY",
            SelectHint::StraightJoin => "STRAIGHT_JOIN",
            SelectHint::SqlSmallResult => "SQL_SMALL_RESULT",
            SelectHint::SqlBigResult => "SQL_BIG_RESULT",
            SelectHint::SqlBufferResult => "SQL_BUFFER_RESULT",
            SelectHint::SqlCache => "SQL_CACHE",
            SelectHint::SqlNoCache => "SQL_NO_CACHE",
            SelectHint::SqlCalcFoundRows => "SQL_CALC_FOUND_ROWS",
        }
    }

    /// The mutually exclusive group this hint belongs to.
    pub const fn group(self) -> HintGroup {
        match self {
            SelectHint::All | SelectHint::Distinct | SelectHint::DistinctRow => {
                HintGroup::Distinctness
            }
            SelectHint::HighPriority => HintGroup::Priority,
            SelectHint::StraightJoin => HintGroup::JoinOrder,
            SelectHint::SqlSmallResult | SelectHint::SqlBigResult => HintGroup::ResultSize,
            SelectHint::SqlBufferResult => HintGroup::BufferResult,
            SelectHint::SqlCache | SelectHint::SqlNoCache => HintGroup::QueryCache,
            SelectHint::SqlCalcFoundRows => HintGroup::FoundRows,
        }
    }

    /// Look up a hint by its exact (case-sensitive) keyword.
    pub fn from_token(token: &str) -> Option<Self> {
        HintGroup::ALL
            .iter()
            .flat_map(|group| group.hints())
            .copied()
            .find(|hint| hint.as_str() == token)
    }
}

impl fmt::Display for SelectHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s).ok_or_else(|| format!("'{s}' is not a SELECT hint"))
    }
}

/// A group of mutually exclusive SELECT modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HintGroup {
    Distinctness,
    Priority,
    JoinOrder,
    ResultSize,
    BufferResult,
    QueryCache,
    FoundRows,
}

impl HintGroup {
    /// Every group, in the order MySQL requires them after `SELECT`.
    pub const ALL: [HintGroup; 7] = [
        HintGroup::Distinctness,
        HintGroup::Priority,
        HintGroup::JoinOrder,
        HintGroup::ResultSize,
        HintGroup::BufferResult,
        HintGroup::QueryCache,
        HintGroup::FoundRows,
    ];

    /// Group name, also used as the capture name in the head grammar.
    pub const fn name(self) -> &'static str {
        match self {
            HintGroup::Distinctness => "distinctness",
            HintGroup::Priority => "priority",
            HintGroup::JoinOrder => "join_order",
            HintGroup::ResultSize => "result_size",
            HintGroup::BufferResult => "buffer_result",
            HintGroup::QueryCache => "query_cache",
            HintGroup::FoundRows => "found_rows",
        }
    }

    /// The hints in this group.
    pub const fn hints(self) -> &'static [SelectHint] {
        match self {
            HintGroup::Distinctness => &[
                SelectHint::All,
                SelectHint::Distinct,
                SelectHint::DistinctRow,
            ],
            HintGroup::Priority => &[SelectHint::HighPriority],
            HintGroup::JoinOrder => &[SelectHint::StraightJoin],
            HintGroup::ResultSize => &[SelectHint::SqlSmallResult, SelectHint::SqlBigResult],
            HintGroup::BufferResult => &[SelectHint::SqlBufferResult],
            HintGroup::QueryCache => &[SelectHint::SqlCache, SelectHint::SqlNoCache],
            HintGroup::FoundRows => &[SelectHint::SqlCalcFoundRows],
        }
    }

    /// Regex alternation matching any token of this group.
    ///
    /// Longer tokens come first so `DISTINCTROW` is not cut short by `DISTINCT`.
    pub(crate) fn alternation(self) -> String {
        let mut tokens: Vec<&str> = self.hints().iter().map(|h| h.as_str()).collect();
        tokens.sort_by_key(|t| std::cmp::Reverse(t.len()));
        tokens.join("|")
    }
}
