//! Comment-driven query rewriting.
//!
//! A query layer that cannot express MySQL-specific SQL directly embeds
//! marker comments of the form `/*QueryRewrite':<payload>*/` in the
//! statements it generates. [`rewrite_query`] strips those markers and
//! applies what they ask for to the head of the statement:
//!
//! - `label=<text>` injects `/*<text>*/` after the statement keyword
//! - a SELECT modifier token (`SQL_NO_CACHE`, `STRAIGHT_JOIN`, ...) is placed
//!   in its grammar position, replacing any token of the same group
//! - `index=`table` USE|IGNORE|FORCE [FOR ...] names|NONE` attaches an index
//!   hint to the first matching `FROM`/`JOIN` table reference
//!
//! The grammar is matched with regular expressions rather than a SQL parser
//! and only recognises the statement heads a query builder emits. Anything
//! it doesn't understand passes through with the markers removed.

mod builder;
mod connection;
mod directive;
mod hints;

pub use builder::QueryHints;
pub use connection::{RewriteConfig, RewritingConnection};
pub use directive::{
    IndexForClause, IndexHint, IndexRule, MARKER_PREFIX, RewriteDirective, parse_directives,
};
pub use hints::{HintGroup, SelectHint};

use std::sync::OnceLock;

use mysqlext_core::quote_ident_mysql;
use regex::{Captures, Regex};

pub(crate) fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*QueryRewrite':(.*?)\*/").expect("marker pattern is valid"))
}

/// Keyword plus any comments already following it.
pub(crate) fn head_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)^\s*(?P<keyword>SELECT|UPDATE|DELETE)\b(?P<comments>(?:\s*/\*.*?\*/)*)\s*",
        )
        .expect("head pattern is valid")
    })
}

/// The SELECT modifiers, one optional capture per group, in grammar order.
fn select_hints_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let mut pattern = String::from("^");
        for group in HintGroup::ALL {
            pattern.push_str(&format!(
                r"(?:(?P<{}>{})\b\s*)?",
                group.name(),
                group.alternation()
            ));
        }
        Regex::new(&pattern).expect("select hints pattern is valid")
    })
}

/// An index hint already attached right after a table reference.
fn existing_index_hint_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s+(?:USE|IGNORE|FORCE)\s+(?:INDEX|KEY)\b").expect("hint pattern is valid")
    })
}

/// Does `sql` contain at least one rewrite marker?
pub fn has_markers(sql: &str) -> bool {
    sql.contains(MARKER_PREFIX)
}

/// Remove every rewrite marker from `sql` without applying anything.
pub fn strip_markers(sql: &str) -> String {
    marker_re().replace_all(sql, "").into_owned()
}

/// Strip rewrite markers from `sql` and apply the directives they carry.
///
/// Never fails: malformed directives are ignored, and statements whose head
/// isn't recognised come back with only the markers removed. Applying the
/// function to its own output returns that output unchanged.
///
/// # Example
///
/// ```
/// use mysqlext_mysql::rewrite::rewrite_query;
///
/// let sql = "SELECT /*QueryRewrite':SQL_NO_CACHE*/ `id` FROM `author`";
/// assert_eq!(rewrite_query(sql), "SELECT SQL_NO_CACHE `id` FROM `author`");
/// ```
pub fn rewrite_query(sql: &str) -> String {
    if !has_markers(sql) {
        return sql.to_string();
    }

    let mut labels = Vec::new();
    let mut hints = Vec::new();
    let mut index_hints = Vec::new();
    for directive in parse_directives(sql) {
        match directive {
            RewriteDirective::Label(text) => labels.push(text),
            RewriteDirective::Hint(hint) => hints.push(hint),
            RewriteDirective::IndexHint(hint) => index_hints.push(hint),
        }
    }

    let stripped = strip_markers(sql);
    if labels.is_empty() && hints.is_empty() && index_hints.is_empty() {
        return stripped;
    }

    modify_statement(&stripped, &labels, &hints, &index_hints)
}

fn modify_statement(
    sql: &str,
    labels: &[String],
    hints: &[SelectHint],
    index_hints: &[IndexHint],
) -> String {
    let Some(head) = head_re().captures(sql) else {
        tracing::debug!("Statement head not recognised, leaving query unmodified");
        return sql.to_string();
    };

    let keyword = &head["keyword"];
    let is_select = keyword == "SELECT";
    let mut rest_start = head.get(0).map_or(0, |m| m.end());

    let mut tokens: Vec<String> = vec![keyword.to_string()];
    let comments = head["comments"].trim();
    if !comments.is_empty() {
        tokens.push(comments.to_string());
    }
    for label in labels {
        tokens.push(format!("/*{label}*/"));
    }

    if is_select {
        let existing = select_hints_re().captures(&sql[rest_start..]);
        for group in HintGroup::ALL {
            let requested = hints.iter().rev().find(|h| h.group() == group);
            if let Some(hint) = requested {
                tokens.push(hint.as_str().to_string());
            } else if let Some(m) = existing.as_ref().and_then(|c| c.name(group.name())) {
                tokens.push(m.as_str().to_string());
            }
        }
        if let Some(m) = existing.as_ref().and_then(|c| c.get(0)) {
            rest_start += m.end();
        }
    }

    let mut remainder = sql[rest_start..].to_string();
    if is_select {
        for hint in index_hints {
            remainder = apply_index_hint(&remainder, hint);
        }
    }

    tracing::debug!(
        keyword = keyword,
        labels = labels.len(),
        hints = hints.len(),
        index_hints = index_hints.len(),
        "Rewrote query head"
    );

    if !remainder.is_empty() {
        tokens.push(remainder);
    }
    tokens.join(" ")
}

/// Words that may follow a table reference and therefore never name an alias.
const TABLE_FOLLOWERS: &[&str] = &[
    "AS", "CROSS", "FOR", "FORCE", "FULL", "GROUP", "HAVING", "IGNORE", "INNER", "INTO",
    "JOIN", "LEFT", "LIMIT", "LOCK", "NATURAL", "ON", "ORDER", "OUTER", "PARTITION", "RIGHT",
    "SET", "STRAIGHT_JOIN", "UNION", "USE", "USING", "WHERE", "WINDOW",
];

/// Pattern for `FROM`/`JOIN` followed by `table`, quoted or bare, plus an
/// optional `[AS] alias` captured as `alias`.
fn table_reference_pattern(table: &str) -> String {
    let quoted = regex::escape(&quote_ident_mysql(table));
    let mut bare = regex::escape(table);
    if table.chars().last().is_some_and(|c| c.is_alphanumeric() || c == '_') {
        bare.push_str(r"\b");
    }
    format!(
        r"\b(?:FROM|JOIN)\s+(?P<table>{quoted}|{bare})(?:\s+(?:(?i:AS)\s+)?(?P<alias>`(?:[^`]|``)+`|[A-Za-z_$][A-Za-z0-9_$]*))?"
    )
}

/// Where an index hint goes: after the alias when there is one, else right
/// after the table name.
fn hint_position(caps: &Captures<'_>) -> Option<usize> {
    let table_end = caps.name("table")?.end();
    Some(match caps.name("alias") {
        Some(alias)
            if !TABLE_FOLLOWERS
                .iter()
                .any(|word| word.eq_ignore_ascii_case(alias.as_str())) =>
        {
            alias.end()
        }
        _ => table_end,
    })
}

/// Insert `hint` after the first reference to its table that has no index
/// hint yet.
fn apply_index_hint(sql: &str, hint: &IndexHint) -> String {
    let re = match Regex::new(&table_reference_pattern(&hint.table)) {
        Ok(re) => re,
        Err(e) => {
            tracing::trace!(table = %hint.table, error = %e, "Skipping index hint");
            return sql.to_string();
        }
    };

    // Resume after each table name, not after the whole match, so a keyword
    // taken as alias candidate (`JOIN`) can still start the next reference.
    let mut target = None;
    let mut start = 0;
    while let Some(caps) = re.captures_at(sql, start) {
        let Some(end) = hint_position(&caps) else {
            break;
        };
        if !existing_index_hint_re().is_match(&sql[end..]) {
            target = Some(end);
            break;
        }
        start = caps.name("table").map_or(end, |m| m.end());
    }

    match target {
        Some(end) => format!("{}{}{}", &sql[..end], hint.clause(), &sql[end..]),
        None => {
            tracing::trace!(table = %hint.table, "No unhinted table reference for index hint");
            sql.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The SELECT modifiers already present in the head of `sql`.
    fn existing_select_hints(sql: &str) -> Vec<SelectHint> {
        let Some(head) = head_re().captures(sql) else {
            return Vec::new();
        };
        if &head["keyword"] != "SELECT" {
            return Vec::new();
        }
        let start = head.get(0).map_or(0, |m| m.end());
        select_hints_re()
            .captures(&sql[start..])
            .map(|caps| {
                HintGroup::ALL
                    .iter()
                    .filter_map(|g| caps.name(g.name()))
                    .filter_map(|m| SelectHint::from_token(m.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn no_markers_is_identity() {
        let sql = "SELECT  `a`   FROM `t` /* keep */";
        assert_eq!(rewrite_query(sql), sql);
    }

    #[test]
    fn hints_are_placed_in_grammar_order() {
        let sql = "SELECT /*QueryRewrite':SQL_CALC_FOUND_ROWS*/ /*QueryRewrite':DISTINCT*/ `a` FROM `t`";
        assert_eq!(
            rewrite_query(sql),
            "SELECT DISTINCT SQL_CALC_FOUND_ROWS `a` FROM `t`"
        );
    }

    #[test]
    fn requested_hint_overrides_existing_group_member() {
        let sql = "SELECT DISTINCT SQL_CACHE /*QueryRewrite':SQL_NO_CACHE*/ `a` FROM `t`";
        assert_eq!(
            rewrite_query(sql),
            "SELECT DISTINCT SQL_NO_CACHE `a` FROM `t`"
        );
    }

    #[test]
    fn labels_follow_existing_comments() {
        let sql = "SELECT /*existing*/ /*QueryRewrite':label=mine*/ `a` FROM `t`";
        assert_eq!(
            rewrite_query(sql),
            "SELECT /*existing*/ /*mine*/ `a` FROM `t`"
        );
    }

    #[test]
    fn update_gets_labels_but_not_hints() {
        let sql = "UPDATE /*QueryRewrite':label=bump*/ /*QueryRewrite':SQL_NO_CACHE*/ `t` SET `a` = 1";
        assert_eq!(rewrite_query(sql), "UPDATE /*bump*/ `t` SET `a` = 1");
    }

    #[test]
    fn delete_index_hints_are_ignored() {
        let sql = "DELETE /*QueryRewrite':index=`t` USE `i`*/ FROM `t` WHERE `a` = 1";
        assert_eq!(rewrite_query(sql), "DELETE FROM `t` WHERE `a` = 1");
    }

    #[test]
    fn unknown_statement_only_loses_markers() {
        let sql = "INSERT INTO `t` (`a`) VALUES (1) /*QueryRewrite':label=x*/";
        assert_eq!(rewrite_query(sql), "INSERT INTO `t` (`a`) VALUES (1) ");
    }

    #[test]
    fn index_hint_with_alias() {
        let sql = "SELECT /*QueryRewrite':index=`book` FORCE `pub_idx`*/ `T2`.`id` FROM `author` INNER JOIN `book` T2 ON (`author`.`id` = T2.`author_id`)";
        assert_eq!(
            rewrite_query(sql),
            "SELECT `T2`.`id` FROM `author` INNER JOIN `book` T2 FORCE INDEX (`pub_idx`) ON (`author`.`id` = T2.`author_id`)"
        );
    }

    #[test]
    fn repeated_table_targets_successive_references() {
        let sql = "SELECT /*QueryRewrite':index=`t` USE `a`*/ /*QueryRewrite':index=`t` IGNORE `b`*/ * FROM `t` INNER JOIN `t` T2 ON (1)";
        assert_eq!(
            rewrite_query(sql),
            "SELECT * FROM `t` USE INDEX (`a`) INNER JOIN `t` T2 IGNORE INDEX (`b`) ON (1)"
        );
    }

    #[test]
    fn index_hint_follows_as_alias() {
        let sql = "SELECT /*QueryRewrite':index=`t` USE (`i`)*/ * FROM `t` AS a WHERE a.x = 1";
        assert_eq!(
            rewrite_query(sql),
            "SELECT * FROM `t` AS a USE INDEX (`i`) WHERE a.x = 1"
        );
    }

    #[test]
    fn index_hint_follows_bare_alias() {
        let sql = "SELECT /*QueryRewrite':index=`t` USE (`i`)*/ * FROM `t` a WHERE a.x = 1";
        assert_eq!(
            rewrite_query(sql),
            "SELECT * FROM `t` a USE INDEX (`i`) WHERE a.x = 1"
        );

        let sql = "SELECT /*QueryRewrite':index=`u` IGNORE `j`*/ * FROM t a INNER JOIN `u` AS `b u` ON (1) ORDER BY a.x";
        assert_eq!(
            rewrite_query(sql),
            "SELECT * FROM t a INNER JOIN `u` AS `b u` IGNORE INDEX (`j`) ON (1) ORDER BY a.x"
        );
    }

    #[test]
    fn keyword_after_table_is_not_an_alias() {
        for (tail, expected) in [
            ("WHERE a = 1", "SELECT * FROM `t` USE INDEX (`i`) WHERE a = 1"),
            ("where a = 1", "SELECT * FROM `t` USE INDEX (`i`) where a = 1"),
            ("LIMIT 5", "SELECT * FROM `t` USE INDEX (`i`) LIMIT 5"),
            ("LEFT JOIN u ON (1)", "SELECT * FROM `t` USE INDEX (`i`) LEFT JOIN u ON (1)"),
        ] {
            let sql = format!("SELECT /*QueryRewrite':index=`t` USE `i`*/ * FROM `t` {tail}");
            assert_eq!(rewrite_query(&sql), expected);
        }
    }

    #[test]
    fn aliased_reference_with_hint_is_skipped() {
        let sql = "SELECT /*QueryRewrite':index=`t` FORCE `b`*/ * FROM `t` AS a USE INDEX (`a`) JOIN `t` ON (1)";
        assert_eq!(
            rewrite_query(sql),
            "SELECT * FROM `t` AS a USE INDEX (`a`) JOIN `t` FORCE INDEX (`b`) ON (1)"
        );
    }

    #[test]
    fn self_join_without_alias() {
        let sql = "SELECT /*QueryRewrite':index=`t` USE `a`*/ /*QueryRewrite':index=`t` USE `b`*/ * FROM `t` JOIN `t` ON (1)";
        assert_eq!(
            rewrite_query(sql),
            "SELECT * FROM `t` USE INDEX (`a`) JOIN `t` USE INDEX (`b`) ON (1)"
        );
    }

    #[test]
    fn index_hint_for_missing_table_is_dropped() {
        let sql = "SELECT /*QueryRewrite':index=`nope` USE `a`*/ * FROM `t`";
        assert_eq!(rewrite_query(sql), "SELECT * FROM `t`");
    }

    #[test]
    fn bare_table_name_needs_word_boundary() {
        let sql = "SELECT /*QueryRewrite':index=`t` USE `a`*/ * FROM tt JOIN t ON (1)";
        assert_eq!(
            rewrite_query(sql),
            "SELECT * FROM tt JOIN t USE INDEX (`a`) ON (1)"
        );
    }

    #[test]
    fn existing_hints_are_reported() {
        assert_eq!(
            existing_select_hints("SELECT DISTINCT STRAIGHT_JOIN * FROM t"),
            vec![SelectHint::Distinct, SelectHint::StraightJoin]
        );
        assert!(existing_select_hints("UPDATE t SET a = 1").is_empty());
    }
}
