//! Rewrite directives carried inside `/*QueryRewrite':...*/` markers.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use mysqlext_core::{quote_ident_mysql, unquote_ident_mysql};
use regex::Regex;

use super::hints::SelectHint;

/// Opening of every rewrite marker comment.
pub const MARKER_PREFIX: &str = "/*QueryRewrite':";

const QUOTED_IDENT: &str = r"`(?:[^`]|``)+`";

fn index_payload_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(
            r"(?x)
            ^index=
            (?P<table>{ident})
            \s+
            (?P<rule>USE|IGNORE|FORCE)
            \s+
            (?:FOR\s+(?P<for_what>JOIN|ORDER\s+BY|GROUP\s+BY)\s+)?
            (?P<open>\(\s*)?
            (?P<names>{ident}(?:\s*,\s*{ident})*|NONE)
            (?P<close>\s*\))?
            \s*$",
            ident = QUOTED_IDENT
        );
        Regex::new(&pattern).expect("index payload pattern is valid")
    })
}

fn quoted_ident_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(QUOTED_IDENT).expect("identifier pattern is valid"))
}

/// Label text is emitted as `/*<text>*/`; nested comment delimiters would
/// either end it early or open a new marker in the rewritten SQL.
pub(crate) fn is_valid_label(text: &str) -> bool {
    !text.contains("/*") && !text.contains("*/")
}

/// One instruction parsed from a rewrite marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteDirective {
    /// Comment injected verbatim after the statement keyword.
    Label(String),
    /// SELECT modifier.
    Hint(SelectHint),
    /// `USE/IGNORE/FORCE INDEX` attached to a table reference.
    IndexHint(IndexHint),
}

impl RewriteDirective {
    /// Classify a marker payload.
    ///
    /// Returns `None` for anything unrecognised; callers drop those silently.
    pub fn parse(payload: &str) -> Option<Self> {
        if let Some(hint) = SelectHint::from_token(payload) {
            return Some(RewriteDirective::Hint(hint));
        }
        if let Some(label) = payload.strip_prefix("label=") {
            return is_valid_label(label).then(|| RewriteDirective::Label(label.to_string()));
        }
        if payload.starts_with("index=") {
            return IndexHint::parse(payload).map(RewriteDirective::IndexHint);
        }
        None
    }

    /// The payload text this directive is written as inside a marker.
    pub fn payload(&self) -> String {
        match self {
            RewriteDirective::Label(text) => format!("label={text}"),
            RewriteDirective::Hint(hint) => hint.as_str().to_string(),
            RewriteDirective::IndexHint(hint) => {
                let mut payload = format!(
                    "index={} {} ",
                    quote_ident_mysql(&hint.table),
                    hint.rule.as_str()
                );
                if let Some(for_clause) = hint.for_clause {
                    payload.push_str("FOR ");
                    payload.push_str(for_clause.as_str());
                    payload.push(' ');
                }
                if hint.indexes.is_empty() {
                    payload.push_str("NONE");
                } else {
                    payload.push_str(&hint.quoted_indexes());
                }
                payload
            }
        }
    }

    /// Render this directive as a complete marker comment.
    pub fn marker(&self) -> String {
        format!("{MARKER_PREFIX}{}*/", self.payload())
    }
}

/// How MySQL should treat the listed indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexRule {
    Use,
    Ignore,
    Force,
}

impl IndexRule {
    pub const fn as_str(self) -> &'static str {
        match self {
            IndexRule::Use => "USE",
            IndexRule::Ignore => "IGNORE",
            IndexRule::Force => "FORCE",
        }
    }
}

impl fmt::Display for IndexRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USE" => Ok(IndexRule::Use),
            "IGNORE" => Ok(IndexRule::Ignore),
            "FORCE" => Ok(IndexRule::Force),
            other => Err(format!(
                "'{other}' is not an index rule, expected one of USE, IGNORE, FORCE"
            )),
        }
    }
}

/// The optional `FOR ...` scope of an index hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexForClause {
    Join,
    OrderBy,
    GroupBy,
}

impl IndexForClause {
    pub const fn as_str(self) -> &'static str {
        match self {
            IndexForClause::Join => "JOIN",
            IndexForClause::OrderBy => "ORDER BY",
            IndexForClause::GroupBy => "GROUP BY",
        }
    }
}

impl fmt::Display for IndexForClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexForClause {
    type Err = String;

    /// Accepts the clause with any run of whitespace between words.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.as_str() {
            "JOIN" => Ok(IndexForClause::Join),
            "ORDER BY" => Ok(IndexForClause::OrderBy),
            "GROUP BY" => Ok(IndexForClause::GroupBy),
            _ => Err(format!(
                "'{s}' is not a valid index hint scope, expected one of JOIN, ORDER BY, GROUP BY"
            )),
        }
    }
}

/// An index hint targeting one table reference.
///
/// An empty `indexes` list is the `NONE` sentinel and renders as `()`,
/// which tells MySQL to use no index at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHint {
    pub table: String,
    pub rule: IndexRule,
    pub indexes: Vec<String>,
    pub for_clause: Option<IndexForClause>,
}

impl IndexHint {
    /// Parse an `index=` payload.
    pub fn parse(payload: &str) -> Option<Self> {
        let caps = index_payload_re().captures(payload)?;

        // Parentheses around the name list are optional but must balance.
        if caps.name("open").is_some() != caps.name("close").is_some() {
            return None;
        }

        let table = unquote_ident_mysql(caps.name("table")?.as_str());
        let rule = caps.name("rule")?.as_str().parse().ok()?;
        let for_clause = match caps.name("for_what") {
            Some(m) => Some(m.as_str().parse().ok()?),
            None => None,
        };
        let names = caps.name("names")?.as_str();
        let indexes = if names == "NONE" {
            Vec::new()
        } else {
            quoted_ident_re()
                .find_iter(names)
                .map(|m| unquote_ident_mysql(m.as_str()))
                .collect()
        };

        Some(Self {
            table,
            rule,
            indexes,
            for_clause,
        })
    }

    /// Comma-separated, backtick-quoted index names (empty for `NONE`).
    pub fn quoted_indexes(&self) -> String {
        self.indexes
            .iter()
            .map(|name| quote_ident_mysql(name))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// The clause inserted after the table reference, with a leading space.
    pub fn clause(&self) -> String {
        let for_section = self
            .for_clause
            .map(|c| format!("FOR {} ", c.as_str()))
            .unwrap_or_default();
        format!(
            " {} INDEX {}({})",
            self.rule.as_str(),
            for_section,
            self.quoted_indexes()
        )
    }
}

/// Collect every well-formed directive in `sql`, in order of appearance.
pub fn parse_directives(sql: &str) -> Vec<RewriteDirective> {
    super::marker_re()
        .captures_iter(sql)
        .filter_map(|caps| {
            let payload = caps.get(1).map_or("", |m| m.as_str());
            let parsed = RewriteDirective::parse(payload);
            if parsed.is_none() {
                tracing::trace!(payload = payload, "Dropping unrecognised QueryRewrite directive");
            }
            parsed
        })
        .collect()
}
