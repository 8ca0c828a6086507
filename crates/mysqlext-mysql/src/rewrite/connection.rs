//! Applying rewrites transparently at the connection boundary.

use mysqlext_core::error::ConfigError;
use mysqlext_core::{Connection, Error, Result, Row, Value};
use serde::{Deserialize, Serialize};

/// Environment variable consulted by [`RewriteConfig::from_env`].
pub const REWRITE_QUERIES_ENV: &str = "MYSQLEXT_REWRITE_QUERIES";

/// Whether statements passing through a [`RewritingConnection`] get rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteConfig {
    pub enabled: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl RewriteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable rewriting.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Read the toggle from `MYSQLEXT_REWRITE_QUERIES`.
    ///
    /// An unset variable keeps the default (enabled).
    pub fn from_env() -> Result<Self> {
        match std::env::var(REWRITE_QUERIES_ENV) {
            Ok(raw) => Ok(Self::new().enabled(parse_flag(&raw)?)),
            Err(std::env::VarError::NotPresent) => Ok(Self::default()),
            Err(e) => Err(Error::Config(ConfigError {
                message: format!("{REWRITE_QUERIES_ENV} is not valid unicode"),
                source: Some(Box::new(e)),
            })),
        }
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::Config(ConfigError {
            message: format!("{REWRITE_QUERIES_ENV} must be a boolean, got {other:?}"),
            source: None,
        })),
    }
}

/// A [`Connection`] that rewrites marker-carrying SQL before delegating.
///
/// Statements without markers are forwarded untouched.
#[derive(Debug)]
pub struct RewritingConnection<C> {
    inner: C,
    config: RewriteConfig,
}

impl<C: Connection> RewritingConnection<C> {
    pub fn new(inner: C) -> Self {
        Self::with_config(inner, RewriteConfig::default())
    }

    pub fn with_config(inner: C, config: RewriteConfig) -> Self {
        Self { inner, config }
    }

    pub fn config(&self) -> RewriteConfig {
        self.config
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    fn prepare<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        if self.config.enabled && super::has_markers(sql) {
            let rewritten = super::rewrite_query(sql);
            tracing::trace!(sql = %rewritten, "Rewritten SQL");
            std::borrow::Cow::Owned(rewritten)
        } else {
            std::borrow::Cow::Borrowed(sql)
        }
    }
}

impl<C: Connection> Connection for RewritingConnection<C> {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.inner.query(&self.prepare(sql), params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.inner.execute(&self.prepare(sql), params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        seen: RefCell<Vec<String>>,
    }

    impl Connection for Recorder {
        fn query(&self, sql: &str, _params: &[Value]) -> Result<Vec<Row>> {
            self.seen.borrow_mut().push(sql.to_string());
            Ok(Vec::new())
        }

        fn execute(&self, sql: &str, _params: &[Value]) -> Result<u64> {
            self.seen.borrow_mut().push(sql.to_string());
            Ok(0)
        }
    }

    #[test]
    fn rewrites_before_delegating() {
        let conn = RewritingConnection::new(Recorder::default());
        conn.query("SELECT /*QueryRewrite':SQL_NO_CACHE*/ * FROM `t`", &[])
            .unwrap();
        conn.execute("UPDATE /*QueryRewrite':label=x*/ `t` SET `a` = 1", &[])
            .unwrap();
        assert_eq!(
            *conn.inner().seen.borrow(),
            vec![
                "SELECT SQL_NO_CACHE * FROM `t`".to_string(),
                "UPDATE /*x*/ `t` SET `a` = 1".to_string(),
            ]
        );
    }

    #[test]
    fn disabled_passes_markers_through() {
        let conn = RewritingConnection::with_config(
            Recorder::default(),
            RewriteConfig::new().enabled(false),
        );
        let sql = "SELECT /*QueryRewrite':SQL_NO_CACHE*/ * FROM `t`";
        conn.query(sql, &[]).unwrap();
        assert_eq!(conn.into_inner().seen.into_inner(), vec![sql.to_string()]);
    }

    #[test]
    fn flag_parsing() {
        assert!(parse_flag("TRUE").unwrap());
        assert!(parse_flag(" on ").unwrap());
        assert!(!parse_flag("0").unwrap());
        assert!(matches!(parse_flag("maybe"), Err(Error::Config(_))));
    }
}
