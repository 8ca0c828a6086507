//! MySQL identifier quoting.

/// Longest identifier MySQL accepts for tables, indexes and HANDLER aliases.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Quote a SQL identifier using MySQL backtick quoting.
///
/// Embedded backticks are escaped by doubling them (`` ` `` → ``` `` ```).
/// This function is safe against SQL injection for any input string.
///
/// # Examples
///
/// ```
/// use mysqlext_core::quote_ident_mysql;
///
/// assert_eq!(quote_ident_mysql("users"), "`users`");
/// assert_eq!(quote_ident_mysql("user`name"), "`user``name`");
/// ```
#[inline]
pub fn quote_ident_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Reverse [`quote_ident_mysql`].
///
/// Input without surrounding backticks is returned unchanged.
///
/// ```
/// use mysqlext_core::unquote_ident_mysql;
///
/// assert_eq!(unquote_ident_mysql("`user``name`"), "user`name");
/// assert_eq!(unquote_ident_mysql("users"), "users");
/// ```
pub fn unquote_ident_mysql(quoted: &str) -> String {
    match quoted
        .strip_prefix('`')
        .and_then(|rest| rest.strip_suffix('`'))
    {
        Some(inner) => inner.replace("``", "`"),
        None => quoted.to_string(),
    }
}
