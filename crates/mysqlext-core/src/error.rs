//! Error types for mysqlext operations.

use std::fmt;

/// The primary error type for all mysqlext operations.
#[derive(Debug)]
pub enum Error {
    /// Query execution errors reported by the server
    Query(QueryError),
    /// Type conversion errors
    Type(TypeError),
    /// HANDLER session errors (unsupported query, lifecycle, bad arguments)
    Handler(HandlerError),
    /// Configuration errors
    Config(ConfigError),
    /// Builder input rejected before any SQL is produced
    Validation(ValidationError),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub sqlstate: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Syntax error in SQL
    Syntax,
    /// Table, column or index not found
    NotFound,
    /// Permission denied
    Permission,
    /// Deadlock detected
    Deadlock,
    /// Statement timeout
    Timeout,
    /// Other database error
    Database,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

/// Failure raised by a HANDLER session before or instead of a server round trip.
#[derive(Debug)]
pub struct HandlerError {
    pub kind: HandlerErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerErrorKind {
    /// The query has ordering, slicing, joins or projections HANDLER can't express
    UnsupportedQuery,
    /// Invalid lifecycle transition (open twice, close unopened, reopen closed)
    State,
    /// Read attempted on a handle that isn't open
    NotOpen,
    /// Bad read arguments (unknown mode/operator, conflicting options)
    InvalidArgument,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// A value handed to a builder that can't be rendered safely.
#[derive(Debug)]
pub struct ValidationError {
    /// The builder input that was rejected (e.g. "label")
    pub field: String,
    pub message: String,
}

impl Error {
    /// Get the HANDLER error kind, if this is a handler error.
    pub fn handler_kind(&self) -> Option<HandlerErrorKind> {
        match self {
            Error::Handler(h) => Some(h.kind),
            _ => None,
        }
    }
}

impl HandlerError {
    pub fn new(kind: HandlerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(HandlerErrorKind::UnsupportedQuery, message)
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::new(HandlerErrorKind::State, message)
    }

    pub fn not_open(message: impl Into<String>) -> Self {
        Self::new(HandlerErrorKind::NotOpen, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(HandlerErrorKind::InvalidArgument, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Query(e) => {
                if let Some(sqlstate) = &e.sqlstate {
                    write!(f, "Query error (SQLSTATE {}): {}", sqlstate, e.message)
                } else {
                    write!(f, "Query error: {}", e.message)
                }
            }
            Error::Type(e) => {
                if let Some(col) = &e.column {
                    write!(
                        f,
                        "Type error in column '{}': expected {}, found {}",
                        col, e.expected, e.actual
                    )
                } else {
                    write!(f, "Type error: expected {}, found {}", e.expected, e.actual)
                }
            }
            Error::Handler(e) => write!(f, "Handler error: {}", e.message),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Validation(e) => write!(f, "Invalid {}: {}", e.field, e.message),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sqlstate) = &self.sqlstate {
            write!(f, "{} (SQLSTATE {})", self.message, sqlstate)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<HandlerError> for Error {
    fn from(err: HandlerError) -> Self {
        Error::Handler(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Validation(err)
    }
}

/// Result type alias for mysqlext operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_error_display_carries_sqlstate() {
        let err = Error::Query(QueryError {
            kind: QueryErrorKind::NotFound,
            sql: Some("HANDLER `t` OPEN AS `t_1`".to_string()),
            sqlstate: Some("42S02".to_string()),
            message: "Table 'db.t' doesn't exist".to_string(),
            source: None,
        });

        assert_eq!(
            err.to_string(),
            "Query error (SQLSTATE 42S02): Table 'db.t' doesn't exist"
        );
        assert_eq!(err.handler_kind(), None);
    }

    #[test]
    fn handler_error_kinds() {
        let err: Error = HandlerError::state("cannot open twice").into();
        assert_eq!(err.handler_kind(), Some(HandlerErrorKind::State));
        assert_eq!(err.to_string(), "Handler error: cannot open twice");

        let err: Error = HandlerError::unsupported("too complex").into();
        assert_eq!(err.handler_kind(), Some(HandlerErrorKind::UnsupportedQuery));
    }
}
