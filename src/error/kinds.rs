use std::{fmt, io};

use crate::error::mongo::StoreDiagnostic;

/// Crate-wide `Result` type using [`DocshellError`] as the error.
pub type Result<T> = std::result::Result<T, DocshellError>;

/// Top-level error type for docshell operations.
#[derive(Debug)]
pub enum DocshellError {
    /// Query parsing and execution errors.
    Query(QueryError),

    /// Connection-related errors.
    Connection(ConnectionError),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Classification of a [`QueryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryErrorKind {
    /// The `db.<collection>.` prefix is missing or a call is not balanced.
    MalformedQuery,
    /// A string, regex or container literal never closes.
    UnterminatedLiteral,
    /// The argument text is not a well-formed literal.
    InvalidLiteral,
    /// The argument text uses an expression form outside the literal grammar.
    UnsupportedConstruct,
    /// The base call is not an allow-listed store operation.
    UnknownOperation,
    /// A chained call is not a cursor modifier, or follows a non-cursor result.
    UnsupportedModifier,
    /// A modifier received an argument it cannot use.
    InvalidArgument,
    /// The document store reported a failure.
    StoreError,
}

impl QueryErrorKind {
    /// Stable name used in messages and serialized diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryErrorKind::MalformedQuery => "MalformedQuery",
            QueryErrorKind::UnterminatedLiteral => "UnterminatedLiteral",
            QueryErrorKind::InvalidLiteral => "InvalidLiteral",
            QueryErrorKind::UnsupportedConstruct => "UnsupportedConstruct",
            QueryErrorKind::UnknownOperation => "UnknownOperation",
            QueryErrorKind::UnsupportedModifier => "UnsupportedModifier",
            QueryErrorKind::InvalidArgument => "InvalidArgument",
            QueryErrorKind::StoreError => "StoreError",
        }
    }
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised while parsing or executing a query.
///
/// Always carries the original query text. `offset` is a byte offset into
/// that text when the failure can be pinned to a position; `call_index` names
/// the chained call whose arguments failed to parse.
#[derive(Debug, Clone)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub message: String,
    pub query: String,
    pub offset: Option<usize>,
    pub call_index: Option<usize>,
    pub diagnostic: Option<StoreDiagnostic>,
}

impl QueryError {
    pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            query: String::new(),
            offset: None,
            call_index: None,
            diagnostic: None,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::MalformedQuery, message)
    }

    pub fn unterminated(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::UnterminatedLiteral, message)
    }

    pub fn invalid_literal(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::InvalidLiteral, message)
    }

    pub fn unsupported_construct(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::UnsupportedConstruct, message)
    }

    pub fn unknown_operation(name: &str) -> Self {
        Self::new(
            QueryErrorKind::UnknownOperation,
            format!("'{name}' is not a supported collection operation"),
        )
    }

    pub fn unsupported_modifier(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::UnsupportedModifier, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::InvalidArgument, message)
    }

    /// Store failure; `message` is kept exactly as the store reported it.
    pub fn store(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::StoreError, message)
    }

    pub fn at(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Shift a locally computed offset by `base`, or set it to `base`.
    pub fn shifted(mut self, base: usize) -> Self {
        self.offset = Some(base + self.offset.unwrap_or(0));
        self
    }

    pub fn in_call(mut self, index: usize) -> Self {
        self.call_index = Some(index);
        self
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query = query.to_string();
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: StoreDiagnostic) -> Self {
        self.diagnostic = Some(diagnostic);
        self
    }
}

/// Connection-specific errors.
#[derive(Debug)]
pub enum ConnectionError {
    /// Failed to establish a connection.
    ConnectionFailed(String),

    /// Invalid connection URI.
    InvalidUri(String),

    /// Not currently connected to MongoDB.
    NotConnected,

    /// Ping command failed.
    PingFailed(String),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for DocshellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocshellError::Query(e) => write!(f, "{e}"),
            DocshellError::Connection(e) => write!(f, "Connection error: {e}"),
            DocshellError::Config(e) => write!(f, "Configuration error: {e}"),
            DocshellError::Io(e) => write!(f, "I/O error: {e}"),
            DocshellError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == QueryErrorKind::StoreError {
            // Store messages are surfaced untouched.
            return write!(f, "{}: {}", self.kind, self.message);
        }
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(index) = self.call_index {
            write!(f, " (call #{index})")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " at offset {offset}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::ConnectionFailed(msg) => write!(f, "Failed to connect: {msg}"),
            ConnectionError::InvalidUri(uri) => write!(f, "Invalid connection URI: {uri}"),
            ConnectionError::NotConnected => write!(f, "Not connected to MongoDB"),
            ConnectionError::PingFailed(msg) => write!(f, "Ping failed: {msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for DocshellError {}
impl std::error::Error for QueryError {}
impl std::error::Error for ConnectionError {}
impl std::error::Error for ConfigError {}

impl DocshellError {
    /// The query error kind, if this is a query error.
    pub fn query_kind(&self) -> Option<QueryErrorKind> {
        match self {
            DocshellError::Query(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Borrow the inner query error, if any.
    pub fn as_query(&self) -> Option<&QueryError> {
        match self {
            DocshellError::Query(e) => Some(e),
            _ => None,
        }
    }
}

/* ========================= Conversions to DocshellError ========================= */

impl From<QueryError> for DocshellError {
    fn from(err: QueryError) -> Self {
        DocshellError::Query(err)
    }
}

impl From<io::Error> for DocshellError {
    fn from(err: io::Error) -> Self {
        DocshellError::Io(err)
    }
}

impl From<ConnectionError> for DocshellError {
    fn from(err: ConnectionError) -> Self {
        DocshellError::Connection(err)
    }
}

impl From<ConfigError> for DocshellError {
    fn from(err: ConfigError) -> Self {
        DocshellError::Config(err)
    }
}

impl From<String> for DocshellError {
    fn from(msg: String) -> Self {
        DocshellError::Generic(msg)
    }
}

impl From<&str> for DocshellError {
    fn from(msg: &str) -> Self {
        DocshellError::Generic(msg.to_owned())
    }
}
