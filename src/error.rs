//! Error types for the tool bridge.
//!
//! Every backend failure is folded into [`BridgeError`] so that tool handlers
//! can propagate with `?` and the registry can turn the error into a failure
//! envelope. Messages never carry statement text or credentials.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Cancelled: {operation} was cancelled by the caller")]
    Cancelled { operation: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Permission denied: {operation} - {reason}")]
    Permission { operation: String, reason: String },

    #[error("Unknown tool: {name}")]
    ToolNotFound { name: String },

    #[error("Tool '{name}' is already registered")]
    DuplicateTool { name: String },

    #[error("Schema error: {message} (object: {object})")]
    Schema { message: String, object: String },

    #[error("Issue tracker error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    IssueTracker { status: Option<u16>, message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BridgeError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a permission error.
    pub fn permission(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Permission {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound { name: name.into() }
    }

    pub fn duplicate_tool(name: impl Into<String>) -> Self {
        Self::DuplicateTool { name: name.into() }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            object: object.into(),
        }
    }

    pub fn issue_tracker(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::IssueTracker {
            status,
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// True when the underlying connection can no longer be trusted.
    ///
    /// The executor marks its connection broken on these and refuses further
    /// statements instead of reconnecting behind the caller's back.
    pub fn is_connection_loss(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Message shown to tool callers, with the suggestion appended when present.
    pub fn user_message(&self) -> String {
        match self {
            Self::Database {
                message,
                sql_state: Some(code),
                suggestion,
            } => format!("Database error: {message} (SQLSTATE: {code}). {suggestion}"),
            _ => match self.suggestion() {
                Some(suggestion) => format!("{self}. {suggestion}"),
                None => self.to_string(),
            },
        }
    }
}

/// Convert sqlx errors to BridgeError.
impl From<sqlx::Error> for BridgeError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => BridgeError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                BridgeError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => BridgeError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            // Single-connection pool: this means another statement still holds it.
            sqlx::Error::PoolTimedOut => BridgeError::database(
                "Timed out waiting for the database connection",
                None,
                "Another statement is still running; retry once it finishes",
            ),
            sqlx::Error::PoolClosed => BridgeError::connection(
                "Connection is closed",
                "Restart the server to reconnect to the database",
            ),
            sqlx::Error::Io(io_err) => BridgeError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => BridgeError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => BridgeError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::WorkerCrashed => BridgeError::connection(
                "Database worker crashed",
                "Restart the server to reconnect to the database",
            ),
            sqlx::Error::TypeNotFound { type_name } => {
                BridgeError::decode(format!("Type not found: {}", type_name))
            }
            sqlx::Error::ColumnNotFound(col) => {
                BridgeError::decode(format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => BridgeError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                BridgeError::decode(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => BridgeError::decode(source.to_string()),
            _ => BridgeError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        // reqwest includes the request URL; strip it so query strings never leak.
        BridgeError::issue_tracker(status, err.without_url().to_string())
    }
}

/// Result type alias for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
