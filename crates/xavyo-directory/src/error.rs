//! Directory error types
//!
//! Error definitions shared by clients, mappers and repositories, with
//! transient/permanent classification.

use thiserror::Error;

use crate::dn::Dn;

/// Error that can occur during directory operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    // Caller errors (raised before any backend call)
    /// A public operation received an invalid argument.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The operation is intentionally not implemented by this backend.
    #[error("unsupported operation: {operation}")]
    Unsupported { operation: String },

    // Result errors
    /// No entry exists at the given distinguished name.
    #[error("entry not found: {dn}")]
    NotFound { dn: Dn },

    /// A query expected a single result but matched nothing.
    #[error("empty result: expected exactly one entry")]
    EmptyResult,

    /// A query returned more results than its contract allows.
    #[error("incorrect result size: expected at most {expected}, got {actual}")]
    ResultCardinality { expected: usize, actual: usize },

    // Mapping errors
    /// An entity, projection or DTO could not be mapped.
    #[error("mapping failed: {message}")]
    Mapping { message: String },

    // Backend errors (propagated unchanged)
    /// Failed to establish a connection to the directory server.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Bind credentials were rejected.
    #[error("authentication failed: invalid credentials")]
    AuthenticationFailed,

    /// An entry already exists at the given distinguished name.
    #[error("entry already exists: {dn}")]
    AlreadyExists { dn: Dn },

    /// The directory server rejected the operation.
    #[error("operation failed: {message}")]
    OperationFailed {
        message: String,
        /// LDAP result code, when the server reported one.
        code: Option<u32>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Client or repository configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Internal error.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl DirectoryError {
    /// Check if this error is transient and the operation could be retried.
    ///
    /// Retrying is left to the caller; this layer never retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, DirectoryError::ConnectionFailed { .. })
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Check if this error signals a missing entry or an empty result.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DirectoryError::NotFound { .. } | DirectoryError::EmptyResult
        )
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            DirectoryError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            DirectoryError::Unsupported { .. } => "UNSUPPORTED",
            DirectoryError::NotFound { .. } => "NOT_FOUND",
            DirectoryError::EmptyResult => "EMPTY_RESULT",
            DirectoryError::ResultCardinality { .. } => "RESULT_CARDINALITY",
            DirectoryError::Mapping { .. } => "MAPPING_FAILED",
            DirectoryError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            DirectoryError::AuthenticationFailed => "AUTH_FAILED",
            DirectoryError::AlreadyExists { .. } => "ALREADY_EXISTS",
            DirectoryError::OperationFailed { .. } => "OPERATION_FAILED",
            DirectoryError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            DirectoryError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    // Convenience constructors

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        DirectoryError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        DirectoryError::Unsupported {
            operation: operation.into(),
        }
    }

    /// Create a mapping error.
    pub fn mapping(message: impl Into<String>) -> Self {
        DirectoryError::Mapping {
            message: message.into(),
        }
    }

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an operation failed error carrying an LDAP result code.
    pub fn operation_failed(code: u32, message: impl Into<String>) -> Self {
        DirectoryError::OperationFailed {
            message: message.into(),
            code: Some(code),
            source: None,
        }
    }

    /// Create an operation failed error with source.
    pub fn operation_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::OperationFailed {
            message: message.into(),
            code: None,
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        DirectoryError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        DirectoryError::Internal {
            message: message.into(),
        }
    }
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;
