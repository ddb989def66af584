// Error handling for the endow runtime

pub type RuntimeResult<T> = Result<T, EndowError>;

/// Errors that can occur while composing a wrapper or running one of its
/// attachments. Configuration problems are fatal at composition time;
/// everything else surfaces from the invocation paths.
#[derive(Debug, thiserror::Error)]
pub enum EndowError {
    #[error("attachment name '{0}' collides with a reserved wrapper member")]
    ReservedName(String),

    #[error("attachment name '{0}' is already bound")]
    DuplicateName(String),

    #[error("unknown attachment: {0}")]
    UnknownAttachment(String),

    #[error("attachment '{0}' is a literal, not an operation")]
    NotAnOperation(String),

    #[error("wrapper for '{0}' is no longer alive")]
    DetachedWrapper(String),

    #[error("type error in {operation}: expected {expected}, got {actual}")]
    TypeError {
        expected: String,
        actual: String,
        operation: String,
    },

    #[error("arity mismatch in {function}: expected {expected}, got {actual}")]
    ArityMismatch {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("{0}")]
    Generic(String),
}

impl EndowError {
    pub fn new(message: &str) -> EndowError {
        EndowError::Generic(message.to_string())
    }
}
