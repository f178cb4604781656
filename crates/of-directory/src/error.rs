use of_invoke::InvokeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Invalid target identifier: {0}")]
    InvalidTarget(String),

    #[error("Failed to resolve {node}: {source}")]
    Resolution {
        node: String,
        #[source]
        source: InvokeError,
    },

    #[error("Account not found in organization: {0}")]
    AccountNotFound(String),

    #[error("Root not found: {0}")]
    RootNotFound(String),

    #[error("Malformed {operation} response: {message}")]
    MalformedResponse { operation: String, message: String },
}

impl DirectoryError {
    /// True for every failure raised while talking to the directory, as
    /// opposed to rejecting the target up front.
    pub fn is_resolution_failure(&self) -> bool {
        !matches!(self, DirectoryError::InvalidTarget(_))
    }
}
