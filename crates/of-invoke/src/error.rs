use std::fmt;
use thiserror::Error;

/// Failure reported by a service adapter for a single remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    /// Error code from the remote API (e.g. `AccessDeniedException`), when known
    pub code: Option<String>,
    pub message: String,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Parameter validation failure raised before any request is sent.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_code("ValidationError", message)
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}: {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ServiceError {}

#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("Unknown service: {0}")]
    UnknownService(String),

    #[error("Unknown operation {operation} for service {service}")]
    UnknownOperation { service: String, operation: String },

    #[error("Failed to construct {service} client: {source}")]
    Client {
        service: String,
        #[source]
        source: ServiceError,
    },

    #[error("{service}.{operation} failed on page {page}: {source}")]
    Call {
        service: String,
        operation: String,
        page: u32,
        #[source]
        source: ServiceError,
    },
}

impl InvokeError {
    /// Remote error code, if the failure came from the remote API.
    pub fn code(&self) -> Option<&str> {
        match self {
            InvokeError::Call { source, .. } | InvokeError::Client { source, .. } => {
                source.code.as_deref()
            }
            _ => None,
        }
    }
}
