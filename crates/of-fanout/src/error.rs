use of_directory::DirectoryError;
use of_invoke::InvokeError;
use thiserror::Error;

/// Failures that abort a whole fan-out run.
#[derive(Error, Debug)]
pub enum FanoutError {
    #[error("Target resolution failed: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Failed to assume role in management account {account_id}: {source}")]
    ManagementAssumption {
        account_id: String,
        #[source]
        source: TaskFailure,
    },
}

/// Why one account's task produced no result.
///
/// These are logged at the account boundary and never returned from a run.
#[derive(Error, Debug)]
pub enum TaskFailure {
    #[error("AssumeRole {role_arn} failed: {source}")]
    RoleAssumption {
        role_arn: String,
        #[source]
        source: InvokeError,
    },

    #[error("AssumeRole {role_arn} returned unusable credentials: {message}")]
    InvalidCredentials { role_arn: String, message: String },

    #[error("Callback failed: {0:#}")]
    Callback(anyhow::Error),
}

impl TaskFailure {
    pub fn is_role_assumption(&self) -> bool {
        !matches!(self, TaskFailure::Callback(_))
    }
}
