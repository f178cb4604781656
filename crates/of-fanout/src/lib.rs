//! OrgFleet Fan-out
//!
//! Runs caller-supplied work once per organization account:
//! - FanoutExecutor: resolves the target accounts, assumes a role in each one
//!   and invokes the callback with the scoped credentials
//! - Per-account failures are logged and dropped; they never fail the run
//! - assume_role: AssumeRole through the invoker, parsed into [`Credentials`]
//!
//! [`Credentials`]: of_common::Credentials

mod credentials;
mod error;
mod executor;

pub use credentials::{assume_role, STS_SERVICE};
pub use error::{FanoutError, TaskFailure};
pub use executor::{FanoutConfig, FanoutExecutor, FanoutPhase, TaskResult};

pub type Result<T> = std::result::Result<T, FanoutError>;
