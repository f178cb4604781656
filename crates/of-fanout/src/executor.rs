//! FanoutExecutor - run a callback in every target account
//!
//! A run moves through `Idle -> ResolvingTargets -> FanningOut -> Aggregating -> Done`.
//! Target resolution failures end the run in `Failed`; failures inside one
//! account's task only drop that account from the results.
//!
//! Tasks are driven as one ordered stream on the caller's task, so results
//! keep dispatch order regardless of completion order.

use futures::stream::{self, StreamExt};
use of_common::{partition_of, Credentials, RoleAssumptionSpec};
use of_directory::{DirectoryNode, DirectoryTreeBuilder};
use of_invoke::{ClientParams, PagedInvoker};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, info, warn};

use crate::{assume_role, FanoutError, TaskFailure};

/// Partition used for the management account, whose ARN is not known up front.
const DEFAULT_PARTITION: &str = "aws";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FanoutPhase {
    Idle,
    ResolvingTargets,
    FanningOut,
    Aggregating,
    Done,
    /// Target resolution failed; no task was dispatched
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanoutConfig {
    /// Tasks in flight at once, 0 for no limit
    pub max_concurrency: usize,
    /// Leave SUSPENDED accounts out of the target set
    pub skip_suspended: bool,
    /// Assume the role into this account before listing anything
    pub management_account: Option<String>,
}

/// One account's successful callback output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskResult<T> {
    pub account_id: String,
    pub account_name: String,
    pub output: T,
}

pub struct FanoutExecutor {
    invoker: PagedInvoker,
    client_params: ClientParams,
    config: FanoutConfig,
    phase: RwLock<FanoutPhase>,
}

impl FanoutExecutor {
    /// # Arguments
    /// * `invoker` - Invoker providing the `organizations` and `sts` services
    /// * `client_params` - Caller credentials and region for listing and AssumeRole
    /// * `config` - Concurrency limit, suspended filter, management override
    pub fn new(invoker: PagedInvoker, client_params: ClientParams, config: FanoutConfig) -> Self {
        Self {
            invoker,
            client_params,
            config,
            phase: RwLock::new(FanoutPhase::Idle),
        }
    }

    pub fn config(&self) -> &FanoutConfig {
        &self.config
    }

    pub fn invoker(&self) -> &PagedInvoker {
        &self.invoker
    }

    /// Phase of the most recent run.
    pub fn phase(&self) -> FanoutPhase {
        *self.phase.read()
    }

    fn set_phase(&self, phase: FanoutPhase) {
        *self.phase.write() = phase;
        debug!(phase = ?phase, "Fan-out phase changed");
    }

    /// Resolve `target`, then run `callback` once per account with credentials
    /// for `role` assumed in that account.
    ///
    /// Returns one entry per account whose role assumption and callback both
    /// succeeded, in dispatch order. Failed accounts are logged and absent.
    pub async fn run<F, Fut, T>(
        &self,
        callback: F,
        role: &RoleAssumptionSpec,
        target: Option<&str>,
        recursive: bool,
    ) -> Result<Vec<TaskResult<T>>, FanoutError>
    where
        F: Fn(Credentials, DirectoryNode) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        self.set_phase(FanoutPhase::ResolvingTargets);
        let (accounts, caller_params) = match self.resolve_targets(role, target, recursive).await {
            Ok(resolved) => resolved,
            Err(e) => {
                debug!(requested = target.unwrap_or("Root"), error = %e, "Target resolution failed");
                self.set_phase(FanoutPhase::Failed);
                return Err(e);
            }
        };

        let dispatched = accounts.len();
        let limit = match self.config.max_concurrency {
            0 => dispatched.max(1),
            n => n,
        };
        info!(accounts = dispatched, concurrency = limit, role = %role.role_name, "Fanning out");
        self.set_phase(FanoutPhase::FanningOut);

        let callback = &callback;
        let caller_params = &caller_params;
        let outcomes: Vec<Option<TaskResult<T>>> = stream::iter(accounts)
            .map(|account| self.run_task(callback, role, caller_params, account))
            .buffered(limit)
            .collect()
            .await;

        self.set_phase(FanoutPhase::Aggregating);
        let results: Vec<TaskResult<T>> = outcomes.into_iter().flatten().collect();
        info!(
            succeeded = results.len(),
            failed = dispatched - results.len(),
            "Fan-out complete"
        );

        self.set_phase(FanoutPhase::Done);
        Ok(results)
    }

    /// Target accounts plus the client params the per-account AssumeRole
    /// calls are made with.
    async fn resolve_targets(
        &self,
        role: &RoleAssumptionSpec,
        target: Option<&str>,
        recursive: bool,
    ) -> Result<(Vec<DirectoryNode>, ClientParams), FanoutError> {
        let caller_params = match &self.config.management_account {
            Some(account_id) => self.assume_management(role, account_id).await?,
            None => self.client_params.clone(),
        };

        let accounts = DirectoryTreeBuilder::new(self.invoker.clone(), caller_params.clone())
            .resolve(target, recursive, self.config.skip_suspended)
            .await?
            .into_accounts(recursive);

        Ok((accounts, caller_params))
    }

    async fn assume_management(
        &self,
        role: &RoleAssumptionSpec,
        account_id: &str,
    ) -> Result<ClientParams, FanoutError> {
        let role_arn = role.role_arn(DEFAULT_PARTITION, account_id);
        info!(account_id = %account_id, role_arn = %role_arn, "Assuming role in management account");

        let credentials = assume_role(&self.invoker, &self.client_params, role, &role_arn)
            .await
            .map_err(|source| FanoutError::ManagementAssumption {
                account_id: account_id.to_string(),
                source,
            })?;

        Ok(self.client_params.clone().with_credentials(credentials))
    }

    /// One account's task. Every failure stops here.
    async fn run_task<F, Fut, T>(
        &self,
        callback: &F,
        role: &RoleAssumptionSpec,
        caller_params: &ClientParams,
        account: DirectoryNode,
    ) -> Option<TaskResult<T>>
    where
        F: Fn(Credentials, DirectoryNode) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match self.execute(callback, role, caller_params, &account).await {
            Ok(output) => {
                debug!(account_id = %account.id, "Account task succeeded");
                Some(TaskResult {
                    account_id: account.id,
                    account_name: account.name,
                    output,
                })
            }
            Err(failure @ TaskFailure::Callback(_)) => {
                warn!(
                    account_id = %account.id,
                    account_name = %account.name,
                    error = %failure,
                    "Callback failed, account dropped from results"
                );
                None
            }
            Err(failure) => {
                warn!(
                    account_id = %account.id,
                    account_name = %account.name,
                    error = %failure,
                    "Role assumption failed, account dropped from results"
                );
                None
            }
        }
    }

    async fn execute<F, Fut, T>(
        &self,
        callback: &F,
        role: &RoleAssumptionSpec,
        caller_params: &ClientParams,
        account: &DirectoryNode,
    ) -> Result<T, TaskFailure>
    where
        F: Fn(Credentials, DirectoryNode) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let role_arn = role.role_arn(partition_of(&account.arn), &account.id);
        let credentials = assume_role(&self.invoker, caller_params, role, &role_arn).await?;

        callback(credentials, account.clone())
            .await
            .map_err(TaskFailure::Callback)
    }
}
