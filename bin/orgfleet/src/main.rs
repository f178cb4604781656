//! OrgFleet command-line front end
//!
//! Thin wrapper over the three library components:
//! - tree / accounts / parents: organization discovery (of-directory)
//! - invoke: one named operation, auto-paginated (of-invoke)
//! - fanout: one named operation in every target account (of-fanout)
//!
//! Results are printed as JSON on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use of_common::{Credentials, RoleAssumptionSpec};
use of_config::{AppConfig, ConfigLoader};
use of_directory::{DirectoryNode, DirectoryTreeBuilder, Target};
use of_fanout::{assume_role, FanoutConfig, FanoutExecutor};
use of_invoke::aws::AwsServices;
use of_invoke::{ClientParams, PagedCallDescriptor, PagedInvoker};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

/// Discover an AWS organization and run operations in every account
#[derive(Parser, Debug)]
#[command(name = "orgfleet")]
#[command(version, about = "Discover an AWS organization and run operations in every account")]
struct Args {
    /// Configuration file
    #[arg(long, global = true, env = "ORGFLEET_CONFIG")]
    config: Option<PathBuf>,

    /// AWS region
    #[arg(long, global = true)]
    region: Option<String>,

    /// Named AWS profile
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Assume the role into this account before listing the organization
    #[arg(long, global = true)]
    management_account: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the organization tree below a root, OU or account
    Tree(TargetArgs),

    /// Print the accounts below a root, OU or account
    Accounts(TargetArgs),

    /// Print the ancestors of an account
    Parents {
        account_id: String,

        /// Leave the root out
        #[arg(long)]
        ous_only: bool,
    },

    /// Invoke one operation, following pagination
    Invoke {
        #[command(flatten)]
        call: CallArgs,

        /// Client construction params as JSON (region, credentials, endpointUrl, maxAttempts)
        #[arg(long)]
        client_params: Option<String>,
    },

    /// Invoke one operation in every target account
    Fanout {
        #[command(flatten)]
        call: CallArgs,

        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        role: RoleArgs,
    },

    /// Print an example configuration file
    ConfigExample,
}

#[derive(ClapArgs, Debug)]
struct TargetArgs {
    /// Root id, OU id or account id (default: the organization root)
    target: Option<String>,

    /// Include nested OUs
    #[arg(long, short)]
    recursive: bool,

    /// Leave out SUSPENDED accounts
    #[arg(long)]
    skip_suspended: bool,
}

#[derive(ClapArgs, Debug)]
struct CallArgs {
    /// Service name, e.g. organizations or sts
    service: String,

    /// Operation name, e.g. ListAccounts
    operation: String,

    /// Operation params as a JSON object
    #[arg(long)]
    params: Option<String>,

    /// Return only this field of the merged result
    #[arg(long)]
    result_key: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct RoleArgs {
    /// Role assumed in each account (default from config)
    #[arg(long)]
    role_name: Option<String>,

    #[arg(long)]
    session_name: Option<String>,

    #[arg(long)]
    external_id: Option<String>,

    #[arg(long)]
    duration_seconds: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (JSON if LOG_FORMAT=json, text otherwise)
    of_common::logging::init_logging("orgfleet");

    let args = Args::parse();

    if let Command::ConfigExample = args.command {
        print!("{}", AppConfig::example_toml());
        return Ok(());
    }

    let config = load_config(&args)?;
    let services = AwsServices::load(config.aws.region.clone(), config.aws.profile.clone()).await;
    let invoker = PagedInvoker::new(services.registry());
    let client_params = ClientParams {
        region: config.aws.region.clone(),
        credentials: None,
        endpoint_url: config.aws.endpoint_url.clone(),
        max_attempts: config.aws.max_attempts,
    };

    match args.command {
        Command::Tree(opts) => {
            let target = Target::parse(opts.target.as_deref())?;
            let skip = opts.skip_suspended || config.fanout.skip_suspended;
            let builder = directory(&invoker, &client_params, &config).await?;
            let tree = builder.build_tree(&target, opts.recursive, skip).await?;
            if skip && tree.is_suspended() {
                return print_json(&Value::Null);
            }
            print_json(&tree)
        }
        Command::Accounts(opts) => {
            let skip = opts.skip_suspended || config.fanout.skip_suspended;
            let builder = directory(&invoker, &client_params, &config).await?;
            let accounts = builder
                .resolve(opts.target.as_deref(), opts.recursive, skip)
                .await?
                .into_accounts(opts.recursive);
            print_json(&accounts)
        }
        Command::Parents {
            account_id,
            ous_only,
        } => {
            let builder = directory(&invoker, &client_params, &config).await?;
            let tree = builder.build_tree(&Target::Root(None), true, false).await?;
            let parents = if ous_only {
                tree.get_parent_ous_for(&account_id)
            } else {
                tree.get_parents_for(&account_id)
            };
            let parents: Vec<NodeSummary> = parents.into_iter().map(NodeSummary::from).collect();
            print_json(&parents)
        }
        Command::Invoke {
            call,
            client_params: raw_params,
        } => {
            let params: ClientParams = match raw_params {
                Some(raw) => serde_json::from_str(&raw).context("--client-params is not valid JSON")?,
                None => client_params,
            };
            let descriptor = call.descriptor(params)?;
            let output = invoker.invoke(&descriptor).await?;
            print_json(&output.into_json())
        }
        Command::Fanout { call, target, role } => {
            let role = role.apply(config.role.to_spec());
            let fanout_config = FanoutConfig {
                max_concurrency: config.fanout.max_concurrency,
                skip_suspended: target.skip_suspended || config.fanout.skip_suspended,
                management_account: config.fanout.management_account.clone(),
            };
            let template = call.descriptor(client_params.clone())?;
            let task_invoker = invoker.clone();
            let executor = FanoutExecutor::new(invoker, client_params, fanout_config);

            let results = executor
                .run(
                    |credentials: Credentials, _account: DirectoryNode| {
                        let invoker = &task_invoker;
                        let mut descriptor = template.clone();
                        descriptor.constructor_params =
                            descriptor.constructor_params.with_credentials(credentials);
                        async move {
                            let output = invoker.invoke(&descriptor).await?;
                            Ok::<_, anyhow::Error>(output.into_json())
                        }
                    },
                    &role,
                    target.target.as_deref(),
                    target.recursive,
                )
                .await?;
            print_json(&results)
        }
        Command::ConfigExample => Ok(()),
    }
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let loader = match &args.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load().context("Failed to load configuration")?;

    if let Some(region) = &args.region {
        config.aws.region = Some(region.clone());
    }
    if let Some(profile) = &args.profile {
        config.aws.profile = Some(profile.clone());
    }
    if let Some(account) = &args.management_account {
        config.fanout.management_account = Some(account.clone());
    }
    config.validate()?;
    Ok(config)
}

/// Tree builder for the directory commands, assuming into the management
/// account first when one is configured.
async fn directory(
    invoker: &PagedInvoker,
    client_params: &ClientParams,
    config: &AppConfig,
) -> Result<DirectoryTreeBuilder> {
    let params = match &config.fanout.management_account {
        Some(account_id) => {
            let role = config.role.to_spec();
            let role_arn = role.role_arn("aws", account_id);
            info!(account_id = %account_id, "Assuming role in management account");
            let credentials = assume_role(invoker, client_params, &role, &role_arn)
                .await
                .with_context(|| format!("Failed to assume {}", role_arn))?;
            client_params.clone().with_credentials(credentials)
        }
        None => client_params.clone(),
    };
    Ok(DirectoryTreeBuilder::new(invoker.clone(), params))
}

impl CallArgs {
    fn descriptor(&self, client_params: ClientParams) -> Result<PagedCallDescriptor> {
        let params: Value = match &self.params {
            Some(raw) => serde_json::from_str(raw).context("--params is not valid JSON")?,
            None => Value::Object(Default::default()),
        };
        anyhow::ensure!(params.is_object(), "--params must be a JSON object");

        let mut descriptor = PagedCallDescriptor::new(&self.service, &self.operation)
            .client_params(client_params)
            .params(params);
        descriptor.result_key = self.result_key.clone();
        Ok(descriptor)
    }
}

impl RoleArgs {
    fn apply(self, mut spec: RoleAssumptionSpec) -> RoleAssumptionSpec {
        if let Some(role_name) = self.role_name {
            spec.role_name = role_name;
        }
        if let Some(session_name) = self.session_name {
            spec.session_name = session_name;
        }
        if self.external_id.is_some() {
            spec.external_id = self.external_id;
        }
        if let Some(duration) = self.duration_seconds {
            spec.duration_seconds = duration;
        }
        spec
    }
}

/// Node identity without its subtree.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct NodeSummary<'a> {
    id: &'a str,
    node_type: of_directory::NodeType,
    name: &'a str,
    arn: &'a str,
}

impl<'a> From<&'a DirectoryNode> for NodeSummary<'a> {
    fn from(node: &'a DirectoryNode) -> Self {
        Self {
            id: &node.id,
            node_type: node.node_type,
            name: &node.name,
            arn: &node.arn,
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
