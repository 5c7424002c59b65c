//! Definitions of CLI arguments and commands for the migration scripts

use clap::{Args, Parser, Subcommand};

use crate::{
    commands::{deploy, print_plan},
    constants::{
        CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH, DEFAULT_DEPLOYMENTS_PATH, MNEMONIC_ENV_VAR,
        PRIV_KEY_ENV_VAR,
    },
    errors::ScriptError,
};

/// Plan and run the contract migration for a target environment
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the migration manifest
    #[arg(short, long, env = CONFIG_ENV_VAR, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Path to the file in which to record deployed addresses
    #[arg(short, long, default_value = DEFAULT_DEPLOYMENTS_PATH)]
    pub deployments_path: String,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// The commands the scripts support
#[derive(Subcommand)]
pub enum Command {
    /// Deploy every module and run the environment's bootstrap actions
    Deploy(DeployArgs),
    /// Print the deployment order for an environment without deploying
    Plan(PlanArgs),
}

impl Command {
    /// Run the command against the manifest at `config_path`
    pub async fn run(self, config_path: &str, deployments_path: &str) -> Result<(), ScriptError> {
        match self {
            Command::Deploy(args) => deploy(args, config_path, deployments_path).await,
            Command::Plan(args) => print_plan(&args, config_path),
        }
    }
}

/// Deploy the migration to an environment
#[derive(Args)]
pub struct DeployArgs {
    /// The environment to deploy to, as named in the manifest
    #[arg(short, long)]
    pub network: String,

    /// Private key of the deployer
    #[arg(short, long, env = PRIV_KEY_ENV_VAR, hide_env_values = true)]
    pub priv_key: Option<String>,

    /// Mnemonic of the deployer, the first derived account is used.
    /// Ignored when a private key is given.
    #[arg(short, long, env = MNEMONIC_ENV_VAR, hide_env_values = true)]
    pub mnemonic: Option<String>,

    /// Resolve and print the plan without connecting to the network
    #[arg(long)]
    pub dry_run: bool,
}

/// Print the deployment plan for an environment
#[derive(Args)]
pub struct PlanArgs {
    /// The environment to plan for, as named in the manifest
    #[arg(short, long)]
    pub network: String,
}
