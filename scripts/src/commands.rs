//! Implementations of the migration scripts

use itertools::Itertools;
use migration_core::{
    environment::Environment,
    orchestrator::{plan, Orchestrator},
    registry::ModuleRegistry,
    resolver::DeploymentPlan,
};
use tracing::{error, info, warn};

use crate::{
    cli::{DeployArgs, PlanArgs},
    config::Manifest,
    errors::ScriptError,
    rpc::{check_senders, RpcBackend},
    utils::{load_signer, write_deployments},
};

/// Deploy every module to the selected environment and bootstrap it.
///
/// Addresses of modules that reached the chain are recorded in the
/// deployments file even when the run fails part way.
pub async fn deploy(
    args: DeployArgs,
    config_path: &str,
    deployments_path: &str,
) -> Result<(), ScriptError> {
    let manifest = Manifest::load(config_path)?;
    let environments = manifest.environments()?;
    let env = environments.select(&args.network)?;
    let mut registry = manifest.registry()?;

    if args.dry_run {
        let plan = plan(&registry, env)?;
        return print_steps(&registry, &plan, env);
    }

    let signer = load_signer(args.priv_key.as_deref(), args.mnemonic.as_deref())?;
    check_senders(signer.address(), &env.bootstrap)?;
    let backend = RpcBackend::connect(&env.network, signer, manifest.artifacts_dir()).await?;
    let result = Orchestrator::new(&backend).run(&mut registry, env).await;

    let deployed = registry.deployed();
    if !deployed.is_empty() {
        match write_deployments(deployments_path, &env.name, &deployed) {
            Ok(()) => info!(
                path = deployments_path,
                deployed = deployed.len(),
                "recorded deployed addresses"
            ),
            // The migration error takes precedence over the bookkeeping one
            Err(e) if result.is_err() => error!("{e}"),
            Err(e) => return Err(e),
        }
    }

    if result.is_err() && !deployed.is_empty() {
        warn!(
            deployed = deployed.len(),
            path = deployments_path,
            "migration failed after deploying some modules"
        );
    }

    let report = result?;
    for (id, address) in report.deployments.iter() {
        println!("{id} deployed at {address:#x}");
    }
    println!("{} bootstrap action(s) executed", report.bootstrapped);

    Ok(())
}

/// Print the order modules would be deployed to the selected environment in
pub fn print_plan(args: &PlanArgs, config_path: &str) -> Result<(), ScriptError> {
    let manifest = Manifest::load(config_path)?;
    let environments = manifest.environments()?;
    let env = environments.select(&args.network)?;
    let registry = manifest.registry()?;

    let plan = plan(&registry, env)?;
    print_steps(&registry, &plan, env)
}

/// Print each deployment with its libraries, followed by the bootstrap actions
fn print_steps(
    registry: &ModuleRegistry,
    plan: &DeploymentPlan,
    env: &Environment,
) -> Result<(), ScriptError> {
    println!("Migration plan for `{}`:", env.name);
    for (step, id) in plan.modules().iter().enumerate() {
        let module = registry.get(id)?;
        if module.links.is_empty() {
            println!("{:>3}. deploy {id}", step + 1);
        } else {
            println!(
                "{:>3}. deploy {id} (linking {})",
                step + 1,
                module.links.iter().join(", ")
            );
        }
    }

    for action in &env.bootstrap {
        println!("  then {}", action.label());
    }

    Ok(())
}
