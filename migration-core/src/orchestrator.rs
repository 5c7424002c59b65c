//! The migration pipeline: resolve, validate, deploy, bootstrap
//!
//! Every environment runs the same pipeline; environments only differ in the
//! data they carry (network, parameters, bootstrap actions).

use tracing::info;

use crate::{
    backend::ExecutionBackend,
    bootstrap::BootstrapRunner,
    deployments::Deployments,
    environment::Environment,
    errors::DeployError,
    executor::DeploymentExecutor,
    registry::ModuleRegistry,
    resolver::{resolve, DeploymentPlan},
};

/// The outcome of a successful migration run
#[derive(Clone, Debug)]
pub struct RunReport {
    /// The order modules were deployed in
    pub plan: DeploymentPlan,
    /// The deployed modules and their addresses
    pub deployments: Deployments,
    /// The number of bootstrap actions executed
    pub bootstrapped: usize,
}

/// Drives a migration against an execution backend
pub struct Orchestrator<'a, B> {
    /// The backend deployments and calls are made through
    backend: &'a B,
}

/// Resolve the deployment plan and check the environment against it.
///
/// Makes no backend calls; any error returned here is structural.
pub fn plan(registry: &ModuleRegistry, env: &Environment) -> Result<DeploymentPlan, DeployError> {
    let plan = resolve(registry)?;
    env.validate(registry)?;
    Ok(plan)
}

impl<'a, B: ExecutionBackend> Orchestrator<'a, B> {
    /// An orchestrator using the given backend
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Run the full migration for `env`.
    ///
    /// Structural errors are reported before the backend is touched. On a
    /// deployment or bootstrap failure the modules deployed so far keep their
    /// addresses on `registry`.
    pub async fn run(
        &self,
        registry: &mut ModuleRegistry,
        env: &Environment,
    ) -> Result<RunReport, DeployError> {
        let plan = plan(registry, env)?;
        info!(
            environment = %env.name,
            modules = plan.len(),
            bootstrap_actions = env.bootstrap.len(),
            "starting migration"
        );

        let deployments = DeploymentExecutor::new(self.backend)
            .execute(registry, &plan, env)
            .await?;
        let bootstrapped = BootstrapRunner::new(self.backend)
            .run(env, &deployments)
            .await?;

        info!(
            environment = %env.name,
            deployed = deployments.len(),
            bootstrapped,
            "migration complete"
        );
        Ok(RunReport {
            plan,
            deployments,
            bootstrapped,
        })
    }
}
