//! Deploys the modules of a plan, in order, through an execution backend

use tracing::{debug, error, info};

use crate::{
    backend::{with_timeout, ExecutionBackend},
    deployments::Deployments,
    environment::Environment,
    errors::{DeployError, FailureCause},
    linker,
    registry::ModuleRegistry,
    resolver::DeploymentPlan,
    types::ModuleId,
};

/// Issues the deploy calls for a deployment plan
pub struct DeploymentExecutor<'a, B> {
    /// The backend deployments are made through
    backend: &'a B,
}

impl<'a, B: ExecutionBackend> DeploymentExecutor<'a, B> {
    /// An executor deploying through the given backend
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Deploy every module in `plan`, in order, assigning each its address.
    ///
    /// The first failure stops the run. Modules deployed before it keep their
    /// addresses, both on the registry and in the returned error. Nothing is
    /// retried.
    pub async fn execute(
        &self,
        registry: &mut ModuleRegistry,
        plan: &DeploymentPlan,
        env: &Environment,
    ) -> Result<Deployments, DeployError> {
        for id in plan.modules() {
            if let Some(existing) = registry.get(id)?.address() {
                return Err(DeployError::AddressAlreadyAssigned {
                    module: id.clone(),
                    existing,
                });
            }
        }

        let timeout = env.network.timeout();
        let mut deployments = Deployments::default();
        for (i, id) in plan.modules().iter().enumerate() {
            let module = registry.get(id)?;
            let links = linker::apply(module, registry)?;
            let artifact = module.artifact().to_string();
            let args = match env.resolve_args(&module.args, &deployments) {
                Ok(args) => args,
                Err(cause) => return Err(failed(id, cause, deployments)),
            };

            info!(
                module = %id,
                artifact = %artifact,
                step = i + 1,
                total = plan.len(),
                "deploying module"
            );
            debug!(module = %id, ?args, "constructor arguments");

            let call = self.backend.deploy(&artifact, &args, &links);
            let address = match with_timeout(timeout, call).await {
                Ok(address) => address,
                Err(cause) => return Err(failed(id, cause, deployments)),
            };

            registry.get_mut(id)?.assign_address(address)?;
            deployments.record(id.clone(), address);
            info!(module = %id, %address, "deployed module");
        }

        Ok(deployments)
    }
}

/// Build the error for a failed deployment of `module`
fn failed(module: &ModuleId, cause: FailureCause, deployed: Deployments) -> DeployError {
    error!(%module, %cause, deployed = deployed.len(), "deployment failed, aborting");
    DeployError::DeploymentFailed {
        module: module.clone(),
        cause,
        deployed,
    }
}
