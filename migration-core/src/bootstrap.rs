//! Runs an environment's post-deployment initialization calls
//!
//! Actions are independent backend calls. A failure stops the sequence, but
//! actions that already ran are not rolled back: the backend offers no
//! transaction spanning several calls, so a partially bootstrapped deployment
//! is left for the operator to complete or redeploy.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::{
    backend::{with_timeout, ExecutionBackend},
    deployments::Deployments,
    environment::Environment,
    errors::{DeployError, FailureCause},
    types::BootstrapAction,
};

/// Executes the bootstrap actions of an environment
pub struct BootstrapRunner<'a, B> {
    /// The backend calls are made through
    backend: &'a B,
}

impl<'a, B: ExecutionBackend> BootstrapRunner<'a, B> {
    /// A runner calling through the given backend
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Execute `env`'s bootstrap actions in declaration order, returning the
    /// number executed. An environment without actions is a no-op.
    pub async fn run(
        &self,
        env: &Environment,
        deployments: &Deployments,
    ) -> Result<usize, DeployError> {
        if env.bootstrap.is_empty() {
            info!(environment = %env.name, "no bootstrap actions declared");
            return Ok(0);
        }

        let timeout = env.network.timeout();
        for (index, action) in env.bootstrap.iter().enumerate() {
            if let Err(cause) = self.run_action(env, action, deployments, timeout).await {
                error!(
                    environment = %env.name,
                    index,
                    action = %action.label(),
                    %cause,
                    "bootstrap action failed, aborting"
                );
                if index > 0 {
                    warn!(completed = index, "earlier bootstrap actions are not rolled back");
                }

                return Err(DeployError::BootstrapFailed {
                    index,
                    action: action.label(),
                    cause,
                    completed: index,
                });
            }
        }

        Ok(env.bootstrap.len())
    }

    /// Resolve and execute a single action
    async fn run_action(
        &self,
        env: &Environment,
        action: &BootstrapAction,
        deployments: &Deployments,
        timeout: Option<Duration>,
    ) -> Result<(), FailureCause> {
        let target = deployments
            .get(&action.target)
            .ok_or_else(|| FailureCause::MissingAddress(action.target.clone()))?;
        let args = env.resolve_args(&action.args, deployments)?;

        let call = self.backend.call(target, &action.method, &args, action.sender);
        let tx_hash = with_timeout(timeout, call).await?;
        info!(action = %action.label(), %target, %tx_hash, "bootstrap action executed");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use alloy_primitives::Address;

    use super::BootstrapRunner;
    use crate::{
        deployments::Deployments,
        environment::{Environment, NetworkConfig},
        errors::{DeployError, FailureCause},
        test_helpers::MockBackend,
        types::{Argument, BootstrapAction, ModuleId},
    };

    fn action(target: &str, method: &str, args: Vec<Argument>) -> BootstrapAction {
        BootstrapAction {
            target: ModuleId::new(target),
            method: method.to_string(),
            args,
            sender: None,
        }
    }

    fn deployments() -> Deployments {
        vec![
            (ModuleId::new("ERC20"), Address::repeat_byte(0x20)),
            (ModuleId::new("Farm"), Address::repeat_byte(0xfa)),
        ]
        .into_iter()
        .collect()
    }

    fn env(actions: Vec<BootstrapAction>) -> Environment {
        let mut env = Environment::new("development", NetworkConfig::new("http://127.0.0.1:7545"))
            .with_param("reward", "1000");
        env.bootstrap = actions;
        env
    }

    #[tokio::test]
    async fn test_runs_actions_in_order() {
        let backend = MockBackend::new();
        let env = env(vec![
            action(
                "ERC20",
                "transfer",
                vec![
                    Argument::module("Farm"),
                    Argument::param("uint256", "reward", None),
                ],
            ),
            action("Farm", "start", vec![]),
        ]);

        let executed = BootstrapRunner::new(&backend)
            .run(&env, &deployments())
            .await
            .unwrap();
        assert_eq!(executed, 2);

        let calls = backend.calls();
        assert_eq!(backend.called_methods(), vec!["transfer", "start"]);
        assert_eq!(calls[0].address, Address::repeat_byte(0x20));
        assert_eq!(calls[0].args[0].value, Address::repeat_byte(0xfa).to_string());
        assert_eq!(calls[0].args[1].value, "1000");
        assert_eq!(calls[1].address, Address::repeat_byte(0xfa));
    }

    #[tokio::test]
    async fn test_empty_sequence_is_noop() {
        let backend = MockBackend::new();
        let executed = BootstrapRunner::new(&backend)
            .run(&env(vec![]), &Deployments::default())
            .await
            .unwrap();

        assert_eq!(executed, 0);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_target_address_stops_sequence() {
        let backend = MockBackend::new();
        let env = env(vec![
            action("Farm", "start", vec![]),
            action("Arena", "register", vec![]),
            action("ERC20", "approve", vec![]),
        ]);

        let err = BootstrapRunner::new(&backend)
            .run(&env, &deployments())
            .await
            .unwrap_err();

        match err {
            DeployError::BootstrapFailed {
                index,
                action,
                cause,
                completed,
            } => {
                assert_eq!(index, 1);
                assert_eq!(action, "Arena.register");
                assert_eq!(cause, FailureCause::MissingAddress(ModuleId::new("Arena")));
                assert_eq!(completed, 1);
            }
            other => panic!("expected a bootstrap failure, got {other:?}"),
        }
        assert_eq!(backend.called_methods(), vec!["start"]);
    }

    #[tokio::test]
    async fn test_missing_argument_address() {
        let backend = MockBackend::new();
        let env = env(vec![action("ERC20", "approve", vec![Argument::module("Arena")])]);

        let err = BootstrapRunner::new(&backend)
            .run(&env, &deployments())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DeployError::BootstrapFailed { cause: FailureCause::MissingAddress(id), .. }
                if id.as_str() == "Arena"
        ));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_stops_sequence() {
        let backend = MockBackend::new().fail_call("transfer");
        let env = env(vec![
            action("Farm", "start", vec![]),
            action("ERC20", "transfer", vec![]),
            action("ERC20", "approve", vec![]),
        ]);

        let err = BootstrapRunner::new(&backend)
            .run(&env, &deployments())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DeployError::BootstrapFailed { index: 1, cause: FailureCause::Backend(_), .. }
        ));
        assert_eq!(backend.called_methods(), vec!["start"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_timeout_stops_sequence() {
        let backend = MockBackend::new().delay_call("transfer", Duration::from_secs(5));
        let mut env = env(vec![
            action("Farm", "start", vec![]),
            action("ERC20", "transfer", vec![]),
            action("ERC20", "approve", vec![]),
        ]);
        env.network.timeout_secs = Some(1);

        let err = BootstrapRunner::new(&backend)
            .run(&env, &deployments())
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), 4);
        match err {
            DeployError::BootstrapFailed {
                index,
                action,
                cause,
                completed,
            } => {
                assert_eq!(index, 1);
                assert_eq!(action, "ERC20.transfer");
                assert_eq!(cause, FailureCause::Timeout(Duration::from_secs(1)));
                assert_eq!(completed, 1);
            }
            other => panic!("expected a bootstrap failure, got {other:?}"),
        }
        assert_eq!(backend.called_methods(), vec!["start"]);
    }
}
