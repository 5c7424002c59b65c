//! End-to-end runs of the migration pipeline against the mock backend

use migration_core::{
    environment::{Environment, EnvironmentSet, NetworkConfig},
    errors::{DeployError, FailureCause},
    orchestrator::{plan, Orchestrator},
    registry::ModuleRegistry,
    test_helpers::MockBackend,
    types::{Argument, BootstrapAction, Module, ModuleId},
};

/// The farm modules, registered in the order the migration declares them
fn farm_registry() -> ModuleRegistry {
    ModuleRegistry::try_from(vec![
        Module::new("SafeMath"),
        Module::new("Counters").with_link("SafeMath"),
        Module::new("ERC20")
            .with_link("SafeMath")
            .with_arg(Argument::literal("string", "FarmCoin"))
            .with_arg(Argument::param("string", "ticker", Some("FC")))
            .with_arg(Argument::literal("uint256", "1000000000000000000000000000000"))
            .with_arg(Argument::literal("uint8", "8")),
        Module::new("ERC721")
            .with_link("SafeMath")
            .with_link("Counters"),
        Module::new("Farm")
            .with_link("SafeMath")
            .with_arg(Argument::module("ERC721"))
            .with_arg(Argument::module("ERC20")),
    ])
    .unwrap()
}

/// A development environment funding the farm, and an empty rinkeby one
fn environments() -> EnvironmentSet {
    let development = Environment::new("development", NetworkConfig::new("http://127.0.0.1:7545"))
        .with_param("reward", "500000")
        .with_action(BootstrapAction {
            target: ModuleId::new("ERC20"),
            method: "transfer".to_string(),
            args: vec![
                Argument::module("Farm"),
                Argument::param("uint256", "reward", None),
            ],
            sender: None,
        });
    let rinkeby = Environment::new("rinkeby", NetworkConfig::new("https://rinkeby.example"))
        .with_param("ticker", "tFC");

    EnvironmentSet::new(vec![development, rinkeby]).unwrap()
}

#[tokio::test]
async fn test_development_migration() {
    let mut registry = farm_registry();
    let envs = environments();
    let env = envs.select("development").unwrap();
    let backend = MockBackend::new();

    let report = Orchestrator::new(&backend)
        .run(&mut registry, env)
        .await
        .unwrap();

    let order: Vec<&str> = report.plan.modules().iter().map(ModuleId::as_str).collect();
    assert_eq!(order, vec!["SafeMath", "Counters", "ERC20", "ERC721", "Farm"]);
    assert_eq!(report.deployments.len(), 5);
    assert_eq!(report.bootstrapped, 1);
    assert_eq!(registry.deployed(), report.deployments);

    // The ticker default applies when the environment does not override it
    let erc20 = &backend.deploys()[2];
    assert_eq!(erc20.args[1].value, "FC");

    // The farm is funded with its own address as recipient
    let farm = report.deployments.get(&ModuleId::new("Farm")).unwrap();
    let transfer = &backend.calls()[0];
    assert_eq!(transfer.method, "transfer");
    assert_eq!(transfer.args[0].value, farm.to_string());
    assert_eq!(transfer.args[1].value, "500000");
}

#[tokio::test]
async fn test_environment_without_bootstrap() {
    let mut registry = farm_registry();
    let envs = environments();
    let env = envs.select("rinkeby").unwrap();
    let backend = MockBackend::new();

    let report = Orchestrator::new(&backend)
        .run(&mut registry, env)
        .await
        .unwrap();

    assert_eq!(report.bootstrapped, 0);
    assert!(backend.calls().is_empty());
    assert_eq!(backend.deploys()[2].args[1].value, "tFC");
}

#[tokio::test]
async fn test_partial_deployment_is_reported() {
    let mut registry = farm_registry();
    let envs = environments();
    let env = envs.select("development").unwrap();
    let backend = MockBackend::new().fail_deploy("ERC20");

    let err = Orchestrator::new(&backend)
        .run(&mut registry, env)
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), 3);
    match err {
        DeployError::DeploymentFailed {
            module,
            cause: FailureCause::Backend(_),
            deployed,
        } => {
            assert_eq!(module.as_str(), "ERC20");
            let ids: Vec<&str> = deployed.iter().map(|(id, _)| id.as_str()).collect();
            assert_eq!(ids, vec!["SafeMath", "Counters"]);
            assert_eq!(registry.deployed(), deployed);
        }
        other => panic!("expected a deployment failure, got {other:?}"),
    }
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_bootstrap_failure_keeps_deployments() {
    let mut registry = farm_registry();
    let envs = environments();
    let env = envs.select("development").unwrap();
    let backend = MockBackend::new().fail_call("transfer");

    let err = Orchestrator::new(&backend)
        .run(&mut registry, env)
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), 4);
    assert!(matches!(err, DeployError::BootstrapFailed { completed: 0, .. }));
    assert_eq!(registry.deployed().len(), 5);
}

#[test]
fn test_plan_is_deterministic() {
    let registry = farm_registry();
    let envs = environments();
    let env = envs.select("rinkeby").unwrap();

    assert_eq!(plan(&registry, env).unwrap(), plan(&registry, env).unwrap());
}

#[test]
fn test_unknown_environment() {
    let err = environments().select("mainnet").unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert_eq!(
        err.to_string(),
        "unknown environment `mainnet` (declared: development, rinkeby)"
    );
}
