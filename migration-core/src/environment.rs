//! Named target environments and the selection between them

use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    deployments::Deployments,
    errors::{DeployError, FailureCause},
    registry::ModuleRegistry,
    types::{ArgValue, Argument, BootstrapAction, Token},
};

/// The number of confirmations waited for by default
const DEFAULT_CONFIRMATIONS: u64 = 1;

/// Connection parameters for the network an environment targets
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// The RPC endpoint of the network
    pub rpc_url: String,
    /// The expected chain id, any chain is accepted when unset
    #[serde(default)]
    pub network_id: Option<u64>,
    /// The gas limit for each transaction, estimated when unset
    #[serde(default)]
    pub gas_limit: Option<u64>,
    /// The number of confirmations to wait for on each transaction
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
    /// The time allowed for a single deploy or bootstrap call
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Serde default for [`NetworkConfig::confirmations`]
fn default_confirmations() -> u64 {
    DEFAULT_CONFIRMATIONS
}

impl NetworkConfig {
    /// A config for the given RPC endpoint with every other option defaulted
    pub fn new(rpc_url: &str) -> Self {
        NetworkConfig {
            rpc_url: rpc_url.to_string(),
            network_id: None,
            gas_limit: None,
            confirmations: DEFAULT_CONFIRMATIONS,
            timeout_secs: None,
        }
    }

    /// The per-call timeout, if one is configured
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// A named target environment
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Environment {
    /// The name of the environment, filled in from the manifest key
    #[serde(default)]
    pub name: String,
    /// The network to deploy to
    pub network: NetworkConfig,
    /// Overrides for parameterized constructor arguments
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// The calls made after every module is deployed, in order
    #[serde(default)]
    pub bootstrap: Vec<BootstrapAction>,
}

impl Environment {
    /// An environment with no parameters and no bootstrap actions
    pub fn new(name: &str, network: NetworkConfig) -> Self {
        Environment {
            name: name.to_string(),
            network,
            params: BTreeMap::new(),
            bootstrap: Vec::new(),
        }
    }

    /// Set a parameter override
    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    /// Append a bootstrap action
    pub fn with_action(mut self, action: BootstrapAction) -> Self {
        self.bootstrap.push(action);
        self
    }

    /// Resolve an argument against this environment and the modules deployed so far
    pub fn resolve_arg(
        &self,
        arg: &Argument,
        deployments: &Deployments,
    ) -> Result<Token, FailureCause> {
        let value = match &arg.value {
            ArgValue::Literal(value) => value.clone(),
            ArgValue::Module(id) => {
                let address = deployments
                    .get(id)
                    .ok_or_else(|| FailureCause::MissingAddress(id.clone()))?;
                address.to_string()
            }
            ArgValue::Param { name, default } => self
                .params
                .get(name)
                .or(default.as_ref())
                .cloned()
                .ok_or_else(|| FailureCause::MissingParameter(name.clone()))?,
        };

        Ok(Token {
            ty: arg.ty.clone(),
            value,
        })
    }

    /// Resolve a list of arguments, stopping at the first failure
    pub fn resolve_args(
        &self,
        args: &[Argument],
        deployments: &Deployments,
    ) -> Result<Vec<Token>, FailureCause> {
        args.iter()
            .map(|arg| self.resolve_arg(arg, deployments))
            .collect()
    }

    /// Check that the environment can drive a migration of the given modules
    /// before anything is deployed: every parameter without a default is set
    /// and every bootstrap action targets a registered module
    pub fn validate(&self, registry: &ModuleRegistry) -> Result<(), DeployError> {
        for module in registry.iter() {
            self.check_params(module.id.as_str(), &module.args)?;
        }

        for action in &self.bootstrap {
            registry.get(&action.target)?;
            for dep in action.args.iter().filter_map(Argument::module_dependency) {
                registry.get(dep)?;
            }
            self.check_params(&action.label(), &action.args)?;
        }

        Ok(())
    }

    /// Check that every parameter in `args` resolves
    fn check_params(&self, owner: &str, args: &[Argument]) -> Result<(), DeployError> {
        for arg in args {
            if let ArgValue::Param { name, default: None } = &arg.value {
                if !self.params.contains_key(name) {
                    return Err(DeployError::MissingParameter {
                        owner: owner.to_string(),
                        name: name.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// The environments declared for a migration, fixed once constructed
#[derive(Clone, Debug, Default)]
pub struct EnvironmentSet {
    /// The declared environments, by name
    environments: HashMap<String, Environment>,
}

impl EnvironmentSet {
    /// Fix the set of environments, keyed by their names. Names must be unique.
    pub fn new(
        environments: impl IntoIterator<Item = Environment>,
    ) -> Result<Self, DeployError> {
        let mut by_name = HashMap::new();
        for env in environments {
            let name = env.name.clone();
            if by_name.insert(name.clone(), env).is_some() {
                return Err(DeployError::DuplicateEnvironment(name));
            }
        }

        Ok(EnvironmentSet {
            environments: by_name,
        })
    }

    /// Select the environment with the given name. Never falls back to a default.
    pub fn select(&self, name: &str) -> Result<&Environment, DeployError> {
        let env = self.environments.get(name).ok_or_else(|| {
            let mut available: Vec<String> = self.environments.keys().cloned().collect();
            available.sort();
            DeployError::UnknownEnvironment {
                name: name.to_string(),
                available,
            }
        })?;

        info!(
            environment = name,
            rpc_url = %env.network.rpc_url,
            bootstrap_actions = env.bootstrap.len(),
            "selected environment"
        );
        Ok(env)
    }

    /// The names of the declared environments, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.environments.keys().map(String::as_str).collect();
        names.sort();
        names
    }
}
