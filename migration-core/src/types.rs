//! Type definitions for the modules, arguments, and bootstrap actions
//! that make up a migration

use std::fmt::{self, Display};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::errors::DeployError;

/// The identity of a deployable module, e.g. `SafeMath`
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(pub String);

impl ModuleId {
    /// Construct a module id from anything string-like
    pub fn new(id: impl Into<String>) -> Self {
        ModuleId(id.into())
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        ModuleId(id.to_string())
    }
}

/// The value of a constructor or bootstrap argument, prior to resolution
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgValue {
    /// A literal value, in the textual form accepted for its ABI type
    Literal(String),
    /// The address of another deployed module
    Module(ModuleId),
    /// A value supplied by the target environment, falling back to
    /// `default` when the environment does not set it
    Param {
        /// The name of the environment parameter
        name: String,
        /// The value used when the environment does not override it
        #[serde(default)]
        default: Option<String>,
    },
}

/// A typed argument, as declared in the manifest
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    /// The ABI type of the argument, e.g. `uint256`
    #[serde(rename = "type")]
    pub ty: String,
    /// The value of the argument
    pub value: ArgValue,
}

impl Argument {
    /// A literal argument
    pub fn literal(ty: &str, value: impl Into<String>) -> Self {
        Argument {
            ty: ty.to_string(),
            value: ArgValue::Literal(value.into()),
        }
    }

    /// An argument taking the address of the given module
    pub fn module(id: impl Into<ModuleId>) -> Self {
        Argument {
            ty: ADDRESS_TYPE.to_string(),
            value: ArgValue::Module(id.into()),
        }
    }

    /// An argument taking an environment parameter
    pub fn param(ty: &str, name: &str, default: Option<&str>) -> Self {
        Argument {
            ty: ty.to_string(),
            value: ArgValue::Param {
                name: name.to_string(),
                default: default.map(str::to_string),
            },
        }
    }

    /// The module this argument's value depends on, if any
    pub fn module_dependency(&self) -> Option<&ModuleId> {
        match &self.value {
            ArgValue::Module(id) => Some(id),
            _ => None,
        }
    }
}

/// The ABI type name of an address
pub const ADDRESS_TYPE: &str = "address";

/// A resolved argument, ready to be encoded by the execution backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// The ABI type of the argument
    pub ty: String,
    /// The textual value of the argument
    pub value: String,
}

impl Token {
    /// A token carrying an address
    pub fn address(address: Address) -> Self {
        Token {
            ty: ADDRESS_TYPE.to_string(),
            value: address.to_string(),
        }
    }
}

/// A deployable module along with its static dependencies
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Module {
    /// The identity of the module
    pub id: ModuleId,
    /// The compiled artifact to deploy, defaults to the module id
    #[serde(default)]
    artifact: Option<String>,
    /// The constructor arguments, in order
    #[serde(default)]
    pub args: Vec<Argument>,
    /// The library modules that must be linked in before deployment
    #[serde(default)]
    pub links: Vec<ModuleId>,
    /// The deployed address, set exactly once by the deployment executor
    #[serde(skip)]
    address: Option<Address>,
}

impl Module {
    /// A new module with no arguments or links
    pub fn new(id: impl Into<ModuleId>) -> Self {
        Module {
            id: id.into(),
            artifact: None,
            args: Vec::new(),
            links: Vec::new(),
            address: None,
        }
    }

    /// Set the artifact the module is deployed from
    pub fn with_artifact(mut self, artifact: &str) -> Self {
        self.artifact = Some(artifact.to_string());
        self
    }

    /// Append a constructor argument
    pub fn with_arg(mut self, arg: Argument) -> Self {
        self.args.push(arg);
        self
    }

    /// Declare a library link dependency
    pub fn with_link(mut self, library: impl Into<ModuleId>) -> Self {
        self.links.push(library.into());
        self
    }

    /// The compiled artifact this module is deployed from
    pub fn artifact(&self) -> &str {
        self.artifact.as_deref().unwrap_or(self.id.as_str())
    }

    /// The deployed address of the module, if it has been deployed
    pub fn address(&self) -> Option<Address> {
        self.address
    }

    /// Every module this one must be deployed after, link dependencies first,
    /// then constructor argument dependencies. Duplicates are removed.
    pub fn dependencies(&self) -> Vec<&ModuleId> {
        let mut deps: Vec<&ModuleId> = Vec::with_capacity(self.links.len());
        let arg_deps = self.args.iter().filter_map(Argument::module_dependency);
        for dep in self.links.iter().chain(arg_deps) {
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }

        deps
    }

    /// Record the deployed address. Fails if an address was already assigned.
    pub(crate) fn assign_address(&mut self, address: Address) -> Result<(), DeployError> {
        if let Some(existing) = self.address {
            return Err(DeployError::AddressAlreadyAssigned {
                module: self.id.clone(),
                existing,
            });
        }

        self.address = Some(address);
        Ok(())
    }
}

/// A post-deployment call against a deployed module
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BootstrapAction {
    /// The module the call is made against
    pub target: ModuleId,
    /// The name of the method to call
    pub method: String,
    /// The call arguments, in order
    #[serde(default)]
    pub args: Vec<Argument>,
    /// The account the call is sent from, the backend's default when unset
    #[serde(default)]
    pub sender: Option<Address>,
}

impl BootstrapAction {
    /// A short human-readable label, e.g. `ERC20.transfer`
    pub fn label(&self) -> String {
        format!("{}.{}", self.target, self.method)
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Address;

    use super::{Argument, Module, ModuleId};
    use crate::errors::DeployError;

    #[test]
    fn test_dependencies_merge_links_and_args() {
        let farm = Module::new("Farm")
            .with_link("SafeMath")
            .with_arg(Argument::module("ERC721"))
            .with_arg(Argument::module("SafeMath"))
            .with_arg(Argument::literal("uint256", "1"));

        let deps: Vec<&str> = farm.dependencies().into_iter().map(ModuleId::as_str).collect();
        assert_eq!(deps, vec!["SafeMath", "ERC721"]);
    }

    #[test]
    fn test_artifact_defaults_to_id() {
        assert_eq!(Module::new("ERC20").artifact(), "ERC20");
        assert_eq!(Module::new("Token").with_artifact("ERC20").artifact(), "ERC20");
    }

    #[test]
    fn test_address_assigned_once() {
        let mut module = Module::new("SafeMath");
        module.assign_address(Address::repeat_byte(1)).unwrap();

        let err = module.assign_address(Address::repeat_byte(2)).unwrap_err();
        assert!(matches!(err, DeployError::AddressAlreadyAssigned { .. }));
        assert_eq!(module.address(), Some(Address::repeat_byte(1)));
    }
}
