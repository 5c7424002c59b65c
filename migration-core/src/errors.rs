//! Definitions of errors that can occur while planning and executing a migration

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    time::Duration,
};

use alloy_primitives::Address;
use itertools::Itertools;

use crate::{backend::BackendError, deployments::Deployments, types::ModuleId};

/// Process exit code for a resolution or other structural failure
pub const EXIT_CODE_RESOLUTION: u8 = 2;
/// Process exit code for a failed module deployment
pub const EXIT_CODE_DEPLOYMENT: u8 = 3;
/// Process exit code for a failed bootstrap action
pub const EXIT_CODE_BOOTSTRAP: u8 = 4;
/// Process exit code for any other failure
pub const EXIT_CODE_OTHER: u8 = 1;

/// The underlying reason a deploy or bootstrap step failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The execution backend rejected or failed the call
    Backend(String),
    /// The backend call did not complete within the configured timeout
    Timeout(Duration),
    /// An environment parameter has no value and no default
    MissingParameter(String),
    /// A referenced module has no deployed address
    MissingAddress(ModuleId),
}

impl Display for FailureCause {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Backend(s) => write!(f, "backend error: {}", s),
            FailureCause::Timeout(d) => write!(f, "timed out after {:?}", d),
            FailureCause::MissingParameter(name) => {
                write!(f, "environment parameter `{}` is not set", name)
            }
            FailureCause::MissingAddress(id) => write!(f, "module `{}` has no address", id),
        }
    }
}

impl From<BackendError> for FailureCause {
    fn from(e: BackendError) -> Self {
        FailureCause::Backend(e.to_string())
    }
}

/// Errors that can occur while planning and executing a migration
#[derive(Debug)]
pub enum DeployError {
    /// A module with the same identity was already registered
    DuplicateModule(ModuleId),
    /// A module identity was referenced but never registered
    UnknownModule(ModuleId),
    /// The dependency graph contains a cycle through the given modules
    CyclicDependency(Vec<ModuleId>),
    /// A module was linked before its library dependency was deployed.
    ///
    /// This indicates an inconsistency between the resolver and the linker
    /// and is always fatal.
    UnlinkedDependency {
        /// The module being linked
        module: ModuleId,
        /// The library with no address
        dependency: ModuleId,
    },
    /// A module failed to deploy. Every module in `deployed` was deployed
    /// before the failure and remains on chain.
    DeploymentFailed {
        /// The module that failed to deploy
        module: ModuleId,
        /// The reason for the failure
        cause: FailureCause,
        /// The modules deployed before the failure
        deployed: Deployments,
    },
    /// A bootstrap action failed. The first `completed` actions were
    /// executed and are not rolled back.
    BootstrapFailed {
        /// The index of the failed action in the environment's sequence
        index: usize,
        /// A label for the failed action, e.g. `ERC20.transfer`
        action: String,
        /// The reason for the failure
        cause: FailureCause,
        /// The number of actions executed before the failure
        completed: usize,
    },
    /// Two environments were declared with the same name
    DuplicateEnvironment(String),
    /// No environment with the given name was declared
    UnknownEnvironment {
        /// The requested environment name
        name: String,
        /// The names of the declared environments
        available: Vec<String>,
    },
    /// A module argument references an environment parameter that the
    /// selected environment does not set and that has no default
    MissingParameter {
        /// The module or action declaring the argument
        owner: String,
        /// The parameter name
        name: String,
    },
    /// A module was assigned an address twice
    AddressAlreadyAssigned {
        /// The module in question
        module: ModuleId,
        /// The address it was first assigned
        existing: Address,
    },
}

impl DeployError {
    /// Whether the error was detected before any backend call was made
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            DeployError::DuplicateModule(_)
                | DeployError::UnknownModule(_)
                | DeployError::CyclicDependency(_)
                | DeployError::DuplicateEnvironment(_)
                | DeployError::UnknownEnvironment { .. }
                | DeployError::MissingParameter { .. }
        )
    }

    /// The process exit code used to report this error
    pub fn exit_code(&self) -> u8 {
        match self {
            e if e.is_structural() => EXIT_CODE_RESOLUTION,
            DeployError::DeploymentFailed { .. } => EXIT_CODE_DEPLOYMENT,
            DeployError::BootstrapFailed { .. } => EXIT_CODE_BOOTSTRAP,
            _ => EXIT_CODE_OTHER,
        }
    }
}

impl Display for DeployError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DeployError::DuplicateModule(id) => write!(f, "module `{}` already registered", id),
            DeployError::UnknownModule(id) => write!(f, "unknown module `{}`", id),
            DeployError::CyclicDependency(cycle) => {
                write!(f, "cyclic dependency: {}", cycle.iter().join(" -> "))
            }
            DeployError::UnlinkedDependency { module, dependency } => write!(
                f,
                "internal error: `{}` linked before library `{}` was deployed",
                module, dependency
            ),
            DeployError::DeploymentFailed {
                module,
                cause,
                deployed,
            } => write!(
                f,
                "error deploying `{}`: {} ({} module(s) deployed before the failure)",
                module,
                cause,
                deployed.len()
            ),
            DeployError::BootstrapFailed {
                index,
                action,
                cause,
                completed,
            } => write!(
                f,
                "error running bootstrap action #{} `{}`: {} ({} action(s) completed)",
                index, action, cause, completed
            ),
            DeployError::DuplicateEnvironment(name) => {
                write!(f, "environment `{}` declared more than once", name)
            }
            DeployError::UnknownEnvironment { name, available } => write!(
                f,
                "unknown environment `{}` (declared: {})",
                name,
                available.iter().join(", ")
            ),
            DeployError::MissingParameter { owner, name } => write!(
                f,
                "`{}` requires environment parameter `{}`, which is not set",
                owner, name
            ),
            DeployError::AddressAlreadyAssigned { module, existing } => write!(
                f,
                "module `{}` already deployed at {}",
                module, existing
            ),
        }
    }
}

impl Error for DeployError {}
