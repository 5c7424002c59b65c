//! Core of the contract migration orchestrator: module registration,
//! dependency resolution, linking, deployment, and bootstrapping.
//!
//! Nothing in this crate talks to a network. Deployments and calls go
//! through an [`ExecutionBackend`](backend::ExecutionBackend).

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod backend;
pub mod bootstrap;
pub mod deployments;
pub mod environment;
pub mod errors;
pub mod executor;
pub mod linker;
pub mod orchestrator;
pub mod registry;
pub mod resolver;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
pub mod types;
