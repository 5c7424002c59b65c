//! The interface to the system that actually deploys modules and calls into them

use std::{
    fmt::{self, Display, Formatter},
    future::Future,
    time::Duration,
};

use alloy_primitives::{Address, TxHash};

use crate::{errors::FailureCause, linker::LinkBindings, types::Token};

/// An error reported by an execution backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError(pub String);

impl BackendError {
    /// Construct a backend error from a message
    pub fn new(msg: impl Into<String>) -> Self {
        BackendError(msg.into())
    }
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BackendError {}

/// The system that performs deployments and method calls.
///
/// Each method resolves once the backend considers the operation confirmed.
/// Neither operation is assumed to be safe to retry.
#[allow(async_fn_in_trait)]
pub trait ExecutionBackend {
    /// Deploy the given artifact with the given constructor arguments and
    /// library bindings, returning the address of the new instance
    async fn deploy(
        &self,
        artifact: &str,
        args: &[Token],
        links: &LinkBindings,
    ) -> Result<Address, BackendError>;

    /// Call `method` on the instance at `address`, sent from `sender` or the
    /// backend's default account when unset
    async fn call(
        &self,
        address: Address,
        method: &str,
        args: &[Token],
        sender: Option<Address>,
    ) -> Result<TxHash, BackendError>;
}

/// Await a backend call, giving up after `timeout` when one is set.
///
/// Giving up does not cancel anything already submitted by the backend.
pub(crate) async fn with_timeout<T>(
    timeout: Option<Duration>,
    call: impl Future<Output = Result<T, BackendError>>,
) -> Result<T, FailureCause> {
    match timeout {
        Some(duration) => tokio::time::timeout(duration, call)
            .await
            .map_err(|_| FailureCause::Timeout(duration))?
            .map_err(FailureCause::from),
        None => call.await.map_err(FailureCause::from),
    }
}
