//! An in-memory execution backend for tests

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};

use alloy_primitives::{Address, TxHash};

use crate::{
    backend::{BackendError, ExecutionBackend},
    linker::LinkBindings,
    types::Token,
};

/// A deployment received by the mock backend
#[derive(Clone, Debug)]
pub struct DeployRecord {
    /// The deployed artifact
    pub artifact: String,
    /// The constructor arguments
    pub args: Vec<Token>,
    /// The linked libraries
    pub links: LinkBindings,
    /// The address handed out
    pub address: Address,
}

/// A method call received by the mock backend
#[derive(Clone, Debug)]
pub struct CallRecord {
    /// The called instance
    pub address: Address,
    /// The called method
    pub method: String,
    /// The call arguments
    pub args: Vec<Token>,
    /// The sender, if one was given
    pub sender: Option<Address>,
}

/// A backend that hands out sequential addresses and records every request.
///
/// Failures and delays can be scripted per artifact or method.
#[derive(Debug, Default)]
pub struct MockBackend {
    /// Artifacts whose deployment fails
    failing_deploys: HashSet<String>,
    /// Methods whose calls fail
    failing_calls: HashSet<String>,
    /// Artifacts whose deployment takes the given time
    deploy_delays: HashMap<String, Duration>,
    /// Methods whose calls take the given time
    call_delays: HashMap<String, Duration>,
    /// The deployments made so far
    deploys: Mutex<Vec<DeployRecord>>,
    /// The calls made so far
    calls: Mutex<Vec<CallRecord>>,
}

impl MockBackend {
    /// A backend on which every request succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Make deployments of the given artifact fail
    pub fn fail_deploy(mut self, artifact: &str) -> Self {
        self.failing_deploys.insert(artifact.to_string());
        self
    }

    /// Make calls to the given method fail
    pub fn fail_call(mut self, method: &str) -> Self {
        self.failing_calls.insert(method.to_string());
        self
    }

    /// Make deployments of the given artifact take `delay`
    pub fn delay_deploy(mut self, artifact: &str, delay: Duration) -> Self {
        self.deploy_delays.insert(artifact.to_string(), delay);
        self
    }

    /// Make calls to the given method take `delay`
    pub fn delay_call(mut self, method: &str, delay: Duration) -> Self {
        self.call_delays.insert(method.to_string(), delay);
        self
    }

    /// The deployments made so far, in order
    pub fn deploys(&self) -> Vec<DeployRecord> {
        self.deploys.lock().unwrap().clone()
    }

    /// The calls made so far, in order
    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls.lock().unwrap().clone()
    }

    /// The artifacts deployed so far, in order
    pub fn deployed_artifacts(&self) -> Vec<String> {
        self.deploys().into_iter().map(|d| d.artifact).collect()
    }

    /// The methods called so far, in order
    pub fn called_methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.method).collect()
    }
}

impl ExecutionBackend for MockBackend {
    async fn deploy(
        &self,
        artifact: &str,
        args: &[Token],
        links: &LinkBindings,
    ) -> Result<Address, BackendError> {
        if let Some(delay) = self.deploy_delays.get(artifact) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_deploys.contains(artifact) {
            return Err(BackendError::new(format!("{artifact} reverted")));
        }

        let mut deploys = self.deploys.lock().unwrap();
        let nonce = deploys.len() as u64 + 1;
        let address = Address::left_padding_from(&nonce.to_be_bytes());
        deploys.push(DeployRecord {
            artifact: artifact.to_string(),
            args: args.to_vec(),
            links: links.clone(),
            address,
        });

        Ok(address)
    }

    async fn call(
        &self,
        address: Address,
        method: &str,
        args: &[Token],
        sender: Option<Address>,
    ) -> Result<TxHash, BackendError> {
        if let Some(delay) = self.call_delays.get(method) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_calls.contains(method) {
            return Err(BackendError::new(format!("{method} reverted")));
        }

        let mut calls = self.calls.lock().unwrap();
        calls.push(CallRecord {
            address,
            method: method.to_string(),
            args: args.to_vec(),
            sender,
        });

        let nonce = calls.len() as u64;
        Ok(TxHash::left_padding_from(&nonce.to_be_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Address;

    use super::MockBackend;
    use crate::{backend::ExecutionBackend, linker::LinkBindings};

    #[tokio::test]
    async fn test_addresses_stay_distinct_past_255_deploys() {
        let backend = MockBackend::new();
        let links = LinkBindings::default();

        let mut last = Address::ZERO;
        for _ in 0..300 {
            last = backend.deploy("Token", &[], &links).await.unwrap();
        }

        assert_eq!(last, Address::left_padding_from(&300u64.to_be_bytes()));
        let mut addresses: Vec<Address> = backend.deploys().iter().map(|d| d.address).collect();
        addresses.sort();
        addresses.dedup();
        assert_eq!(addresses.len(), 300);
    }
}
