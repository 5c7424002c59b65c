//! The record of module addresses produced by a migration run

use alloy_primitives::Address;

use crate::types::ModuleId;

/// The addresses of the modules deployed so far, in deployment order.
///
/// Owned by a single migration run and only appended to by the deployment executor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Deployments {
    /// The deployed modules and their addresses
    entries: Vec<(ModuleId, Address)>,
}

impl Deployments {
    /// The address of the given module, if it was deployed
    pub fn get(&self, id: &ModuleId) -> Option<Address> {
        self.entries
            .iter()
            .find_map(|(module, address)| (module == id).then_some(*address))
    }

    /// Whether the given module was deployed
    pub fn contains(&self, id: &ModuleId) -> bool {
        self.get(id).is_some()
    }

    /// The number of deployed modules
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no module was deployed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the deployed modules in deployment order
    pub fn iter(&self) -> impl Iterator<Item = (&ModuleId, &Address)> {
        self.entries.iter().map(|(id, address)| (id, address))
    }

    /// Record a deployed module
    pub(crate) fn record(&mut self, id: ModuleId, address: Address) {
        debug_assert!(!self.contains(&id), "module recorded twice");
        self.entries.push((id, address));
    }
}

impl FromIterator<(ModuleId, Address)> for Deployments {
    fn from_iter<T: IntoIterator<Item = (ModuleId, Address)>>(iter: T) -> Self {
        let mut deployments = Deployments::default();
        for (id, address) in iter {
            deployments.record(id, address);
        }

        deployments
    }
}
