//! The registry of deployable modules

use std::collections::HashMap;

use tracing::debug;

use crate::{
    deployments::Deployments,
    errors::DeployError,
    types::{Module, ModuleId},
};

/// The set of modules declared for a migration, in registration order
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    /// The registered modules, in registration order
    modules: Vec<Module>,
    /// The index of each module in `modules`
    index: HashMap<ModuleId, usize>,
}

impl ModuleRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module. Its dependency declarations are fixed from here on.
    pub fn register(&mut self, module: Module) -> Result<(), DeployError> {
        if self.index.contains_key(&module.id) {
            return Err(DeployError::DuplicateModule(module.id));
        }

        debug!(
            module = %module.id,
            links = module.links.len(),
            args = module.args.len(),
            "registered module"
        );
        self.index.insert(module.id.clone(), self.modules.len());
        self.modules.push(module);
        Ok(())
    }

    /// Look up a registered module
    pub fn get(&self, id: &ModuleId) -> Result<&Module, DeployError> {
        self.position(id).map(|i| &self.modules[i])
    }

    /// Whether a module with the given id is registered
    pub fn contains(&self, id: &ModuleId) -> bool {
        self.index.contains_key(id)
    }

    /// The registration index of a module
    pub fn position(&self, id: &ModuleId) -> Result<usize, DeployError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| DeployError::UnknownModule(id.clone()))
    }

    /// The number of registered modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Iterate over the modules in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    /// The addresses of every deployed module, in registration order
    pub fn deployed(&self) -> Deployments {
        self.modules
            .iter()
            .filter_map(|module| Some((module.id.clone(), module.address()?)))
            .collect()
    }

    /// Mutable access to a module, used by the executor to assign addresses
    pub(crate) fn get_mut(&mut self, id: &ModuleId) -> Result<&mut Module, DeployError> {
        let i = self.position(id)?;
        Ok(&mut self.modules[i])
    }
}

impl TryFrom<Vec<Module>> for ModuleRegistry {
    type Error = DeployError;

    fn try_from(modules: Vec<Module>) -> Result<Self, Self::Error> {
        let mut registry = ModuleRegistry::new();
        for module in modules {
            registry.register(module)?;
        }

        Ok(registry)
    }
}
