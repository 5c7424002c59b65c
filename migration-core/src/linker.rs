//! Binds deployed library addresses into the modules that link against them

use alloy_primitives::Address;
use tracing::{debug, error};

use crate::{
    errors::DeployError,
    registry::ModuleRegistry,
    types::{Module, ModuleId},
};

/// The library addresses to be linked into a single module's deployment
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkBindings {
    /// The library modules and their deployed addresses, in declaration order
    bindings: Vec<(ModuleId, Address)>,
}

impl LinkBindings {
    /// The address bound for the given library, if any
    pub fn get(&self, library: &ModuleId) -> Option<Address> {
        self.bindings
            .iter()
            .find_map(|(id, address)| (id == library).then_some(*address))
    }

    /// Iterate over the bound libraries
    pub fn iter(&self) -> impl Iterator<Item = (&ModuleId, &Address)> {
        self.bindings.iter().map(|(id, address)| (id, address))
    }

    /// The number of bound libraries
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no library is bound
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl FromIterator<(ModuleId, Address)> for LinkBindings {
    fn from_iter<T: IntoIterator<Item = (ModuleId, Address)>>(iter: T) -> Self {
        LinkBindings {
            bindings: iter.into_iter().collect(),
        }
    }
}

/// Collect the library bindings for `module`.
///
/// Every library the module links against must already have been deployed.
/// A library without an address means the deployment plan was not respected,
/// which is reported as [`DeployError::UnlinkedDependency`].
pub fn apply(module: &Module, registry: &ModuleRegistry) -> Result<LinkBindings, DeployError> {
    let mut bindings = Vec::with_capacity(module.links.len());
    for library in &module.links {
        let Some(address) = registry.get(library)?.address() else {
            error!(module = %module.id, %library, "library linked before deployment");
            return Err(DeployError::UnlinkedDependency {
                module: module.id.clone(),
                dependency: library.clone(),
            });
        };

        debug!(module = %module.id, %library, %address, "linking library");
        bindings.push((library.clone(), address));
    }

    Ok(LinkBindings { bindings })
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Address;

    use super::apply;
    use crate::{
        errors::DeployError,
        registry::ModuleRegistry,
        types::{Module, ModuleId},
    };

    fn registry() -> ModuleRegistry {
        ModuleRegistry::try_from(vec![
            Module::new("SafeMath"),
            Module::new("Counters").with_link("SafeMath"),
            Module::new("ERC721").with_link("SafeMath").with_link("Counters"),
        ])
        .unwrap()
    }

    #[test]
    fn test_bindings_carry_library_addresses() {
        let mut registry = registry();
        let safe_math = Address::repeat_byte(0xaa);
        let counters = Address::repeat_byte(0xbb);
        registry
            .get_mut(&ModuleId::new("SafeMath"))
            .unwrap()
            .assign_address(safe_math)
            .unwrap();
        registry
            .get_mut(&ModuleId::new("Counters"))
            .unwrap()
            .assign_address(counters)
            .unwrap();

        let erc721 = registry.get(&ModuleId::new("ERC721")).unwrap();
        let bindings = apply(erc721, &registry).unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings.get(&ModuleId::new("SafeMath")), Some(safe_math));
        assert_eq!(bindings.get(&ModuleId::new("Counters")), Some(counters));
    }

    #[test]
    fn test_no_links_no_bindings() {
        let registry = registry();
        let safe_math = registry.get(&ModuleId::new("SafeMath")).unwrap();
        assert!(apply(safe_math, &registry).unwrap().is_empty());
    }

    #[test]
    fn test_undeployed_library() {
        let mut registry = registry();
        registry
            .get_mut(&ModuleId::new("SafeMath"))
            .unwrap()
            .assign_address(Address::repeat_byte(1))
            .unwrap();

        let erc721 = registry.get(&ModuleId::new("ERC721")).unwrap();
        match apply(erc721, &registry) {
            Err(DeployError::UnlinkedDependency { module, dependency }) => {
                assert_eq!(module.as_str(), "ERC721");
                assert_eq!(dependency.as_str(), "Counters");
            }
            other => panic!("expected an unlinked dependency, got {other:?}"),
        }
    }
}
