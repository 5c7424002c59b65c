//! Loading of the migration manifest: the modules to deploy and the
//! environments they can be deployed to

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use migration_core::{
    environment::{Environment, EnvironmentSet},
    errors::DeployError,
    registry::ModuleRegistry,
    types::Module,
};
use serde::Deserialize;

use crate::{constants::DEFAULT_ARTIFACTS_DIR, errors::ScriptError};

/// The migration manifest
#[derive(Clone, Debug, Deserialize)]
pub struct Manifest {
    /// The directory compilation artifacts are read from, relative to the manifest
    #[serde(default = "default_artifacts_dir")]
    artifacts_dir: PathBuf,
    /// The modules to deploy, in registration order
    pub modules: Vec<Module>,
    /// The environments the modules can be deployed to, keyed by name
    #[serde(default)]
    pub environments: BTreeMap<String, Environment>,
    /// The directory the manifest was loaded from
    #[serde(skip)]
    base_dir: PathBuf,
}

/// Serde default for [`Manifest::artifacts_dir`]
fn default_artifacts_dir() -> PathBuf {
    PathBuf::from(DEFAULT_ARTIFACTS_DIR)
}

impl Manifest {
    /// Read and parse the manifest at `file_path`
    pub fn load(file_path: &str) -> Result<Self, ScriptError> {
        let contents = fs::read_to_string(file_path)
            .map_err(|e| ScriptError::ReadFile(format!("{file_path}: {e}")))?;

        let mut manifest = Self::parse(&contents)?;
        manifest.base_dir = Path::new(file_path)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(manifest)
    }

    /// Parse a manifest, naming each environment after its key
    pub fn parse(contents: &str) -> Result<Self, ScriptError> {
        let mut manifest: Manifest =
            serde_json::from_str(contents).map_err(|e| ScriptError::ConfigParsing(e.to_string()))?;

        for (name, env) in manifest.environments.iter_mut() {
            env.name = name.clone();
        }

        Ok(manifest)
    }

    /// Register the manifest's modules, in declaration order
    pub fn registry(&self) -> Result<ModuleRegistry, DeployError> {
        ModuleRegistry::try_from(self.modules.clone())
    }

    /// The declared environments
    pub fn environments(&self) -> Result<EnvironmentSet, DeployError> {
        EnvironmentSet::new(self.environments.values().cloned())
    }

    /// The directory compilation artifacts are read from
    pub fn artifacts_dir(&self) -> PathBuf {
        self.base_dir.join(&self.artifacts_dir)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use migration_core::{
        errors::DeployError, orchestrator::plan, resolver::resolve, types::ModuleId,
    };
    use tempfile::NamedTempFile;

    use super::Manifest;
    use crate::errors::ScriptError;

    /// The manifest shipped with the scripts
    const FARM_MANIFEST: &str = include_str!("../config/farm.json");

    #[test]
    fn test_farm_manifest_order() {
        let manifest = Manifest::parse(FARM_MANIFEST).unwrap();
        let registry = manifest.registry().unwrap();
        let plan = resolve(&registry).unwrap();

        let order: Vec<&str> = plan.modules().iter().map(ModuleId::as_str).collect();
        assert_eq!(order, vec!["SafeMath", "Counters", "ERC20", "ERC721", "Farm"]);
    }

    #[test]
    fn test_farm_manifest_environments() {
        let manifest = Manifest::parse(FARM_MANIFEST).unwrap();
        let registry = manifest.registry().unwrap();
        let envs = manifest.environments().unwrap();
        assert_eq!(envs.names(), vec!["development", "rinkeby"]);

        let development = envs.select("development").unwrap();
        assert_eq!(development.name, "development");
        assert_eq!(development.network.network_id, None);
        assert_eq!(development.bootstrap.len(), 1);
        plan(&registry, development).unwrap();

        let rinkeby = envs.select("rinkeby").unwrap();
        assert_eq!(rinkeby.network.gas_limit, Some(5_500_000));
        assert_eq!(rinkeby.network.confirmations, 2);
        assert!(rinkeby.bootstrap.is_empty());
        plan(&registry, rinkeby).unwrap();
    }

    #[test]
    fn test_duplicate_module_in_manifest() {
        let manifest = Manifest::parse(
            r#"{ "modules": [{ "id": "SafeMath" }, { "id": "SafeMath" }] }"#,
        )
        .unwrap();

        assert!(matches!(
            manifest.registry(),
            Err(DeployError::DuplicateModule(id)) if id.as_str() == "SafeMath"
        ));
    }

    #[test]
    fn test_malformed_manifest() {
        let err = Manifest::parse(r#"{ "environments": {} }"#).unwrap_err();
        assert!(matches!(err, ScriptError::ConfigParsing(_)));
    }

    #[test]
    fn test_artifacts_dir_is_relative_to_manifest() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "artifacts_dir": "out", "modules": [] }}"#).unwrap();

        let path = file.path().to_str().unwrap();
        let manifest = Manifest::load(path).unwrap();
        let expected = file.path().parent().unwrap().join("out");
        assert_eq!(manifest.artifacts_dir(), expected);
        assert!(matches!(
            Manifest::load("does/not/exist.json"),
            Err(ScriptError::ReadFile(_))
        ));
    }
}
