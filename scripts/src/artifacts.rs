//! Compilation artifacts and the linking of library addresses into their bytecode

use std::{fs, path::Path};

use alloy_primitives::Address;
use migration_core::linker::LinkBindings;
use serde::Deserialize;

use crate::{
    constants::{
        ARTIFACT_EXTENSION, LIBRARY_NAME_MAX_LEN, LIBRARY_PLACEHOLDER_LEN,
        LIBRARY_PLACEHOLDER_PREFIX,
    },
    errors::ScriptError,
};

/// A compiled contract, as emitted by the build
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// The name of the compiled contract
    #[serde(default)]
    pub contract_name: String,
    /// The hex encoded creation bytecode, possibly containing library placeholders
    pub bytecode: String,
}

impl Artifact {
    /// Read the artifact named `name` from `artifacts_dir`
    pub fn load(artifacts_dir: &Path, name: &str) -> Result<Self, ScriptError> {
        let path = artifacts_dir.join(format!("{name}.{ARTIFACT_EXTENSION}"));
        let contents = fs::read_to_string(&path)
            .map_err(|e| ScriptError::ReadFile(format!("{}: {e}", path.display())))?;

        let mut artifact: Artifact = serde_json::from_str(&contents)
            .map_err(|e| ScriptError::ArtifactParsing(format!("{name}: {e}")))?;
        if artifact.contract_name.is_empty() {
            artifact.contract_name = name.to_string();
        }

        Ok(artifact)
    }

    /// The creation bytecode with the address of every bound library
    /// substituted for its placeholder
    pub fn linked_bytecode(&self, links: &LinkBindings) -> Result<Vec<u8>, ScriptError> {
        let mut code = self
            .bytecode
            .strip_prefix("0x")
            .unwrap_or(&self.bytecode)
            .to_string();
        if code.is_empty() {
            return Err(ScriptError::ArtifactParsing(format!(
                "{} has no creation bytecode",
                self.contract_name
            )));
        }

        for (library, address) in links.iter() {
            code = link_library(&code, library.as_str(), *address);
        }

        if let Some(library) = unlinked_library(&code) {
            return Err(ScriptError::Linking(format!(
                "{} references library `{library}` which was not linked",
                self.contract_name
            )));
        }

        hex::decode(&code).map_err(|e| {
            ScriptError::ArtifactParsing(format!("{}: {e}", self.contract_name))
        })
    }
}

/// The placeholder a library's address takes in unlinked bytecode: the name,
/// truncated, behind `__` and padded with underscores to the width of an address
pub fn library_placeholder(library: &str) -> String {
    let name: String = library.chars().take(LIBRARY_NAME_MAX_LEN).collect();
    let width = LIBRARY_PLACEHOLDER_LEN - LIBRARY_PLACEHOLDER_PREFIX.len();
    format!("{LIBRARY_PLACEHOLDER_PREFIX}{name:_<width$}")
}

/// Replace every placeholder for `library` in hex `bytecode` with `address`
pub fn link_library(bytecode: &str, library: &str, address: Address) -> String {
    bytecode.replace(&library_placeholder(library), &hex::encode(address))
}

/// The name of the first library still referenced by a placeholder, if any
fn unlinked_library(bytecode: &str) -> Option<String> {
    let start = bytecode.find(LIBRARY_PLACEHOLDER_PREFIX)?;
    let placeholder = bytecode
        .get(start..start + LIBRARY_PLACEHOLDER_LEN)
        .unwrap_or(&bytecode[start..]);

    Some(placeholder.trim_matches('_').to_string())
}
