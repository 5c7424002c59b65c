//! Utilities for the migration scripts.

use std::{
    env,
    fs::{self, File},
    io::Read,
    path::Path,
    str::FromStr,
};

use alloy::signers::local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner};
use migration_core::deployments::Deployments;
use serde_json::{Map, Value};

use crate::{
    constants::{DEPLOYMENTS_KEY, ENV_VAR_CLOSE, ENV_VAR_OPEN},
    errors::ScriptError,
};

/// The deployer's signer, from a private key or else the first account of a mnemonic
pub fn load_signer(
    priv_key: Option<&str>,
    mnemonic: Option<&str>,
) -> Result<PrivateKeySigner, ScriptError> {
    if let Some(priv_key) = priv_key {
        return PrivateKeySigner::from_str(priv_key)
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()));
    }

    let phrase = mnemonic.ok_or(ScriptError::MissingCredentials)?;
    MnemonicBuilder::<English>::default()
        .phrase(phrase)
        .index(0)
        .and_then(|builder| builder.build())
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))
}

/// Substitute `${NAME}` references with the value of the named environment variable
pub fn expand_env_vars(value: &str) -> Result<String, ScriptError> {
    let mut expanded = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find(ENV_VAR_OPEN) {
        expanded.push_str(&rest[..start]);
        let reference = &rest[start + ENV_VAR_OPEN.len()..];
        let end = reference.find(ENV_VAR_CLOSE).ok_or_else(|| {
            ScriptError::ConfigParsing(format!("unterminated variable reference in `{value}`"))
        })?;

        let name = &reference[..end];
        let var = env::var(name).map_err(|_| {
            ScriptError::ConfigParsing(format!("environment variable `{name}` is not set"))
        })?;
        expanded.push_str(&var);
        rest = &reference[end + ENV_VAR_CLOSE.len()..];
    }

    expanded.push_str(rest);
    Ok(expanded)
}

/// Read and parse the JSON file at `file_path`
pub fn get_json_from_file(file_path: &str) -> Result<Value, ScriptError> {
    let mut file_contents = String::new();
    File::open(file_path)
        .map_err(|e| ScriptError::ReadFile(e.to_string()))?
        .read_to_string(&mut file_contents)
        .map_err(|e| ScriptError::ReadFile(e.to_string()))?;

    serde_json::from_str(&file_contents).map_err(|e| ScriptError::ReadFile(e.to_string()))
}

/// Record the deployed addresses for `environment`, keeping whatever else the
/// file holds. Modules not in `deployments` keep their previous address.
pub fn write_deployments(
    file_path: &str,
    environment: &str,
    deployments: &Deployments,
) -> Result<(), ScriptError> {
    let mut parsed_json = if Path::new(file_path).exists() {
        get_json_from_file(file_path)?
    } else {
        Value::Object(Map::new())
    };

    let not_an_object =
        |key: &str| ScriptError::WriteFile(format!("`{key}` in {file_path} is not an object"));
    let entries = parsed_json
        .as_object_mut()
        .ok_or_else(|| not_an_object("<root>"))?
        .entry(DEPLOYMENTS_KEY)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| not_an_object(DEPLOYMENTS_KEY))?
        .entry(environment)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| not_an_object(environment))?;

    for (id, address) in deployments.iter() {
        entries.insert(id.to_string(), Value::String(format!("{address:#x}")));
    }

    let contents = serde_json::to_string_pretty(&parsed_json)
        .map_err(|e| ScriptError::WriteFile(e.to_string()))?;
    fs::write(file_path, contents).map_err(|e| ScriptError::WriteFile(e.to_string()))
}
