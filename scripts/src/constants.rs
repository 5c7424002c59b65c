//! Constants used in the migration scripts

/// The default path of the migration manifest
pub const DEFAULT_CONFIG_PATH: &str = "config/farm.json";

/// The default path of the file deployed addresses are recorded in
pub const DEFAULT_DEPLOYMENTS_PATH: &str = "deployments.json";

/// The default directory compilation artifacts are read from, relative to the manifest
pub const DEFAULT_ARTIFACTS_DIR: &str = "build/contracts";

/// The extension of a compilation artifact
pub const ARTIFACT_EXTENSION: &str = "json";

/// The log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info";

/// The name of the environment variable holding the manifest path
pub const CONFIG_ENV_VAR: &str = "MIGRATION_CONFIG";

/// The name of the environment variable holding the deployer's private key
pub const PRIV_KEY_ENV_VAR: &str = "PKEY";

/// The name of the environment variable holding the deployer's mnemonic
pub const MNEMONIC_ENV_VAR: &str = "MNEMONIC";

/// The deployments key in the `deployments.json` file
pub const DEPLOYMENTS_KEY: &str = "deployments";

/// The prefix of an unlinked library placeholder in bytecode
pub const LIBRARY_PLACEHOLDER_PREFIX: &str = "__";

/// The length of a library placeholder, the hex length of an address
pub const LIBRARY_PLACEHOLDER_LEN: usize = 40;

/// The longest library name a placeholder holds, longer names are truncated
pub const LIBRARY_NAME_MAX_LEN: usize = 36;

/// The opening of an environment variable reference in an RPC URL
pub const ENV_VAR_OPEN: &str = "${";

/// The closing of an environment variable reference in an RPC URL
pub const ENV_VAR_CLOSE: &str = "}";
