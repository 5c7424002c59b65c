//! Definitions of errors that can occur during the execution of the migration scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use migration_core::errors::{DeployError, EXIT_CODE_OTHER};

/// Errors that can occur during the execution of the migration scripts
#[derive(Debug)]
pub enum ScriptError {
    /// Error reading a file from disk
    ReadFile(String),
    /// Error writing a file to disk
    WriteFile(String),
    /// Error parsing the migration manifest
    ConfigParsing(String),
    /// Error parsing a compilation artifact
    ArtifactParsing(String),
    /// Error linking library addresses into a contract's bytecode
    Linking(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// Neither a private key nor a mnemonic was provided
    MissingCredentials,
    /// Error constructing calldata for a constructor or contract method
    CalldataConstruction(String),
    /// A bootstrap action names a sender the deployer cannot sign for
    UnsupportedSender(String),
    /// The migration itself failed
    Migration(DeployError),
}

impl ScriptError {
    /// The process exit code this error is reported with
    pub fn exit_code(&self) -> u8 {
        match self {
            ScriptError::Migration(e) => e.exit_code(),
            _ => EXIT_CODE_OTHER,
        }
    }
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::ReadFile(s) => write!(f, "error reading file: {}", s),
            ScriptError::WriteFile(s) => write!(f, "error writing file: {}", s),
            ScriptError::ConfigParsing(s) => write!(f, "error parsing manifest: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::Linking(s) => write!(f, "error linking bytecode: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::MissingCredentials => {
                write!(f, "no private key or mnemonic provided for the deployer")
            }
            ScriptError::CalldataConstruction(s) => write!(f, "error constructing calldata: {}", s),
            ScriptError::UnsupportedSender(s) => write!(f, "unsupported sender: {}", s),
            ScriptError::Migration(e) => write!(f, "migration failed: {}", e),
        }
    }
}

impl Error for ScriptError {}

impl From<DeployError> for ScriptError {
    fn from(e: DeployError) -> Self {
        ScriptError::Migration(e)
    }
}
