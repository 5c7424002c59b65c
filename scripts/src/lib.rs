//! Scripts for planning and running the contract migration against a live network.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod artifacts;
pub mod cli;
mod commands;
pub mod config;
pub mod constants;
pub mod errors;
pub mod rpc;
pub mod utils;
