//! Formgate command-line interface

pub mod cli;
pub mod commands;
pub mod error;
pub mod exit_codes;

pub use cli::{Cli, Commands};
pub use commands::{execute, CommandOutput};
pub use error::{handle_cli_result, CliError, CliResult};
