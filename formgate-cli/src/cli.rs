use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "formgate")]
#[command(version)]
#[command(about = "Validate form submissions against runtime form definitions")]
#[command(long_about = "
formgate compiles a form definition into a validation schema and checks
submissions against it: custom JavaScript rules, uniqueness against stored
records, then type and constraint checks.

Example usage:
  formgate validate --form form.json --submission data.json
  formgate validate --form form.json --submission data.json --records stored.json
  formgate schema --form form.json

Exit codes for validate: 0 valid, 1 invalid, 2 error.
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to formgate.{toml,yaml,yml,json} in the
    /// current directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Log level selected by the global flags
    pub fn log_level(&self) -> Level {
        if self.quiet {
            Level::ERROR
        } else if self.debug {
            Level::DEBUG
        } else if self.verbose {
            Level::INFO
        } else {
            Level::WARN
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a submission and print the verdict as JSON
    Validate {
        /// Form definition (JSON)
        #[arg(long, value_name = "FILE")]
        form: PathBuf,

        /// Submission data (JSON object)
        #[arg(long, value_name = "FILE")]
        submission: PathBuf,

        /// Stored submissions used for uniqueness checks (JSON array)
        #[arg(long, value_name = "FILE")]
        records: Option<PathBuf>,

        /// Identifier of the record being updated
        #[arg(long, value_name = "ID")]
        existing_id: Option<String>,
    },
    /// Print the compiled schema of a form
    Schema {
        /// Form definition (JSON)
        #[arg(long, value_name = "FILE")]
        form: PathBuf,
    },
}
