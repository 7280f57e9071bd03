//! CLI command dispatch
//!
//! Routes parsed arguments to their handlers.

pub mod completions;
pub mod run;
pub mod stages;
pub mod validate;
pub mod version;

use crate::cli::args::{Cli, Commands};
use crate::error::PhenologyError;

/// Dispatches a parsed invocation.
///
/// # Errors
///
/// Returns whatever the dispatched handler fails with.
pub fn dispatch(cli: Cli) -> Result<(), PhenologyError> {
    match cli.command {
        Commands::Run(args) => run::run(&args, cli.quiet),
        Commands::Validate(args) => validate::run(&args),
        Commands::Stages(args) => stages::run(&args),
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}
