//! CLI command definitions and execution
//!
//! Each subcommand lives in its own module and returns an [`ExitCode`].

use clap::{Parser, Subcommand};
use mv_core::ConfigManager;

use crate::exit_code::ExitCode;
use crate::output::OutputConfig;

mod alias;
mod completions;
mod mv;

/// s3mv - move objects and prefixes on S3-compatible storage
///
/// Objects are copied server-side and their sources deleted once the copy
/// is confirmed. Large objects are copied in parallel parts.
#[derive(Parser, Debug)]
#[command(name = "s3mv")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress spinner
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Move an object or every object under a prefix (copy + delete source)
    Mv(mv::MvArgs),

    /// Manage storage service aliases
    #[command(subcommand)]
    Alias(alias::AliasCommands),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

impl Cli {
    /// Output settings from the flags, with `[defaults]` filling in what
    /// the flags leave unset
    fn output_config(&self) -> OutputConfig {
        let defaults = ConfigManager::new()
            .and_then(|manager| manager.load())
            .map(|config| config.defaults)
            .unwrap_or_default();

        OutputConfig {
            json: self.json || defaults.output == "json",
            no_color: self.no_color || defaults.color == "never",
            no_progress: self.no_progress || !defaults.progress,
            quiet: self.quiet,
        }
    }
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = cli.output_config();

    match cli.command {
        Commands::Mv(args) => mv::execute(args, output_config).await,
        Commands::Alias(cmd) => alias::execute(cmd, output_config),
        Commands::Completions(args) => completions::execute(args),
    }
}
