//! docs2confluence CLI.
//!
//! Provides commands for:
//! - `publish`: Mirror a markdown directory as a Confluence page tree

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::PublishArgs;
use error::CliError;
use output::{Output, Tone};

/// docs2confluence - publish markdown documentation to Confluence.
#[derive(Parser)]
#[command(name = "d2c", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update one Confluence page per markdown document.
    Publish(PublishArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = matches!(&cli.command, Commands::Publish(args) if args.verbose);

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli) {
        output.line(Tone::Failure, &format!("Error: {err}"));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let rt = tokio::runtime::Runtime::new()?;
    match cli.command {
        Commands::Publish(args) => rt.block_on(args.execute()),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_publish() {
        let cli = Cli::try_parse_from([
            "d2c",
            "publish",
            "docs",
            "--space",
            "DOCS",
            "--concurrency",
            "2",
            "--failure-policy",
            "stop",
            "--dry-run",
        ])
        .unwrap();
        let Commands::Publish(args) = cli.command;
        assert!(args.dry_run);
        assert!(!args.verbose);
    }

    #[test]
    fn test_reject_unknown_policy() {
        let result = Cli::try_parse_from(["d2c", "publish", "--failure-policy", "retry"]);
        assert!(result.is_err());
    }
}
