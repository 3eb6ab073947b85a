mod cache;
mod cli;
mod client;
mod commands;
mod config;
mod detail;
mod error;
mod key;
mod logging;
mod merge;
mod output;
mod queries;
mod query;
mod responses;
mod search;
#[cfg(test)]
mod test_support;
mod types;

use std::io;

use clap::{CommandFactory, Parser};
use clap_complete::generate;

use cli::{Cli, Commands, IssueCommands};
use commands::Context;
use config::Config;
use error::Result;
use std::error::Error;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");

        // Show error chain if verbose flag was passed
        if std::env::args().any(|arg| arg == "--verbose" || arg == "-v") {
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("Caused by: {cause}");
                source = cause.source();
            }
        }

        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose);
    output::set_format(cli.output_format());
    output::set_quiet(cli.quiet);

    match cli.command {
        // Commands that don't require config/client
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "ghi", &mut io::stdout());
        }
        Commands::Init => {
            commands::init::run().await?;
        }
        // Commands that require config and client
        command => {
            let ctx = Context::from_config(Config::load()?)?;
            tracing::debug!(repository = %ctx.repo, endpoint = ctx.config.endpoint(), "loaded config");

            match command {
                Commands::Issues(args) => {
                    commands::issues::list(&ctx, args).await?;
                }
                Commands::Issue { action } => match action {
                    IssueCommands::List(args) => {
                        commands::issues::list(&ctx, args).await?;
                    }
                    IssueCommands::View(args) => {
                        commands::issues::view(&ctx, args).await?;
                    }
                    IssueCommands::Comments(args) => {
                        commands::comments::list(&ctx, args).await?;
                    }
                },
                Commands::Browse(args) => {
                    commands::browse::run(&ctx, args).await?;
                }
                Commands::Completions { .. } | Commands::Init => {
                    // Already handled above
                }
            }
        }
    }

    Ok(())
}
