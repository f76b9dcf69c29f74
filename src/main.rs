use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use reqlog::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    init_tracing();

    match args.command {
        cli::Commands::Serve { addr } => {
            commands::serve::execute(&args.config, addr).await?;
        }
        cli::Commands::Send {
            level,
            fields,
            message,
        } => {
            commands::send::execute(&args.config, &level, &fields, message).await?;
        }
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(&args.config)?,
            cli::ConfigCommands::Validate => commands::config::validate(&args.config)?,
        },
    }

    Ok(())
}
