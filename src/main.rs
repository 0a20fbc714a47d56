mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, TokenCommand};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encrypt(args) => commands::encrypt::run_encrypt(args)?,
        Commands::Decrypt(args) => commands::decrypt::run_decrypt(args)?,
        Commands::Inspect(args) => commands::inspect::run_inspect(args)?,
        Commands::Token(TokenCommand::Issue(args)) => commands::token::run_issue(args)?,
        Commands::Token(TokenCommand::Verify(args)) => commands::token::run_verify(args)?,
        Commands::Keygen(args) => commands::keygen::run_keygen(args)?,
        Commands::Config => commands::config::run_config()?,
    }

    Ok(())
}
