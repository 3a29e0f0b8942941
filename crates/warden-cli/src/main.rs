mod bootstrap_helpers;
mod cli_args;
mod cli_types;
mod prepare_command;
mod update_comment_command;

use anyhow::Result;
use clap::Parser;

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::{Cli, Command};
use crate::prepare_command::run_prepare_command;
use crate::update_comment_command::run_update_comment_command;

async fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Prepare(args) => run_prepare_command(args).await,
        Command::UpdateComment(args) => run_update_comment_command(args).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run_cli(cli).await
}
