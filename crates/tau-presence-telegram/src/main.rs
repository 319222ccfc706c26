mod bootstrap;
mod cli_args;

use anyhow::Result;
use clap::Parser;
use tau_presence_telegram::run_telegram_presence_bot;

use crate::bootstrap::init_tracing;
use crate::cli_args::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.runtime_config()?;
    run_telegram_presence_bot(config).await
}
