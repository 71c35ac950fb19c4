use std::io;

use clap::Parser;
use tracing::Level;

mod cli;
mod repl;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::ERROR })
        .with_writer(io::stderr)
        .init();

    let config = cli.chain_config()?;
    tracing::debug!(
        difficulty = ?config.difficulty,
        expected_attempts = config.difficulty.expected_attempts(),
        "starting session"
    );
    let chain = tally_chain::Chain::from_config(&config)?;

    let stdin = io::stdin();
    let mut session = repl::Session::new(chain, stdin.lock(), io::stdout(), cli.format);
    session.run()
}
