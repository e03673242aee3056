// BankNetCoin - CLI

use banknetcoin::{Cli, CliHandler};
use clap::Parser;

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let handler = CliHandler::new(cli.config());

    if let Err(e) = handler.handle(cli.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
