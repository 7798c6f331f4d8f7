use clap::Parser;
use std::error::Error;
use toolbridge::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    toolbridge::run(Cli::parse()).await
}
