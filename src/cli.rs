use std::net::SocketAddr;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "toolbridge",
    version,
    about = "REST APIs as LLM tools, with a provider-agnostic agent loop"
)]
pub struct Cli {
    #[arg(long)]
    pub config: Option<String>,
    /// Override the configured listen address.
    #[arg(long)]
    pub listen: Option<SocketAddr>,
}
