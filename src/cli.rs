use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "keepwarm")]
#[command(about = "Backend keep-alive and content cache warming service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the warming service with its diagnostics HTTP endpoint
    Serve(ServeArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to bind the diagnostics HTTP server to
    /// (defaults to server.bind_addr from the configuration)
    #[arg(long)]
    pub address: Option<SocketAddr>,

    /// Path to a TOML configuration file (defaults to config/keepwarm.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}
