use anyhow::Result;
use clap::{Parser, Subcommand};
use meetcap::app;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "meetcap", about = "Meeting recording bot service")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Override the API server port from the config file
    #[arg(short, long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if let Some(CliCommand::Version) = cli.command {
        println!("meetcap {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    app::run_service(cli.port).await
}
