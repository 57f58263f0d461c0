//! minivote server binary

use std::net::SocketAddr;

use clap::Parser;
use minivote::{Config, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "minivote")]
#[command(about = "minimal voting service with email invitations and reminders")]
struct Cli {
    /// Listen address for the HTTP API
    #[arg(long, default_value = "0.0.0.0:4000")]
    addr: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    Server::new(config, cli.addr).serve().await?;
    Ok(())
}
