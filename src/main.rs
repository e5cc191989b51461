//! strmsync CLI entrypoint

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use strmsync::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // DEBUG=true lowers the default level; RUST_LOG still wins
    let default_level = match std::env::var("DEBUG") {
        Ok(value) if value.eq_ignore_ascii_case("true") => "debug",
        _ => "info",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    cli.execute().await
}
