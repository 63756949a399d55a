use clap::Parser;
use rustkv::config::Config;
use rustkv::{server, Error};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::parse();

    let _ = tracing_subscriber::fmt()
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    server::run(config).await
}
