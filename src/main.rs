use anyhow::Context;
use tracing_subscriber::EnvFilter;

use redis_server::{config::Config, server::RedisServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_args(std::env::args()).context("invalid command line")?;

    let server = RedisServer::bind(config).await?;
    server.run().await
}
