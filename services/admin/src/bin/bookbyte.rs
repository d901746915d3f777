//! services/admin/src/bin/bookbyte.rs

use bookbyte_admin::{
    cli::{run, Cli},
    config::AdminConfig,
    error::AdminError,
};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AdminError> {
    let cli = Cli::parse();

    let config = AdminConfig::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(cli, config).await
}
