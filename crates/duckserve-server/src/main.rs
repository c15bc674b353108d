mod config;
mod error;
mod query;
mod server;


use clap::Parser;
use config::Config;
use tracing_subscriber::FmtSubscriber;

/// Serves SQL queries against an embedded DuckDB database over HTTP.
#[derive(Debug, Parser)]
#[command(name = "duckserve", version)]
struct Args {
    /// TOML configuration file; built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<String>,
    /// Overrides `database.path`.
    #[arg(long)]
    database: Option<String>,
    /// Overrides `server.listen_addr`.
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };
    if let Some(path) = args.database {
        config.database.path = path;
    }
    if let Some(addr) = args.listen {
        config.server.listen_addr = addr;
    }
    let config = Config::validated(config)?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level()?)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    server::run(config).await?;
    Ok(())
}
