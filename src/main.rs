use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use mcpvisor::{ConfigStore, LogWriter, RuntimeError, Subscribe, Supervisor, SupervisorConfig};

/// Supervise named stdio servers behind an HTTP control API.
#[derive(Parser, Debug)]
#[command(name = "mcpvisor", version, about)]
struct Args {
    /// Path to the server configuration file.
    #[arg(short, long, default_value = "mcp_config.json")]
    config: PathBuf,

    /// Address the control API binds to.
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port the control API listens on.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// How long to wait for servers to exit on shutdown (e.g. "5s", "500ms").
    #[arg(long, default_value = "5s", value_parser = humantime::parse_duration)]
    grace: Duration,

    /// Delay between binding the API and starting every server.
    #[arg(long, default_value = "1s", value_parser = humantime::parse_duration)]
    autostart_delay: Duration,

    /// Do not start servers at boot.
    #[arg(long)]
    no_autostart: bool,

    /// Default log filter, used when RUST_LOG is not set.
    #[arg(long, default_value = "mcpvisor=info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let store = ConfigStore::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    tracing::info!(
        config = %args.config.display(),
        servers = store.len(),
        "configuration loaded"
    );

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| RuntimeError::Bind {
            addr: addr.clone(),
            source,
        })?;

    let cfg = SupervisorConfig {
        grace: args.grace,
        autostart: !args.no_autostart,
        autostart_delay: args.autostart_delay,
        ..SupervisorConfig::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let sup = Supervisor::builder(cfg, store)
        .with_subscribers(subs)
        .build();

    sup.run(listener).await?;
    tracing::info!("mcpvisor stopped");
    Ok(())
}
