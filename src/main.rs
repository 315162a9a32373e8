use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use sim_relay::server::net;
use sim_relay::{ImpairmentConfig, RelayHub, RelayServer, ServerConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sim-relay")]
#[command(about = "Broadcaster/viewer relay with simulated network impairment", long_about = None)]
struct Args {
    /// Listen address
    #[arg(long, env = "SIM_RELAY_BIND", default_value = "0.0.0.0:8443")]
    bind: SocketAddr,

    /// Host advertised in the broadcaster URL (detected when omitted)
    #[arg(long, env = "SIM_RELAY_PUBLIC_HOST")]
    public_host: Option<String>,

    /// Scheme advertised in the broadcaster URL
    #[arg(long, env = "SIM_RELAY_PUBLIC_SCHEME", default_value = "https")]
    public_scheme: String,

    /// Directory with index.html, broadcast.html and static assets
    #[arg(long, env = "SIM_RELAY_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Maximum data-channel message size in bytes
    #[arg(long, env = "SIM_RELAY_MAX_MESSAGE_SIZE", default_value_t = sim_relay::server::config::DEFAULT_MAX_MESSAGE_SIZE)]
    max_message_size: usize,

    /// Outbound queue length per connection
    #[arg(long, env = "SIM_RELAY_PEER_QUEUE", default_value_t = sim_relay::relay::hub::DEFAULT_PEER_QUEUE_CAPACITY)]
    peer_queue: usize,

    /// Initial simulated loss in percent
    #[arg(long, env = "SIM_RELAY_LOSS_PERCENT", default_value_t = 0)]
    loss_percent: u32,

    /// Initial simulated latency in milliseconds
    #[arg(long, env = "SIM_RELAY_LATENCY_MS", default_value_t = 0)]
    latency_ms: u64,
}

#[tokio::main]
async fn main() -> sim_relay::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sim_relay=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = ServerConfig::with_addr(args.bind)
        .public_scheme(args.public_scheme)
        .max_message_size(args.max_message_size)
        .peer_queue_capacity(args.peer_queue);
    if let Some(host) = args.public_host {
        config = config.public_host(host);
    }
    if let Some(dir) = args.static_dir {
        config = config.static_dir(dir);
    }

    let impairment = ImpairmentConfig::new(args.loss_percent, args.latency_ms);
    let hub = RelayHub::with_impairment(impairment).peer_queue_capacity(config.peer_queue_capacity);
    let server = RelayServer::with_hub(config, Arc::new(hub));

    let host = net::advertised_host(server.config().public_host.as_deref());
    let scheme = &server.config().public_scheme;
    let port = server.bind_addr().port();
    info!("Viewer:      {}://{}:{}/", scheme, host, port);
    info!("Broadcaster: {}://{}:{}/broadcast", scheme, host, port);
    info!(
        loss_percent = impairment.loss_percent,
        latency_ms = impairment.latency_ms,
        "Initial impairment"
    );

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
}
