use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use outbreak_server::config::{GameConfig, ServerConfig};
use outbreak_server::game::clock::SystemClock;
use outbreak_server::metrics::{self, Metrics};
use outbreak_server::net::host::{run_host_loop, HostSession};
use outbreak_server::net::tls::TlsConfig;
use outbreak_server::net::transport::WebTransportServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Outbreak Server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::load_or_default();
    config.validate()?;
    let game_config = GameConfig::load_or_default();
    game_config.validate()?;
    info!(
        "Configuration loaded: {}:{}, {} Hz, {} bots",
        config.bind_address, config.port, config.tick_rate, config.bot_count
    );

    let metrics = Arc::new(Metrics::new());

    let metrics_clone = metrics.clone();
    let metrics_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = metrics::start_metrics_server(metrics_clone, metrics_port).await {
            error!("Metrics server error: {}", e);
        }
    });

    let mut session = HostSession::new(game_config, config.host_nickname.as_deref(), metrics);
    for _ in 0..config.bot_count {
        session.add_bot();
    }
    let handle = session.handle();
    let host_loop = tokio::spawn(run_host_loop(
        session,
        SystemClock::new(),
        config.tick_duration(),
    ));

    let tls_config = TlsConfig::load().await?;
    let server = WebTransportServer::new(config.clone(), tls_config, handle);
    info!(
        "Server ready on https://{}:{}",
        config.bind_address, config.port
    );
    info!("Certificate hash: {}", server.cert_hash());

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Shutdown signal received"),
                Err(e) => error!("Failed to listen for shutdown signal: {}", e),
            }
        }
    }

    host_loop.abort();
    info!("Server stopped");

    Ok(())
}
