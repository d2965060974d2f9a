//! Tunnel gateway binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!                 │               TUNNEL GATEWAY                  │
//!  Client ───────▶│  http/server ─▶ pipeline ─▶ session ─▶ proxy │───▶ Tenant
//!                 │                    │                          │     backend
//!                 │                    └─▶ routing/mux (fallback) │
//!                 │  config · observability · lifecycle           │
//!                 └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use axum::response::IntoResponse;
use clap::Parser;
use tokio::net::TcpListener;

use tunnel_gateway::config::{self, GatewayConfig};
use tunnel_gateway::observability::{logging, metrics};
use tunnel_gateway::proxy::DenyingProxyGate;
use tunnel_gateway::routing::RequestMultiplexer;
use tunnel_gateway::transport::registry::StaticTenantRegistry;
use tunnel_gateway::{GatewayServer, Shutdown};

#[derive(Parser)]
#[command(name = "tunnel-gateway", about = "Multi-tenant reverse-tunnel gateway")]
struct Args {
    /// Path to a TOML config file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => GatewayConfig::default(),
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        host = %config.host,
        variant = ?config.session.variant,
        tenants = config.tenants.len(),
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let transport = Arc::new(StaticTenantRegistry::from_config(
        &config.host,
        &config.tenants,
    ));
    let gate = Arc::new(DenyingProxyGate);

    let mut mux = RequestMultiplexer::new();
    mux.handle_fn("GET /healthz", |_req| async { "ok".into_response() });

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let shutdown = Shutdown::new();
    let server = GatewayServer::new(config, transport, gate, mux);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
