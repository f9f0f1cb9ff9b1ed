use std::net::SocketAddr;
use std::sync::Arc;

use gateway::config::{deadlines, Config, RouteFamily};
use gateway::metrics::GatewayMetrics;
use gateway::middleware::cors::CorsConfig;
use gateway::middleware::rate_limit::RateLimiters;
use gateway::proxy::ReverseProxy;
use gateway::ratelimit::RateLimiter;
use gateway::rest_client::RestClient;
use gateway::rpc_client::RpcClient;
use gateway::state::AppState;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "gateway starting");

    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("FATAL: failed to load config: {e}");
            std::process::exit(1);
        }
    };

    // The gateway only ever reads the datastore; the ingester owns the
    // schema and runs migrations.
    let pool = match &cfg.database_url {
        Some(url) => match PgPoolOptions::new().max_connections(10).connect(url).await {
            Ok(pool) => Some(pool),
            Err(e) => {
                tracing::warn!(error = %e, "failed to connect to datastore, read endpoints will degrade");
                None
            }
        },
        None => {
            tracing::warn!("DATABASE_URL not set, datastore-backed endpoints will degrade");
            None
        }
    };

    let rpc_client = match RpcClient::connect_lazy(&cfg.continuum_grpc_url) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("FATAL: failed to construct RPC client: {e}");
            std::process::exit(1);
        }
    };
    let rest_client = RestClient::new(cfg.continuum_rest_url.clone());
    let rollup_proxy = ReverseProxy::new(cfg.rollup_url.clone());
    let continuum_rest_proxy = ReverseProxy::new(cfg.continuum_rest_url.clone());

    let rate_limiters = build_rate_limiters(&cfg);
    let metrics = Arc::new(GatewayMetrics::default());
    let cors = CorsConfig {
        allowed_origins: cfg.allowed_origins.clone(),
    };

    let port = cfg.port;
    let state = AppState {
        config: Arc::new(cfg),
        pool,
        rollup_proxy,
        continuum_rest_proxy,
        rpc_client,
        rest_client,
        rate_limiters,
        metrics,
        cors,
    };

    let router = gateway::build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await.expect("failed to bind");
    info!(%addr, "gateway listening");

    // `with_graceful_shutdown` only stops accepting new connections and
    // waits for in-flight ones; it has no deadline of its own, so the
    // 30 s drain deadline from spec §5 is enforced here by racing the
    // server task against a timeout and aborting it (closing any
    // still-open connections) if the drain runs long.
    let (notify_tx, mut notify_rx) = tokio::sync::watch::channel(false);
    let server_task = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(async move {
                notify_rx.changed().await.ok();
            })
            .await
    });
    let abort_handle = server_task.abort_handle();

    shutdown_signal().await;
    let _ = notify_tx.send(true);
    info!("shutdown signal received, draining in-flight requests");

    match tokio::time::timeout(deadlines::SHUTDOWN_DRAIN, server_task).await {
        Ok(Ok(Ok(()))) => info!("gateway shut down gracefully"),
        Ok(Ok(Err(e))) => panic!("server error: {e}"),
        Ok(Err(e)) => panic!("server task panicked: {e}"),
        Err(_) => {
            warn!("in-flight requests did not drain within the shutdown deadline, forcing close");
            abort_handle.abort();
        }
    }
}

/// Spawns each route family's sweeper and returns the assembled registry
/// (spec §4.2 "background sweeper runs every 5 minutes").
fn build_rate_limiters(cfg: &Config) -> RateLimiters {
    let make = |family: RouteFamily| {
        let (rate, burst) = cfg.rate_limit_for(family);
        let limiter = RateLimiter::new(rate, burst);
        limiter.spawn_sweeper();
        limiter
    };
    RateLimiters {
        rollup: make(RouteFamily::Rollup),
        continuum_grpc: make(RouteFamily::ContinuumGrpc),
        continuum_rest: make(RouteFamily::ContinuumRest),
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl+C, shutting down"); },
        _ = terminate => { info!("received SIGTERM, shutting down"); },
    }
}
