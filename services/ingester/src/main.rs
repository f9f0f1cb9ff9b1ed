use std::sync::Arc;

use ingester::config::{Config, OutputMode};
use ingester::health::ReadinessFlag;
use ingester::writer::Writer;
use ingester::{db, health, metrics, pipeline, stream_reader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "ingester starting");

    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("FATAL: failed to load config: {e}");
            std::process::exit(1);
        }
    };

    let metrics = Arc::new(metrics::IngesterMetrics::new());
    let readiness = ReadinessFlag::new();

    let writer: Arc<dyn Writer> = match cfg.output_mode {
        OutputMode::Timescale => {
            info!("connecting to timescale datastore...");
            let pool = db::create_pool(&cfg).await;
            db::run_migrations(&pool).await;
            info!("migrations applied");
            Arc::new(ingester::writer::postgres::PostgresWriter::new(pool))
        }
        OutputMode::Console => Arc::new(ingester::writer::console::ConsoleWriter::new(cfg.output_format)),
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let pipeline_cfg = pipeline::PipelineConfig {
        buffer_size: cfg.buffer_size,
        worker_count: cfg.worker_count,
        batch_size: cfg.batch_size,
        flush_interval: cfg.flush_interval,
        drain_deadline: std::time::Duration::from_secs(30),
    };
    let (wire_tx, pipeline_handle) = pipeline::spawn(pipeline_cfg, writer, metrics.clone(), shutdown_rx.clone());

    let (error_tx, mut error_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(msg) = error_rx.recv().await {
            tracing::warn!(%msg, "sequencer stream reported an error");
        }
    });

    let reader_handle = tokio::spawn(stream_reader::run(
        cfg.continuum_grpc_url.clone(),
        cfg.start_tick,
        stream_reader::BackoffConfig::default(),
        wire_tx,
        error_tx,
        readiness.clone(),
        shutdown_rx.clone(),
    ));

    let health_addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.health_check_port));
    let health_metrics = metrics.clone();
    let health_readiness = readiness.clone();
    tokio::spawn(async move {
        if let Err(e) = health::serve(health_addr, health_metrics, health_readiness).await {
            tracing::error!(error = %e, "health server exited");
        }
    });
    info!(addr = %health_addr, "health server listening");

    shutdown_signal().await;
    info!("shutdown signal received, draining pipeline");
    let _ = shutdown_tx.send(true);

    let _ = reader_handle.await;
    let _ = pipeline_handle.await;
    info!("ingester shut down gracefully");
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
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
