//! Shared application state threaded through every axum handler.

use sqlx::PgPool;

use crate::config::Config;
use crate::metrics::GatewayMetrics;
use crate::middleware::cors::CorsConfig;
use crate::middleware::rate_limit::RateLimiters;
use crate::proxy::ReverseProxy;
use crate::rest_client::RestClient;
use crate::rpc_client::RpcClient;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// `None` when `DATABASE_URL` was not configured; datastore-backed
    /// endpoints degrade gracefully per spec §4.4 (never 500 on absence).
    pub pool: Option<PgPool>,
    pub rollup_proxy: ReverseProxy,
    /// Proxies unmatched `/continuum/*` paths straight to the REST backend
    /// (spec §6 "`GET /continuum/*` (unmatched)"), separate from
    /// [`RestClient`] which only handles structured JSON GETs.
    pub continuum_rest_proxy: ReverseProxy,
    pub rpc_client: RpcClient,
    pub rest_client: RestClient,
    pub rate_limiters: RateLimiters,
    pub metrics: Arc<GatewayMetrics>,
    pub cors: CorsConfig,
}
