//! Shared test fixtures: a fully-wired `AppState` pointed at unreachable
//! or caller-supplied upstreams, without touching a live database.

use std::sync::Arc;

use gateway::config::{Config, RouteFamily};
use gateway::metrics::GatewayMetrics;
use gateway::middleware::cors::CorsConfig;
use gateway::middleware::rate_limit::RateLimiters;
use gateway::proxy::ReverseProxy;
use gateway::ratelimit::RateLimiter;
use gateway::rest_client::RestClient;
use gateway::rpc_client::RpcClient;
use gateway::state::AppState;

pub fn test_state(rollup_url: &str, continuum_rest_url: &str, continuum_grpc_url: &str) -> AppState {
    let config = Config {
        port: 0,
        env: "test".to_owned(),
        allowed_origins: vec!["https://allowed.example".to_owned()],
        rollup_url: rollup_url.to_owned(),
        continuum_grpc_url: continuum_grpc_url.to_owned(),
        continuum_rest_url: continuum_rest_url.to_owned(),
        database_url: None,
        rate_limit_rollup: 1000,
        rate_limit_continuum_grpc: 500,
        rate_limit_continuum_rest: 2000,
    };

    let make_limiter = |family: RouteFamily| {
        let (rate, burst) = config.rate_limit_for(family);
        RateLimiter::new(rate, burst)
    };

    AppState {
        rollup_proxy: ReverseProxy::new(config.rollup_url.clone()),
        continuum_rest_proxy: ReverseProxy::new(config.continuum_rest_url.clone()),
        rpc_client: RpcClient::connect_lazy(&config.continuum_grpc_url).expect("lazy rpc client"),
        rest_client: RestClient::new(config.continuum_rest_url.clone()),
        rate_limiters: RateLimiters {
            rollup: make_limiter(RouteFamily::Rollup),
            continuum_grpc: make_limiter(RouteFamily::ContinuumGrpc),
            continuum_rest: make_limiter(RouteFamily::ContinuumRest),
        },
        metrics: Arc::new(GatewayMetrics::new()),
        cors: CorsConfig {
            allowed_origins: config.allowed_origins.clone(),
        },
        pool: None,
        config: Arc::new(config),
    }
}
