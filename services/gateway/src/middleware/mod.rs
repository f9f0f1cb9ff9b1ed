//! Middleware chain (spec §4.1), applied outermost-first: request-ID,
//! panic recovery, access log, metrics, CORS.

pub mod access_log;
pub mod cors;
pub mod metrics;
pub mod rate_limit;
pub mod recovery;
pub mod request_id;
