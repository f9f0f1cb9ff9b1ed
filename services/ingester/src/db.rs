use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;

pub async fn create_pool(cfg: &Config) -> PgPool {
    let database_url = cfg
        .database_url
        .as_deref()
        .expect("create_pool requires DATABASE_URL (caller must check OUTPUT_MODE first)");

    PgPoolOptions::new()
        .max_connections(cfg.db_max_connections)
        .min_connections(cfg.db_min_connections)
        .max_lifetime(cfg.db_max_conn_lifetime)
        .idle_timeout(cfg.db_max_conn_idle_time)
        .connect(database_url)
        .await
        .expect("failed to connect to Postgres")
}

pub async fn run_migrations(pool: &PgPool) {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .expect("failed to run database migrations")
}
