//! Thin JSON client for the Continuum REST backend (spec §4.4 composite &
//! fallback paths). Separate from [`crate::proxy::ReverseProxy`] because
//! these calls parse the response rather than streaming it through.

use std::time::Duration;

use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned {0}")]
    Status(reqwest::StatusCode),
    #[error("not found")]
    NotFound,
}

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("failed to build REST client");
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, deadline: Duration) -> Result<T, RestError> {
        let url = format!("{}{}", self.base_url, path);
        let response = tokio::time::timeout(deadline, self.client.get(&url).send())
            .await
            .map_err(|_| RestError::Status(reqwest::StatusCode::GATEWAY_TIMEOUT))??;

        match response.status() {
            status if status == reqwest::StatusCode::NOT_FOUND => Err(RestError::NotFound),
            status if status.is_success() => Ok(response.json::<T>().await?),
            status => Err(RestError::Status(status)),
        }
    }
}
