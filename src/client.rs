use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::config::{Endpoints, Settings};
use crate::error::{FetchError, Result};

/// HTTP access to the JMA bosai endpoints.
///
/// Cheap to clone; the inner `reqwest::Client` shares its connection pool.
#[derive(Debug, Clone)]
pub struct JmaClient {
    http: Client,
    endpoints: Endpoints,
}

impl JmaClient {
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, endpoints })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.endpoints.clone(), settings.timeout)
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// GETs `url` and returns the body, failing on transport errors and
    /// non-2xx statuses.
    pub(crate) async fn get_text(&self, url: &str) -> Result<String> {
        debug!(%url, "GET");
        let response = self.http.get(url).send().await.map_err(|e| {
            warn!(%url, error = %e, "request failed");
            FetchError::Network(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "unexpected status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(response.text().await?)
    }
}
