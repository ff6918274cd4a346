use crate::config::SourceSettings;
use crate::utils::error::{Result, TelemetryError};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;

/// Thin reqwest wrapper that applies the timeout and retry policy.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(settings: &SourceSettings) -> Result<Self> {
        let client = Client::builder().timeout(settings.timeout()).build()?;
        Ok(Self {
            client,
            retry_attempts: settings.retry_attempts,
            retry_delay: settings.retry_delay(),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Sends the request built by `build` and decodes a JSON body.
    /// Transport failures and 5xx responses are retried.
    pub async fn send_json<F>(&self, source_name: &str, build: F) -> Result<serde_json::Value>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            match self.try_once(source_name, &build).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.retry_attempts => {
                    attempt += 1;
                    tracing::warn!(
                        "{} request failed ({}), retry {}/{}",
                        source_name,
                        e,
                        attempt,
                        self.retry_attempts
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_once<F>(&self, source_name: &str, build: &F) -> Result<serde_json::Value>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = build(&self.client).send().await?;
        let status = response.status();
        tracing::debug!("{} responded with {}", source_name, status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TelemetryError::SourceStatus {
                source_name: source_name.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}
