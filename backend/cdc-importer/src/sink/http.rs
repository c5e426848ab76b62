use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

use super::{SinkClient, SinkResponse};
use crate::cdc::NormalizedCommand;
use crate::error::SinkError;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Importer API endpoint configuration
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Full URL the commands are POSTed to
    pub endpoint: Url,
    /// Key the selected row image is sent under
    pub entity_field: String,
    /// Request timeout; `None` keeps the transport default
    pub timeout: Option<Duration>,
}

/// POSTs commands as JSON to the importer API. No retries.
#[derive(Clone)]
pub struct HttpSinkClient {
    http: reqwest::Client,
    config: SinkConfig,
}

impl HttpSinkClient {
    pub fn new(config: SinkConfig) -> Result<Self, SinkError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            config,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.config.endpoint
    }
}

#[async_trait]
impl SinkClient for HttpSinkClient {
    async fn send(&self, command: &NormalizedCommand) -> Result<SinkResponse, SinkError> {
        let body = serde_json::to_vec(&command.body(&self.config.entity_field))?;

        debug!(
            endpoint = %self.config.endpoint,
            operation = command.operation.code(),
            "Sending command to importer API"
        );

        let response = self
            .http
            .post(self.config.endpoint.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(SinkResponse { status, body })
    }
}
