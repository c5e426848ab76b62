//! Downstream delivery of normalized commands

mod http;

use async_trait::async_trait;

use crate::cdc::NormalizedCommand;
use crate::error::SinkError;

pub use http::{HttpSinkClient, SinkConfig};

/// What the downstream returned for a delivered command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkResponse {
    pub status: u16,
    pub body: String,
}

impl SinkResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait SinkClient: Send + Sync {
    /// Deliver one command. Transport failures are errors; any HTTP status is a response.
    async fn send(&self, command: &NormalizedCommand) -> Result<SinkResponse, SinkError>;
}
