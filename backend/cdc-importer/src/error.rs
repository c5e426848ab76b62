//! Error types for the CDC importer
//!
//! Each stage of the pipeline has its own error so the poller can decide,
//! per stage, whether a failure halts the consumer or is skipped.

use thiserror::Error;

use crate::cdc::Position;

/// Configuration could not be loaded or failed validation
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Failures of the broker subscription itself (not of individual events)
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("Subscription is closed")]
    Closed,
}

/// A data event could not be turned into a command
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Malformed JSON, missing `payload`, or an `op` outside c/r/u/d
    #[error("Invalid change event envelope: {0}")]
    Envelope(#[from] serde_json::Error),

    #[error("Row image for '{op}' must be an object or null")]
    InvalidImage { op: &'static str },
}

/// Delivery to the downstream sink failed
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to serialize command: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Fatal outcome of a poll loop
#[derive(Debug, Error)]
pub enum PollerError {
    #[error("Failed to subscribe: {0}")]
    Subscribe(#[from] SubscriptionError),

    #[error("Broker error ({code}): {message}")]
    Broker { code: String, message: String },

    #[error("Failed to normalize event at {position}: {source}")]
    Decode {
        position: Position,
        #[source]
        source: NormalizeError,
    },

    #[error("Failed to deliver event at {position}: {source}")]
    Sink {
        position: Position,
        #[source]
        source: SinkError,
    },
}

pub type Result<T, E = PollerError> = std::result::Result<T, E>;
