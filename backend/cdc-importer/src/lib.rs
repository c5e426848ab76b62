//! Change-data-capture importer
//!
//! Consumes Debezium change events from Kafka, normalizes them into importer
//! commands and POSTs them to the importer API that maintains the search index.
//!
//! ```text
//! Kafka → StreamSubscription.poll → normalize → SinkClient.send → importer API
//! ```

pub mod cdc;
pub mod config;
pub mod error;
pub mod kafka;
pub mod metrics;
pub mod poller;
pub mod sink;

pub use cdc::{normalize, NormalizedCommand, Operation, Position, RawEvent};
pub use config::Config;
pub use error::{NormalizeError, PollerError, SinkError, SubscriptionError};
pub use kafka::{KafkaSubscription, PollOutcome, StreamSubscription};
pub use poller::{ErrorPolicy, Poller, PollerConfig, PollerState};
pub use sink::{HttpSinkClient, SinkClient, SinkResponse};
