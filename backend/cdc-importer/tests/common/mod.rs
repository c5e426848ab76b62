//! Test doubles for the poll loop
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cdc_importer::error::{SinkError, SubscriptionError};
use cdc_importer::kafka::{BrokerError, PartitionEnd, PollOutcome, StreamSubscription};
use cdc_importer::{NormalizedCommand, Position, RawEvent, SinkClient, SinkResponse};
use serde_json::Value;
use tokio::sync::watch;

pub const TOPIC: &str = "MSSQLSERVER.dbo.persons";

/// Calls observed on a [`ScriptedSubscription`]
#[derive(Debug, Default)]
pub struct SubscriptionLog {
    pub subscribes: usize,
    pub polls: usize,
    pub acked: Vec<Position>,
    pub closes: usize,
}

/// Replays a fixed list of poll outcomes, then requests a stop
pub struct ScriptedSubscription {
    topics: Vec<String>,
    script: VecDeque<PollOutcome>,
    log: Arc<Mutex<SubscriptionLog>>,
    stop_tx: Option<watch::Sender<bool>>,
    fail_subscribe: bool,
}

impl ScriptedSubscription {
    pub fn new(script: Vec<PollOutcome>) -> Self {
        Self {
            topics: vec![TOPIC.to_string()],
            script: script.into(),
            log: Arc::new(Mutex::new(SubscriptionLog::default())),
            stop_tx: None,
            fail_subscribe: false,
        }
    }

    /// Once the script runs dry, flip this sender to `true`
    pub fn stop_when_drained(mut self, stop_tx: watch::Sender<bool>) -> Self {
        self.stop_tx = Some(stop_tx);
        self
    }

    pub fn failing_subscribe(mut self) -> Self {
        self.fail_subscribe = true;
        self
    }

    pub fn log(&self) -> Arc<Mutex<SubscriptionLog>> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl StreamSubscription for ScriptedSubscription {
    fn topics(&self) -> &[String] {
        &self.topics
    }

    fn subscribe(&mut self) -> Result<(), SubscriptionError> {
        self.log.lock().unwrap().subscribes += 1;
        if self.fail_subscribe {
            return Err(SubscriptionError::Closed);
        }
        Ok(())
    }

    async fn poll(&mut self, _timeout: Duration) -> PollOutcome {
        self.log.lock().unwrap().polls += 1;
        match self.script.pop_front() {
            Some(outcome) => outcome,
            None => {
                if let Some(stop_tx) = &self.stop_tx {
                    let _ = stop_tx.send(true);
                }
                PollOutcome::NoEvent
            }
        }
    }

    fn ack(&mut self, position: &Position) -> Result<(), SubscriptionError> {
        self.log.lock().unwrap().acked.push(position.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), SubscriptionError> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}

/// Records every command it is given
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub sent: Arc<Mutex<Vec<NormalizedCommand>>>,
    fail: bool,
    status: Option<u16>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send fails as a transport-level error
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn responding_with(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<NormalizedCommand> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SinkClient for RecordingSink {
    async fn send(&self, command: &NormalizedCommand) -> Result<SinkResponse, SinkError> {
        self.sent.lock().unwrap().push(command.clone());
        if self.fail {
            return Err(sink_failure());
        }
        Ok(SinkResponse {
            status: self.status.unwrap_or(200),
            body: serde_json::to_string(&command.body("Entity")).unwrap(),
        })
    }
}

pub fn sink_failure() -> SinkError {
    SinkError::Serialize(serde_json::from_str::<Value>("{").unwrap_err())
}

pub fn data(partition: i32, offset: i64, envelope: Value) -> PollOutcome {
    PollOutcome::Data(RawEvent::new(
        Position::new(TOPIC, partition, offset),
        Some(serde_json::to_vec(&envelope).unwrap()),
    ))
}

pub fn raw(partition: i32, offset: i64, bytes: &[u8]) -> PollOutcome {
    PollOutcome::Data(RawEvent::new(
        Position::new(TOPIC, partition, offset),
        Some(bytes.to_vec()),
    ))
}

pub fn tombstone(partition: i32, offset: i64) -> PollOutcome {
    PollOutcome::Data(RawEvent::tombstone(Position::new(TOPIC, partition, offset)))
}

pub fn end_of_partition(partition: i32) -> PollOutcome {
    PollOutcome::EndOfPartition(PartitionEnd { partition })
}

pub fn broker_error() -> PollOutcome {
    PollOutcome::BrokerError(BrokerError {
        code: "AllBrokersDown".to_string(),
        message: "all brokers are down".to_string(),
    })
}

pub fn update_event(id: i64, before: &str, after: &str) -> Value {
    serde_json::json!({
        "payload": {
            "op": "u",
            "before": {"id": id, "name": before},
            "after": {"id": id, "name": after}
        }
    })
}

pub fn create_event(id: i64, name: &str) -> Value {
    serde_json::json!({
        "payload": {"op": "c", "before": null, "after": {"id": id, "name": name}}
    })
}

pub fn delete_event(id: i64, name: &str) -> Value {
    serde_json::json!({
        "payload": {"op": "d", "before": {"id": id, "name": name}, "after": null}
    })
}
