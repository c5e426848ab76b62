use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// Location of an event in a single partition's log
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl Position {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]@{}", self.topic, self.partition, self.offset)
    }
}

/// A change event as delivered by the broker
///
/// `payload == None` is a tombstone, the empty record the connector emits
/// after a delete so log compaction can drop the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub position: Position,
    pub payload: Option<Vec<u8>>,
}

impl RawEvent {
    pub fn new(position: Position, payload: Option<Vec<u8>>) -> Self {
        Self { position, payload }
    }

    pub fn tombstone(position: Position) -> Self {
        Self {
            position,
            payload: None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.payload.is_none()
    }
}

/// Operation codes emitted by Debezium
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub enum ChangeOp {
    /// Insert (c = create)
    #[serde(rename = "c")]
    Create,
    /// Initial snapshot row (r = read)
    #[serde(rename = "r")]
    Read,
    #[serde(rename = "u")]
    Update,
    #[serde(rename = "d")]
    Delete,
}

/// Debezium message with the schema wrapper (`value.converter.schemas.enable = true`)
///
/// Everything besides `payload` (the `schema` block, `source`, `ts_ms`, ...) is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeEnvelope {
    pub payload: ChangePayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePayload {
    pub op: ChangeOp,

    /// Row state before the change (null for inserts and snapshot reads)
    #[serde(default)]
    pub before: Option<Value>,

    /// Row state after the change (null for deletes)
    #[serde(default)]
    pub after: Option<Value>,
}

impl ChangePayload {
    /// The image a command carries: `before` for deletes, `after` otherwise
    pub fn selected_image(&self) -> Option<&Value> {
        match self.op {
            ChangeOp::Delete => self.before.as_ref(),
            ChangeOp::Create | ChangeOp::Read | ChangeOp::Update => self.after.as_ref(),
        }
    }
}
