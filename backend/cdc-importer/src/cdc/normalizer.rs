//! Raw change event → normalized importer command
//!
//! The operation mapping is fixed:
//!
//! | raw op    | Operation |
//! |-----------|-----------|
//! | c, r      | 1         |
//! | u         | 0         |
//! | d         | -1        |
//! | tombstone | 999       |

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use super::models::{ChangeEnvelope, ChangeOp, Position, RawEvent};
use crate::error::NormalizeError;

/// Operation carried by a normalized command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Tombstone,
}

impl Operation {
    /// Integer code understood by the importer API
    pub fn code(&self) -> i32 {
        match self {
            Operation::Create | Operation::Read => 1,
            Operation::Update => 0,
            Operation::Delete => -1,
            Operation::Tombstone => 999,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "c",
            Operation::Read => "r",
            Operation::Update => "u",
            Operation::Delete => "d",
            Operation::Tombstone => "t",
        }
    }
}

impl From<ChangeOp> for Operation {
    fn from(op: ChangeOp) -> Self {
        match op {
            ChangeOp::Create => Operation::Create,
            ChangeOp::Read => Operation::Read,
            ChangeOp::Update => Operation::Update,
            ChangeOp::Delete => Operation::Delete,
        }
    }
}

/// Unit handed to the sink
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCommand {
    /// Where the event came from; logged, never sent
    pub position: Position,
    pub operation: Operation,
    /// Selected row image: an object, or null when the connector sent none
    pub entity: Value,
}

impl NormalizedCommand {
    pub fn tombstone(position: Position) -> Self {
        Self {
            position,
            operation: Operation::Tombstone,
            entity: Value::Object(Map::new()),
        }
    }

    /// Tombstones are never forwarded
    pub fn is_suppressed(&self) -> bool {
        self.operation == Operation::Tombstone
    }

    /// Wire body `{"Operation": <code>, "<entity_field>": <image>}`
    pub fn body<'a>(&'a self, entity_field: &'a str) -> CommandBody<'a> {
        CommandBody {
            command: self,
            entity_field,
        }
    }
}

/// Borrowed view serializing a command under a collaborator-defined entity key
pub struct CommandBody<'a> {
    command: &'a NormalizedCommand,
    entity_field: &'a str,
}

impl Serialize for CommandBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("Operation", &self.command.operation.code())?;
        map.serialize_entry(self.entity_field, &self.command.entity)?;
        map.end()
    }
}

/// Turn a raw event into a command.
///
/// Absent payload yields the suppressed tombstone command. Anything that is
/// not a well-formed envelope with a c/r/u/d `op` is an error.
pub fn normalize(event: &RawEvent) -> Result<NormalizedCommand, NormalizeError> {
    let bytes = match &event.payload {
        Some(bytes) => bytes,
        None => return Ok(NormalizedCommand::tombstone(event.position.clone())),
    };

    let text = std::str::from_utf8(bytes)?;
    let envelope: ChangeEnvelope = serde_json::from_str(text)?;
    let payload = envelope.payload;

    let entity = match payload.selected_image() {
        None => Value::Null,
        Some(image) if image.is_object() => image.clone(),
        Some(_) => {
            return Err(NormalizeError::InvalidImage {
                op: Operation::from(payload.op).as_str(),
            })
        }
    };

    Ok(NormalizedCommand {
        position: event.position.clone(),
        operation: payload.op.into(),
        entity,
    })
}
