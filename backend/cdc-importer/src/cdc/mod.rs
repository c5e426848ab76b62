mod models;
mod normalizer;

pub use models::{ChangeEnvelope, ChangeOp, ChangePayload, Position, RawEvent};
pub use normalizer::{normalize, CommandBody, NormalizedCommand, Operation};
