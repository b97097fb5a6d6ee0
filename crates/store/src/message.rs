use std::collections::HashMap;

use tokio::sync::oneshot;

use gnd_types::parse_bool;

/// One field of a wire message. Times travel as `Int` nanoseconds since
/// epoch, buffers as `Bytes`, everything else as text.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Str(text) => text.parse().ok(),
            Self::Bytes(_) => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Bytes(bytes) => bytes,
            Self::Str(text) => text.as_bytes(),
            Self::Int(_) => &[],
        }
    }

    /// Textual boolean coercion; integers are truthy when non-zero.
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Int(value) => *value != 0,
            Self::Str(text) => parse_bool(text),
            Self::Bytes(_) => false,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// Opaque message map published to a topic.
pub type FieldMap = HashMap<String, FieldValue>;

/// A command or lifecycle directive delivered to an interface, with the
/// reply channel the store routes back to the original requester.
#[derive(Debug)]
pub struct Delivery {
    pub topic: String,
    pub fields: FieldMap,
    reply: oneshot::Sender<String>,
}

impl Delivery {
    /// Creates a delivery plus the receiver the requester waits on.
    pub fn new(topic: impl Into<String>, fields: FieldMap) -> (Self, oneshot::Receiver<String>) {
        let (reply, reply_rx) = oneshot::channel();
        (
            Self {
                topic: topic.into(),
                fields,
                reply,
            },
            reply_rx,
        )
    }

    /// Replies to the requester. A requester that went away is not an
    /// error.
    pub fn reply(self, status: impl Into<String>) {
        let _ = self.reply.send(status.into());
    }
}
