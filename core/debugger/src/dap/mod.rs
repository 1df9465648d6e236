//! Debug Adapter Protocol (DAP) plumbing
//!
//! This module implements the protocol side of the bridge.
//!
//! # Architecture
//!
//! The DAP implementation consists of:
//! - Protocol envelopes (requests, responses, events) and typed bodies
//! - The protocol handler, dispatching requests to registered commands
//! - The message pump, the rendezvous between a transport thread and the
//!   engine thread
//! - The `Content-Length` framing codec used by stream transports
//!
//! # References
//!
//! - [DAP Specification](https://microsoft.github.io/debug-adapter-protocol/)

pub mod handler;
pub mod messages;
pub mod pump;
pub mod transport;

pub use messages::*;

use crate::error::DapResult;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// DAP protocol message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProtocolMessage {
    /// A request from the client.
    #[serde(rename = "request")]
    Request(Request),
    /// A response to a request.
    #[serde(rename = "response")]
    Response(Response),
    /// An event pushed to the client.
    #[serde(rename = "event")]
    Event(Event),
}

/// DAP request message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Sequence number of the request.
    #[serde(default)]
    pub seq: i64,
    /// The command to execute.
    pub command: String,
    /// Command specific arguments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

impl Request {
    /// Deserializes the arguments of the request.
    ///
    /// Missing arguments deserialize as an empty object, so argument structs
    /// whose fields all have defaults accept argument-less requests.
    pub fn parse_arguments<T: DeserializeOwned>(&self) -> DapResult<T> {
        let arguments = self
            .arguments
            .clone()
            .filter(|arguments| !arguments.is_null())
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        Ok(serde_json::from_value(arguments)?)
    }
}

/// DAP response message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Sequence number of the response.
    pub seq: i64,
    /// Sequence number of the request answered.
    pub request_seq: i64,
    /// Outcome of the request.
    pub success: bool,
    /// The command of the request answered.
    pub command: String,
    /// Error text of a failed request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The result, or `{ "error": .. }` on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Response {
    /// Serializes the response as a complete envelope.
    pub fn into_value(self) -> Value {
        envelope(ProtocolMessage::Response(self))
    }
}

/// DAP event message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Sequence number of the event.
    pub seq: i64,
    /// Type of the event.
    pub event: String,
    /// Event specific information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Event {
    /// Creates an event.
    pub fn new(seq: i64, event: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            seq,
            event: event.into(),
            body,
        }
    }

    /// Serializes the event as a complete envelope.
    pub fn into_value(self) -> Value {
        envelope(ProtocolMessage::Event(self))
    }
}

fn envelope(message: ProtocolMessage) -> Value {
    serde_json::to_value(&message).unwrap_or_else(|err| {
        log::error!(target: "dapbridge::protocol", "Failed to serialize message: {err}");
        Value::Null
    })
}

/// Serializes a typed body.
pub(crate) fn to_body<T: Serialize>(body: &T) -> DapResult<Value> {
    Ok(serde_json::to_value(body)?)
}
