//! Application messages carried by a transport.
//!
//! The transport does not interpret these; it only needs a closed set of
//! shapes so that malformed input fails at the boundary with a typed error
//! instead of travelling further as an untyped value.

pub mod payload;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One application message. On the wire: a JSON object tagged by `"type"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// Greeting sent by the service once the channel opens.
    Hello {
        #[serde(rename = "protocolVersion")]
        protocol_version: u32,
        #[serde(rename = "appName")]
        app_name: String,
        #[serde(rename = "appVersion")]
        app_version: String,
    },

    /// Request from the client.
    Command {
        command: String,
        #[serde(default)]
        params: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// Reply to a command.
    Response {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        #[serde(default)]
        result: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<bool>,
    },

    /// Unsolicited notification from the service.
    Event {
        event: String,
        #[serde(default)]
        payload: Value,
        #[serde(default)]
        nanos: u64,
        #[serde(default)]
        paused: bool,
    },

    /// Protocol-level error reported by the service.
    Error { message: String },
}

impl Message {
    pub fn command(command: impl Into<String>, params: Value, id: Option<String>) -> Self {
        Self::Command {
            command: command.into(),
            params,
            id,
        }
    }

    /// The `"type"` tag of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::Command { .. } => "command",
            Self::Response { .. } => "response",
            Self::Event { .. } => "event",
            Self::Error { .. } => "error",
        }
    }

    /// Serialize to the JSON text carried in one frame.
    pub fn encode(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse one frame's JSON text.
    pub fn decode(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
