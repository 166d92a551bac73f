//! JSON message protocol for the session transport boundary.
//!
//! The engine itself moves typed values over channels; a transport
//! (websocket, local pipe) encodes each message as one JSON object with a
//! `type` discriminator. Audio flows in as sequence-numbered PCM chunks,
//! transcript events flow out.

use crate::error::Result;
use crate::transcript::TranscriptEvent;
use serde::{Deserialize, Serialize};

/// Messages sent by a client into a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// One audio chunk: 16-bit PCM mono samples at the session sample rate,
    /// tagged with a strictly consecutive sequence number starting at 0.
    Audio { seq: u64, samples: Vec<i16> },
    /// No more audio will follow; flush and close the session.
    EndSession,
}

impl ClientMessage {
    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from a JSON string.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Messages sent by a session back to its client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// One inference cycle's transcript update.
    Transcript(TranscriptEvent),
    /// The session failed; a `Closed` message follows.
    Error { message: String },
    /// The session is over; no further messages will arrive.
    Closed,
}

impl ServerMessage {
    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from a JSON string.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}
