// Request/response envelopes

use crate::error::ProtocolError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response command for `ping`
pub const PONG: &str = "pong";
pub const BALANCE_RESPONSE: &str = "balance-response";
pub const UTXO_RESPONSE: &str = "utxo-response";
pub const TX_RESPONSE: &str = "tx-response";
/// Sent for unknown commands and undecodable requests
pub const ERROR: &str = "error";

/// `tx-response` payloads
pub const ACCEPTED: &str = "accepted";
pub const REJECTED: &str = "rejected";

/// Request commands understood by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    Balance,
    Utxo,
    Tx,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Ping => "ping",
            Command::Balance => "balance",
            Command::Utxo => "utxo",
            Command::Tx => "tx",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "ping" => Some(Command::Ping),
            "balance" => Some(Command::Balance),
            "utxo" => Some(Command::Utxo),
            "tx" => Some(Command::Tx),
            _ => None,
        }
    }
}

/// Envelope shared by requests and responses: `{ "command": ..., "data": ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub command: String,
    #[serde(default)]
    pub data: Value,
}

impl Message {
    pub fn new(command: impl Into<String>, data: Value) -> Self {
        Self {
            command: command.into(),
            data,
        }
    }

    /// Build a request carrying a serializable payload
    pub fn request<T: Serialize>(command: Command, payload: &T) -> Result<Self, ProtocolError> {
        Ok(Self::new(command.as_str(), serde_json::to_value(payload)?))
    }

    /// Explicit error response
    pub fn error(reason: impl Into<String>) -> Self {
        Self::new(ERROR, Value::String(reason.into()))
    }

    pub fn is_error(&self) -> bool {
        self.command == ERROR
    }

    /// Decode the payload into a concrete type
    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        Ok(T::deserialize(&self.data)?)
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(data)?)
    }
}
