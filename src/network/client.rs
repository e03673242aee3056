// Client stub - one connection per request

use crate::config::NodeConfig;
use crate::core::{Transaction, TxOutput};
use crate::error::ProtocolError;
use crate::network::message::{ACCEPTED, BALANCE_RESPONSE, PONG, TX_RESPONSE, UTXO_RESPONSE};
use crate::network::{Command, Connection, Message};
use secp256k1::PublicKey;
use serde_json::Value;

/// Talks to a bank server
pub struct Client {
    config: NodeConfig,
}

impl Client {
    pub fn new(config: NodeConfig) -> Self {
        Self { config }
    }

    /// Open a connection, send one request, wait for one response, close
    pub async fn send_message(&self, command: &str, data: Value) -> Result<Message, ProtocolError> {
        let mut conn = Connection::connect(&self.config).await?;

        conn.send_message(&Message::new(command, data)).await?;
        let response = conn.receive_message().await?;

        log::debug!("Received {} from {}", response.command, conn.addr());
        Ok(response)
    }

    pub async fn ping(&self) -> Result<(), ProtocolError> {
        let response = self
            .send_message(Command::Ping.as_str(), Value::String(String::new()))
            .await?;
        Self::expect(response, PONG).map(|_| ())
    }

    /// Balance of `public_key`
    pub async fn balance(&self, public_key: &PublicKey) -> Result<u64, ProtocolError> {
        let request = Message::request(Command::Balance, public_key)?;
        let response = self.send_message(&request.command, request.data).await?;
        Self::expect(response, BALANCE_RESPONSE)?.decode_data()
    }

    /// Unspent outputs of `public_key`
    pub async fn utxo(&self, public_key: &PublicKey) -> Result<Vec<TxOutput>, ProtocolError> {
        let request = Message::request(Command::Utxo, public_key)?;
        let response = self.send_message(&request.command, request.data).await?;
        Self::expect(response, UTXO_RESPONSE)?.decode_data()
    }

    /// Submit a transaction; `true` when the bank accepted it
    pub async fn submit(&self, tx: &Transaction) -> Result<bool, ProtocolError> {
        let request = Message::request(Command::Tx, tx)?;
        let response = self.send_message(&request.command, request.data).await?;
        let status: String = Self::expect(response, TX_RESPONSE)?.decode_data()?;
        Ok(status == ACCEPTED)
    }

    fn expect(response: Message, expected: &str) -> Result<Message, ProtocolError> {
        if response.is_error() {
            let reason = match response.data {
                Value::String(reason) => reason,
                other => other.to_string(),
            };
            return Err(ProtocolError::Server(reason));
        }
        if response.command != expected {
            return Err(ProtocolError::UnexpectedResponse {
                expected: expected.to_string(),
                got: response.command,
            });
        }
        Ok(response)
    }
}
