// Bank server - one request and one response per connection

use crate::config::NodeConfig;
use crate::core::Transaction;
use crate::error::ProtocolError;
use crate::ledger::Bank;
use crate::network::message::{
    ACCEPTED, BALANCE_RESPONSE, PONG, REJECTED, TX_RESPONSE, UTXO_RESPONSE,
};
use crate::network::{Command, Connection, Message};
use secp256k1::PublicKey;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Protocol handler in front of a [`Bank`]
#[derive(Clone)]
pub struct Server {
    bank: Arc<Bank>,
    config: NodeConfig,
}

impl Server {
    /// Create a new server
    pub fn new(bank: Arc<Bank>, config: NodeConfig) -> Self {
        Self { bank, config }
    }

    /// Bind the configured port and serve forever
    pub async fn listen(self) -> Result<(), ProtocolError> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        self.serve(listener).await
    }

    /// Accept connections on `listener`, one task per connection
    pub async fn serve(self, listener: TcpListener) -> Result<(), ProtocolError> {
        log::info!("Bank listening on {}", listener.local_addr()?);

        loop {
            let (stream, addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    log::error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };

            log::debug!("New connection from {}", addr);

            let bank = self.bank.clone();
            let config = self.config.clone();

            // Handle connection in separate task
            tokio::spawn(async move {
                if let Err(e) = Self::handle_connection(stream, addr, bank, config).await {
                    log::warn!("Connection {} error: {}", addr, e);
                }
            });
        }
    }

    /// Read one request, answer it once, close
    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        bank: Arc<Bank>,
        config: NodeConfig,
    ) -> Result<(), ProtocolError> {
        let mut conn = Connection::new(stream, addr, &config);

        let response = match conn.receive_message().await {
            Ok(request) => {
                log::debug!("Received {} from {}", request.command, conn.addr());
                Self::dispatch(&bank, request).await
            }
            // Undecodable envelope still gets an answer
            Err(ProtocolError::Decode(e)) => Message::error(format!("malformed request: {}", e)),
            Err(e) => return Err(e),
        };

        conn.send_message(&response).await
    }

    /// Route a decoded request to the bank and build the response
    pub async fn dispatch(bank: &Bank, request: Message) -> Message {
        let Some(command) = Command::from_name(&request.command) else {
            log::warn!("Unknown command: {}", request.command);
            return Message::error(format!("unknown command: {}", request.command));
        };

        match command {
            Command::Ping => Message::new(PONG, Value::String(String::new())),
            Command::Balance => match request.decode_data::<PublicKey>() {
                Ok(public_key) => {
                    let balance = bank.fetch_balance(&public_key).await;
                    Message::new(BALANCE_RESPONSE, Value::from(balance))
                }
                Err(e) => Message::error(format!("invalid public key: {}", e)),
            },
            Command::Utxo => match request.decode_data::<PublicKey>() {
                Ok(public_key) => {
                    let utxos = bank.fetch_utxo(&public_key).await;
                    match serde_json::to_value(utxos) {
                        Ok(data) => Message::new(UTXO_RESPONSE, data),
                        Err(e) => Message::error(format!("failed to encode outputs: {}", e)),
                    }
                }
                Err(e) => Message::error(format!("invalid public key: {}", e)),
            },
            Command::Tx => {
                let status = match request.decode_data::<Transaction>() {
                    Ok(tx) => match bank.handle(&tx).await {
                        Ok(()) => ACCEPTED,
                        // Reason already logged by the bank
                        Err(_) => REJECTED,
                    },
                    Err(e) => {
                        log::info!("Rejected undecodable transaction: {}", e);
                        REJECTED
                    }
                };
                Message::new(TX_RESPONSE, Value::String(status.to_string()))
            }
        }
    }
}
