// BankNetCoin
// A minimal UTXO bank served over a framed request/response protocol

pub mod core;
pub mod ledger;
pub mod network;
pub mod wallet;
pub mod config;
pub mod error;
pub mod cli;

// Re-exports for convenience
pub use crate::core::{Hash256, OutPoint, Transaction, TxInput, TxOutput};
pub use crate::ledger::{Bank, UtxoSet};
pub use crate::network::{Client, Command, Message, Server};
pub use crate::wallet::{Address, KeyPair, TransactionBuilder, user_private_key, user_public_key};
pub use crate::config::NodeConfig;
pub use crate::error::{ProtocolError, SignatureError, ValidationError, WalletError};
pub use crate::cli::{Cli, CliHandler};
