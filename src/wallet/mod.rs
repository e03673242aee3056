// Wallet: named identities and transaction building

mod identity;
mod tx_builder;

pub use identity::{Address, KeyPair, user_private_key, user_public_key};
pub use tx_builder::TransactionBuilder;
