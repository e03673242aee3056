// Ledger: the unspent output set and the bank that guards it

mod utxo_set;
mod bank;

pub use utxo_set::UtxoSet;
pub use bank::Bank;
