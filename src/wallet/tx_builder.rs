// Transaction builder

use crate::core::{hash256, Hash256, Transaction, TxInput, TxOutput};
use crate::error::WalletError;
use crate::wallet::KeyPair;
use secp256k1::PublicKey;

/// Builds signed payments from a sender's unspent outputs
pub struct TransactionBuilder<'a> {
    sender: &'a KeyPair,
}

impl<'a> TransactionBuilder<'a> {
    /// Create a new transaction builder
    pub fn new(sender: &'a KeyPair) -> Self {
        Self { sender }
    }

    /// Build a transaction paying `amount` to `to`, returning change to the sender.
    /// Every input is signed.
    pub fn build(
        &self,
        utxos: &[TxOutput],
        to: &PublicKey,
        amount: u64,
    ) -> Result<Transaction, WalletError> {
        if amount == 0 {
            return Err(WalletError::InvalidAmount);
        }

        let (selected, total_input) = self.select_utxos(utxos, amount)?;

        // Create inputs (unsigned)
        let inputs: Vec<TxInput> = selected
            .iter()
            .map(|utxo| TxInput::new(utxo.txid, utxo.vout))
            .collect();

        // Payment first, then change (if any)
        let mut payees = vec![(amount, *to)];
        let change = total_input - amount;
        if change > 0 {
            payees.push((change, self.sender.public_key));
        }

        let id = Self::derive_id(&inputs, &payees);
        let outputs = payees
            .into_iter()
            .enumerate()
            .map(|(vout, (value, owner))| TxOutput::new(id, vout as u32, value, owner))
            .collect();

        let mut tx = Transaction::new(id, inputs, outputs);
        for index in 0..tx.inputs.len() {
            tx.sign_input(index, &self.sender.secret_key)?;
        }

        Ok(tx)
    }

    /// Select the sender's UTXOs until `target` is covered
    fn select_utxos<'u>(
        &self,
        utxos: &'u [TxOutput],
        target: u64,
    ) -> Result<(Vec<&'u TxOutput>, u64), WalletError> {
        let mut selected = Vec::new();
        let mut total = 0u64;

        for utxo in utxos.iter().filter(|u| u.public_key == self.sender.public_key) {
            selected.push(utxo);
            total = total.saturating_add(utxo.amount);

            if total >= target {
                return Ok((selected, total));
            }
        }

        Err(WalletError::InsufficientFunds { have: total, need: target })
    }

    /// Id committing to the spent outpoints and the payees.
    /// Outpoints are spendable once, so ids never repeat on an honest ledger.
    fn derive_id(inputs: &[TxInput], payees: &[(u64, PublicKey)]) -> Hash256 {
        let mut preimage = Vec::new();
        for input in inputs {
            preimage.extend_from_slice(input.txid.as_bytes());
            preimage.extend_from_slice(&input.vout.to_le_bytes());
        }
        for (amount, owner) in payees {
            preimage.extend_from_slice(&amount.to_le_bytes());
            preimage.extend_from_slice(&owner.serialize());
        }
        hash256(&preimage)
    }
}
