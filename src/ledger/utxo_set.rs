// UTXO (Unspent Transaction Output) set management

use crate::core::{OutPoint, Transaction, TxOutput};
use crate::error::ValidationError;
use secp256k1::PublicKey;
use std::collections::{HashMap, HashSet};

/// In-memory unspent output set.
///
/// Not synchronised on its own; [`Bank`](crate::ledger::Bank) owns it behind a lock.
#[derive(Debug, Default)]
pub struct UtxoSet {
    outputs: HashMap<OutPoint, TxOutput>,
    /// Sum of all unspent amounts, kept in step with `outputs`
    total_value: u64,
}

impl UtxoSet {
    /// Create an empty UTXO set
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a UTXO
    pub fn get(&self, outpoint: &OutPoint) -> Option<&TxOutput> {
        self.outputs.get(outpoint)
    }

    /// Check if a UTXO exists
    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.outputs.contains_key(outpoint)
    }

    /// Count total UTXOs
    pub fn count(&self) -> usize {
        self.outputs.len()
    }

    /// Sum of every unspent amount
    pub fn total_value(&self) -> u64 {
        self.total_value
    }

    /// All UTXOs owned by `public_key`, ordered by outpoint
    pub fn outputs_for(&self, public_key: &PublicKey) -> Vec<TxOutput> {
        let mut owned: Vec<TxOutput> = self
            .outputs
            .values()
            .filter(|output| &output.public_key == public_key)
            .cloned()
            .collect();
        owned.sort_by_key(TxOutput::outpoint);
        owned
    }

    /// Get balance for a public key
    pub fn balance(&self, public_key: &PublicKey) -> u64 {
        self.outputs
            .values()
            .filter(|output| &output.public_key == public_key)
            .map(|output| output.amount)
            .sum()
    }

    /// Check a freshly minted output before it is applied
    pub fn check_issuance(&self, tx: &Transaction) -> Result<(), ValidationError> {
        Self::check_output_shape(tx)?;
        self.check_outputs_new(tx)?;
        let minted = tx.total_output_value().ok_or(ValidationError::ValueOverflow)?;
        self.total_value
            .checked_add(minted)
            .ok_or(ValidationError::ValueOverflow)?;
        Ok(())
    }

    /// Validate a spending transaction against the current set.
    /// Stops at the first failure.
    pub fn validate(&self, tx: &Transaction) -> Result<(), ValidationError> {
        if tx.inputs.is_empty() || tx.outputs.is_empty() {
            return Err(ValidationError::EmptyTransaction);
        }

        Self::check_output_shape(tx)?;

        let mut seen = HashSet::with_capacity(tx.inputs.len());
        let mut input_sum = 0u64;

        for (index, input) in tx.inputs.iter().enumerate() {
            let outpoint = input.outpoint();
            if !seen.insert(outpoint) {
                return Err(ValidationError::DuplicateInput(outpoint));
            }

            let spent = self
                .get(&outpoint)
                .ok_or(ValidationError::UnknownOutpoint(outpoint))?;

            // Missing and malformed signatures count as invalid
            match tx.verify_input(index, &spent.public_key) {
                Ok(true) => {}
                Ok(false) | Err(_) => return Err(ValidationError::InvalidSignature { index }),
            }

            input_sum = input_sum
                .checked_add(spent.amount)
                .ok_or(ValidationError::ValueOverflow)?;
        }

        self.check_outputs_new(tx)?;

        let output_sum = tx.total_output_value().ok_or(ValidationError::ValueOverflow)?;
        if input_sum != output_sum {
            return Err(ValidationError::ValueMismatch {
                inputs: input_sum,
                outputs: output_sum,
            });
        }

        Ok(())
    }

    /// Every output must sit at (tx.id, position) and carry value
    fn check_output_shape(tx: &Transaction) -> Result<(), ValidationError> {
        for (index, output) in tx.outputs.iter().enumerate() {
            if output.txid != tx.id || output.vout as usize != index {
                return Err(ValidationError::OutputMismatch { index });
            }
            if output.amount == 0 {
                return Err(ValidationError::ZeroAmount { index });
            }
        }
        Ok(())
    }

    /// New outputs must not overwrite unspent ones
    fn check_outputs_new(&self, tx: &Transaction) -> Result<(), ValidationError> {
        match tx.outputs.iter().find(|output| self.contains(&output.outpoint())) {
            Some(output) => Err(ValidationError::OutputExists(output.outpoint())),
            None => Ok(()),
        }
    }

    /// Spend the inputs and add the outputs of an already validated transaction
    pub fn apply(&mut self, tx: &Transaction) {
        for input in &tx.inputs {
            if let Some(spent) = self.outputs.remove(&input.outpoint()) {
                self.total_value = self.total_value.saturating_sub(spent.amount);
            }
        }
        for output in &tx.outputs {
            self.total_value = self.total_value.saturating_add(output.amount);
            self.outputs.insert(output.outpoint(), output.clone());
        }
    }
}
