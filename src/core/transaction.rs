// Transaction data structures and input signing

use crate::core::{Hash256, hash256};
use crate::error::SignatureError;
use super::serialize::{write_varint, write_var_bytes};
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output identifier - transaction id + output index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Hash256,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Hash256, vout: u32) -> Self {
        Self { txid, vout }
    }

    /// Append the 36-byte encoding (txid + LE index)
    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.txid.as_bytes());
        buf.extend_from_slice(&self.vout.to_le_bytes());
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// Transaction input - claims a previous output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// Id of the transaction that created the output
    pub txid: Hash256,
    /// Index of the output in that transaction
    pub vout: u32,
    /// ECDSA signature over the spend message, absent until signed
    #[serde(default)]
    pub signature: Option<Signature>,
}

impl TxInput {
    /// Create an unsigned input
    pub fn new(txid: Hash256, vout: u32) -> Self {
        Self {
            txid,
            vout,
            signature: None,
        }
    }

    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }
}

/// Transaction output - amount owned by a public key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxOutput {
    /// Id of the transaction that creates this output
    pub txid: Hash256,
    /// Position of this output in that transaction
    pub vout: u32,
    pub amount: u64,
    /// Owner allowed to spend the output
    pub public_key: PublicKey,
}

impl TxOutput {
    pub fn new(txid: Hash256, vout: u32, amount: u64, public_key: PublicKey) -> Self {
        Self {
            txid,
            vout,
            amount,
            public_key,
        }
    }

    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        self.outpoint().write_to(buf);
        buf.extend_from_slice(&self.amount.to_le_bytes());
        write_var_bytes(buf, &self.public_key.serialize());
    }
}

/// Transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction id
    pub id: Hash256,
    /// Outputs being spent
    pub inputs: Vec<TxInput>,
    /// Newly created outputs
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    /// Create a new transaction
    pub fn new(id: Hash256, inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        Self { id, inputs, outputs }
    }

    /// Create an issuance transaction: no inputs, one output
    pub fn issuance(id: Hash256, amount: u64, public_key: PublicKey) -> Self {
        Self {
            id,
            inputs: Vec::new(),
            outputs: vec![TxOutput::new(id, 0, amount, public_key)],
        }
    }

    /// Check if this transaction mints new value
    pub fn is_issuance(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Total output value, `None` on overflow
    pub fn total_output_value(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.amount))
    }

    /// Bytes a signature for input `index` must cover:
    /// the claimed outpoint followed by every output of the transaction.
    pub fn spend_message(&self, index: usize) -> Result<Vec<u8>, SignatureError> {
        let input = self.inputs.get(index).ok_or(SignatureError::InputOutOfRange {
            index,
            len: self.inputs.len(),
        })?;

        let mut buf = Vec::with_capacity(36 + 1 + self.outputs.len() * 80);
        input.outpoint().write_to(&mut buf);
        write_varint(&mut buf, self.outputs.len() as u64);
        for output in &self.outputs {
            output.write_to(&mut buf);
        }
        Ok(buf)
    }

    fn spend_digest(&self, index: usize) -> Result<Message, SignatureError> {
        let message = self.spend_message(index)?;
        Ok(Message::from_digest(hash256(&message).0))
    }

    /// Sign input `index` and store the signature on it
    pub fn sign_input(&mut self, index: usize, secret_key: &SecretKey) -> Result<(), SignatureError> {
        let secp = Secp256k1::signing_only();
        let digest = self.spend_digest(index)?;
        let signature = secp.sign_ecdsa(&digest, secret_key);
        self.inputs[index].signature = Some(signature);
        Ok(())
    }

    /// Verify the stored signature of input `index` against `public_key`.
    /// A well-formed but wrong signature yields `Ok(false)`.
    pub fn verify_input(&self, index: usize, public_key: &PublicKey) -> Result<bool, SignatureError> {
        let digest = self.spend_digest(index)?;
        let signature = self.inputs[index]
            .signature
            .as_ref()
            .ok_or(SignatureError::MissingSignature { index })?;

        let secp = Secp256k1::verification_only();
        Ok(secp.verify_ecdsa(&digest, signature, public_key).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::rand::rngs::OsRng;

    fn keypair() -> (SecretKey, PublicKey) {
        let secp = Secp256k1::new();
        secp.generate_keypair(&mut OsRng)
    }

    fn spend_tx(owner: &PublicKey, recipient: &PublicKey) -> Transaction {
        let id = Hash256::new([7; 32]);
        Transaction::new(
            id,
            vec![TxInput::new(Hash256::new([1; 32]), 0), TxInput::new(Hash256::new([2; 32]), 3)],
            vec![
                TxOutput::new(id, 0, 600, *recipient),
                TxOutput::new(id, 1, 400, *owner),
            ],
        )
    }

    #[test]
    fn test_issuance_transaction() {
        let (_, pk) = keypair();
        let id = Hash256::new([9; 32]);
        let tx = Transaction::issuance(id, 1000, pk);

        assert!(tx.is_issuance());
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.outputs[0].outpoint(), OutPoint::new(id, 0));
        assert_eq!(tx.total_output_value(), Some(1000));
    }

    #[test]
    fn test_sign_and_verify() {
        let (sk, pk) = keypair();
        let (_, bob) = keypair();
        let mut tx = spend_tx(&pk, &bob);

        tx.sign_input(0, &sk).unwrap();
        tx.sign_input(1, &sk).unwrap();

        assert!(tx.verify_input(0, &pk).unwrap());
        assert!(tx.verify_input(1, &pk).unwrap());
        assert!(!tx.verify_input(0, &bob).unwrap());
    }

    #[test]
    fn test_signature_bound_to_outputs() {
        let (sk, pk) = keypair();
        let (_, bob) = keypair();
        let mut tx = spend_tx(&pk, &bob);
        tx.sign_input(0, &sk).unwrap();

        // Redirect the payment after signing
        tx.outputs[0].public_key = pk;
        assert!(!tx.verify_input(0, &pk).unwrap());

        let mut tx = spend_tx(&pk, &bob);
        tx.sign_input(0, &sk).unwrap();
        tx.outputs[1].amount += 1;
        assert!(!tx.verify_input(0, &pk).unwrap());
    }

    #[test]
    fn test_signature_bound_to_input() {
        let (sk, pk) = keypair();
        let (_, bob) = keypair();
        let mut tx = spend_tx(&pk, &bob);
        tx.sign_input(0, &sk).unwrap();

        // Reusing input 0's signature for input 1 must fail
        tx.inputs[1].signature = tx.inputs[0].signature;
        assert!(!tx.verify_input(1, &pk).unwrap());
        assert_ne!(tx.spend_message(0).unwrap(), tx.spend_message(1).unwrap());
    }

    #[test]
    fn test_missing_signature() {
        let (_, pk) = keypair();
        let tx = spend_tx(&pk, &pk);

        assert!(matches!(
            tx.verify_input(0, &pk),
            Err(SignatureError::MissingSignature { index: 0 })
        ));
    }

    #[test]
    fn test_input_out_of_range() {
        let (sk, pk) = keypair();
        let mut tx = spend_tx(&pk, &pk);

        assert!(matches!(
            tx.sign_input(5, &sk),
            Err(SignatureError::InputOutOfRange { index: 5, len: 2 })
        ));
        assert!(matches!(
            tx.verify_input(2, &pk),
            Err(SignatureError::InputOutOfRange { .. })
        ));
    }

    #[test]
    fn test_spend_message_layout() {
        let (_, pk) = keypair();
        let tx = spend_tx(&pk, &pk);
        let message = tx.spend_message(1).unwrap();

        // outpoint (36) + count (1) + 2 * (36 + 8 + 1 + 33)
        assert_eq!(message.len(), 36 + 1 + 2 * 78);
        assert_eq!(&message[..32], &[2u8; 32]);
        assert_eq!(&message[32..36], &3u32.to_le_bytes());
        assert_eq!(message[36], 2);
    }

    #[test]
    fn test_json_round_trip() {
        let (sk, pk) = keypair();
        let mut tx = spend_tx(&pk, &pk);
        tx.sign_input(0, &sk).unwrap();

        let json = serde_json::to_string(&tx).unwrap();
        let decoded: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, tx);
        assert!(decoded.verify_input(0, &pk).unwrap());
        assert_eq!(serde_json::to_string(&decoded).unwrap(), json);
    }

    #[test]
    fn test_json_round_trip_empty() {
        let tx = Transaction::new(Hash256::zero(), vec![], vec![]);
        let json = serde_json::to_string(&tx).unwrap();
        let decoded: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.total_output_value(), Some(0));
    }

    #[test]
    fn test_unsigned_input_field_optional() {
        let json = format!(r#"{{"txid":"{}","vout":4}}"#, "00".repeat(32));
        let input: TxInput = serde_json::from_str(&json).unwrap();
        assert_eq!(input.outpoint(), OutPoint::new(Hash256::zero(), 4));
        assert!(input.signature.is_none());
    }

    #[test]
    fn test_output_overflow() {
        let (_, pk) = keypair();
        let id = Hash256::zero();
        let tx = Transaction::new(
            id,
            vec![],
            vec![TxOutput::new(id, 0, u64::MAX, pk), TxOutput::new(id, 1, 1, pk)],
        );
        assert_eq!(tx.total_output_value(), None);
    }
}
