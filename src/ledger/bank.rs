// The bank: lock-guarded owner of the UTXO set

use crate::core::{hash256, Hash256, Transaction, TxOutput};
use crate::error::ValidationError;
use crate::ledger::UtxoSet;
use crate::wallet::{Address, KeyPair};
use secp256k1::PublicKey;
use tokio::sync::RwLock;

/// Single ledger instance shared by every connection of a server.
///
/// Mutations (`issue`, `apply`, `handle`) hold the write lock for their whole
/// check-then-update sequence, so two transactions racing for the same
/// outpoint are serialised and only the first one can succeed. Lookups take
/// the read lock and always see a complete transaction or none of it.
pub struct Bank {
    identity: KeyPair,
    utxo_set: RwLock<UtxoSet>,
}

impl Bank {
    /// Create a bank with an empty UTXO set
    pub fn new(identity: KeyPair) -> Self {
        Self {
            identity,
            utxo_set: RwLock::new(UtxoSet::new()),
        }
    }

    /// Public key of the issuing identity
    pub fn public_key(&self) -> &PublicKey {
        &self.identity.public_key
    }

    pub fn address(&self) -> &Address {
        &self.identity.address
    }

    /// Mint `amount` to `public_key`.
    ///
    /// Trusted path: no inputs and no signature. Not exposed over the wire.
    pub async fn issue(&self, amount: u64, public_key: PublicKey) -> Result<Transaction, ValidationError> {
        let tx = Transaction::issuance(self.fresh_id(), amount, public_key);

        let mut utxo_set = self.utxo_set.write().await;
        utxo_set.check_issuance(&tx)?;
        utxo_set.apply(&tx);

        log::info!("Issued {} to {} in {}", amount, Address::from_public_key(&public_key), tx.id);
        Ok(tx)
    }

    /// Issuance ids hash the issuer key with a random nonce
    fn fresh_id(&self) -> Hash256 {
        let mut preimage = Vec::with_capacity(33 + 32);
        preimage.extend_from_slice(&self.identity.public_key.serialize());
        preimage.extend_from_slice(Hash256::random().as_bytes());
        hash256(&preimage)
    }

    /// Check `tx` against the current UTXO set without changing it
    pub async fn validate(&self, tx: &Transaction) -> Result<(), ValidationError> {
        self.utxo_set.read().await.validate(tx)
    }

    /// Apply a transaction that is already known to be valid
    pub async fn apply(&self, tx: &Transaction) {
        self.utxo_set.write().await.apply(tx);
    }

    /// Validate and apply `tx` as one critical section.
    /// On error the UTXO set is left untouched.
    pub async fn handle(&self, tx: &Transaction) -> Result<(), ValidationError> {
        let mut utxo_set = self.utxo_set.write().await;

        if let Err(e) = utxo_set.validate(tx) {
            log::info!("Rejected transaction {}: {}", tx.id, e);
            return Err(e);
        }
        utxo_set.apply(tx);

        log::info!(
            "Accepted transaction {} ({} inputs, {} outputs)",
            tx.id,
            tx.inputs.len(),
            tx.outputs.len()
        );
        Ok(())
    }

    /// Unspent outputs owned by `public_key`
    pub async fn fetch_utxo(&self, public_key: &PublicKey) -> Vec<TxOutput> {
        self.utxo_set.read().await.outputs_for(public_key)
    }

    /// Sum of unspent outputs owned by `public_key`
    pub async fn fetch_balance(&self, public_key: &PublicKey) -> u64 {
        self.utxo_set.read().await.balance(public_key)
    }

    pub async fn utxo_count(&self) -> usize {
        self.utxo_set.read().await.count()
    }

    /// Total unspent value (equals everything ever issued)
    pub async fn total_supply(&self) -> u64 {
        self.utxo_set.read().await.total_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OutPoint, TxInput};
    use crate::wallet::{user_private_key, user_public_key};
    use std::sync::Arc;

    fn bank() -> Bank {
        Bank::new(KeyPair::generate())
    }

    /// Spend output 0 of `prev`, paying `outputs`
    fn spend(prev: &Transaction, signer: &str, id: u8, outputs: &[(u64, PublicKey)]) -> Transaction {
        let id = Hash256::new([id; 32]);
        let outputs = outputs
            .iter()
            .enumerate()
            .map(|(i, (amount, pk))| TxOutput::new(id, i as u32, *amount, *pk))
            .collect();
        let mut tx = Transaction::new(id, vec![TxInput::new(prev.id, 0)], outputs);
        tx.sign_input(0, &user_private_key(signer)).unwrap();
        tx
    }

    #[tokio::test]
    async fn test_issue() {
        let bank = bank();
        let alice = user_public_key("alice");

        let tx = bank.issue(1000, alice).await.unwrap();

        assert!(tx.inputs.is_empty());
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(bank.fetch_balance(&alice).await, 1000);
        assert_eq!(bank.utxo_count().await, 1);
    }

    #[tokio::test]
    async fn test_issue_ids_unique() {
        let bank = bank();
        let alice = user_public_key("alice");

        let first = bank.issue(10, alice).await.unwrap();
        let second = bank.issue(10, alice).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(bank.fetch_balance(&alice).await, 20);
    }

    #[tokio::test]
    async fn test_issue_zero_rejected() {
        let bank = bank();
        let alice = user_public_key("alice");

        assert_eq!(
            bank.issue(0, alice).await,
            Err(ValidationError::ZeroAmount { index: 0 })
        );
        assert_eq!(bank.utxo_count().await, 0);
    }

    #[tokio::test]
    async fn test_handle_transfer() {
        let bank = bank();
        let alice = user_public_key("alice");
        let bob = user_public_key("bob");
        let mint = bank.issue(1000, alice).await.unwrap();

        let tx = spend(&mint, "alice", 1, &[(250, bob), (750, alice)]);
        bank.handle(&tx).await.unwrap();

        assert_eq!(bank.fetch_balance(&alice).await, 750);
        assert_eq!(bank.fetch_balance(&bob).await, 250);
        assert_eq!(bank.total_supply().await, 1000);
    }

    #[tokio::test]
    async fn test_double_spend_rejected() {
        let bank = bank();
        let alice = user_public_key("alice");
        let bob = user_public_key("bob");
        let mint = bank.issue(1000, alice).await.unwrap();

        bank.handle(&spend(&mint, "alice", 1, &[(1000, bob)])).await.unwrap();

        let again = spend(&mint, "alice", 2, &[(1000, alice)]);
        assert_eq!(
            bank.handle(&again).await,
            Err(ValidationError::UnknownOutpoint(OutPoint::new(mint.id, 0)))
        );
        assert_eq!(bank.fetch_balance(&bob).await, 1000);
        assert_eq!(bank.fetch_balance(&alice).await, 0);
    }

    #[tokio::test]
    async fn test_rejection_leaves_state_unchanged() {
        let bank = bank();
        let alice = user_public_key("alice");
        let bob = user_public_key("bob");
        let mint = bank.issue(1000, alice).await.unwrap();
        let before = bank.fetch_utxo(&alice).await;

        // Inflation attempt
        let tx = spend(&mint, "alice", 1, &[(900, bob), (200, alice)]);
        assert!(matches!(
            bank.handle(&tx).await,
            Err(ValidationError::ValueMismatch { inputs: 1000, outputs: 1100 })
        ));

        // Bob cannot spend Alice's coins
        let theft = spend(&mint, "bob", 2, &[(1000, bob)]);
        assert_eq!(
            bank.handle(&theft).await,
            Err(ValidationError::InvalidSignature { index: 0 })
        );

        assert_eq!(bank.fetch_utxo(&alice).await, before);
        assert_eq!(bank.fetch_balance(&bob).await, 0);
        assert_eq!(bank.utxo_count().await, 1);
    }

    #[tokio::test]
    async fn test_validate_then_apply() {
        let bank = bank();
        let alice = user_public_key("alice");
        let bob = user_public_key("bob");
        let mint = bank.issue(500, alice).await.unwrap();

        let tx = spend(&mint, "alice", 1, &[(500, bob)]);
        bank.validate(&tx).await.unwrap();
        assert_eq!(bank.fetch_balance(&bob).await, 0);

        bank.apply(&tx).await;
        assert_eq!(bank.fetch_balance(&bob).await, 500);
    }

    #[tokio::test]
    async fn test_balance_matches_utxo() {
        let bank = bank();
        let alice = user_public_key("alice");
        let bob = user_public_key("bob");
        let mint = bank.issue(1000, alice).await.unwrap();
        bank.issue(42, alice).await.unwrap();
        bank.handle(&spend(&mint, "alice", 1, &[(1, bob), (999, alice)])).await.unwrap();

        for pk in [alice, bob] {
            let sum: u64 = bank.fetch_utxo(&pk).await.iter().map(|o| o.amount).sum();
            assert_eq!(bank.fetch_balance(&pk).await, sum);
        }
        assert_eq!(bank.fetch_balance(&alice).await, 1041);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_double_spend() {
        let bank = Arc::new(bank());
        let alice = user_public_key("alice");
        let bob = user_public_key("bob");
        let carol = user_public_key("carol");
        let mint = bank.issue(1000, alice).await.unwrap();

        let to_bob = spend(&mint, "alice", 1, &[(1000, bob)]);
        let to_carol = spend(&mint, "alice", 2, &[(1000, carol)]);

        let a = tokio::spawn({
            let bank = bank.clone();
            async move { bank.handle(&to_bob).await }
        });
        let b = tokio::spawn({
            let bank = bank.clone();
            async move { bank.handle(&to_carol).await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];

        let accepted = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(accepted, 1);
        assert!(results.iter().any(|r| {
            *r == Err(ValidationError::UnknownOutpoint(OutPoint::new(mint.id, 0)))
        }));
        assert_eq!(bank.fetch_balance(&bob).await + bank.fetch_balance(&carol).await, 1000);
        assert_eq!(bank.total_supply().await, 1000);
    }
}
