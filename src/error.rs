// Error types for the ledger, the wire protocol and the wallet

use crate::core::OutPoint;
use std::time::Duration;
use thiserror::Error;

/// Reasons a transaction is refused by the bank
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Input references an output that does not exist or was already spent
    #[error("unknown or already spent outpoint {0}")]
    UnknownOutpoint(OutPoint),

    /// Signature absent or not valid for the owner of the referenced output
    #[error("invalid signature on input {index}")]
    InvalidSignature { index: usize },

    /// Sum of referenced inputs differs from sum of outputs
    #[error("value mismatch: inputs {inputs}, outputs {outputs}")]
    ValueMismatch { inputs: u64, outputs: u64 },

    /// Transaction has no inputs or no outputs
    #[error("empty transaction")]
    EmptyTransaction,

    /// Output (or issuance) of amount zero
    #[error("zero amount in output {index}")]
    ZeroAmount { index: usize },

    /// The same outpoint is spent twice within one transaction
    #[error("outpoint {0} spent twice in one transaction")]
    DuplicateInput(OutPoint),

    /// Output does not carry the (txid, position) outpoint of its transaction
    #[error("output {index} does not belong to its transaction")]
    OutputMismatch { index: usize },

    /// Output outpoint is already present in the unspent set
    #[error("output {0} already exists")]
    OutputExists(OutPoint),

    #[error("amount overflow")]
    ValueOverflow,
}

/// Failures while signing or verifying a single input
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("input {index} is not signed")]
    MissingSignature { index: usize },

    #[error("input index {index} out of range ({len} inputs)")]
    InputOutOfRange { index: usize, len: usize },

    #[error("secp256k1: {0}")]
    Secp(#[from] secp256k1::Error),
}

/// Wire protocol failures (framing, codec, transport)
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Malformed envelope or payload
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Transport-level failure
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("frame of {len} bytes exceeds limit of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Peer answered with a command we did not expect
    #[error("unexpected response: expected {expected}, got {got}")]
    UnexpectedResponse { expected: String, got: String },

    /// Server answered with an explicit error envelope
    #[error("server error: {0}")]
    Server(String),
}

/// Failures while building a payment
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: u64, need: u64 },

    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("signing failed: {0}")]
    Signature(#[from] SignatureError),
}
