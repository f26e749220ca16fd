use alloy_primitives::{Address, B256, U256};
use rlp::DecoderError;
use thiserror::Error;

use crate::oracle::Role;

/// Byte-level failures while splitting a trie node into RLP items.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RlpError {
    #[error("empty input")]
    Empty,

    #[error("expected a list, found a byte string")]
    NotAList,

    #[error("expected a byte string, found a list")]
    NotBytes,

    #[error("length prefix runs past the end of the input")]
    Truncated,

    #[error("{0} trailing bytes after the encoded item")]
    TrailingBytes(usize),

    #[error("invalid encoding: {0}")]
    Invalid(DecoderError),
}

impl From<DecoderError> for RlpError {
    fn from(err: DecoderError) -> Self {
        match err {
            DecoderError::RlpIsTooShort => RlpError::Truncated,
            DecoderError::RlpExpectedToBeList => RlpError::NotAList,
            DecoderError::RlpExpectedToBeData => RlpError::NotBytes,
            other => RlpError::Invalid(other),
        }
    }
}

/// Every reason a proof bundle or block header is rejected.
#[derive(Debug, Error)]
pub enum ProofError {
    #[error("empty proof against non-empty root {0}")]
    EmptyProof(B256),

    #[error("node at depth {depth} does not hash to the reference held by its parent")]
    HashMismatch { depth: usize },

    #[error("malformed node at depth {depth}: {reason}")]
    MalformedNode { depth: usize, reason: &'static str },

    #[error("proof continues after a terminal node at depth {depth}")]
    TrailingNodes { depth: usize },

    #[error("proof ends before reaching a terminal node (depth {depth})")]
    Truncated { depth: usize },

    #[error("account {0} is not present under the state root")]
    AccountNotFound(Address),

    #[error("malformed account leaf: {0}")]
    MalformedAccount(&'static str),

    #[error("malformed storage value for slot {slot}")]
    MalformedSlotValue { slot: U256 },

    #[error("expected {expected} proofs in bundle, got {got}")]
    ProofCount { expected: usize, got: usize },

    #[error("bundle carries no storage proof for slot {0}")]
    MissingSlot(U256),

    #[error("malformed block header: {0}")]
    MalformedHeader(&'static str),

    #[error("block {number} hashes to {got}, trusted hash is {expected}")]
    BlockHashMismatch {
        number: u64,
        expected: B256,
        got: B256,
    },

    #[error("no trusted {what} recorded for block {number}")]
    UntrustedBlock { number: u64, what: &'static str },

    #[error("rlp: {0}")]
    Rlp(String),

    #[error(transparent)]
    Node(#[from] RlpError),
}

impl From<rlp::DecoderError> for ProofError {
    fn from(err: rlp::DecoderError) -> Self {
        ProofError::Rlp(format!("{err:?}"))
    }
}

/// Rejections surfaced by the oracle and the proof-submission entry points.
///
/// All of them are fail-closed: the state is untouched when one is returned.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("proof invalid: {0}")]
    ProofInvalid(#[from] ProofError),

    #[error("stale update: block {block_number} is below watermark {last_block_number}")]
    StaleUpdate {
        block_number: u64,
        last_block_number: u64,
    },

    #[error("{caller} does not hold role {role:?}")]
    Unauthorized { caller: Address, role: Role },

    #[error("{name} = {value} is outside [{min}, {max}]")]
    ConfigOutOfRange {
        name: &'static str,
        value: U256,
        min: U256,
        max: U256,
    },

    #[error("arithmetic failure: {0}")]
    Arithmetic(&'static str),

    #[error("block {block_number} already has a different trusted {what}")]
    RootConflict {
        block_number: u64,
        what: &'static str,
    },
}

pub type OracleResult<T> = Result<T, OracleError>;
