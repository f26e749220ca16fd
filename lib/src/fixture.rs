//! Builds real state and storage tries for a vault so proofs can be produced
//! without a source chain.

use alloy_primitives::{Address, B256, U256};
use rlp::RlpStream;

use crate::builder::MPTBuilder;
use crate::bundle::ProofBundle;
use crate::rlp_encoding::{encode_uint, keccak256};
use crate::types::Account;

fn trimmed(value: U256) -> Vec<u8> {
    let bytes = value.to_be_bytes::<32>();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}

/// RLP of an account leaf: `[nonce, balance, storage_root, code_hash]`
pub fn encode_account(account: &Account) -> Vec<u8> {
    let mut stream = RlpStream::new_list(4);
    stream.append(&account.nonce);
    stream.append(&trimmed(account.balance));
    stream.append(&account.storage_root.to_vec());
    stream.append(&account.code_hash.to_vec());
    stream.out().to_vec()
}

/// Minimal post-London header fields, in canonical order.
#[derive(Clone, Debug)]
pub struct HeaderFields {
    pub parent_hash: B256,
    pub state_root: B256,
    pub number: u64,
    pub timestamp: u64,
}

/// RLP of a block header carrying the given fields; all others are zeroed.
pub fn encode_header(fields: &HeaderFields) -> Vec<u8> {
    let mut stream = RlpStream::new_list(16);
    stream.append(&fields.parent_hash.to_vec());
    stream.append(&B256::ZERO.to_vec()); // ommers hash
    stream.append(&Address::ZERO.to_vec()); // coinbase
    stream.append(&fields.state_root.to_vec());
    stream.append(&B256::ZERO.to_vec()); // transactions root
    stream.append(&B256::ZERO.to_vec()); // receipts root
    stream.append(&vec![0u8; 256]); // logs bloom
    stream.append(&0u64); // difficulty
    stream.append(&fields.number);
    stream.append(&30_000_000u64); // gas limit
    stream.append(&0u64); // gas used
    stream.append(&fields.timestamp);
    stream.append_empty_data(); // extra data
    stream.append(&B256::ZERO.to_vec()); // mix hash
    stream.append(&vec![0u8; 8]); // nonce
    stream.append(&1_000_000_000u64); // base fee
    stream.out().to_vec()
}

/// A state trie holding one contract with the given storage, plus decoys.
pub struct VaultState {
    pub address: Address,
    pub account: Account,
    state: MPTBuilder,
    storage: MPTBuilder,
}

impl VaultState {
    /// Zero-valued slots are left out of the storage trie, as on chain.
    pub fn new(address: Address, slots: &[(U256, U256)], decoys: &[Address]) -> Self {
        let mut storage = MPTBuilder::new();
        for (slot, value) in slots.iter().filter(|(_, v)| !v.is_zero()) {
            storage.insert(&keccak256(&slot.to_be_bytes::<32>()), &encode_uint(*value));
        }

        let account = Account {
            nonce: 1,
            balance: U256::ZERO,
            storage_root: B256::from(storage.root()),
            code_hash: B256::from(keccak256(b"vault code")),
        };

        let mut state = MPTBuilder::new();
        state.insert(&keccak256(address.as_slice()), &encode_account(&account));
        for (i, decoy) in decoys.iter().enumerate() {
            let other = Account {
                nonce: i as u64,
                balance: U256::from(10u64).pow(U256::from(18u64)),
                storage_root: crate::mpt::EMPTY_TRIE_ROOT,
                code_hash: B256::from(keccak256(&[])),
            };
            state.insert(&keccak256(decoy.as_slice()), &encode_account(&other));
        }

        Self {
            address,
            account,
            state,
            storage,
        }
    }

    pub fn state_root(&self) -> B256 {
        B256::from(self.state.root())
    }

    pub fn account_proof(&self) -> Vec<Vec<u8>> {
        self.state_proof_for(self.address)
    }

    /// State-trie proof for any address; an exclusion proof when absent.
    pub fn state_proof_for(&self, address: Address) -> Vec<Vec<u8>> {
        self.state.get_proof(&keccak256(address.as_slice()))
    }

    pub fn storage_proof(&self, slot: U256) -> Vec<Vec<u8>> {
        self.storage.get_proof(&keccak256(&slot.to_be_bytes::<32>()))
    }

    /// Bundle proving `slots`, in that order.
    pub fn bundle(&self, slots: &[U256]) -> ProofBundle {
        ProofBundle::new(
            self.account_proof(),
            slots.iter().map(|slot| self.storage_proof(*slot)).collect(),
        )
    }

    /// Header committing to this state at `number` / `timestamp`.
    pub fn header(&self, number: u64, timestamp: u64) -> Vec<u8> {
        encode_header(&HeaderFields {
            parent_hash: B256::from(keccak256(&number.to_be_bytes())),
            state_root: self.state_root(),
            number,
            timestamp,
        })
    }
}
