use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};

/// 32-byte hash type
pub type H256 = [u8; 32];

/// How a parent node points at a child
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeRef {
    /// keccak256 of the child's RLP
    Hash(H256),
    /// Child RLP shorter than 32 bytes, embedded in the parent
    Inline(Vec<u8>),
}

/// MPT Node types
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// Leaf node: [path nibbles, value]
    Leaf(Vec<u8>, Vec<u8>),

    /// Extension node: [path nibbles, child]
    Extension(Vec<u8>, NodeRef),

    /// Branch node: 16 children + optional value
    Branch(Box<[Option<NodeRef>; 16]>, Option<Vec<u8>>),
}

/// A block hash and/or state root accepted by the relay for one block number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedRoot {
    pub block_number: u64,
    pub block_hash: Option<B256>,
    pub state_root: Option<B256>,
}

/// Decoded account leaf of the state trie.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub nonce: u64,
    pub balance: U256,
    pub storage_root: B256,
    pub code_hash: B256,
}

/// Number of vault fields carried by a price update.
pub const PARAM_COUNT: usize = 7;

/// Raw vault storage values proven at one block.
///
/// Field order is the wire order of `update_price` and of the storage proofs
/// in a serialized bundle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSnapshot {
    pub total_debt: U256,
    pub total_idle: U256,
    pub total_supply: U256,
    pub full_profit_unlock_date: U256,
    pub profit_unlocking_rate: U256,
    pub last_profit_update: U256,
    pub balance_of_self: U256,
}

impl VaultSnapshot {
    pub fn from_array(values: [U256; PARAM_COUNT]) -> Self {
        let [total_debt, total_idle, total_supply, full_profit_unlock_date, profit_unlocking_rate, last_profit_update, balance_of_self] =
            values;
        Self {
            total_debt,
            total_idle,
            total_supply,
            full_profit_unlock_date,
            profit_unlocking_rate,
            last_profit_update,
            balance_of_self,
        }
    }

    pub fn to_array(&self) -> [U256; PARAM_COUNT] {
        [
            self.total_debt,
            self.total_idle,
            self.total_supply,
            self.full_profit_unlock_date,
            self.profit_unlocking_rate,
            self.last_profit_update,
            self.balance_of_self,
        ]
    }
}
