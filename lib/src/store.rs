use std::collections::BTreeMap;

use alloy_primitives::B256;
use tracing::debug;

use crate::error::{OracleError, OracleResult};
use crate::types::TrustedRoot;

/// Block hashes and state roots already accepted by an external relay.
///
/// Entries are append-only: once set for a block number they never change.
pub trait TrustedRootStore {
    fn root(&self, block_number: u64) -> Option<TrustedRoot>;

    fn block_hash(&self, block_number: u64) -> Option<B256> {
        self.root(block_number).and_then(|root| root.block_hash)
    }

    fn state_root(&self, block_number: u64) -> Option<B256> {
        self.root(block_number).and_then(|root| root.state_root)
    }
}

/// In-memory [`TrustedRootStore`] fed by whatever relay the host runs.
#[derive(Clone, Debug, Default)]
pub struct MemoryRootStore {
    roots: BTreeMap<u64, TrustedRoot>,
}

impl MemoryRootStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_block_hash(&mut self, block_number: u64, hash: B256) -> OracleResult<()> {
        let root = self.entry(block_number);
        set_once(&mut root.block_hash, hash, block_number, "block hash")
    }

    pub fn set_state_root(&mut self, block_number: u64, state_root: B256) -> OracleResult<()> {
        let root = self.entry(block_number);
        set_once(&mut root.state_root, state_root, block_number, "state root")
    }

    /// Highest block number with any trusted value.
    pub fn latest(&self) -> Option<u64> {
        self.roots.keys().next_back().copied()
    }

    fn entry(&mut self, block_number: u64) -> &mut TrustedRoot {
        self.roots.entry(block_number).or_insert_with(|| TrustedRoot {
            block_number,
            block_hash: None,
            state_root: None,
        })
    }
}

fn set_once(
    slot: &mut Option<B256>,
    value: B256,
    block_number: u64,
    what: &'static str,
) -> OracleResult<()> {
    match slot {
        Some(existing) if *existing == value => Ok(()),
        Some(_) => Err(OracleError::RootConflict { block_number, what }),
        None => {
            debug!(block_number, %value, what, "trusted root recorded");
            *slot = Some(value);
            Ok(())
        }
    }
}

impl TrustedRootStore for MemoryRootStore {
    fn root(&self, block_number: u64) -> Option<TrustedRoot> {
        self.roots.get(&block_number).cloned()
    }
}

impl<S: TrustedRootStore + ?Sized> TrustedRootStore for &S {
    fn root(&self, block_number: u64) -> Option<TrustedRoot> {
        (**self).root(block_number)
    }
}
