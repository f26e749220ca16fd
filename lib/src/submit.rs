//! Proof submission entry points: verify a serialized bundle against a
//! trusted root, then feed the proven values to the oracle.

use alloy_primitives::{Address, U256};
use tracing::{debug, info};

use crate::bundle::ProofBundle;
use crate::error::{OracleResult, ProofError};
use crate::header::BlockHeader;
use crate::oracle::{Clock, PriceOracle};
use crate::slots::{period_slots, price_param_slots, LAST_PROFIT_UPDATE_SLOT, PROFIT_MAX_UNLOCK_TIME_SLOT};
use crate::store::TrustedRootStore;
use crate::types::{TrustedRoot, VaultSnapshot, PARAM_COUNT};
use crate::verifier::{verify, verify_with_header, SlotValues};

/// Binds one vault to a root store and submits its proofs to an oracle
/// under `identity`.
#[derive(Clone, Debug)]
pub struct VaultVerifier<S> {
    store: S,
    vault: Address,
    identity: Address,
}

impl<S: TrustedRootStore> VaultVerifier<S> {
    pub fn new(store: S, vault: Address, identity: Address) -> Self {
        Self {
            store,
            vault,
            identity,
        }
    }

    pub fn vault(&self) -> Address {
        self.vault
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Prove the price parameters under a block whose header hashes to a
    /// trusted block hash. The header timestamp becomes the snapshot time.
    pub fn verify_by_block_hash<C: Clock>(
        &self,
        oracle: &mut PriceOracle<C>,
        header_rlp: &[u8],
        proof_rlp: &[u8],
    ) -> OracleResult<U256> {
        let (header, values) = self.prove_with_header(header_rlp, proof_rlp, &price_param_slots(self.vault))?;
        let snapshot = to_snapshot(&values);
        info!(block_number = header.number, vault = %self.vault, "price parameters proven by block hash");
        oracle.update(self.identity, snapshot, header.timestamp, header.number)
    }

    /// Prove the price parameters under a trusted state root.
    ///
    /// No header is available, so the vault's own `last_profit_update` stands
    /// in for the snapshot time.
    pub fn verify_by_state_root<C: Clock>(
        &self,
        oracle: &mut PriceOracle<C>,
        block_number: u64,
        proof_rlp: &[u8],
    ) -> OracleResult<U256> {
        let values = self.prove_with_state_root(block_number, proof_rlp, &price_param_slots(self.vault))?;
        let snapshot = to_snapshot(&values);
        let ts = to_u64(snapshot.last_profit_update, LAST_PROFIT_UPDATE_SLOT)?;
        info!(block_number, vault = %self.vault, "price parameters proven by state root");
        oracle.update(self.identity, snapshot, ts, block_number)
    }

    pub fn verify_period_by_block_hash<C: Clock>(
        &self,
        oracle: &mut PriceOracle<C>,
        header_rlp: &[u8],
        proof_rlp: &[u8],
    ) -> OracleResult<bool> {
        let (header, values) = self.prove_with_header(header_rlp, proof_rlp, &period_slots())?;
        let period = to_period(&values)?;
        oracle.update_profit_max_unlock_time(self.identity, period, header.number)
    }

    pub fn verify_period_by_state_root<C: Clock>(
        &self,
        oracle: &mut PriceOracle<C>,
        block_number: u64,
        proof_rlp: &[u8],
    ) -> OracleResult<bool> {
        let values = self.prove_with_state_root(block_number, proof_rlp, &period_slots())?;
        let period = to_period(&values)?;
        oracle.update_profit_max_unlock_time(self.identity, period, block_number)
    }

    fn trusted(&self, block_number: u64, what: &'static str) -> Result<TrustedRoot, ProofError> {
        self.store
            .root(block_number)
            .ok_or(ProofError::UntrustedBlock {
                number: block_number,
                what,
            })
    }

    fn prove_with_header(
        &self,
        header_rlp: &[u8],
        proof_rlp: &[u8],
        slots: &[U256],
    ) -> Result<(BlockHeader, SlotValues), ProofError> {
        let number = BlockHeader::decode(header_rlp)?.number;
        let root = self.trusted(number, "block hash")?;
        let bundle = ProofBundle::from_rlp(proof_rlp)?;
        verify_with_header(&root, header_rlp, self.vault, slots, &bundle)
    }

    fn prove_with_state_root(
        &self,
        block_number: u64,
        proof_rlp: &[u8],
        slots: &[U256],
    ) -> Result<SlotValues, ProofError> {
        let root = self.trusted(block_number, "state root")?;
        let bundle = ProofBundle::from_rlp(proof_rlp)?;
        let values = verify(&root, self.vault, slots, &bundle)?;
        debug!(block_number, storage_root = %values.storage_root, "slots proven");
        Ok(values)
    }
}

fn to_snapshot(values: &SlotValues) -> VaultSnapshot {
    let mut params = [U256::ZERO; PARAM_COUNT];
    for (param, value) in params.iter_mut().zip(values.values()) {
        *param = value;
    }
    VaultSnapshot::from_array(params)
}

fn to_period(values: &SlotValues) -> Result<u64, ProofError> {
    let value = values.values().next().unwrap_or_default();
    to_u64(value, PROFIT_MAX_UNLOCK_TIME_SLOT)
}

fn to_u64(value: U256, slot: u64) -> Result<u64, ProofError> {
    u64::try_from(value).map_err(|_| ProofError::MalformedSlotValue {
        slot: U256::from(slot),
    })
}
