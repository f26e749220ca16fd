//! Shared plumbing for the oracle binaries: logging, state persistence and
//! conversion of RPC proof responses.

use std::fs;
use std::path::Path;

use alloy_primitives::{Address, U256};
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use vault_oracle_lib::{
    Clock, OracleConfig, OracleSnapshot, PriceOracle, ProofResponse, Role, SystemClock,
    TrustedRootStore, VaultVerifier,
};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Install the fmt subscriber, filtered by `RUST_LOG` (default `info`).
pub fn setup_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // a second install is harmless, e.g. across tests
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Load a persisted oracle, if the file exists.
pub fn load_state(path: &Path) -> Result<Option<OracleSnapshot>, BoxError> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path)?;
    let snapshot: OracleSnapshot = bincode::deserialize(&bytes)?;
    info!(
        path = %path.display(),
        last_block_number = snapshot.state.last_block_number,
        "oracle state loaded"
    );
    Ok(Some(snapshot))
}

/// Persist the oracle through a temporary file so a crash never leaves a
/// half-written state behind.
pub fn save_state(path: &Path, snapshot: &OracleSnapshot) -> Result<(), BoxError> {
    let bytes = bincode::serialize(snapshot)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "oracle state saved");
    Ok(())
}

/// Restore the oracle persisted at `state`, or create one administered by
/// `relayer` that may submit both kinds of update.
pub fn open_oracle(
    state: Option<&Path>,
    relayer: Address,
    config: &OracleConfig,
) -> Result<PriceOracle<SystemClock>, BoxError> {
    if let Some(snapshot) = state.map(load_state).transpose()?.flatten() {
        return Ok(PriceOracle::restore(snapshot, SystemClock)?);
    }
    let mut oracle = PriceOracle::new(relayer, config, SystemClock)?;
    oracle.grant_role(relayer, Role::PriceParametersVerifier, relayer)?;
    oracle.grant_role(relayer, Role::UnlockTimeVerifier, relayer)?;
    Ok(oracle)
}

/// Re-read any `eth_getProof`-shaped value (e.g. an RPC client's response
/// type) as the library's [`ProofResponse`].
pub fn to_proof_response<T: Serialize>(response: &T) -> Result<ProofResponse, serde_json::Error> {
    serde_json::from_value(serde_json::to_value(response)?)
}

pub fn read_proof_response(path: &Path) -> Result<ProofResponse, BoxError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// What relaying one block changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relayed {
    /// Relative price change, parts per 1e18
    pub change: U256,
    /// `None` when the period proof was rejected
    pub period_changed: Option<bool>,
}

/// Apply a block's price proof, then its period proof, persisting to `state`
/// after each accepted one.
///
/// A rejected price proof leaves the oracle untouched and is returned as an
/// error. A rejected period proof is only logged: the price update already
/// moved the block watermark and is kept.
pub fn relay_block<S: TrustedRootStore, C: Clock>(
    oracle: &mut PriceOracle<C>,
    verifier: &VaultVerifier<S>,
    block_number: u64,
    price_proof: &[u8],
    period_proof: &[u8],
    state: &Path,
) -> Result<Relayed, BoxError> {
    let change = verifier.verify_by_state_root(oracle, block_number, price_proof)?;
    save_state(state, &oracle.snapshot())?;

    let period_changed = match verifier.verify_period_by_state_root(oracle, block_number, period_proof) {
        Ok(changed) => {
            if changed {
                save_state(state, &oracle.snapshot())?;
            }
            Some(changed)
        }
        Err(err) => {
            warn!(%err, block_number, "period proof rejected");
            None
        }
    };
    Ok(Relayed { change, period_changed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_oracle_lib::fixture::VaultState;
    use vault_oracle_lib::slots::{period_slots, price_param_slots};
    use vault_oracle_lib::{ManualClock, MemoryRootStore, VaultSnapshot};

    #[test]
    fn test_state_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oracle.bin");
        assert!(load_state(&path).unwrap().is_none());

        let admin = Address::repeat_byte(1);
        let clock = ManualClock::new(1_000);
        let mut oracle = PriceOracle::new(admin, &OracleConfig::default(), clock.clone()).unwrap();
        oracle.grant_role(admin, Role::PriceParametersVerifier, admin).unwrap();
        let snapshot = VaultSnapshot {
            total_idle: U256::from(3u64),
            total_supply: U256::from(2u64),
            ..Default::default()
        };
        oracle.update(admin, snapshot, 1_000, 42).unwrap();

        save_state(&path, &oracle.snapshot()).unwrap();
        let loaded = load_state(&path).unwrap().unwrap();
        assert_eq!(loaded, oracle.snapshot());

        let restored = PriceOracle::restore(loaded, clock).unwrap();
        assert_eq!(restored.last_block_number(), 42);
        assert!(restored.has_role(Role::PriceParametersVerifier, admin));
    }

    #[test]
    fn test_open_oracle_fresh_then_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oracle.bin");
        let relayer = Address::repeat_byte(7);

        let oracle = open_oracle(Some(&path), relayer, &OracleConfig::default()).unwrap();
        assert!(oracle.has_role(Role::Admin, relayer));
        assert!(oracle.has_role(Role::UnlockTimeVerifier, relayer));
        assert_eq!(oracle.last_block_number(), 0);

        let mut snapshot = oracle.snapshot();
        snapshot.state.last_block_number = 9;
        save_state(&path, &snapshot).unwrap();
        let other = Address::repeat_byte(8);
        let reopened = open_oracle(Some(&path), other, &OracleConfig::default()).unwrap();
        assert_eq!(reopened.last_block_number(), 9);
        assert!(!reopened.has_role(Role::Admin, other));
    }

    #[test]
    fn test_proof_response_from_rpc_json() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct RpcProof {
            address: Address,
            balance: U256,
            account_proof: Vec<String>,
            storage_proof: Vec<serde_json::Value>,
        }
        let rpc = RpcProof {
            address: Address::repeat_byte(0x42),
            balance: U256::ZERO,
            account_proof: vec!["0xc0".into()],
            storage_proof: vec![serde_json::json!({
                "key": "0x0000000000000000000000000000000000000000000000000000000000000015",
                "value": "0x1",
                "proof": []
            })],
        };

        let response = to_proof_response(&rpc).unwrap();
        assert_eq!(response.address, Address::repeat_byte(0x42));
        assert_eq!(response.storage_proof[0].key, U256::from(21u64));
        assert_eq!(response.storage_proof[0].value, U256::from(1u64));
    }

    #[test]
    fn test_price_update_is_saved_when_period_proof_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oracle.bin");
        let vault = Address::repeat_byte(0x42);
        let relayer = Address::repeat_byte(7);

        let unit = U256::from(10u64).pow(U256::from(18u64));
        let snapshot = VaultSnapshot {
            total_idle: unit,
            total_supply: unit,
            last_profit_update: U256::from(1_000u64),
            ..Default::default()
        };
        let mut slots: Vec<(U256, U256)> = price_param_slots(vault).into_iter().zip(snapshot.to_array()).collect();
        slots.push((period_slots()[0], U256::from(86_400u64)));
        let trie = VaultState::new(vault, &slots, &[Address::repeat_byte(9)]);

        let mut store = MemoryRootStore::new();
        store.set_state_root(30, trie.state_root()).unwrap();

        // may submit prices, not periods
        let mut oracle = PriceOracle::new(relayer, &OracleConfig::default(), ManualClock::new(1_000)).unwrap();
        oracle.grant_role(relayer, Role::PriceParametersVerifier, relayer).unwrap();

        let verifier = VaultVerifier::new(&store, vault, relayer);
        let relayed = relay_block(
            &mut oracle,
            &verifier,
            30,
            &trie.bundle(&price_param_slots(vault)).to_rlp(),
            &trie.bundle(&period_slots()).to_rlp(),
            &path,
        )
        .unwrap();
        assert_eq!(relayed.period_changed, None);

        let saved = load_state(&path).unwrap().unwrap();
        assert_eq!(saved.state.last_block_number, 30);
        assert_eq!(saved, oracle.snapshot());
    }

    #[test]
    fn test_rejected_price_proof_saves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oracle.bin");
        let vault = Address::repeat_byte(0x42);
        let relayer = Address::repeat_byte(7);
        let store = MemoryRootStore::new();

        let mut oracle = PriceOracle::new(relayer, &OracleConfig::default(), ManualClock::new(1_000)).unwrap();
        oracle.grant_role(relayer, Role::PriceParametersVerifier, relayer).unwrap();
        let trie = VaultState::new(vault, &[], &[]);

        let verifier = VaultVerifier::new(&store, vault, relayer);
        let proof = trie.bundle(&price_param_slots(vault)).to_rlp();
        assert!(relay_block(&mut oracle, &verifier, 30, &proof, &proof, &path).is_err());
        assert!(load_state(&path).unwrap().is_none());
    }
}
