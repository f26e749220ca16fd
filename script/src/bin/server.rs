//! Relayer for the vault price oracle.
//!
//! Polls a source chain, fetches storage proofs for the vault's price
//! parameters and unlock period, verifies them against the block's state
//! root, feeds them to a local oracle and prints destination-chain calldata.
//!
//! Usage:
//! RUST_LOG=info cargo run --bin server -- --vault 0x...

use std::path::PathBuf;
use std::time::Duration;

use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{BlockId, BlockNumberOrTag};
use alloy_primitives::{Address, B256};
use clap::Parser;
use tokio::time::sleep;
use tracing::{info, warn};
use url::Url;
use vault_oracle_lib::calldata::{update_price_calldata, update_profit_max_unlock_time_calldata};
use vault_oracle_lib::slots::{period_slots, price_param_slots};
use vault_oracle_lib::{
    MemoryRootStore, OracleConfig, PriceModel, PriceOracle, ProofBundle, SystemClock, VaultVerifier,
};
use vault_oracle_script::{open_oracle, relay_block, setup_logger, to_proof_response, BoxError};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, env = "SOURCE_RPC_URL", default_value = "https://eth-mainnet.g.alchemy.com/v2/demo")]
    rpc_url: Url,

    #[arg(long, env = "VAULT_ADDRESS")]
    vault: Address,

    /// Identity the relayer submits under; also the oracle admin
    #[arg(long, env = "RELAYER_ADDRESS", default_value_t = Address::ZERO)]
    relayer: Address,

    #[arg(long, env = "ORACLE_STATE_PATH", default_value = "oracle-state.bin")]
    state: PathBuf,

    /// JSON `OracleConfig`, used only when no state exists yet
    #[arg(long, env = "ORACLE_CONFIG")]
    config: Option<PathBuf>,

    /// Seconds between polls
    #[arg(long, env = "POLL_INTERVAL", default_value_t = 12)]
    interval: u64,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    setup_logger();
    dotenv::dotenv().ok();
    let args = Args::parse();

    let config: OracleConfig = match &args.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => OracleConfig::default(),
    };
    let mut oracle = open_oracle(Some(args.state.as_path()), args.relayer, &config)?;
    let mut store = MemoryRootStore::new();
    info!(vault = %args.vault, relayer = %args.relayer, last_block = oracle.last_block_number(), "starting relayer");

    let provider = ProviderBuilder::new().on_http(args.rpc_url.clone());
    let vault = alloy::primitives::Address::from(args.vault.into_array());
    let price_slots = price_param_slots(args.vault);
    let keys: Vec<alloy::primitives::B256> = price_slots
        .iter()
        .chain(period_slots().iter())
        .map(|slot| alloy::primitives::B256::from(slot.to_be_bytes::<32>()))
        .collect();

    loop {
        let block_number = match provider.get_block_number().await {
            Ok(n) => n,
            Err(e) => {
                warn!(%e, "failed to get block number, retrying");
                sleep(Duration::from_secs(5)).await;
                continue;
            }
        };
        if block_number <= oracle.last_block_number() {
            sleep(Duration::from_secs(args.interval)).await;
            continue;
        }

        // The block's state root stands in for a root accepted by a relay.
        let block = match provider
            .get_block_by_number(BlockNumberOrTag::Number(block_number), false)
            .await
        {
            Ok(Some(block)) => block,
            Ok(None) => {
                warn!(block_number, "block not found");
                sleep(Duration::from_secs(5)).await;
                continue;
            }
            Err(e) => {
                warn!(%e, block_number, "failed to get block");
                sleep(Duration::from_secs(5)).await;
                continue;
            }
        };
        let state_root = B256::from(block.header.state_root.0);
        if let Err(err) = store.set_state_root(block_number, state_root) {
            // a reorg at the head; try again on the next poll
            warn!(%err, block_number, "state root changed");
            sleep(Duration::from_secs(args.interval)).await;
            continue;
        }

        let proof = match provider
            .get_proof(vault, keys.clone())
            .block_id(BlockId::Number(BlockNumberOrTag::Number(block_number)))
            .await
        {
            Ok(p) => p,
            Err(e) => {
                warn!(%e, block_number, "failed to get proof");
                sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        if let Err(err) = relay(&mut oracle, &store, &args, block_number, &proof) {
            warn!(%err, block_number, "proof rejected");
        }

        sleep(Duration::from_secs(args.interval)).await;
    }
}

fn relay<T: serde::Serialize>(
    oracle: &mut PriceOracle<SystemClock>,
    store: &MemoryRootStore,
    args: &Args,
    block_number: u64,
    proof: &T,
) -> Result<(), BoxError> {
    let response = to_proof_response(proof)?;
    let price_proof = ProofBundle::from_response(&response, &price_param_slots(args.vault))?.to_rlp();
    let period_proof = ProofBundle::from_response(&response, &period_slots())?.to_rlp();

    let verifier = VaultVerifier::new(store, args.vault, args.relayer);
    let relayed = relay_block(oracle, &verifier, block_number, &price_proof, &period_proof, &args.state)?;

    let params = *oracle.price_params();
    info!(block_number, change = %relayed.change, "price parameters relayed");
    println!(
        "update_price calldata: 0x{}",
        hex::encode(update_price_calldata(&params, oracle.price_params_ts(), block_number))
    );
    if relayed.period_changed == Some(true) {
        let period = oracle.profit_max_unlock_time();
        info!(block_number, period, "profit unlock period changed");
        println!(
            "update_profit_max_unlock_time calldata: 0x{}",
            hex::encode(update_profit_max_unlock_time_calldata(period, block_number))
        );
    }

    for model in PriceModel::ALL {
        match oracle.price(model) {
            Ok(price) => info!(?model, %price, "price"),
            Err(err) => warn!(?model, %err, "no price"),
        }
    }
    Ok(())
}
