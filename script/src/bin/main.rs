//! Offline vault oracle tool.
//!
//! Verifies an `eth_getProof` JSON response against a trusted block hash or
//! state root, applies it to a fresh or persisted oracle, and prints prices
//! and destination-chain calldata.
//!
//! ```shell
//! RUST_LOG=info cargo run --release -- demo
//! RUST_LOG=info cargo run --release -- price --vault 0x... --proof proof.json --state-root 0x... --block 123
//! RUST_LOG=info cargo run --release -- price --vault 0x... --proof proof.json --header header.hex --block-hash 0x...
//! ```

use std::fs;
use std::path::PathBuf;

use alloy_primitives::{Address, B256, U256};
use clap::{Parser, Subcommand};
use tracing::info;
use vault_oracle_lib::calldata::{update_price_calldata, update_profit_max_unlock_time_calldata};
use vault_oracle_lib::fixture::VaultState;
use vault_oracle_lib::slots::{period_slots, price_param_slots};
use vault_oracle_lib::{
    keccak256, BlockHeader, Clock, ManualClock, MemoryRootStore, OracleConfig, PriceModel,
    PriceOracle, ProofBundle, Role, SystemClock, VaultSnapshot, VaultVerifier,
};
use vault_oracle_script::{
    load_state, open_oracle, read_proof_response, save_state, setup_logger, BoxError,
};

/// The arguments for the command.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prove the vault's price parameters and apply them
    Price(Submission),
    /// Prove the vault's profit unlock period and apply it
    Period(Submission),
    /// Print the prices of a persisted oracle
    Inspect {
        #[arg(long, env = "ORACLE_STATE_PATH", default_value = "oracle-state.bin")]
        state: PathBuf,
    },
    /// Run a reward cycle against a locally built vault trie
    Demo,
}

#[derive(clap::Args, Debug)]
struct Submission {
    #[arg(long, env = "VAULT_ADDRESS")]
    vault: Address,

    /// `eth_getProof` JSON response
    #[arg(long)]
    proof: PathBuf,

    /// Hex-encoded header RLP, checked against `--block-hash`
    #[arg(long, requires = "block_hash", conflicts_with = "state_root")]
    header: Option<PathBuf>,

    /// Trusted hash of the block in `--header`
    #[arg(long)]
    block_hash: Option<B256>,

    /// Trusted state root of `--block`
    #[arg(long, requires = "block")]
    state_root: Option<B256>,

    #[arg(long)]
    block: Option<u64>,

    /// Persisted oracle; created when missing and written back on success
    #[arg(long, env = "ORACLE_STATE_PATH")]
    state: Option<PathBuf>,

    #[arg(long, env = "RELAYER_ADDRESS", default_value_t = Address::ZERO)]
    relayer: Address,

    /// Print the destination-chain calldata of the update
    #[arg(long)]
    calldata: bool,
}

/// Where the trusted root of a submission comes from.
enum Anchor {
    Header(Vec<u8>),
    StateRoot(u64),
}

impl Submission {
    /// Record the operator-supplied trusted root and return how to prove
    /// against it.
    fn anchor(&self, store: &mut MemoryRootStore) -> Result<Anchor, BoxError> {
        match (&self.header, self.state_root, self.block) {
            (Some(path), _, _) => {
                let text = fs::read_to_string(path)?;
                let header_rlp = hex::decode(text.trim().trim_start_matches("0x"))?;
                let number = BlockHeader::decode(&header_rlp)?.number;
                let hash = self.block_hash.ok_or("--header needs --block-hash")?;
                store.set_block_hash(number, hash)?;
                Ok(Anchor::Header(header_rlp))
            }
            (None, Some(state_root), Some(block)) => {
                store.set_state_root(block, state_root)?;
                Ok(Anchor::StateRoot(block))
            }
            _ => Err("either --header or --state-root with --block is required".into()),
        }
    }
}

fn main() -> Result<(), BoxError> {
    setup_logger();
    dotenv::dotenv().ok();

    match Args::parse().command {
        Command::Price(submission) => submit_price(&submission)?,
        Command::Period(submission) => submit_period(&submission)?,
        Command::Inspect { state } => {
            let Some(snapshot) = load_state(&state)? else {
                return Err(format!("no oracle state at {}", state.display()).into());
            };
            let mut oracle = PriceOracle::restore(snapshot, SystemClock)?;
            print_prices(&mut oracle);
        }
        Command::Demo => demo()?,
    }
    Ok(())
}

fn submit_price(submission: &Submission) -> Result<(), BoxError> {
    let response = read_proof_response(&submission.proof)?;
    let proof = ProofBundle::from_response(&response, &price_param_slots(submission.vault))?.to_rlp();

    let mut store = MemoryRootStore::new();
    let anchor = submission.anchor(&mut store)?;
    let mut oracle = open_oracle(submission.state.as_deref(), submission.relayer, &OracleConfig::default())?;
    let verifier = VaultVerifier::new(&store, submission.vault, submission.relayer);

    let change = match &anchor {
        Anchor::Header(header_rlp) => verifier.verify_by_block_hash(&mut oracle, header_rlp, &proof)?,
        Anchor::StateRoot(block) => verifier.verify_by_state_root(&mut oracle, *block, &proof)?,
    };

    let params = *oracle.price_params();
    println!("Proof verified for vault {}", submission.vault);
    println!("  block:                   {}", oracle.last_block_number());
    println!("  timestamp:               {}", oracle.price_params_ts());
    println!("  total_debt:              {}", params.total_debt);
    println!("  total_idle:              {}", params.total_idle);
    println!("  total_supply:            {}", params.total_supply);
    println!("  full_profit_unlock_date: {}", params.full_profit_unlock_date);
    println!("  profit_unlocking_rate:   {}", params.profit_unlocking_rate);
    println!("  last_profit_update:      {}", params.last_profit_update);
    println!("  balance_of_self:         {}", params.balance_of_self);
    println!("  relative change:         {change}");
    print_prices(&mut oracle);

    if submission.calldata {
        let data = update_price_calldata(&params, oracle.price_params_ts(), oracle.last_block_number());
        println!("update_price calldata: 0x{}", hex::encode(data));
    }
    if let Some(path) = &submission.state {
        save_state(path, &oracle.snapshot())?;
    }
    Ok(())
}

fn submit_period(submission: &Submission) -> Result<(), BoxError> {
    let response = read_proof_response(&submission.proof)?;
    let proof = ProofBundle::from_response(&response, &period_slots())?.to_rlp();

    let mut store = MemoryRootStore::new();
    let anchor = submission.anchor(&mut store)?;
    let mut oracle = open_oracle(submission.state.as_deref(), submission.relayer, &OracleConfig::default())?;
    let verifier = VaultVerifier::new(&store, submission.vault, submission.relayer);

    let changed = match &anchor {
        Anchor::Header(header_rlp) => verifier.verify_period_by_block_hash(&mut oracle, header_rlp, &proof)?,
        Anchor::StateRoot(block) => verifier.verify_period_by_state_root(&mut oracle, *block, &proof)?,
    };

    let period = oracle.profit_max_unlock_time();
    println!("Proof verified: profit_max_unlock_time = {period} (changed: {changed})");
    if submission.calldata {
        let data = update_profit_max_unlock_time_calldata(period, oracle.last_block_number());
        println!("update_profit_max_unlock_time calldata: 0x{}", hex::encode(data));
    }
    if let Some(path) = &submission.state {
        save_state(path, &oracle.snapshot())?;
    }
    Ok(())
}

fn print_prices<C: Clock>(oracle: &mut PriceOracle<C>) {
    println!("last block: {}", oracle.last_block_number());
    println!("profit_max_unlock_time: {}", oracle.profit_max_unlock_time());
    for model in PriceModel::ALL {
        match oracle.price(model) {
            Ok(price) => println!("price {model:?}: {price}"),
            Err(err) => println!("price {model:?}: unavailable ({err})"),
        }
    }
    match oracle.raw_price() {
        Ok(price) => println!("raw price: {price}"),
        Err(err) => println!("raw price: unavailable ({err})"),
    }
}

/// Prove a flat vault, then the same vault a moment after a 10% reward, and
/// watch v1 unlock it over the week.
fn demo() -> Result<(), BoxError> {
    const WEEK: u64 = 604_800;
    let unit = U256::from(10u64).pow(U256::from(18u64));
    let reward = unit / U256::from(10u64);
    let t0 = 1_700_000_000u64;

    let vault = Address::repeat_byte(0x42);
    let relayer = Address::repeat_byte(0x01);
    let decoys: Vec<Address> = (1u8..8).map(|b| Address::repeat_byte(b.wrapping_mul(17))).collect();

    let clock = ManualClock::new(t0);
    let mut oracle = PriceOracle::new(relayer, &OracleConfig::default(), clock.clone())?;
    oracle.grant_role(relayer, Role::PriceParametersVerifier, relayer)?;

    let mut store = MemoryRootStore::new();
    let rounds = [
        (
            100u64,
            t0,
            VaultSnapshot {
                total_idle: unit,
                total_supply: unit,
                full_profit_unlock_date: U256::from(t0 + WEEK),
                last_profit_update: U256::from(t0),
                ..Default::default()
            },
        ),
        (
            101u64,
            t0 + 12,
            VaultSnapshot {
                total_idle: unit + reward,
                total_supply: unit + reward,
                balance_of_self: reward,
                full_profit_unlock_date: U256::from(t0 + 12 + WEEK),
                last_profit_update: U256::from(t0 + 12),
                profit_unlocking_rate: reward * U256::from(1_000_000_000_000u64) / U256::from(WEEK),
                ..Default::default()
            },
        ),
    ];

    for (block, ts, snapshot) in rounds {
        let slots: Vec<(U256, U256)> = price_param_slots(vault).into_iter().zip(snapshot.to_array()).collect();
        let state = VaultState::new(vault, &slots, &decoys);
        let header = state.header(block, ts);
        store.set_block_hash(block, B256::from(keccak256(&header)))?;

        clock.set(ts);
        let proof = state.bundle(&price_param_slots(vault)).to_rlp();
        let change = VaultVerifier::new(&store, vault, relayer).verify_by_block_hash(&mut oracle, &header, &proof)?;
        info!(block, %change, "demo round submitted");
        println!("\n== block {block} (relative change {change}) ==");
        print_prices(&mut oracle);
    }

    for days in [1u64, 3, 7] {
        clock.set(t0 + 12 + days * 86_400);
        println!("\n== {days} day(s) later ==");
        print_prices(&mut oracle);
    }
    Ok(())
}
