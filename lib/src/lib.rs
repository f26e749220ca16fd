pub mod types;
pub mod error;
pub mod rlp_encoding;
pub mod path;
pub mod mpt;
pub mod header;
pub mod bundle;
pub mod slots;
pub mod verifier;
pub mod store;
pub mod config;
pub mod oracle;
pub mod submit;
pub mod calldata;

#[cfg(feature = "std")]
pub mod builder;
#[cfg(feature = "std")]
pub mod fixture;

pub use types::*;
pub use error::*;
pub use rlp_encoding::*;
pub use path::*;
pub use mpt::*;
pub use header::BlockHeader;
pub use bundle::{ProofBundle, ProofResponse, StorageProofEntry};
pub use verifier::{verify, verify_state_root, verify_with_header, SlotValues};
pub use store::{MemoryRootStore, TrustedRootStore};
pub use config::OracleConfig;
pub use oracle::{
    Clock, ManualClock, OracleSnapshot, OracleState, PriceModel, PriceOracle, Role, SystemClock,
};
pub use submit::VaultVerifier;

#[cfg(feature = "std")]
pub use builder::*;
