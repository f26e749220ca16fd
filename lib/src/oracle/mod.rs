//! Stateful share-price oracle fed with proven vault snapshots.

mod access;
mod clock;
pub mod models;
mod smoothing;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use access::{AccessControl, Role};
pub use clock::{Clock, ManualClock, SystemClock};
pub use models::PriceModel;
pub use smoothing::{price_ceiling, smooth, PriceMemory};

use crate::config::{check_max_price_increment, check_max_v2_duration, OracleConfig, PRICE_UNIT};
use crate::error::{OracleError, OracleResult};
use crate::types::VaultSnapshot;

/// Everything the oracle persists between runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleState {
    pub price_params: VaultSnapshot,
    /// Timestamp of the block the params were proven at
    pub price_params_ts: u64,
    /// Reward period of the vault, seconds
    pub profit_max_unlock_time: u64,
    /// Linearizability watermark
    pub last_block_number: u64,
    pub max_price_increment: U256,
    pub max_v2_duration: u32,
    /// Smoothing memory per model, indexed by [`PriceModel::index`]
    pub last_prices: [PriceMemory; 3],
}

impl OracleState {
    /// A vault holding `initial_price` assets over one share.
    pub fn new(config: &OracleConfig, now: u64) -> Self {
        let memory = PriceMemory {
            price: config.initial_price,
            ts: now,
        };
        Self {
            price_params: VaultSnapshot {
                total_idle: config.initial_price,
                total_supply: PRICE_UNIT,
                ..Default::default()
            },
            price_params_ts: now,
            profit_max_unlock_time: config.profit_max_unlock_time,
            last_block_number: 0,
            max_price_increment: config.max_price_increment,
            max_v2_duration: config.max_v2_duration,
            last_prices: [memory; 3],
        }
    }

    /// Smoothed price of `model` at `now`, recorded in its memory.
    pub fn smoothed(&mut self, model: PriceModel, now: u64) -> OracleResult<U256> {
        let raw = model.raw(self, now)?;
        let increment = self.max_price_increment;
        Ok(smooth(&mut self.last_prices[model.index()], raw, increment, now))
    }

    fn check_watermark(&self, block_number: u64) -> OracleResult<()> {
        if block_number < self.last_block_number {
            warn!(
                block_number,
                last_block_number = self.last_block_number,
                "stale update rejected"
            );
            return Err(OracleError::StaleUpdate {
                block_number,
                last_block_number: self.last_block_number,
            });
        }
        Ok(())
    }
}

/// Change from `old` to `new` in parts per 1e18, taken relative to the lower
/// of the two. A drop to zero saturates.
fn relative_change(old: U256, new: U256) -> U256 {
    let (diff, base) = if new >= old {
        (new - old, old)
    } else {
        (old - new, new)
    };
    diff.saturating_mul(PRICE_UNIT)
        .checked_div(base)
        .unwrap_or(U256::MAX)
}

/// Oracle state together with its role grants, as stored on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleSnapshot {
    pub state: OracleState,
    pub roles: AccessControl,
}

/// Share-price oracle.
///
/// Every mutating call either applies completely or leaves the oracle as it
/// was. Price queries take `&mut self` because each one advances the
/// smoothing memory of its model.
#[derive(Debug)]
pub struct PriceOracle<C: Clock = SystemClock> {
    state: OracleState,
    roles: AccessControl,
    clock: C,
}

impl<C: Clock> PriceOracle<C> {
    pub fn new(admin: Address, config: &OracleConfig, clock: C) -> OracleResult<Self> {
        config.validate()?;
        let state = OracleState::new(config, clock.now());
        info!(%admin, initial_price = %config.initial_price, "price oracle created");
        Ok(Self {
            state,
            roles: AccessControl::with_admin(admin),
            clock,
        })
    }

    /// Resume from a persisted snapshot. Its settings are re-checked against
    /// the same bounds the setters enforce.
    pub fn restore(snapshot: OracleSnapshot, clock: C) -> OracleResult<Self> {
        check_max_price_increment(snapshot.state.max_price_increment)?;
        check_max_v2_duration(snapshot.state.max_v2_duration)?;
        Ok(Self {
            state: snapshot.state,
            roles: snapshot.roles,
            clock,
        })
    }

    pub fn snapshot(&self) -> OracleSnapshot {
        OracleSnapshot {
            state: self.state.clone(),
            roles: self.roles.clone(),
        }
    }

    /// Store a proven vault snapshot taken at `ts` in block `block_number`.
    ///
    /// An equal block number overwrites the previous snapshot; a lower one is
    /// rejected. Returns the relative change of the raw price, parts per 1e18.
    pub fn update(
        &mut self,
        caller: Address,
        snapshot: VaultSnapshot,
        ts: u64,
        block_number: u64,
    ) -> OracleResult<U256> {
        self.roles.check(Role::PriceParametersVerifier, caller)?;
        self.state.check_watermark(block_number)?;

        let now = self.clock.now();
        let mut next = self.state.clone();
        for model in PriceModel::ALL {
            // a model without a price keeps its memory
            if let Err(err) = next.smoothed(model, now) {
                debug!(?model, %err, "no price to carry over");
            }
        }

        let old_ts = U256::from(next.price_params_ts);
        let current = models::raw_price_at(&next, old_ts, old_ts).ok();

        next.price_params = snapshot;
        next.price_params_ts = ts;
        next.last_block_number = block_number;
        let ts = U256::from(ts);
        let new_price = models::raw_price_at(&next, ts, ts)?;

        let change = match current {
            Some(current) if !current.is_zero() => relative_change(current, new_price),
            _ => U256::ZERO,
        };

        self.state = next;
        info!(
            block_number,
            %new_price,
            %change,
            "price parameters updated"
        );
        Ok(change)
    }

    /// Store a proven reward period. Returns whether it changed.
    pub fn update_profit_max_unlock_time(
        &mut self,
        caller: Address,
        profit_max_unlock_time: u64,
        block_number: u64,
    ) -> OracleResult<bool> {
        self.roles.check(Role::UnlockTimeVerifier, caller)?;
        self.state.check_watermark(block_number)?;

        let previous = self.state.profit_max_unlock_time;
        self.state.profit_max_unlock_time = profit_max_unlock_time;
        self.state.last_block_number = block_number;
        info!(
            block_number,
            profit_max_unlock_time, previous, "profit unlock period updated"
        );
        Ok(previous != profit_max_unlock_time)
    }

    pub fn price(&mut self, model: PriceModel) -> OracleResult<U256> {
        let now = self.clock.now();
        self.state.smoothed(model, now)
    }

    pub fn price_v0(&mut self) -> OracleResult<U256> {
        self.price(PriceModel::V0)
    }

    pub fn price_v1(&mut self) -> OracleResult<U256> {
        self.price(PriceModel::V1)
    }

    pub fn price_v2(&mut self) -> OracleResult<U256> {
        self.price(PriceModel::V2)
    }

    /// Unsmoothed v1 price at the current time.
    pub fn raw_price(&self) -> OracleResult<U256> {
        PriceModel::V1.raw(&self.state, self.clock.now())
    }

    pub fn set_max_price_increment(&mut self, caller: Address, value: U256) -> OracleResult<()> {
        self.roles.check(Role::Admin, caller)?;
        check_max_price_increment(value)?;
        self.state.max_price_increment = value;
        info!(%value, "max price increment set");
        Ok(())
    }

    pub fn set_max_v2_duration(&mut self, caller: Address, value: u32) -> OracleResult<()> {
        self.roles.check(Role::Admin, caller)?;
        check_max_v2_duration(value)?;
        self.state.max_v2_duration = value;
        info!(value, "max v2 duration set");
        Ok(())
    }

    pub fn grant_role(&mut self, caller: Address, role: Role, account: Address) -> OracleResult<()> {
        self.roles.grant_role(caller, role, account)
    }

    pub fn revoke_role(&mut self, caller: Address, role: Role, account: Address) -> OracleResult<()> {
        self.roles.revoke_role(caller, role, account)
    }

    pub fn renounce_role(&mut self, caller: Address, role: Role) {
        self.roles.renounce_role(caller, role)
    }

    pub fn has_role(&self, role: Role, account: Address) -> bool {
        self.roles.has_role(role, account)
    }

    pub fn state(&self) -> &OracleState {
        &self.state
    }

    pub fn price_params(&self) -> &VaultSnapshot {
        &self.state.price_params
    }

    pub fn price_params_ts(&self) -> u64 {
        self.state.price_params_ts
    }

    pub fn last_block_number(&self) -> u64 {
        self.state.last_block_number
    }

    pub fn profit_max_unlock_time(&self) -> u64 {
        self.state.profit_max_unlock_time
    }

    pub fn max_price_increment(&self) -> U256 {
        self.state.max_price_increment
    }

    pub fn max_v2_duration(&self) -> u32 {
        self.state.max_v2_duration
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
