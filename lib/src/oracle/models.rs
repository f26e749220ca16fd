//! Share-price reconstruction from a proven vault snapshot.
//!
//! Everything here is a pure function of an [`OracleState`] and a timestamp;
//! the smoothing memories live in the oracle itself.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use super::OracleState;
use crate::config::{MAX_BPS_EXTENDED, PRICE_UNIT};
use crate::error::{OracleError, OracleResult};
use crate::types::VaultSnapshot;

/// Projection model behind a price query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceModel {
    /// Snapshot priced at its own block, no extrapolation
    V0,
    /// Remaining profit unlocks linearly, no new rewards
    V1,
    /// Same reward every period, up to `max_v2_duration` periods
    V2,
}

impl PriceModel {
    pub const ALL: [PriceModel; 3] = [PriceModel::V0, PriceModel::V1, PriceModel::V2];

    pub fn index(self) -> usize {
        match self {
            PriceModel::V0 => 0,
            PriceModel::V1 => 1,
            PriceModel::V2 => 2,
        }
    }

    /// Unsmoothed price of this model at `now`.
    pub fn raw(self, state: &OracleState, now: u64) -> OracleResult<U256> {
        let now = U256::from(now);
        let params_ts = U256::from(state.price_params_ts);
        match self {
            PriceModel::V0 => raw_price_at(state, params_ts, state.price_params.last_profit_update),
            PriceModel::V1 => raw_price_at(state, now, params_ts),
            PriceModel::V2 => raw_price_at(state, now, now),
        }
    }
}

fn overflow(what: &'static str) -> OracleError {
    OracleError::Arithmetic(what)
}

/// Locked shares that have been released by `ts`.
pub fn unlocked_shares(params: &VaultSnapshot, ts: U256) -> OracleResult<U256> {
    if params.full_profit_unlock_date > ts {
        let elapsed = ts.saturating_sub(params.last_profit_update);
        let released = params
            .profit_unlocking_rate
            .checked_mul(elapsed)
            .ok_or_else(|| overflow("unlocking rate overflow"))?;
        Ok(released / MAX_BPS_EXTENDED)
    } else if !params.full_profit_unlock_date.is_zero() {
        Ok(params.balance_of_self)
    } else {
        Ok(U256::ZERO)
    }
}

/// Shares in circulation at `ts`: total supply minus shares unlocked by then.
pub fn circulating_supply(params: &VaultSnapshot, ts: U256) -> OracleResult<U256> {
    params
        .total_supply
        .checked_sub(unlocked_shares(params, ts)?)
        .ok_or_else(|| overflow("unlocked shares exceed total supply"))
}

pub fn total_assets(params: &VaultSnapshot) -> OracleResult<U256> {
    params
        .total_idle
        .checked_add(params.total_debt)
        .ok_or_else(|| overflow("total assets overflow"))
}

/// Replay whole reward periods elapsed between `last_profit_update` and
/// `params_ts`, assuming each one brings the gain of the last.
///
/// Mirrors the vault's report processing: at each period end every locked
/// share is burned and the repeated gain is locked again at the current
/// share price.
pub fn project_params(
    params: &VaultSnapshot,
    period: u64,
    max_periods: u32,
    params_ts: U256,
) -> OracleResult<VaultSnapshot> {
    let mut p = *params;
    if period == 0 || p.last_profit_update.saturating_add(U256::from(period)) >= params_ts {
        return Ok(p);
    }
    let period = U256::from(period);

    let elapsed = (params_ts - p.last_profit_update) / period;
    let periods = elapsed.min(U256::from(max_periods));
    if periods.is_zero() {
        return Ok(p);
    }

    if p.total_supply.is_zero() {
        return Err(overflow("projection over zero supply"));
    }
    let gain = p
        .balance_of_self
        .checked_mul(total_assets(&p)?)
        .ok_or_else(|| overflow("gain overflow"))?
        / p.total_supply;
    p.total_idle = gain
        .checked_mul(periods)
        .and_then(|added| p.total_idle.checked_add(added))
        .ok_or_else(|| overflow("projected idle overflow"))?;

    for _ in 0..periods.to::<u32>() {
        if p.total_supply.is_zero() {
            return Err(overflow("projection exhausted supply"));
        }
        let remaining = p
            .total_supply
            .checked_sub(p.balance_of_self)
            .ok_or_else(|| overflow("locked shares exceed supply"))?;
        let relocked = p
            .balance_of_self
            .checked_mul(remaining)
            .ok_or_else(|| overflow("relocked shares overflow"))?
            / p.total_supply;
        let burned = p
            .balance_of_self
            .checked_mul(p.balance_of_self)
            .ok_or_else(|| overflow("burned shares overflow"))?
            / p.total_supply;
        p.total_supply -= burned;
        p.balance_of_self = relocked;
    }

    p.profit_unlocking_rate = if p.full_profit_unlock_date > p.last_profit_update {
        p.balance_of_self
            .checked_mul(MAX_BPS_EXTENDED)
            .ok_or_else(|| overflow("unlocking rate overflow"))?
            / (p.full_profit_unlock_date - p.last_profit_update)
    } else {
        U256::ZERO
    };
    let shift = periods * period;
    p.full_profit_unlock_date = p.full_profit_unlock_date.saturating_add(shift);
    p.last_profit_update = p.last_profit_update.saturating_add(shift);
    Ok(p)
}

/// Assets per circulating share at `ts`, on parameters projected to
/// `params_ts`, scaled by 1e18.
pub fn raw_price_at(state: &OracleState, ts: U256, params_ts: U256) -> OracleResult<U256> {
    let params = project_params(
        &state.price_params,
        state.profit_max_unlock_time,
        state.max_v2_duration,
        params_ts,
    )?;
    let supply = circulating_supply(&params, ts)?;
    if supply.is_zero() {
        return Err(overflow("zero circulating supply"));
    }
    let assets = total_assets(&params)?
        .checked_mul(PRICE_UNIT)
        .ok_or_else(|| overflow("price overflow"))?;
    Ok(assets / supply)
}
