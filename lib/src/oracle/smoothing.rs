use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::config::PRICE_UNIT;

/// Last price a model reported and when.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceMemory {
    pub price: U256,
    pub ts: u64,
}

/// Highest price reachable from `memory` by `now`.
///
/// Linear in elapsed seconds, which never exceeds the compounded bound
/// `price * (1 + r)^elapsed`.
pub fn price_ceiling(memory: &PriceMemory, max_price_increment: U256, now: u64) -> U256 {
    let elapsed = U256::from(now.saturating_sub(memory.ts));
    let step = max_price_increment
        .saturating_mul(elapsed)
        .saturating_mul(memory.price)
        / PRICE_UNIT;
    memory.price.saturating_add(step)
}

/// Clamp `raw` from above and remember the result.
///
/// Decreases pass through untouched. The ceiling of a zero memory is zero,
/// so a model that has reported 0 stays there.
pub fn smooth(memory: &mut PriceMemory, raw: U256, max_price_increment: U256, now: u64) -> U256 {
    let reported = raw.min(price_ceiling(memory, max_price_increment, now));
    memory.price = reported;
    memory.ts = memory.ts.max(now);
    reported
}
