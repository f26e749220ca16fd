use alloy_primitives::{Address, U256};
use vault_oracle_lib::{Clock, ManualClock, OracleConfig, PriceOracle, Role, VaultSnapshot};

const WEEK: u64 = 604_800;
const T0: u64 = 1_700_000_000;

fn unit() -> U256 {
    U256::from(10u64).pow(U256::from(18u64))
}

fn e18(n: u64) -> U256 {
    U256::from(n) * unit()
}

/// Share accounting of the vault: each report burns what has unlocked and
/// locks the new gain as freshly minted shares, released linearly over one
/// period.
#[derive(Clone, Debug)]
struct Vault {
    idle: U256,
    supply: U256,
    locked: U256,
    full_profit_unlock_date: u64,
    unlocking_rate: U256,
    last_profit_update: u64,
}

impl Vault {
    fn new(assets: U256) -> Self {
        Self {
            idle: assets,
            supply: assets,
            locked: U256::ZERO,
            full_profit_unlock_date: 0,
            unlocking_rate: U256::ZERO,
            last_profit_update: 0,
        }
    }

    fn unlocked(&self, t: u64) -> U256 {
        if self.full_profit_unlock_date > t {
            self.unlocking_rate * U256::from(t - self.last_profit_update) / U256::from(1_000_000_000_000u64)
        } else if self.full_profit_unlock_date != 0 {
            self.locked
        } else {
            U256::ZERO
        }
    }

    fn report(&mut self, t: u64, gain: U256) {
        let unlocked = self.unlocked(t);
        self.supply -= unlocked;
        self.locked -= unlocked;

        let minted = gain * self.supply / self.idle;
        self.idle += gain;
        self.supply += minted;
        self.locked += minted;
        self.unlocking_rate = self.locked * U256::from(1_000_000_000_000u64) / U256::from(WEEK);
        self.full_profit_unlock_date = t + WEEK;
        self.last_profit_update = t;
    }

    fn price(&self, t: u64) -> U256 {
        self.idle * unit() / (self.supply - self.unlocked(t))
    }

    fn snapshot(&self) -> VaultSnapshot {
        VaultSnapshot {
            total_debt: U256::ZERO,
            total_idle: self.idle,
            total_supply: self.supply,
            full_profit_unlock_date: U256::from(self.full_profit_unlock_date),
            profit_unlocking_rate: self.unlocking_rate,
            last_profit_update: U256::from(self.last_profit_update),
            balance_of_self: self.locked,
        }
    }
}

fn oracle_with(vault: &Vault, clock: &ManualClock) -> PriceOracle<ManualClock> {
    let prover = Address::repeat_byte(1);
    let mut oracle = PriceOracle::new(prover, &OracleConfig::default(), clock.clone()).unwrap();
    oracle.grant_role(prover, Role::PriceParametersVerifier, prover).unwrap();
    oracle.update(prover, vault.snapshot(), clock.now(), 1).unwrap();
    oracle
}

fn within(got: U256, want: U256, parts_per_billion: u64) -> bool {
    let diff = if got > want { got - want } else { want - got };
    diff * U256::from(1_000_000_000u64) <= want * U256::from(parts_per_billion)
}

#[test]
fn v1_is_exact_without_new_rewards() {
    let mut vault = Vault::new(e18(1_000));
    vault.report(T0, e18(25));
    let clock = ManualClock::new(T0);
    let mut oracle = oracle_with(&vault, &clock);

    for offset in [0, 1, 600, 86_400, WEEK / 2, WEEK - 1, WEEK, WEEK + 1, 10 * WEEK] {
        clock.set(T0 + offset);
        assert_eq!(oracle.price_v1().unwrap(), vault.price(T0 + offset), "offset {offset}");
    }
}

#[test]
fn v0_catches_up_but_never_leads() {
    let mut vault = Vault::new(e18(1_000));
    vault.report(T0, e18(25));
    let clock = ManualClock::new(T0);
    let mut oracle = oracle_with(&vault, &clock);

    let mut last = U256::ZERO;
    for offset in [0, 3_600, WEEK / 3, WEEK, 2 * WEEK] {
        clock.set(T0 + offset);
        let v0 = oracle.price_v0().unwrap();
        assert!(v0 >= last);
        assert!(v0 <= vault.price(T0 + offset));
        last = v0;
    }
}

#[test]
fn v2_tracks_steady_weekly_rewards() {
    let gain = e18(10);
    let mut vault = Vault::new(e18(1_000));
    vault.report(T0, gain);
    let clock = ManualClock::new(T0);
    let mut oracle = oracle_with(&vault, &clock);

    for week in 0..5u64 {
        for offset in [0, 1, WEEK / 7, WEEK / 2, WEEK - 1] {
            let t = T0 + week * WEEK + offset;
            if offset == 0 && week > 0 {
                vault.report(t, gain);
            }
            clock.set(t);
            let v2 = oracle.price_v2().unwrap();
            let truth = vault.price(t);
            assert!(within(v2, truth, 1), "week {week} offset {offset}: {v2} vs {truth}");
        }
    }
}

#[test]
fn v1_falls_behind_when_rewards_continue() {
    let gain = e18(10);
    let mut vault = Vault::new(e18(1_000));
    vault.report(T0, gain);
    let clock = ManualClock::new(T0);
    let mut oracle = oracle_with(&vault, &clock);

    for week in 1..4u64 {
        vault.report(T0 + week * WEEK, gain);
    }
    let t = T0 + 3 * WEEK + WEEK / 2;
    clock.set(t);
    assert!(oracle.price_v1().unwrap() < vault.price(t));
    assert!(within(oracle.price_v2().unwrap(), vault.price(t), 1));
}
