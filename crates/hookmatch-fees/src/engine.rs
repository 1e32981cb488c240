//! The shared fee/volume service.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use hookmatch_types::{FeeQuote, HookmatchError, Result, UserId, constants};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{FeeSchedule, FeeTier, VolumeTracker};

#[derive(Debug)]
struct FeeState {
    volumes: VolumeTracker,
    market_makers: HashSet<UserId>,
    /// trader -> referrer
    referrers: HashMap<UserId, UserId>,
}

/// Tier lookup, fee computation and volume bookkeeping.
///
/// Shared between books as `Arc<FeeTierEngine>`; all mutable state sits
/// behind an internal lock so every method takes `&self`.
#[derive(Debug)]
pub struct FeeTierEngine {
    schedule: FeeSchedule,
    state: RwLock<FeeState>,
}

impl FeeTierEngine {
    /// # Errors
    /// `Configuration` if `schedule` fails validation.
    pub fn new(schedule: FeeSchedule) -> Result<Self> {
        schedule.validate()?;
        Ok(Self::build(schedule))
    }

    /// Engine over [`FeeSchedule::default`].
    #[must_use]
    pub fn with_default_schedule() -> Self {
        Self::build(FeeSchedule::default())
    }

    fn build(schedule: FeeSchedule) -> Self {
        let volumes = VolumeTracker::with_window_days(schedule.volume_window_days);
        Self {
            schedule,
            state: RwLock::new(FeeState {
                volumes,
                market_makers: HashSet::new(),
                referrers: HashMap::new(),
            }),
        }
    }

    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    #[must_use]
    pub fn schedule(&self) -> &FeeSchedule {
        &self.schedule
    }

    // =================================================================
    // Account flags
    // =================================================================

    pub fn set_market_maker(&self, trader: UserId, flagged: bool) {
        let mut state = self.write();
        if flagged {
            state.market_makers.insert(trader);
        } else {
            state.market_makers.remove(&trader);
        }
    }

    #[must_use]
    pub fn is_market_maker(&self, trader: &UserId) -> bool {
        self.read().market_makers.contains(trader)
    }

    /// Register `referrer` for `trader`.
    ///
    /// # Errors
    /// `Configuration` on self-referral.
    pub fn register_referrer(&self, trader: UserId, referrer: UserId) -> Result<()> {
        if trader == referrer {
            return Err(HookmatchError::Configuration(format!(
                "{trader} cannot refer themselves"
            )));
        }
        self.write().referrers.insert(trader, referrer);
        Ok(())
    }

    #[must_use]
    pub fn referrer_of(&self, trader: &UserId) -> Option<UserId> {
        self.read().referrers.get(trader).copied()
    }

    // =================================================================
    // Volume and tiers
    // =================================================================

    #[must_use]
    pub fn rolling_volume(&self, trader: &UserId) -> Decimal {
        self.rolling_volume_at(trader, Utc::now())
    }

    #[must_use]
    pub fn rolling_volume_at(&self, trader: &UserId, now: DateTime<Utc>) -> Decimal {
        self.read().volumes.volume_at(trader, now)
    }

    /// Tier for `trader`'s current rolling volume.
    #[must_use]
    pub fn tier_for(&self, trader: &UserId) -> FeeTier {
        self.tier_for_at(trader, Utc::now())
    }

    #[must_use]
    pub fn tier_for_at(&self, trader: &UserId, now: DateTime<Utc>) -> FeeTier {
        let volume = self.rolling_volume_at(trader, now);
        self.schedule.tier_for_volume(volume).clone()
    }

    /// Credit a fill's quote value to both counterparties.
    pub fn record_fill(&self, taker: UserId, maker: UserId, value: Decimal, at: DateTime<Utc>) {
        let mut state = self.write();
        state.volumes.prune(at);
        state.volumes.record(taker, value, at);
        if maker != taker {
            state.volumes.record(maker, value, at);
        }
        tracing::trace!(%taker, %maker, %value, "fill volume recorded");
    }

    // =================================================================
    // Fees
    // =================================================================

    /// Fee split for a trade of quote value `trade_value`.
    #[must_use]
    pub fn compute_fees(&self, taker: &UserId, maker: &UserId, trade_value: Decimal) -> FeeQuote {
        self.compute_fees_at(taker, maker, trade_value, Utc::now())
    }

    /// [`Self::compute_fees`] with volumes evaluated at `now`.
    ///
    /// The rebate never exceeds the maker's own fee base, nor the taker fee
    /// it is paid out of, so `pool_retained` is never negative.
    #[must_use]
    pub fn compute_fees_at(
        &self,
        taker: &UserId,
        maker: &UserId,
        trade_value: Decimal,
        now: DateTime<Utc>,
    ) -> FeeQuote {
        if trade_value <= Decimal::ZERO {
            return FeeQuote::ZERO;
        }
        let state = self.read();
        let taker_tier = self
            .schedule
            .tier_for_volume(state.volumes.volume_at(taker, now));

        let mut taker_fee = bps_of(trade_value, taker_tier.taker_fee_bps);
        if self.schedule.referral_discount_bps > 0 && state.referrers.contains_key(taker) {
            taker_fee -= bps_of(taker_fee, self.schedule.referral_discount_bps);
        }

        let mut maker_rebate = Decimal::ZERO;
        if state.market_makers.contains(maker) {
            let maker_tier = self
                .schedule
                .tier_for_volume(state.volumes.volume_at(maker, now));
            let maker_fee_base = bps_of(trade_value, maker_tier.maker_fee_bps);
            maker_rebate = bps_of(maker_fee_base, self.schedule.market_maker_rebate_bps)
                .min(maker_fee_base)
                .min(taker_fee);
        }

        FeeQuote {
            taker_fee,
            maker_rebate,
            pool_retained: taker_fee - maker_rebate,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, FeeState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, FeeState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `value * bps / 10_000`, rounded toward zero to quote precision.
fn bps_of(value: Decimal, bps: u32) -> Decimal {
    (value * Decimal::from(bps) / Decimal::from(constants::BPS_DENOMINATOR))
        .round_dp_with_strategy(constants::QUOTE_PRECISION, RoundingStrategy::ToZero)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn engine() -> FeeTierEngine {
        FeeTierEngine::new(FeeSchedule::default()).unwrap()
    }

    #[test]
    fn tier_zero_taker_fee() {
        let fees = engine().compute_fees_at(&UserId::new(), &UserId::new(), dec(1000), t0());
        assert_eq!(fees.taker_fee, dec(2));
        assert_eq!(fees.maker_rebate, Decimal::ZERO);
        assert_eq!(fees.pool_retained, dec(2));
        assert!(fees.is_consistent());
    }

    #[test]
    fn volume_moves_trader_up_tiers() {
        let engine = engine();
        let whale = UserId::new();
        let other = UserId::new();
        assert_eq!(engine.tier_for_at(&whale, t0()).taker_fee_bps, 20);

        engine.record_fill(whale, other, dec(1_000_000), t0());
        assert_eq!(engine.tier_for_at(&whale, t0()).taker_fee_bps, 18);
        assert_eq!(engine.tier_for_at(&other, t0()).taker_fee_bps, 18);

        // The volume ages out after the window.
        assert_eq!(
            engine
                .tier_for_at(&whale, t0() + Duration::days(31))
                .taker_fee_bps,
            20
        );
    }

    #[test]
    fn referral_discount_applies_to_tiered_fee() {
        let engine = engine();
        let taker = UserId::new();
        engine.register_referrer(taker, UserId::new()).unwrap();
        let fees = engine.compute_fees_at(&taker, &UserId::new(), dec(1000), t0());
        // 2.0 less 10% = 1.8
        assert_eq!(fees.taker_fee, Decimal::new(18, 1));
        assert_eq!(engine.tier_for_at(&taker, t0()).taker_fee_bps, 20);
    }

    #[test]
    fn self_referral_rejected() {
        let user = UserId::new();
        assert!(engine().register_referrer(user, user).is_err());
    }

    #[test]
    fn market_maker_rebate() {
        let engine = engine();
        let maker = UserId::new();
        engine.set_market_maker(maker, true);
        let fees = engine.compute_fees_at(&UserId::new(), &maker, dec(1000), t0());
        // maker base = 1000 * 10bps = 1.0, rebate 50% = 0.5
        assert_eq!(fees.taker_fee, dec(2));
        assert_eq!(fees.maker_rebate, Decimal::new(5, 1));
        assert_eq!(fees.pool_retained, Decimal::new(15, 1));

        engine.set_market_maker(maker, false);
        assert!(!engine.is_market_maker(&maker));
    }

    #[test]
    fn rebate_capped_by_base_and_taker_fee() {
        let schedule = FeeSchedule {
            tiers: vec![FeeTier::new(Decimal::ZERO, 40, 20)],
            market_maker_rebate_bps: 10_000,
            ..FeeSchedule::default()
        };
        let engine = FeeTierEngine::new(schedule).unwrap();
        let maker = UserId::new();
        engine.set_market_maker(maker, true);
        let fees = engine.compute_fees_at(&UserId::new(), &maker, dec(1000), t0());
        // maker base 4.0 would exceed the 2.0 taker fee.
        assert_eq!(fees.maker_rebate, dec(2));
        assert_eq!(fees.pool_retained, Decimal::ZERO);
        assert!(fees.is_consistent());
    }

    #[test]
    fn fees_round_toward_zero() {
        let fees = engine().compute_fees_at(
            &UserId::new(),
            &UserId::new(),
            Decimal::new(1, 8),
            t0(),
        );
        assert_eq!(fees.taker_fee, Decimal::ZERO);
        assert!(fees.is_consistent());
    }

    #[test]
    fn invalid_schedule_rejected() {
        let schedule = FeeSchedule {
            volume_window_days: 0,
            ..FeeSchedule::default()
        };
        assert!(FeeTierEngine::new(schedule).is_err());
    }
}
