//! Fee schedule configuration.

use hookmatch_types::{HookmatchError, Result, constants};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Rates applying to traders whose rolling volume reaches `volume_threshold`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTier {
    /// Rolling quote volume needed for this tier.
    pub volume_threshold: Decimal,
    pub maker_fee_bps: u32,
    pub taker_fee_bps: u32,
}

impl FeeTier {
    #[must_use]
    pub fn new(volume_threshold: Decimal, maker_fee_bps: u32, taker_fee_bps: u32) -> Self {
        Self {
            volume_threshold,
            maker_fee_bps,
            taker_fee_bps,
        }
    }
}

/// Tiers plus discount settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Strictly increasing thresholds; tier 0 has threshold zero.
    pub tiers: Vec<FeeTier>,
    /// Share of a flagged maker's fee base paid back as rebate, in bps.
    #[serde(default)]
    pub market_maker_rebate_bps: u32,
    /// Reduction of a referred taker's fee, in bps of that fee.
    #[serde(default)]
    pub referral_discount_bps: u32,
    #[serde(default = "default_window_days")]
    pub volume_window_days: u32,
}

fn default_window_days() -> u32 {
    constants::DEFAULT_VOLUME_WINDOW_DAYS
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            tiers: vec![
                FeeTier::new(Decimal::ZERO, 10, 20),
                FeeTier::new(Decimal::from(1_000_000), 8, 18),
                FeeTier::new(Decimal::from(10_000_000), 5, 15),
                FeeTier::new(Decimal::from(50_000_000), 2, 10),
            ],
            market_maker_rebate_bps: 5_000,
            referral_discount_bps: 1_000,
            volume_window_days: constants::DEFAULT_VOLUME_WINDOW_DAYS,
        }
    }
}

impl FeeSchedule {
    /// Parse and validate a JSON schedule.
    pub fn from_json(json: &str) -> Result<Self> {
        let schedule: Self = serde_json::from_str(json)
            .map_err(|e| HookmatchError::Configuration(format!("fee schedule: {e}")))?;
        schedule.validate()?;
        Ok(schedule)
    }

    /// Structural checks. Non-monotonic fees are allowed but logged.
    pub fn validate(&self) -> Result<()> {
        let Some(first) = self.tiers.first() else {
            return Err(config("at least one fee tier is required"));
        };
        if !first.volume_threshold.is_zero() {
            return Err(config(format!(
                "tier 0 threshold must be zero, got {}",
                first.volume_threshold
            )));
        }
        for (i, tier) in self.tiers.iter().enumerate() {
            if tier.maker_fee_bps > constants::BPS_DENOMINATOR
                || tier.taker_fee_bps > constants::BPS_DENOMINATOR
            {
                return Err(config(format!("tier {i} rate exceeds 100%")));
            }
        }
        for (i, pair) in self.tiers.windows(2).enumerate() {
            let (lower, upper) = (&pair[0], &pair[1]);
            if upper.volume_threshold <= lower.volume_threshold {
                return Err(config(format!(
                    "tier {} threshold {} is not above tier {i} threshold {}",
                    i + 1,
                    upper.volume_threshold,
                    lower.volume_threshold
                )));
            }
            if upper.maker_fee_bps > lower.maker_fee_bps || upper.taker_fee_bps > lower.taker_fee_bps {
                tracing::warn!(
                    tier = i + 1,
                    maker_bps = upper.maker_fee_bps,
                    taker_bps = upper.taker_fee_bps,
                    "fee tier charges more than the tier below it"
                );
            }
        }
        if self.market_maker_rebate_bps > constants::BPS_DENOMINATOR {
            return Err(config("market_maker_rebate_bps exceeds 100%"));
        }
        if self.referral_discount_bps > constants::BPS_DENOMINATOR {
            return Err(config("referral_discount_bps exceeds 100%"));
        }
        if self.volume_window_days == 0 {
            return Err(config("volume_window_days must be at least 1"));
        }
        Ok(())
    }

    /// Highest tier whose threshold `volume` reaches. Tier 0 when none
    /// above it qualifies.
    ///
    /// # Panics
    /// If the schedule has no tiers; [`Self::validate`] rejects that.
    #[must_use]
    pub fn tier_for_volume(&self, volume: Decimal) -> &FeeTier {
        let default = &self.tiers[0];
        self.tiers
            .iter()
            .rev()
            .find(|tier| tier.volume_threshold <= volume)
            .unwrap_or(default)
    }
}

fn config(reason: impl Into<String>) -> HookmatchError {
    HookmatchError::Configuration(reason.into())
}
