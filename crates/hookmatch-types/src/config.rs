//! Configuration types for HookMatch books.

use serde::{Deserialize, Serialize};

use crate::{HookmatchError, MarketPair, Result, UserId, constants};

/// Per-book configuration, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookConfig {
    /// The pair this book trades.
    pub market: MarketPair,
    /// Maximum crosses a single market order may execute before the
    /// remainder is discarded.
    #[serde(default = "default_max_market_matches")]
    pub max_market_matches: usize,
    /// Extra quote escrow reserved on buys to cover taker fees, in bps of
    /// the order's quote value.
    #[serde(default = "default_fee_reserve_bps")]
    pub fee_reserve_bps: u32,
    /// Account credited with the retained part of every taker fee.
    pub fee_collector: UserId,
}

fn default_max_market_matches() -> usize {
    constants::DEFAULT_MAX_MARKET_MATCHES
}

fn default_fee_reserve_bps() -> u32 {
    constants::DEFAULT_FEE_RESERVE_BPS
}

impl BookConfig {
    /// Config with default limits for `market`.
    #[must_use]
    pub fn new(market: MarketPair, fee_collector: UserId) -> Self {
        Self {
            market,
            max_market_matches: constants::DEFAULT_MAX_MARKET_MATCHES,
            fee_reserve_bps: constants::DEFAULT_FEE_RESERVE_BPS,
            fee_collector,
        }
    }

    /// Default BTC/USDT book.
    #[must_use]
    pub fn btc_usdt(fee_collector: UserId) -> Self {
        Self::new(MarketPair::new("BTC", "USDT"), fee_collector)
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| HookmatchError::Configuration(format!("book config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configs a book cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.market.base.is_empty() || self.market.quote.is_empty() {
            return Err(HookmatchError::Configuration(
                "market assets must be non-empty".into(),
            ));
        }
        if self.market.base == self.market.quote {
            return Err(HookmatchError::Configuration(format!(
                "base and quote are both {}",
                self.market.base
            )));
        }
        if self.max_market_matches == 0 {
            return Err(HookmatchError::Configuration(
                "max_market_matches must be at least 1".into(),
            ));
        }
        if self.fee_reserve_bps > constants::BPS_DENOMINATOR {
            return Err(HookmatchError::Configuration(format!(
                "fee_reserve_bps {} exceeds {}",
                self.fee_reserve_bps,
                constants::BPS_DENOMINATOR
            )));
        }
        Ok(())
    }
}
