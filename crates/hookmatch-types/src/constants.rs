//! System-wide constants for the HookMatch engine.

/// Decimal places kept for prices (and the fixed-point scale used by the
/// record codec).
pub const PRICE_PRECISION: u32 = 8;

/// Decimal places kept for base amounts.
pub const QTY_PRECISION: u32 = 8;

/// Decimal places kept for quote values and fees.
pub const QUOTE_PRECISION: u32 = 8;

/// Basis-point denominator (1 bps = 1 / 10_000).
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Default cap on crosses a single market order may execute.
pub const DEFAULT_MAX_MARKET_MATCHES: usize = 64;

/// Default rolling window used for fee-tier volume, in days.
pub const DEFAULT_VOLUME_WINDOW_DAYS: u32 = 30;

/// Largest trader population a single book can intern (32-bit slots).
pub const MAX_TRADER_SLOTS: u64 = u32::MAX as u64;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "HookMatch";

/// Default fee reserve added on top of a buy order's quote escrow, in bps.
pub const DEFAULT_FEE_RESERVE_BPS: u32 = 100;
