//! Rolling per-trader volume.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use hookmatch_types::UserId;
use rust_decimal::Decimal;

/// Time-stamped volume entries over a trailing window.
///
/// An entry recorded at `t` counts toward the volume at `now` while
/// `now - window < t`.
#[derive(Debug, Clone)]
pub struct VolumeTracker {
    window: Duration,
    entries: HashMap<UserId, VecDeque<(DateTime<Utc>, Decimal)>>,
}

impl VolumeTracker {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_window_days(days: u32) -> Self {
        Self::new(Duration::days(i64::from(days)))
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Add `value` to `trader`'s volume at time `at`.
    pub fn record(&mut self, trader: UserId, value: Decimal, at: DateTime<Utc>) {
        if value <= Decimal::ZERO {
            return;
        }
        let series = self.entries.entry(trader).or_default();
        // Keep entries time-ordered even if fills arrive out of order.
        let pos = series.partition_point(|(t, _)| *t <= at);
        series.insert(pos, (at, value));
    }

    /// `trader`'s volume inside the window ending at `now`.
    #[must_use]
    pub fn volume_at(&self, trader: &UserId, now: DateTime<Utc>) -> Decimal {
        let cutoff = now - self.window;
        self.entries.get(trader).map_or(Decimal::ZERO, |series| {
            series
                .iter()
                .rev()
                .take_while(|(t, _)| *t > cutoff)
                .filter(|(t, _)| *t <= now)
                .map(|(_, v)| *v)
                .sum()
        })
    }

    /// Drop every entry that has left the window ending at `now`.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        self.entries.retain(|_, series| {
            while series.front().is_some_and(|(t, _)| *t <= cutoff) {
                series.pop_front();
            }
            !series.is_empty()
        });
    }

    /// Number of traders with live entries.
    #[must_use]
    pub fn tracked_traders(&self) -> usize {
        self.entries.len()
    }
}

impl Default for VolumeTracker {
    fn default() -> Self {
        Self::with_window_days(hookmatch_types::constants::DEFAULT_VOLUME_WINDOW_DAYS)
    }
}
