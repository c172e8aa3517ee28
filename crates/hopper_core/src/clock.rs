//! Wall-clock source for "now" and "today".
//!
//! Core logic never reads the system clock directly; it asks a `Clock`, so
//! day boundaries can be driven deterministically in tests.

use crate::model::day_key::DayKey;
use chrono::Utc;
use std::sync::{Mutex, PoisonError};

/// Source of the current instant and local calendar day.
pub trait Clock: Send + Sync {
    /// Unix epoch milliseconds.
    fn now_ms(&self) -> i64;
    /// Current local calendar day.
    fn today(&self) -> DayKey;
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn today(&self) -> DayKey {
        DayKey::today()
    }
}

/// Manually driven clock.
#[derive(Debug)]
pub struct FixedClock {
    state: Mutex<(i64, DayKey)>,
}

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

impl FixedClock {
    pub fn new(today: DayKey, now_ms: i64) -> Self {
        Self {
            state: Mutex::new((now_ms, today)),
        }
    }

    /// Clock positioned at UTC midday of `today`.
    pub fn at(today: DayKey) -> Self {
        Self::new(today, today.day_number() * MS_PER_DAY + MS_PER_DAY / 2)
    }

    pub fn set_today(&self, today: DayKey) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let delta = DayKey::diff_days(state.1, today);
        state.0 += delta * MS_PER_DAY;
        state.1 = today;
    }

    /// Moves both the day and the instant; negative values move backward.
    pub fn advance_days(&self, days: i64) {
        let today = self.today();
        self.set_today(today.add_days(days));
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).0
    }

    fn today(&self) -> DayKey {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).1
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, FixedClock, MS_PER_DAY};
    use crate::model::day_key::DayKey;

    #[test]
    fn fixed_clock_moves_day_and_instant_together() {
        let start = DayKey::parse("2025-03-01").expect("fixture day key should parse");
        let clock = FixedClock::at(start);
        let before = clock.now_ms();
        assert_eq!(before, start.day_number() * MS_PER_DAY + MS_PER_DAY / 2);

        clock.advance_days(2);
        assert_eq!(clock.today().to_string(), "2025-03-03");
        assert_eq!(clock.now_ms() - before, 2 * 24 * 60 * 60 * 1000);

        clock.advance_days(-3);
        assert_eq!(clock.today().to_string(), "2025-02-28");
    }
}
