//! Daily rollover state machine.
//!
//! # Responsibility
//! - Advance each task from its recorded `day_key` to the real current day,
//!   applying streak, decay and auto-secure rules once per elapsed day.
//!
//! # Invariants
//! - Never iterates backward: a `day_key` ahead of today is clamped.
//! - Day N+1 is computed from day N's post-rollover state.
//! - Idempotent once caught up: a second call with the same `today` is a no-op.
//! - Never fails and never drives the hopper below 0.

use crate::model::day_key::DayKey;
use crate::model::registry::Registry;
use crate::model::task::{clamp_hopper, SecureReason, Task};
use log::info;

/// Hopper amount removed each time a day closes.
///
/// Flat subtraction of one full threshold, not a percentage decay.
pub const DAILY_DECAY: f64 = 1.0;

/// What one `advance_to_today` call did to a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RolloverOutcome {
    /// Midnight boundaries crossed.
    pub days_advanced: i64,
    /// Days secured by leftover hopper during this pass.
    pub auto_secured: u32,
    /// Whether a non-zero streak was reset.
    pub streak_broken: bool,
    /// Whether `day_key` was ahead of today and got clamped.
    pub clamped_backward: bool,
}

impl RolloverOutcome {
    pub fn changed(&self) -> bool {
        self.days_advanced > 0 || self.clamped_backward
    }
}

/// Aligns one task with `today`.
pub fn advance_to_today(task: &mut Task, today: DayKey, now_ms: i64) -> RolloverOutcome {
    let mut outcome = RolloverOutcome::default();

    if task.day_key > today {
        task.day_key = today;
        task.secured_today = false;
        outcome.clamped_backward = true;
        return outcome;
    }

    let elapsed = DayKey::diff_days(task.day_key, today);
    if elapsed <= 0 {
        return outcome;
    }

    for _ in 0..elapsed {
        if is_drained(task) {
            // Every remaining iteration would only move `day_key`.
            task.day_key = today;
            break;
        }

        if !task.secured_today {
            outcome.streak_broken |= task.streak > 0;
            task.streak = 0;
        }
        task.hopper = clamp_hopper(task.hopper - DAILY_DECAY);
        task.day_key = task.day_key.add_days(1);
        task.secured_today = false;

        if task.try_secure(SecureReason::Rollover, now_ms) {
            outcome.auto_secured += 1;
        }
    }

    outcome.days_advanced = elapsed;
    outcome
}

/// Aligns every task in the registry with `today`.
///
/// Bumps `updated_at` on changed tasks and on the registry. Returns whether
/// anything changed, i.e. whether a persist is due.
pub fn advance_all_to_today(registry: &mut Registry, today: DayKey, now_ms: i64) -> bool {
    let mut changed = false;

    for task in &mut registry.tasks {
        let outcome = advance_to_today(task, today, now_ms);
        if !outcome.changed() {
            continue;
        }

        task.touch(now_ms);
        changed = true;
        info!(
            "event=rollover module=engine status=ok task_id={} days={} auto_secured={} streak_broken={} clamped_backward={} streak={} hopper={}",
            task.id,
            outcome.days_advanced,
            outcome.auto_secured,
            outcome.streak_broken,
            outcome.clamped_backward,
            task.streak,
            task.hopper
        );
    }

    if changed {
        registry.touch(now_ms);
    }
    changed
}

fn is_drained(task: &Task) -> bool {
    task.hopper <= 0.0 && task.streak == 0 && !task.secured_today
}

#[cfg(test)]
mod tests {
    use super::{advance_all_to_today, advance_to_today};
    use crate::model::day_key::DayKey;
    use crate::model::registry::Registry;
    use crate::model::task::{SecureReason, Task};

    const NOW: i64 = 1_750_000_000_000;

    fn day(value: &str) -> DayKey {
        DayKey::parse(value).expect("fixture day key should parse")
    }

    fn task_on(day_key: &str, hopper: f64, streak: u32, secured: bool) -> Task {
        let mut task = Task::new("walk", None, day(day_key), 1);
        task.hopper = hopper;
        task.streak = streak;
        task.secured_today = secured;
        task
    }

    #[test]
    fn same_day_is_a_no_op() {
        let mut task = task_on("2025-05-01", 0.4, 3, false);
        let before = task.clone();

        let outcome = advance_to_today(&mut task, day("2025-05-01"), NOW);
        assert!(!outcome.changed());
        assert_eq!(task, before);
    }

    #[test]
    fn second_call_after_catch_up_is_idempotent() {
        let mut task = task_on("2025-05-01", 2.7, 1, true);
        advance_to_today(&mut task, day("2025-05-04"), NOW);
        let caught_up = task.clone();

        let outcome = advance_to_today(&mut task, day("2025-05-04"), NOW + 1);
        assert!(!outcome.changed());
        assert_eq!(task, caught_up);
    }

    #[test]
    fn unsecured_day_breaks_streak() {
        let mut task = task_on("2025-05-01", 0.5, 6, false);

        let outcome = advance_to_today(&mut task, day("2025-05-02"), NOW);
        assert!(outcome.streak_broken);
        assert_eq!(task.streak, 0);
        assert_eq!(task.hopper, 0.0);
        assert_eq!(task.day_key, day("2025-05-02"));
        assert!(!task.secured_today);
    }

    #[test]
    fn secured_day_keeps_streak_and_clears_flag() {
        let mut task = task_on("2025-05-01", 1.0, 6, true);

        let outcome = advance_to_today(&mut task, day("2025-05-02"), NOW);
        assert!(!outcome.streak_broken);
        assert_eq!(task.streak, 6);
        assert_eq!(task.hopper, 0.0);
        assert!(!task.secured_today);
    }

    #[test]
    fn surplus_auto_secures_consecutive_days() {
        let mut task = task_on("2025-05-01", 3.5, 0, false);

        let outcome = advance_to_today(&mut task, day("2025-05-04"), NOW);
        assert_eq!(outcome.days_advanced, 3);
        assert_eq!(outcome.auto_secured, 2);
        assert_eq!(task.hopper, 0.5);
        assert_eq!(task.streak, 2);
        assert!(!task.secured_today);
        assert_eq!(task.day_key, day("2025-05-04"));
    }

    #[test]
    fn unsecured_close_resets_streak_before_auto_secures() {
        let mut task = task_on("2025-05-01", 3.5, 8, false);

        let outcome = advance_to_today(&mut task, day("2025-05-04"), NOW);
        assert!(outcome.streak_broken);
        assert_eq!(task.streak, 2);
    }

    #[test]
    fn surplus_on_secured_day_extends_existing_streak() {
        let mut task = task_on("2025-05-01", 3.5, 5, true);

        let outcome = advance_to_today(&mut task, day("2025-05-04"), NOW);
        assert_eq!(outcome.auto_secured, 2);
        assert_eq!(task.streak, 7);
        assert_eq!(task.hopper, 0.5);
        assert!(!outcome.streak_broken);
    }

    #[test]
    fn auto_secure_on_final_day_leaves_today_secured() {
        let mut task = task_on("2025-05-01", 2.0, 0, false);

        advance_to_today(&mut task, day("2025-05-02"), NOW);
        assert_eq!(task.hopper, 1.0);
        assert!(task.secured_today);
        assert_eq!(task.streak, 1);
        assert_eq!(task.last_secured_reason, Some(SecureReason::Rollover));
        assert_eq!(task.last_secured_at, Some(NOW));
    }

    #[test]
    fn hopper_never_goes_negative_over_long_gaps() {
        for hopper in [0.0, 0.3, 1.0, 4.25, 17.0] {
            let mut task = task_on("2024-01-01", hopper, 9, true);
            advance_to_today(&mut task, day("2025-01-01"), NOW);
            assert!(task.hopper >= 0.0);
            assert_eq!(task.streak, 0);
            assert_eq!(task.day_key, day("2025-01-01"));
            assert!(!task.secured_today);
        }
    }

    #[test]
    fn drained_task_fast_forwards_to_today() {
        let mut task = task_on("1990-01-01", 0.0, 0, false);

        let outcome = advance_to_today(&mut task, day("2025-01-01"), NOW);
        assert_eq!(task.day_key, day("2025-01-01"));
        assert_eq!(
            outcome.days_advanced,
            DayKey::diff_days(day("1990-01-01"), day("2025-01-01"))
        );
        assert_eq!(task.hopper, 0.0);
        assert_eq!(task.streak, 0);
    }

    #[test]
    fn future_day_key_is_clamped_without_looping() {
        let mut task = task_on("2025-05-10", 1.5, 4, true);

        let outcome = advance_to_today(&mut task, day("2025-05-08"), NOW);
        assert!(outcome.clamped_backward);
        assert_eq!(outcome.days_advanced, 0);
        assert_eq!(task.day_key, day("2025-05-08"));
        assert!(!task.secured_today);
        assert_eq!(task.streak, 4);
        assert_eq!(task.hopper, 1.5);
    }

    #[test]
    fn advance_all_reports_changes_and_touches_changed_tasks_only() {
        let mut registry = Registry::empty(1);
        registry.tasks.push(task_on("2025-05-01", 0.0, 0, false));
        registry.tasks.push(task_on("2025-05-03", 0.5, 1, false));

        assert!(advance_all_to_today(&mut registry, day("2025-05-03"), NOW));
        assert_eq!(registry.updated_at, NOW);
        assert_eq!(registry.tasks[0].updated_at, NOW);
        assert_eq!(registry.tasks[1].updated_at, 1);

        assert!(!advance_all_to_today(&mut registry, day("2025-05-03"), NOW + 5));
        assert_eq!(registry.updated_at, NOW);
    }
}
