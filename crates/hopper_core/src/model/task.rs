//! Task domain model.
//!
//! # Responsibility
//! - Define the persisted task record (hopper level, streak, day alignment).
//! - Own the securing rule that turns a full hopper into a streak increment.
//!
//! # Invariants
//! - `hopper >= 0` and is rounded to `HOPPER_DECIMALS` after every mutation.
//! - `streak` increments at most once per `day_key` (guarded by `secured_today`).
//! - `id` is stable and never reused for another task.

use crate::model::day_key::DayKey;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque task identifier.
pub type TaskId = String;

/// Hopper level that counts as one completed day.
pub const HOPPER_THRESHOLD: f64 = 1.0;
/// Tolerance absorbing floating-point drift from repeated small additions.
///
/// Must stay far below the smallest meaningful contribution.
pub const SECURE_EPSILON: f64 = 1e-9;
/// Decimal places kept on the hopper after every mutation.
pub const HOPPER_DECIMALS: i32 = 6;
/// Maximum task name length in characters.
pub const MAX_TASK_NAME_CHARS: usize = 80;
/// Name substituted for missing or blank persisted names.
pub const DEFAULT_TASK_NAME: &str = "Untitled task";

/// Why a day was secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecureReason {
    /// A user contribution crossed the threshold.
    Add,
    /// The hopper was still over threshold when a new day began.
    Rollover,
}

impl SecureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Rollover => "rollover",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "add" => Some(Self::Add),
            "rollover" => Some(Self::Rollover),
            _ => None,
        }
    }
}

/// One tracked habit with its daily hopper and streak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    /// Managed upload reference (`/uploads/<file>`); the file itself is not owned.
    pub thumbnail_url: Option<String>,
    /// 1.0 is 100% of the daily goal.
    pub hopper: f64,
    pub streak: u32,
    /// Last day this task's state was aligned to.
    pub day_key: DayKey,
    pub secured_today: bool,
    /// Unix epoch milliseconds of the most recent securing.
    pub last_secured_at: Option<i64>,
    pub last_secured_reason: Option<SecureReason>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds, bumped on every mutation.
    pub updated_at: i64,
}

impl Task {
    /// Creates an empty task aligned to `today` with a generated ID.
    pub fn new(
        name: impl Into<String>,
        thumbnail_url: Option<String>,
        today: DayKey,
        now_ms: i64,
    ) -> Self {
        Self {
            id: new_task_id(),
            name: name.into(),
            thumbnail_url,
            hopper: 0.0,
            streak: 0,
            day_key: today,
            secured_today: false,
            last_secured_at: None,
            last_secured_reason: None,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    /// Whether the hopper is at or above threshold, within `SECURE_EPSILON`.
    pub fn meets_threshold(&self) -> bool {
        self.hopper >= HOPPER_THRESHOLD - SECURE_EPSILON
    }

    /// Secures the current day if the hopper is full.
    ///
    /// Returns `true` only when this call performed the securing. A day that
    /// is already secured is left untouched.
    pub fn try_secure(&mut self, reason: SecureReason, now_ms: i64) -> bool {
        if self.secured_today || !self.meets_threshold() {
            return false;
        }

        self.secured_today = true;
        self.streak = self.streak.saturating_add(1);
        self.last_secured_at = Some(now_ms);
        self.last_secured_reason = Some(reason);
        true
    }

    /// Adds `amount` (possibly negative) to the hopper, keeping it >= 0.
    pub fn add_to_hopper(&mut self, amount: f64) {
        self.hopper = clamp_hopper(self.hopper + amount);
    }

    pub fn touch(&mut self, now_ms: i64) {
        self.updated_at = now_ms;
    }
}

/// Generates a fresh task ID.
pub fn new_task_id() -> TaskId {
    Uuid::new_v4().to_string()
}

/// Rounds to `HOPPER_DECIMALS`; non-finite input becomes 0.
pub fn round_hopper(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let scaled = value * 10_f64.powi(HOPPER_DECIMALS);
    if !scaled.is_finite() {
        // Magnitudes this large carry no fractional digits to round.
        return value;
    }
    scaled.round() / 10_f64.powi(HOPPER_DECIMALS)
}

/// Rounds and floors at 0, yielding a value valid for `Task::hopper`.
pub fn clamp_hopper(value: f64) -> f64 {
    round_hopper(value).max(0.0)
}
