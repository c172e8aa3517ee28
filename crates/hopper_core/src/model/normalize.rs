//! Normalization of untrusted persisted state.
//!
//! # Responsibility
//! - Coerce arbitrary JSON (possibly corrupted or partial) into valid
//!   `Task` / `Registry` values.
//!
//! # Invariants
//! - Never panics and never fails; every field has a safe default.
//! - Each field is judged independently; one bad field never discards a task.
//! - Output satisfies every `Task` invariant (hopper >= 0 and rounded, valid
//!   day key, managed thumbnail, non-empty name, unique IDs).

use crate::model::day_key::DayKey;
use crate::model::registry::{Registry, STORE_VERSION};
use crate::model::task::{
    clamp_hopper, new_task_id, SecureReason, Task, DEFAULT_TASK_NAME, MAX_TASK_NAME_CHARS,
};
use crate::uploads::is_managed_upload_ref;
use log::warn;
use serde_json::Value;
use std::collections::HashSet;

const MAX_TASK_ID_CHARS: usize = 128;

/// Values substituted for missing fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeContext {
    pub today: DayKey,
    pub now_ms: i64,
}

/// Produces a valid task from any JSON value.
///
/// A missing or malformed `dayKey` is snapped to today with `securedToday`
/// cleared and `updatedAt` bumped.
pub fn normalize_task(raw: &Value, ctx: &NormalizeContext) -> Task {
    let day_key = string_field(raw, "dayKey").and_then(DayKey::parse);
    let day_key_repaired = day_key.is_none();

    Task {
        id: string_field(raw, "id")
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.chars().count() <= MAX_TASK_ID_CHARS)
            .map(str::to_string)
            .unwrap_or_else(new_task_id),
        name: string_field(raw, "name")
            .map(normalize_name)
            .unwrap_or_else(|| DEFAULT_TASK_NAME.to_string()),
        thumbnail_url: managed_ref_field(raw, "thumbnailUrl"),
        hopper: field(raw, "hopper")
            .and_then(Value::as_f64)
            .map(clamp_hopper)
            .unwrap_or(0.0),
        streak: field(raw, "streak").and_then(as_streak).unwrap_or(0),
        day_key: day_key.unwrap_or(ctx.today),
        secured_today: !day_key_repaired
            && field(raw, "securedToday")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        last_secured_at: field(raw, "lastSecuredAt").and_then(as_timestamp),
        last_secured_reason: string_field(raw, "lastSecuredReason").and_then(SecureReason::parse),
        created_at: field(raw, "createdAt")
            .and_then(as_timestamp)
            .unwrap_or(ctx.now_ms),
        updated_at: field(raw, "updatedAt")
            .and_then(as_timestamp)
            .filter(|_| !day_key_repaired)
            .unwrap_or(ctx.now_ms),
    }
}

/// Produces a valid registry from any JSON value.
///
/// Tasks that collide on ID keep the first occurrence's ID; later ones get a
/// fresh one.
pub fn normalize_registry(raw: &Value, ctx: &NormalizeContext) -> Registry {
    if let Some(version) = field(raw, "version").and_then(Value::as_u64) {
        if version > u64::from(STORE_VERSION) {
            warn!(
                "event=registry_normalize module=model status=warn store_version={} supported_version={}",
                version, STORE_VERSION
            );
        }
    }

    let mut seen = HashSet::new();
    let tasks: Vec<Task> = field(raw, "tasks")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    let mut task = normalize_task(item, ctx);
                    while !seen.insert(task.id.clone()) {
                        task.id = new_task_id();
                    }
                    task
                })
                .collect()
        })
        .unwrap_or_default();

    Registry {
        created_at: field(raw, "createdAt")
            .and_then(as_timestamp)
            .unwrap_or(ctx.now_ms),
        updated_at: field(raw, "updatedAt")
            .and_then(as_timestamp)
            .unwrap_or(ctx.now_ms),
        background_url: managed_ref_field(raw, "backgroundUrl"),
        tasks,
    }
}

/// Trims and truncates a user-provided name; blank input yields the placeholder.
pub fn normalize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DEFAULT_TASK_NAME.to_string();
    }
    trimmed
        .chars()
        .take(MAX_TASK_NAME_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

fn field<'a>(raw: &'a Value, key: &str) -> Option<&'a Value> {
    raw.as_object().and_then(|object| object.get(key))
}

fn string_field<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    field(raw, key).and_then(Value::as_str)
}

fn managed_ref_field(raw: &Value, key: &str) -> Option<String> {
    string_field(raw, key)
        .filter(|reference| is_managed_upload_ref(reference))
        .map(str::to_string)
}

fn as_streak(value: &Value) -> Option<u32> {
    if let Some(int) = value.as_u64() {
        return Some(u32::try_from(int).unwrap_or(u32::MAX));
    }
    // JSON writers may emit integral floats such as `3.0`.
    let float = value.as_f64()?;
    if float.is_finite() && float >= 0.0 && float.fract() == 0.0 {
        return Some(if float >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            float as u32
        });
    }
    None
}

fn as_timestamp(value: &Value) -> Option<i64> {
    if let Some(int) = value.as_i64() {
        return Some(int);
    }
    value
        .as_f64()
        .filter(|float| float.is_finite())
        .map(|float| float as i64)
}
