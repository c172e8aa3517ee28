//! Domain model for daily hopper tracking.
//!
//! # Responsibility
//! - Define the task record, the registry and the day-key type.
//! - Gate untrusted persisted state through the normalizer.
//!
//! # Invariants
//! - Every task is identified by a stable, unique `TaskId`.
//! - Values built from storage always pass through `normalize`.

pub mod day_key;
pub mod normalize;
pub mod registry;
pub mod task;
