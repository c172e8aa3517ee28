//! Core domain logic for StreakHopper.
//! This crate is the single source of truth for hopper, streak and rollover
//! invariants; transport layers only call into `HopperService`.

pub mod clock;
pub mod config;
pub mod engine;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;
pub mod uploads;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, HopperConfig};
pub use engine::rollover::{advance_all_to_today, advance_to_today, RolloverOutcome, DAILY_DECAY};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::day_key::DayKey;
pub use model::normalize::{normalize_registry, normalize_task, NormalizeContext};
pub use model::registry::{Registry, RegistryDocument, STORE_VERSION};
pub use model::task::{
    SecureReason, Task, TaskId, HOPPER_THRESHOLD, MAX_TASK_NAME_CHARS, SECURE_EPSILON,
};
pub use service::hopper_service::{
    AddOutcome, HopperError, HopperResult, HopperService, RegistryView,
};
pub use service::ticker::{start_ticker, tick_once, SharedService, TickerHandle};
pub use store::{JsonFileStore, PersistQueue, QueueStats, SnapshotSink, StoreError};
pub use uploads::{is_managed_upload_ref, UploadDir, UploadStore, UPLOAD_URL_PREFIX};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
