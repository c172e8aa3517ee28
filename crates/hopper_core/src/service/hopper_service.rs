//! Hopper use-case service.
//!
//! # Responsibility
//! - Own the single live `Registry` and expose every read/mutation entry point.
//! - Run the rollover pass before any read or mutation is reported.
//! - Queue a snapshot after every state change.
//!
//! # Invariants
//! - Input validation happens before any mutation; rejected calls leave the
//!   registry untouched.
//! - Upload references are validated before being stored; replaced files are
//!   deleted best-effort.
//! - Persistence failures never roll back an in-memory mutation.

use crate::clock::{Clock, SystemClock};
use crate::config::{HopperConfig, DEFAULT_MAX_ADD_AMOUNT};
use crate::engine::rollover::advance_all_to_today;
use crate::model::day_key::DayKey;
use crate::model::normalize::NormalizeContext;
use crate::model::registry::Registry;
use crate::model::task::{SecureReason, Task, TaskId, MAX_TASK_NAME_CHARS};
use crate::store::{JsonFileStore, PersistQueue, QueueStats, StoreResult};
use crate::uploads::{UploadDir, UploadStore};
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type HopperResult<T> = Result<T, HopperError>;

/// Rejected service calls. None of them mutates state.
#[derive(Debug, Clone, PartialEq)]
pub enum HopperError {
    /// Task name is blank after trimming.
    NameRequired,
    NameTooLong { max: usize },
    /// Amount is NaN or infinite.
    InvalidAmount,
    AmountTooLarge { amount: f64, max: f64 },
    /// Reference is outside the managed upload namespace.
    InvalidUploadRef(String),
    TaskNotFound(TaskId),
}

impl Display for HopperError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NameRequired => write!(f, "task name is required"),
            Self::NameTooLong { max } => write!(f, "task name exceeds {max} characters"),
            Self::InvalidAmount => write!(f, "amount must be a finite number"),
            Self::AmountTooLarge { amount, max } => {
                write!(f, "amount {amount} exceeds maximum {max}")
            }
            Self::InvalidUploadRef(reference) => {
                write!(f, "not a managed upload reference: `{reference}`")
            }
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
        }
    }
}

impl Error for HopperError {}

impl HopperError {
    /// Whether the error is a caller-side validation failure (vs. missing task).
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::TaskNotFound(_))
    }
}

/// Result of one hopper contribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddOutcome {
    pub task: Task,
    /// Whether this call secured the day.
    pub secured: bool,
}

/// Read-only projection of the registry handed to transport layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryView {
    pub today: DayKey,
    pub updated_at: i64,
    pub background_url: Option<String>,
    pub tasks: Vec<Task>,
}

/// Owner of the live registry.
pub struct HopperService {
    registry: Registry,
    queue: PersistQueue,
    uploads: Box<dyn UploadStore>,
    clock: Arc<dyn Clock>,
    max_add_amount: f64,
}

impl HopperService {
    /// Assembles a service around an already loaded registry.
    pub fn new(registry: Registry, queue: PersistQueue, uploads: Box<dyn UploadStore>) -> Self {
        Self {
            registry,
            queue,
            uploads,
            clock: Arc::new(SystemClock),
            max_add_amount: DEFAULT_MAX_ADD_AMOUNT,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_max_add_amount(mut self, max_add_amount: f64) -> Self {
        self.max_add_amount = max_add_amount;
        self
    }

    /// Loads state from `config.data_file` and starts the write queue.
    pub fn open(config: &HopperConfig) -> StoreResult<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    pub fn open_with_clock(config: &HopperConfig, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        let store = JsonFileStore::new(&config.data_file);
        let ctx = NormalizeContext {
            today: clock.today(),
            now_ms: clock.now_ms(),
        };
        let registry = store.load(&ctx);
        let queue = PersistQueue::start(store)?;

        let mut service = Self::new(registry, queue, Box::new(UploadDir::new(&config.upload_dir)))
            .with_clock(clock)
            .with_max_add_amount(config.max_add_amount);
        service.advance_all();
        Ok(service)
    }

    /// Aligns every task with today; queues a snapshot when anything changed.
    pub fn advance_all(&mut self) -> bool {
        let changed =
            advance_all_to_today(&mut self.registry, self.clock.today(), self.clock.now_ms());
        if changed {
            self.persist();
        }
        changed
    }

    pub fn today(&self) -> DayKey {
        self.clock.today()
    }

    /// Registry as it is right now, without running rollover.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Current state, after rollover.
    pub fn state(&mut self) -> RegistryView {
        self.advance_all();
        RegistryView {
            today: self.clock.today(),
            updated_at: self.registry.updated_at,
            background_url: self.registry.background_url.clone(),
            tasks: self.registry.tasks.clone(),
        }
    }

    /// One task, after rollover.
    pub fn task(&mut self, id: &str) -> HopperResult<Task> {
        self.advance_all();
        self.registry
            .find(id)
            .cloned()
            .ok_or_else(|| HopperError::TaskNotFound(id.to_string()))
    }

    pub fn create_task(&mut self, name: &str, thumbnail: Option<&str>) -> HopperResult<Task> {
        let name = validate_name(name)?;
        let thumbnail = thumbnail
            .map(|reference| self.validate_upload_ref(reference))
            .transpose()?;

        self.advance_all();
        let now_ms = self.clock.now_ms();
        let task = Task::new(name, thumbnail, self.clock.today(), now_ms);
        self.registry.tasks.push(task.clone());
        self.commit(now_ms);

        info!(
            "event=task_create module=service status=ok task_id={} tasks={}",
            task.id,
            self.registry.tasks.len()
        );
        Ok(task)
    }

    /// Adds `amount` to the task's hopper and secures the day if it is now full.
    ///
    /// Non-positive amounts are accepted and act as withdrawals.
    pub fn add_to_hopper(&mut self, id: &str, amount: f64) -> HopperResult<AddOutcome> {
        if !amount.is_finite() {
            return Err(HopperError::InvalidAmount);
        }
        if amount > self.max_add_amount {
            return Err(HopperError::AmountTooLarge {
                amount,
                max: self.max_add_amount,
            });
        }

        self.advance_all();
        let now_ms = self.clock.now_ms();
        let task = self
            .registry
            .find_mut(id)
            .ok_or_else(|| HopperError::TaskNotFound(id.to_string()))?;
        task.add_to_hopper(amount);
        task.touch(now_ms);
        let secured = task.try_secure(SecureReason::Add, now_ms);
        let task = task.clone();
        self.commit(now_ms);

        info!(
            "event=hopper_add module=service status=ok task_id={} amount={} hopper={} secured={} streak={}",
            task.id, amount, task.hopper, secured, task.streak
        );
        Ok(AddOutcome { task, secured })
    }

    pub fn rename_task(&mut self, id: &str, name: &str) -> HopperResult<Task> {
        let name = validate_name(name)?;

        self.advance_all();
        let now_ms = self.clock.now_ms();
        let task = self
            .registry
            .find_mut(id)
            .ok_or_else(|| HopperError::TaskNotFound(id.to_string()))?;
        task.name = name;
        task.touch(now_ms);
        let task = task.clone();
        self.commit(now_ms);

        info!("event=task_rename module=service status=ok task_id={}", task.id);
        Ok(task)
    }

    /// Replaces (or clears) a task thumbnail; the previous file is deleted.
    pub fn set_thumbnail(&mut self, id: &str, thumbnail: Option<&str>) -> HopperResult<Task> {
        let thumbnail = thumbnail
            .map(|reference| self.validate_upload_ref(reference))
            .transpose()?;

        self.advance_all();
        let now_ms = self.clock.now_ms();
        let task = self
            .registry
            .find_mut(id)
            .ok_or_else(|| HopperError::TaskNotFound(id.to_string()))?;
        let previous = std::mem::replace(&mut task.thumbnail_url, thumbnail);
        task.touch(now_ms);
        let task = task.clone();
        self.commit(now_ms);

        self.discard_replaced(previous, task.thumbnail_url.as_deref());
        info!("event=task_thumbnail module=service status=ok task_id={}", task.id);
        Ok(task)
    }

    /// Removes a task; its thumbnail file is deleted best-effort.
    pub fn delete_task(&mut self, id: &str) -> HopperResult<()> {
        self.advance_all();
        let removed = self
            .registry
            .remove(id)
            .ok_or_else(|| HopperError::TaskNotFound(id.to_string()))?;
        self.commit(self.clock.now_ms());

        if let Some(reference) = removed.thumbnail_url.as_deref() {
            self.uploads.remove(reference);
        }
        info!(
            "event=task_delete module=service status=ok task_id={} tasks={}",
            removed.id,
            self.registry.tasks.len()
        );
        Ok(())
    }

    pub fn set_background(&mut self, reference: &str) -> HopperResult<()> {
        let reference = self.validate_upload_ref(reference)?;

        self.advance_all();
        let previous = self.registry.background_url.replace(reference);
        self.commit(self.clock.now_ms());

        let current = self.registry.background_url.clone();
        self.discard_replaced(previous, current.as_deref());
        info!("event=background_set module=service status=ok");
        Ok(())
    }

    pub fn clear_background(&mut self) {
        self.advance_all();
        let previous = self.registry.background_url.take();
        self.commit(self.clock.now_ms());

        self.discard_replaced(previous, None);
        info!("event=background_clear module=service status=ok");
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Blocks until every queued snapshot has been written.
    pub fn flush(&self) {
        self.queue.flush();
    }

    /// Queues a final snapshot and waits for the queue to drain.
    pub fn shutdown(&mut self) {
        self.persist();
        self.queue.flush();
        info!(
            "event=service_shutdown module=service status=ok tasks={}",
            self.registry.tasks.len()
        );
    }

    fn commit(&mut self, now_ms: i64) {
        self.registry.touch(now_ms);
        self.persist();
    }

    fn persist(&self) {
        self.queue.enqueue(self.registry.to_document());
    }

    fn validate_upload_ref(&self, reference: &str) -> HopperResult<String> {
        self.uploads
            .resolve(reference)
            .map(|_| reference.to_string())
            .ok_or_else(|| HopperError::InvalidUploadRef(reference.to_string()))
    }

    fn discard_replaced(&self, previous: Option<String>, current: Option<&str>) {
        if let Some(previous) = previous {
            if current != Some(previous.as_str()) {
                self.uploads.remove(&previous);
            }
        }
    }
}

fn validate_name(raw: &str) -> HopperResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(HopperError::NameRequired);
    }
    if name.chars().count() > MAX_TASK_NAME_CHARS {
        return Err(HopperError::NameTooLong {
            max: MAX_TASK_NAME_CHARS,
        });
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::validate_name;
    use super::HopperError;
    use crate::model::task::MAX_TASK_NAME_CHARS;

    #[test]
    fn validate_name_trims_and_bounds() {
        assert_eq!(validate_name("  Read  ").expect("padded name should be accepted"), "Read");
        assert_eq!(validate_name(" \t ").unwrap_err(), HopperError::NameRequired);
        assert_eq!(
            validate_name(&"x".repeat(MAX_TASK_NAME_CHARS + 1)).unwrap_err(),
            HopperError::NameTooLong {
                max: MAX_TASK_NAME_CHARS
            }
        );
        assert!(validate_name(&"é".repeat(MAX_TASK_NAME_CHARS)).is_ok());
    }
}
