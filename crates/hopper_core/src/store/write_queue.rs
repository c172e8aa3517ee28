//! Serialized snapshot write queue.
//!
//! # Responsibility
//! - Accept registry snapshots from any caller without blocking on I/O.
//! - Drain them strictly in FIFO order on one worker thread.
//!
//! # Invariants
//! - At most one write is in flight at any time.
//! - A failed write is logged and counted; later writes still run.
//! - Dropping the queue drains every pending write before returning.

use super::{SnapshotSink, StoreError, StoreResult};
use crate::model::registry::RegistryDocument;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{error, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

enum QueueMessage {
    Write(Box<RegistryDocument>),
    Flush(Sender<()>),
}

#[derive(Debug, Default)]
struct QueueCounters {
    enqueued: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time queue counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueued: u64,
    /// Writes that reached durable storage.
    pub completed: u64,
    pub failed: u64,
}

/// Single-consumer persistence queue.
pub struct PersistQueue {
    sender: Option<Sender<QueueMessage>>,
    worker: Option<JoinHandle<()>>,
    counters: Arc<QueueCounters>,
}

impl PersistQueue {
    /// Spawns the worker thread that owns `sink`.
    pub fn start(sink: impl SnapshotSink) -> StoreResult<Self> {
        let (sender, receiver) = unbounded();
        let counters = Arc::new(QueueCounters::default());
        let worker_counters = Arc::clone(&counters);
        let worker = std::thread::Builder::new()
            .name("hopper-persist".to_owned())
            .spawn(move || run_worker(sink, receiver, worker_counters))
            .map_err(StoreError::Worker)?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            counters,
        })
    }

    /// Queues a snapshot for writing after every previously queued one.
    pub fn enqueue(&self, document: RegistryDocument) {
        self.counters.enqueued.fetch_add(1, Ordering::SeqCst);
        let Some(sender) = &self.sender else {
            return;
        };
        if sender
            .send(QueueMessage::Write(Box::new(document)))
            .is_err()
        {
            self.counters.failed.fetch_add(1, Ordering::SeqCst);
            error!("event=persist_enqueue module=store status=error error_code=worker_gone");
        }
    }

    /// Blocks until every write queued before this call has finished.
    pub fn flush(&self) {
        let Some(sender) = &self.sender else {
            return;
        };
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        if sender.send(QueueMessage::Flush(ack_tx)).is_err() || ack_rx.recv().is_err() {
            warn!("event=persist_flush module=store status=error error_code=worker_gone");
        }
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            enqueued: self.counters.enqueued.load(Ordering::SeqCst),
            completed: self.counters.completed.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
        }
    }
}

impl Drop for PersistQueue {
    fn drop(&mut self) {
        // Closing the channel lets the worker finish the backlog and exit.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("event=persist_shutdown module=store status=error error_code=worker_panicked");
            }
        }
    }
}

fn run_worker(
    mut sink: impl SnapshotSink,
    receiver: Receiver<QueueMessage>,
    counters: Arc<QueueCounters>,
) {
    for message in receiver {
        match message {
            QueueMessage::Write(document) => match sink.write_snapshot(&document) {
                Ok(()) => {
                    counters.completed.fetch_add(1, Ordering::SeqCst);
                }
                Err(err) => {
                    counters.failed.fetch_add(1, Ordering::SeqCst);
                    error!(
                        "event=persist_write module=store status=error error_code=write_failed error={}",
                        err
                    );
                }
            },
            QueueMessage::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    info!(
        "event=persist_shutdown module=store status=ok completed={} failed={}",
        counters.completed.load(Ordering::SeqCst),
        counters.failed.load(Ordering::SeqCst)
    );
}
