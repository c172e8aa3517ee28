//! Background rollover ticker.
//!
//! Re-runs the rollover pass periodically so day boundaries are applied
//! shortly after midnight even without inbound calls. Ticks and callers
//! share one `Mutex`, so two rollover passes never overlap.

use crate::service::hopper_service::HopperService;
use crossbeam_channel::{select, tick, Receiver, Sender};
use log::{debug, error, info};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Service handle shared between the transport layer and the ticker.
pub type SharedService = Arc<Mutex<HopperService>>;

/// Running ticker; stops and joins on `stop()` or drop.
pub struct TickerHandle {
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl TickerHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop_tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("event=ticker_stop module=service status=error error_code=worker_panicked");
            }
        }
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawns the ticker thread.
pub fn start_ticker(service: SharedService, interval: Duration) -> std::io::Result<TickerHandle> {
    let (stop_tx, stop_rx) = crossbeam_channel::bounded(0);
    let worker = std::thread::Builder::new()
        .name("hopper-ticker".to_owned())
        .spawn(move || run_ticker(service, interval, stop_rx))?;

    info!(
        "event=ticker_start module=service status=ok interval_ms={}",
        interval.as_millis()
    );
    Ok(TickerHandle {
        stop_tx: Some(stop_tx),
        worker: Some(worker),
    })
}

/// Runs one rollover pass; returns whether anything changed.
///
/// A poisoned lock skips the pass.
pub fn tick_once(service: &SharedService) -> bool {
    match service.lock() {
        Ok(mut guard) => guard.advance_all(),
        Err(_) => {
            error!("event=ticker_tick module=service status=error error_code=lock_poisoned");
            false
        }
    }
}

fn run_ticker(service: SharedService, interval: Duration, stop_rx: Receiver<()>) {
    let ticks = tick(interval);
    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(ticks) -> _ => {
                if tick_once(&service) {
                    debug!("event=ticker_tick module=service status=ok changed=true");
                }
            }
        }
    }
    info!("event=ticker_stop module=service status=ok");
}
