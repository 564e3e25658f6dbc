//! Transfer control
//!
//! Cancellation and pause intents per transfer, plus the limiter that caps
//! how many transfers stream at once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, warn};

use crate::backend::FsError;

/// Transfer control signals
#[derive(Debug)]
pub struct TransferControl {
    cancel_tx: watch::Sender<bool>,
    cancel_rx: watch::Receiver<bool>,
    /// Independent from cancellation
    pause_tx: watch::Sender<bool>,
    pause_rx: watch::Receiver<bool>,
}

impl TransferControl {
    pub fn new() -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (pause_tx, pause_rx) = watch::channel(false);
        Self {
            cancel_tx,
            cancel_rx,
            pause_tx,
            pause_rx,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    pub fn is_paused(&self) -> bool {
        *self.pause_rx.borrow()
    }

    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    pub fn pause(&self) {
        let _ = self.pause_tx.send(true);
    }

    pub fn resume(&self) {
        let _ = self.pause_tx.send(false);
    }

    /// Block while paused. Returns early on cancellation.
    pub async fn wait_while_paused(&self) {
        let mut pause_rx = self.pause_rx.clone();
        let mut cancel_rx = self.cancel_rx.clone();
        while *pause_rx.borrow_and_update() && !*cancel_rx.borrow_and_update() {
            tokio::select! {
                changed = pause_rx.changed() => if changed.is_err() { break },
                changed = cancel_rx.changed() => if changed.is_err() { break },
            }
        }
    }
}

impl Default for TransferControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Checkpoint for backends between chunks: waits out a pause, then reports
/// cancellation as an error.
pub async fn check_transfer_control(control: &TransferControl) -> Result<(), FsError> {
    control.wait_while_paused().await;
    if control.is_cancelled() {
        return Err(FsError::TransferCancelled);
    }
    Ok(())
}

/// RAII permit that decrements [`TransferManager::active_count`] on drop
pub struct TransferPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
    active_count: Arc<AtomicUsize>,
}

impl Drop for TransferPermit {
    fn drop(&mut self) {
        let result = self
            .active_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match result {
            Ok(prev) => debug!("TransferPermit dropped, active count: {}", prev - 1),
            Err(_) => warn!("TransferPermit dropped with active_count already 0"),
        }
    }
}

/// Unregisters a transfer from [`TransferManager`] on drop, on every exit path
pub struct TransferGuard {
    manager: Arc<TransferManager>,
    transfer_id: String,
}

impl TransferGuard {
    pub fn new(manager: Arc<TransferManager>, transfer_id: impl Into<String>) -> Self {
        Self {
            manager,
            transfer_id: transfer_id.into(),
        }
    }
}

impl Drop for TransferGuard {
    fn drop(&mut self) {
        self.manager.unregister(&self.transfer_id);
    }
}

/// Upper bound for the configurable limit
pub const MAX_POSSIBLE_CONCURRENT: usize = 10;

/// Default concurrent transfers
pub const DEFAULT_CONCURRENT_TRANSFERS: usize = 3;

/// Tracks controls of live transfers and limits concurrency
pub struct TransferManager {
    /// Sized for the maximum; the configured limit is enforced softly
    semaphore: Arc<Semaphore>,
    controls: RwLock<HashMap<String, Arc<TransferControl>>>,
    active_count: Arc<AtomicUsize>,
    max_concurrent: AtomicUsize,
}

impl TransferManager {
    pub fn new() -> Self {
        Self::with_max_concurrent(DEFAULT_CONCURRENT_TRANSFERS)
    }

    pub fn with_max_concurrent(max: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(MAX_POSSIBLE_CONCURRENT)),
            controls: RwLock::new(HashMap::new()),
            active_count: Arc::new(AtomicUsize::new(0)),
            max_concurrent: AtomicUsize::new(max.clamp(1, MAX_POSSIBLE_CONCURRENT)),
        }
    }

    pub fn set_max_concurrent(&self, max: usize) {
        let clamped = max.clamp(1, MAX_POSSIBLE_CONCURRENT);
        self.max_concurrent.store(clamped, Ordering::SeqCst);
        info!("Max concurrent transfers set to: {}", clamped);
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }

    /// Register a new transfer and get its control handle
    pub fn register(&self, transfer_id: &str) -> Arc<TransferControl> {
        let control = Arc::new(TransferControl::new());
        self.controls
            .write()
            .insert(transfer_id.to_string(), control.clone());
        debug!("Registered transfer: {}", transfer_id);
        control
    }

    pub fn get_control(&self, transfer_id: &str) -> Option<Arc<TransferControl>> {
        self.controls.read().get(transfer_id).cloned()
    }

    pub fn unregister(&self, transfer_id: &str) {
        self.controls.write().remove(transfer_id);
        debug!("Unregistered transfer: {}", transfer_id);
    }

    /// Wait for a streaming slot
    pub async fn acquire_permit(&self) -> Result<TransferPermit, FsError> {
        loop {
            let current = self.active_count.load(Ordering::Acquire);
            if current < self.max_concurrent() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| FsError::TransferError(format!("transfer limiter closed: {}", e)))?;
        let new_count = self.active_count.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            "Acquired transfer permit, active count: {}/{}",
            new_count,
            self.max_concurrent()
        );
        Ok(TransferPermit {
            _permit: permit,
            active_count: self.active_count.clone(),
        })
    }

    pub fn active_count(&self) -> usize {
        self.active_count.load(Ordering::Acquire)
    }

    /// Raise the cancel intent. Also releases a paused transfer.
    pub fn cancel(&self, transfer_id: &str) -> bool {
        self.signal(transfer_id, "cancel", TransferControl::cancel)
    }

    pub fn pause(&self, transfer_id: &str) -> bool {
        self.signal(transfer_id, "pause", TransferControl::pause)
    }

    pub fn resume(&self, transfer_id: &str) -> bool {
        self.signal(transfer_id, "resume", TransferControl::resume)
    }

    fn signal(&self, transfer_id: &str, action: &str, apply: fn(&TransferControl)) -> bool {
        match self.get_control(transfer_id) {
            Some(control) => {
                apply(control.as_ref());
                info!("Transfer {}: {}", transfer_id, action);
                true
            }
            None => {
                warn!("No live transfer {} to {}", transfer_id, action);
                false
            }
        }
    }
}

impl Default for TransferManager {
    fn default() -> Self {
        Self::new()
    }
}
