// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! This module implements the health manager.
//! See `sidecar-health-exports/controller_traits.rs` for functional details.

use sidecar_health_exports::HealthManager;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::watch;
use tracing::{info, warn};

/// Implementation of the health manager
/// Allows stopping the health worker
pub struct HealthManagerImpl {
    /// stop signal sender and worker thread join handle
    pub(crate) worker: Option<(watch::Sender<bool>, JoinHandle<()>)>,

    /// passes completed by the worker
    pub(crate) completed: Arc<AtomicU64>,
}

impl HealthManager for HealthManagerImpl {
    /// stops the worker once its in-flight pass is done
    fn stop(&mut self) {
        info!("stopping health worker...");
        if let Some((stop_tx, join_handle)) = self.worker.take() {
            // the worker may have finished on its own
            let _ = stop_tx.send(true);
            if let Err(err) = join_handle.join() {
                warn!("health worker panicked: {:?}", err);
            }
        }
        info!(
            "health worker stopped after {} passes",
            self.completed_cycles()
        );
    }

    fn completed_cycles(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }
}
