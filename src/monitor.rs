//! Read-side adapter over the pinger's listener channel
//!
//! Retains the most recent statistics snapshot, derives the success rate,
//! and forwards manual warm triggers. This is the only piece the
//! diagnostics surface talks to; it never mutates warming state directly.

use std::sync::{Arc, Mutex};

use crate::coordinator::{WarmNowReport, WarmingCoordinator};
use crate::pinger::{KeepAlivePinger, ListenerId, PingStats};

pub struct PingMonitor {
    pinger: KeepAlivePinger,
    coordinator: WarmingCoordinator,
    latest: Arc<Mutex<PingStats>>,
    listener: ListenerId,
}

impl PingMonitor {
    /// Subscribe to the coordinator's pinger. The listener is removed
    /// again when the monitor is dropped.
    pub fn new(coordinator: &WarmingCoordinator) -> Self {
        let pinger = coordinator.pinger().clone();
        let latest = Arc::new(Mutex::new(pinger.stats()));

        let slot = Arc::clone(&latest);
        let listener = pinger.add_listener(move |stats| {
            *slot.lock().unwrap() = stats.clone();
        });

        Self {
            pinger,
            coordinator: coordinator.clone(),
            latest,
            listener,
        }
    }

    /// Most recent statistics snapshot seen on the listener channel
    pub fn latest(&self) -> PingStats {
        self.latest.lock().unwrap().clone()
    }

    /// Fraction of cycles that succeeded; 0.0 before the first cycle
    pub fn success_rate(&self) -> f64 {
        let stats = self.latest();
        if stats.total_pings == 0 {
            0.0
        } else {
            stats.successful_pings as f64 / stats.total_pings as f64
        }
    }

    /// Forward a manual warm trigger to the coordinator
    pub async fn warm_now(&self) -> WarmNowReport {
        self.coordinator.warm_now().await
    }
}

impl Drop for PingMonitor {
    fn drop(&mut self) {
        self.pinger.remove_listener(self.listener);
    }
}
