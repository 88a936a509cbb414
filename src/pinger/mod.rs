//! Keep-alive pinger
//!
//! Periodically probes the backend health endpoint so that idle-timeout
//! based hosts never suspend it. Each scheduled cycle runs one probe with
//! bounded retries, counts once in the cumulative statistics regardless of
//! how many retries it took, and fans a fresh statistics snapshot out to
//! registered listeners. Failures are absorbed and logged; nothing here
//! propagates errors to callers of `start()`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, info, warn};

use crate::client::WarmingClient;
use crate::config::PingerConfig;
use crate::store::StateStore;

/// Cumulative keep-alive statistics
///
/// A "cycle" is one scheduled attempt including all of its retries; the
/// counters move once per cycle, never per retry. `is_active` is skipped
/// during serialization on purpose: a restarted process has no running
/// timer, so persisted statistics must always hydrate as inactive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PingStats {
    pub total_pings: u64,
    pub successful_pings: u64,
    pub last_ping_time: Option<DateTime<Utc>>,
    pub last_success_time: Option<DateTime<Utc>>,
    pub current_streak: u64,
    #[serde(skip)]
    pub is_active: bool,
}

/// Handle for unregistering a statistics listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

type Listener = Box<dyn Fn(&PingStats) + Send + Sync>;

struct PingerInner {
    config: PingerConfig,
    client: Arc<WarmingClient>,
    store: Arc<StateStore>,
    stats: Mutex<PingStats>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener_id: AtomicU64,
    /// Stop signal for the running loop task; `Some` while scheduled
    stop: Mutex<Option<watch::Sender<bool>>>,
}

/// Keep-alive pinger with its own recurring timer
#[derive(Clone)]
pub struct KeepAlivePinger {
    inner: Arc<PingerInner>,
}

impl KeepAlivePinger {
    /// Create a pinger, hydrating statistics from the store when a prior
    /// well-formed value exists.
    pub fn new(config: PingerConfig, client: Arc<WarmingClient>, store: Arc<StateStore>) -> Self {
        let stats = store.load_ping_stats().unwrap_or_default();
        if stats.total_pings > 0 {
            debug!(
                total = stats.total_pings,
                successful = stats.successful_pings,
                "Hydrated ping statistics from store"
            );
        }

        Self {
            inner: Arc::new(PingerInner {
                config,
                client,
                store,
                stats: Mutex::new(stats),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(0),
                stop: Mutex::new(None),
            }),
        }
    }

    /// Start the recurring ping loop. Idempotent: a second call while
    /// running logs and returns without spawning another timer.
    pub fn start(&self) {
        let mut stop_slot = self.inner.stop.lock().unwrap();
        if stop_slot.is_some() {
            info!("Keep-alive pinger already running");
            return;
        }

        {
            let mut stats = self.inner.stats.lock().unwrap();
            stats.is_active = true;
        }
        self.persist_stats();

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let pinger = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(pinger.inner.config.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // The first tick of an interval completes immediately
            ticker.tick().await;
            if pinger.inner.config.warm_on_load {
                pinger.run_cycle().await;
            }

            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        pinger.run_cycle().await;
                    }
                }
            }
            debug!("Keep-alive loop exited");
        });

        *stop_slot = Some(stop_tx);
        info!(
            interval_ms = self.inner.config.interval_ms,
            "Keep-alive pinger started"
        );
    }

    /// Stop scheduling future cycles. An in-flight cycle runs to
    /// completion; only the recurring timer is cancelled. Idempotent.
    pub fn stop(&self) {
        let stop = self.inner.stop.lock().unwrap().take();
        let Some(stop) = stop else {
            debug!("Keep-alive pinger not running");
            return;
        };

        let _ = stop.send(true);

        {
            let mut stats = self.inner.stats.lock().unwrap();
            stats.is_active = false;
        }
        self.persist_stats();
        info!("Keep-alive pinger stopped");
    }

    /// Whether the recurring loop is currently scheduled
    pub fn is_active(&self) -> bool {
        self.inner.stats.lock().unwrap().is_active
    }

    /// Run one ping cycle outside the schedule. Does not touch the
    /// recurring timer. Returns whether the cycle ultimately succeeded.
    pub async fn ping_once(&self) -> bool {
        self.run_cycle().await
    }

    /// Owned snapshot of the current statistics
    pub fn stats(&self) -> PingStats {
        self.inner.stats.lock().unwrap().clone()
    }

    /// Register a listener invoked synchronously, in registration order,
    /// with a fresh snapshot after every statistics update. Listeners must
    /// not block; that contract is on the caller.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&PingStats) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .lock()
            .unwrap()
            .push((id, Box::new(listener)));
        id
    }

    /// Remove a previously registered listener. Returns whether it was
    /// still registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.lock().unwrap();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// One ping cycle: bounded-retry health probe, statistics mutated at
    /// the cycle boundaries only, persisted and broadcast once at the end.
    async fn run_cycle(&self) -> bool {
        {
            let mut stats = self.inner.stats.lock().unwrap();
            stats.total_pings += 1;
            stats.last_ping_time = Some(Utc::now());
        }

        let max_retries = self.inner.config.max_retries;
        let mut attempt = 0u32;
        let success = loop {
            match self.inner.client.probe_health().await {
                Ok(()) => break true,
                Err(err) => {
                    if attempt >= max_retries {
                        warn!(
                            %err,
                            attempts = attempt + 1,
                            "Health ping failed, retries exhausted"
                        );
                        break false;
                    }
                    attempt += 1;
                    debug!(%err, attempt, max_retries, "Health ping failed, retrying");
                    sleep(self.inner.config.retry_delay()).await;
                }
            }
        };

        {
            let mut stats = self.inner.stats.lock().unwrap();
            if success {
                stats.successful_pings += 1;
                stats.current_streak += 1;
                stats.last_success_time = Some(Utc::now());
            } else {
                stats.current_streak = 0;
            }
        }

        self.persist_stats();
        self.notify_listeners();

        if success {
            debug!("Backend pinged successfully");
        }
        success
    }

    fn persist_stats(&self) {
        let snapshot = self.stats();
        if let Err(err) = self.inner.store.save_ping_stats(&snapshot) {
            warn!(%err, "Failed to persist ping statistics");
        }
    }

    fn notify_listeners(&self) {
        let snapshot = self.stats();
        let listeners = self.inner.listeners.lock().unwrap();
        for (_, listener) in listeners.iter() {
            listener(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_active_not_serialized() {
        let stats = PingStats {
            total_pings: 5,
            successful_pings: 5,
            current_streak: 5,
            is_active: true,
            ..PingStats::default()
        };

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json.get("is_active").is_none());

        let restored: PingStats = serde_json::from_value(json).unwrap();
        assert_eq!(restored.total_pings, 5);
        assert!(!restored.is_active);
    }

    #[test]
    fn test_default_stats_are_zeroed() {
        let stats = PingStats::default();
        assert_eq!(stats.total_pings, 0);
        assert_eq!(stats.successful_pings, 0);
        assert_eq!(stats.current_streak, 0);
        assert!(stats.last_ping_time.is_none());
        assert!(stats.last_success_time.is_none());
        assert!(!stats.is_active);
    }
}
