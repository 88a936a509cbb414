//! Content cache warmer
//!
//! Keeps a small page of "top content" warm in memory and on disk so it is
//! available the moment anything asks for it. A snapshot is fresh strictly
//! under the configured timeout; once expired it is kept around as stale
//! fallback until a fetch replaces it wholesale. Refreshes are
//! single-flight: concurrent `warm()` calls share one backend fetch.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::client::{ContentItem, WarmingClient};
use crate::config::WarmerConfig;
use crate::store::StateStore;

/// Where the data in a served snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotSource {
    /// Served from the in-memory/persisted cache (including stale fallback)
    Cache,
    /// Freshly fetched from the content endpoint
    Api,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub total_available: u64,
    pub fetched_count: usize,
    pub source: SnapshotSource,
}

/// One captured page of top content. Replaced wholesale on every
/// successful fetch; never merged or partially updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedContentSnapshot {
    pub items: Vec<ContentItem>,
    pub timestamp: DateTime<Utc>,
    pub metadata: SnapshotMetadata,
}

impl CachedContentSnapshot {
    /// Strict freshness check: elapsed time equal to the timeout already
    /// counts as expired.
    pub fn is_fresh(&self, timeout_ms: u64, now: DateTime<Utc>) -> bool {
        let elapsed = now.signed_duration_since(self.timestamp).num_milliseconds();
        elapsed >= 0 && (elapsed as u64) < timeout_ms
    }

    pub fn age_ms(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.timestamp).num_milliseconds()
    }
}

/// Cache state for diagnostics, without fetch side effects
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub metadata: SnapshotMetadata,
    pub timestamp: DateTime<Utc>,
    pub age_ms: i64,
    pub fresh: bool,
}

struct WarmerInner {
    config: WarmerConfig,
    client: Arc<WarmingClient>,
    store: Arc<StateStore>,
    snapshot: Mutex<Option<CachedContentSnapshot>>,
    /// Serializes refreshes so at most one fetch is ever in flight
    refresh: tokio::sync::Mutex<()>,
    /// Stop signal for the running loop task; `Some` while scheduled
    stop: Mutex<Option<watch::Sender<bool>>>,
}

/// Content cache warmer with its own recurring timer
#[derive(Clone)]
pub struct ContentWarmer {
    inner: Arc<WarmerInner>,
}

impl ContentWarmer {
    /// Create a warmer, hydrating the snapshot from the store when a
    /// prior well-formed value exists (it may already be expired, in
    /// which case it only serves as stale fallback).
    pub fn new(config: WarmerConfig, client: Arc<WarmingClient>, store: Arc<StateStore>) -> Self {
        let snapshot = store.load_snapshot();
        if let Some(ref snapshot) = snapshot {
            debug!(
                items = snapshot.items.len(),
                age_ms = snapshot.age_ms(Utc::now()),
                "Hydrated content snapshot from store"
            );
        }

        Self {
            inner: Arc::new(WarmerInner {
                config,
                client,
                store,
                snapshot: Mutex::new(snapshot),
                refresh: tokio::sync::Mutex::new(()),
                stop: Mutex::new(None),
            }),
        }
    }

    /// Return warm content: the fresh cached snapshot when one exists,
    /// otherwise the result of a (shared, single-flight) fetch. On fetch
    /// failure the previous snapshot is served stale; `None` means no data
    /// has ever been fetched, which callers must treat as a valid empty
    /// state.
    pub async fn warm(&self) -> Option<CachedContentSnapshot> {
        if let Some(snapshot) = self.fresh_snapshot() {
            debug!(
                age_ms = snapshot.age_ms(Utc::now()),
                "Serving content from cache"
            );
            return Some(snapshot);
        }

        let _guard = self.inner.refresh.lock().await;

        // Another caller may have refreshed while we waited for the lock
        if let Some(snapshot) = self.fresh_snapshot() {
            return Some(snapshot);
        }

        self.refresh().await
    }

    /// Start the recurring warm loop. Idempotent, same pattern as the
    /// pinger: a second call while running logs and returns.
    pub fn start_periodic(&self) {
        let mut stop_slot = self.inner.stop.lock().unwrap();
        if stop_slot.is_some() {
            info!("Content warmer already running");
            return;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let warmer = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(warmer.inner.config.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            ticker.tick().await;
            if warmer.inner.config.warm_on_load {
                warmer.warm().await;
            }

            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        warmer.warm().await;
                    }
                }
            }
            debug!("Content warm loop exited");
        });

        *stop_slot = Some(stop_tx);
        info!(
            interval_ms = self.inner.config.interval_ms,
            "Content warmer started"
        );
    }

    /// Stop scheduling future warm cycles. Idempotent; an in-flight cycle
    /// runs to completion.
    pub fn stop_periodic(&self) {
        let stop = self.inner.stop.lock().unwrap().take();
        let Some(stop) = stop else {
            debug!("Content warmer not running");
            return;
        };

        let _ = stop.send(true);
        info!("Content warmer stopped");
    }

    /// Whether the recurring loop is currently scheduled
    pub fn is_active(&self) -> bool {
        self.inner.stop.lock().unwrap().is_some()
    }

    /// Fire-and-forget prefetch of the first few item images of the
    /// current snapshot. Never blocks, never touches cache state.
    pub fn preload_images(&self) {
        if !self.inner.config.preload_images {
            return;
        }

        let snapshot = self.inner.snapshot.lock().unwrap().clone();
        let Some(snapshot) = snapshot else {
            debug!("No content snapshot, skipping image preload");
            return;
        };

        let urls: Vec<String> = snapshot
            .items
            .iter()
            .filter_map(|item| item.cover_image.clone())
            .take(self.inner.config.preload_count)
            .collect();

        if urls.is_empty() {
            return;
        }

        info!(count = urls.len(), "Preloading content images");
        for url in urls {
            let client = Arc::clone(&self.inner.client);
            tokio::spawn(async move {
                if let Err(err) = client.prefetch_asset(&url).await {
                    debug!(%err, url, "Image preload failed");
                }
            });
        }
    }

    /// Drop the in-memory snapshot and erase the persisted copy.
    /// Subsequent `warm()` calls will fetch fresh.
    pub fn clear_cache(&self) {
        *self.inner.snapshot.lock().unwrap() = None;
        if let Err(err) = self.inner.store.clear_snapshot() {
            warn!(%err, "Failed to clear persisted snapshot");
        }
        info!("Content cache cleared");
    }

    /// Cache state for the status aggregate, without fetch side effects
    pub fn cached_status(&self) -> Option<CacheStatus> {
        let snapshot = self.inner.snapshot.lock().unwrap();
        snapshot.as_ref().map(|snapshot| {
            let now = Utc::now();
            CacheStatus {
                metadata: snapshot.metadata.clone(),
                timestamp: snapshot.timestamp,
                age_ms: snapshot.age_ms(now),
                fresh: snapshot.is_fresh(self.inner.config.cache_timeout_ms, now),
            }
        })
    }

    fn fresh_snapshot(&self) -> Option<CachedContentSnapshot> {
        let snapshot = self.inner.snapshot.lock().unwrap();
        snapshot
            .as_ref()
            .filter(|s| s.is_fresh(self.inner.config.cache_timeout_ms, Utc::now()))
            .map(|s| {
                let mut served = s.clone();
                served.metadata.source = SnapshotSource::Cache;
                served
            })
    }

    /// One warm cycle: content page and health probe fetched concurrently,
    /// both awaited to settlement. The health result is informational only
    /// and never gates the outcome.
    async fn refresh(&self) -> Option<CachedContentSnapshot> {
        let limit = self.inner.config.content_limit;
        let (content, health) = tokio::join!(
            self.inner.client.fetch_top_content(limit),
            self.inner.client.probe_health(),
        );

        if let Err(err) = health {
            debug!(%err, "Backend health probe failed during warm");
        }

        match content {
            Ok(page) => {
                let snapshot = CachedContentSnapshot {
                    metadata: SnapshotMetadata {
                        total_available: page.total_available,
                        fetched_count: page.items.len(),
                        source: SnapshotSource::Api,
                    },
                    items: page.items,
                    timestamp: Utc::now(),
                };

                *self.inner.snapshot.lock().unwrap() = Some(snapshot.clone());
                if let Err(err) = self.inner.store.save_snapshot(&snapshot) {
                    warn!(%err, "Failed to persist content snapshot");
                }

                info!(
                    fetched = snapshot.metadata.fetched_count,
                    total = snapshot.metadata.total_available,
                    "Content cache warmed"
                );
                Some(snapshot)
            }
            Err(err) => {
                let stale = self.inner.snapshot.lock().unwrap().clone();
                match stale {
                    Some(mut snapshot) => {
                        warn!(
                            %err,
                            age_ms = snapshot.age_ms(Utc::now()),
                            "Content fetch failed, serving stale cache"
                        );
                        snapshot.metadata.source = SnapshotSource::Cache;
                        Some(snapshot)
                    }
                    None => {
                        warn!(%err, "Content fetch failed and no cached snapshot available");
                        None
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn snapshot_at(timestamp: DateTime<Utc>) -> CachedContentSnapshot {
        CachedContentSnapshot {
            items: Vec::new(),
            timestamp,
            metadata: SnapshotMetadata {
                total_available: 0,
                fetched_count: 0,
                source: SnapshotSource::Api,
            },
        }
    }

    #[test]
    fn test_freshness_strictly_under_timeout() {
        let now = Utc::now();
        let snapshot = snapshot_at(now - Duration::milliseconds(999));
        assert!(snapshot.is_fresh(1_000, now));
    }

    #[test]
    fn test_elapsed_equal_to_timeout_is_expired() {
        let now = Utc::now();
        let snapshot = snapshot_at(now - Duration::milliseconds(1_000));
        assert!(!snapshot.is_fresh(1_000, now));
    }

    #[test]
    fn test_elapsed_past_timeout_is_expired() {
        let now = Utc::now();
        let snapshot = snapshot_at(now - Duration::milliseconds(1_001));
        assert!(!snapshot.is_fresh(1_000, now));
    }

    #[test]
    fn test_future_timestamp_is_not_fresh() {
        // Clock skew: a snapshot from the future is suspect, treat as expired
        let now = Utc::now();
        let snapshot = snapshot_at(now + Duration::milliseconds(500));
        assert!(!snapshot.is_fresh(1_000, now));
    }
}
