use std::path::Path;

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::pinger::PingStats;
use crate::warmer::CachedContentSnapshot;

use super::Result;

const PING_STATS_KEY: &str = "ping_stats";
const CONTENT_CACHE_KEY: &str = "content_cache";

/// Fjall-backed persistent storage for warming state
#[derive(Clone)]
pub struct StateStore {
    keyspace: Keyspace,
    warming: PartitionHandle,
}

impl StateStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening warming state store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let warming = keyspace.open_partition("warming", PartitionCreateOptions::default())?;

        Ok(Self { keyspace, warming })
    }

    /// Load persisted ping statistics, if present and well-formed.
    ///
    /// `is_active` is deliberately not part of the persisted form: a
    /// restarted process has no running timer, so hydrated statistics
    /// always come back inactive.
    pub fn load_ping_stats(&self) -> Option<PingStats> {
        self.load_json(PING_STATS_KEY)
    }

    pub fn save_ping_stats(&self, stats: &PingStats) -> Result<()> {
        self.save_json(PING_STATS_KEY, stats)
    }

    /// Load the persisted content snapshot, if present and well-formed.
    /// The snapshot may already be past its freshness window; it then
    /// serves only as stale fallback.
    pub fn load_snapshot(&self) -> Option<CachedContentSnapshot> {
        self.load_json(CONTENT_CACHE_KEY)
    }

    pub fn save_snapshot(&self, snapshot: &CachedContentSnapshot) -> Result<()> {
        self.save_json(CONTENT_CACHE_KEY, snapshot)
    }

    /// Erase the persisted content snapshot
    pub fn clear_snapshot(&self) -> Result<()> {
        self.warming.remove(CONTENT_CACHE_KEY)?;
        debug!("Persisted content snapshot cleared");
        Ok(())
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.warming.get(key) {
            Ok(Some(value)) => match serde_json::from_slice(&value) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    warn!(key, %err, "Discarding malformed persisted state");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(key, %err, "Failed to read persisted state");
                None
            }
        }
    }

    fn save_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.warming.insert(key, bytes)?;
        debug!(key, "Persisted warming state");
        Ok(())
    }
}
