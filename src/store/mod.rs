//! Fjall-based persistence for warming state
//!
//! The warming subsystem survives process restarts through two fixed keys
//! in a single `warming` partition:
//!
//! - `ping_stats` — serialized keep-alive statistics
//! - `content_cache` — the last successful content snapshot
//!
//! Missing or malformed values are treated as "no prior state", never as a
//! fatal error: the in-memory state is authoritative for the session and
//! persistence is best-effort.

mod state;

pub use state::StateStore;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
