//! Lifecycle coordinator
//!
//! One instance per process, constructed by the entry point and handed to
//! whatever needs it. Owns start/stop of both the keep-alive pinger and
//! the content warmer: neither starts itself. Startup is delayed so the
//! warming loops never compete with whatever else the process brings up
//! first, and a hidden-to-visible transition restarts the pinger when the
//! host environment suspended its timer.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::Config;
use crate::pinger::{KeepAlivePinger, PingStats};
use crate::warmer::{CacheStatus, ContentWarmer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Running,
    Shutdown,
}

/// Host context visibility, fed in by the embedding environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Read-only composite status for diagnostics. Never used for control
/// decisions.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorStatus {
    pub state: LifecycleState,
    pub pinger: PingerStatus,
    pub warmer: WarmerStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct PingerStatus {
    pub enabled: bool,
    pub active: bool,
    pub stats: PingStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct WarmerStatus {
    pub enabled: bool,
    pub active: bool,
    pub cache: Option<CacheStatus>,
}

/// Outcome of a manual warm: `None` means the sub-service is disabled,
/// `Some(false)` a settled failure. Partial success is still "done".
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WarmNowReport {
    pub pinger: Option<bool>,
    pub warmer: Option<bool>,
}

struct CoordinatorInner {
    config: Arc<Config>,
    pinger: KeepAlivePinger,
    warmer: ContentWarmer,
    state: Mutex<LifecycleState>,
    last_visibility: Mutex<Visibility>,
}

#[derive(Clone)]
pub struct WarmingCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl WarmingCoordinator {
    pub fn new(config: Arc<Config>, pinger: KeepAlivePinger, warmer: ContentWarmer) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                pinger,
                warmer,
                state: Mutex::new(LifecycleState::Uninitialized),
                last_visibility: Mutex::new(Visibility::Visible),
            }),
        }
    }

    /// Begin delayed startup of the enabled warming loops. Idempotent:
    /// a second call while initializing or running logs and returns.
    /// Returns immediately; the loops start after the configured delay.
    pub fn initialize(&self) {
        {
            let mut state = self.inner.state.lock().unwrap();
            match *state {
                LifecycleState::Uninitialized | LifecycleState::Shutdown => {
                    *state = LifecycleState::Initializing;
                }
                current => {
                    info!(state = ?current, "Warming coordinator already initialized");
                    return;
                }
            }
        }

        let startup = &self.inner.config.startup;
        info!(
            delay_ms = startup.delay_ms,
            "Warming coordinator initializing"
        );

        let coordinator = self.clone();
        tokio::spawn(async move {
            sleep(coordinator.inner.config.startup.delay()).await;
            coordinator.start_services();
        });
    }

    /// Stop both loops and reset the lifecycle. Safe to call repeatedly.
    pub fn shutdown(&self) {
        {
            let mut state = self.inner.state.lock().unwrap();
            if *state == LifecycleState::Uninitialized || *state == LifecycleState::Shutdown {
                debug!("Warming coordinator already shut down");
                return;
            }
            *state = LifecycleState::Shutdown;
        }

        self.inner.pinger.stop();
        self.inner.warmer.stop_periodic();
        info!("Warming coordinator shut down");
    }

    /// Record a visibility transition. On hidden-to-visible while running,
    /// the pinger is restarted if it is enabled but went inactive (a
    /// backgrounded host may have suspended its timers). The warmer is
    /// never touched here, so it cannot be duplicated.
    pub fn handle_visibility(&self, visibility: Visibility) {
        let previous = {
            let mut last = self.inner.last_visibility.lock().unwrap();
            std::mem::replace(&mut *last, visibility)
        };

        if previous != Visibility::Hidden || visibility != Visibility::Visible {
            return;
        }

        let running = *self.inner.state.lock().unwrap() == LifecycleState::Running;
        if running && self.inner.config.pinger.enabled && !self.inner.pinger.is_active() {
            info!("Context visible again, restarting keep-alive pinger");
            self.inner.pinger.start();
        }
    }

    /// Read-only composite status for diagnostics
    pub fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            state: *self.inner.state.lock().unwrap(),
            pinger: PingerStatus {
                enabled: self.inner.config.pinger.enabled,
                active: self.inner.pinger.is_active(),
                stats: self.inner.pinger.stats(),
            },
            warmer: WarmerStatus {
                enabled: self.inner.config.warmer.enabled,
                active: self.inner.warmer.is_active(),
                cache: self.inner.warmer.cached_status(),
            },
        }
    }

    /// One manual cycle of each enabled sub-service, run concurrently and
    /// awaited to settlement. Individual failures are swallowed into the
    /// report.
    pub async fn warm_now(&self) -> WarmNowReport {
        info!("Manual warm requested");

        let ping = async {
            if self.inner.config.pinger.enabled {
                Some(self.inner.pinger.ping_once().await)
            } else {
                None
            }
        };
        let warm = async {
            if self.inner.config.warmer.enabled {
                Some(self.inner.warmer.warm().await.is_some())
            } else {
                None
            }
        };

        let (pinger, warmer) = tokio::join!(ping, warm);
        WarmNowReport { pinger, warmer }
    }

    /// Direct access for read-side adapters
    pub fn pinger(&self) -> &KeepAlivePinger {
        &self.inner.pinger
    }

    fn start_services(&self) {
        {
            let mut state = self.inner.state.lock().unwrap();
            // Shutdown may have raced the startup delay
            if *state != LifecycleState::Initializing {
                debug!(state = ?*state, "Skipping delayed startup");
                return;
            }
            *state = LifecycleState::Running;
        }

        if self.inner.config.pinger.enabled {
            self.inner.pinger.start();
        } else {
            info!("Keep-alive pinger disabled");
        }

        if self.inner.config.warmer.enabled {
            self.inner.warmer.start_periodic();
        } else {
            info!("Content warmer disabled");
        }

        if self.inner.config.warmer.enabled && self.inner.config.warmer.preload_images {
            let warmer = self.inner.warmer.clone();
            let delay = self.inner.config.startup.preload_after();
            tokio::spawn(async move {
                sleep(delay).await;
                warmer.preload_images();
            });
        }

        info!("Warming coordinator running");
    }
}
