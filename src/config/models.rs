use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub pinger: PingerConfig,
    #[serde(default)]
    pub warmer: WarmerConfig,
    #[serde(default)]
    pub startup: StartupConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            backend: BackendConfig::default(),
            pinger: PingerConfig::default(),
            warmer: WarmerConfig::default(),
            startup: StartupConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

/// Diagnostics server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_fjall_path")]
    pub fjall_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            fjall_path: default_fjall_path(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    "0.0.0.0:8090".parse().unwrap()
}

fn default_fjall_path() -> PathBuf {
    PathBuf::from("data/warming")
}

/// Remote backend being kept warm
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    #[serde(default = "default_content_path")]
    pub content_path: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            health_path: default_health_path(),
            content_path: default_content_path(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_content_path() -> String {
    "/api/blogs".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_user_agent() -> String {
    "keepwarm/0.1.0".to_string()
}

/// Keep-alive pinger configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PingerConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Time between cycle starts
    #[serde(default = "default_ping_interval_ms")]
    pub interval_ms: u64,
    /// Retries per cycle, on top of the initial attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Fire an immediate cycle when the loop starts
    #[serde(default = "default_enabled")]
    pub warm_on_load: bool,
}

impl PingerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for PingerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_ms: default_ping_interval_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            warm_on_load: default_enabled(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_ping_interval_ms() -> u64 {
    14 * 60 * 1000 // 14 minutes, under typical 15-minute idle eviction
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    5_000
}

/// Content cache warmer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WarmerConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_warm_interval_ms")]
    pub interval_ms: u64,
    /// Snapshot freshness window; elapsed == timeout counts as expired
    #[serde(default = "default_cache_timeout_ms")]
    pub cache_timeout_ms: u64,
    /// Page size requested from the content endpoint
    #[serde(default = "default_content_limit")]
    pub content_limit: usize,
    #[serde(default = "default_enabled")]
    pub warm_on_load: bool,
    #[serde(default = "default_enabled")]
    pub preload_images: bool,
    #[serde(default = "default_preload_count")]
    pub preload_count: usize,
}

impl WarmerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for WarmerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_ms: default_warm_interval_ms(),
            cache_timeout_ms: default_cache_timeout_ms(),
            content_limit: default_content_limit(),
            warm_on_load: default_enabled(),
            preload_images: default_enabled(),
            preload_count: default_preload_count(),
        }
    }
}

fn default_warm_interval_ms() -> u64 {
    10 * 60 * 1000 // 10 minutes
}

fn default_cache_timeout_ms() -> u64 {
    5 * 60 * 1000 // 5 minutes
}

fn default_content_limit() -> usize {
    6
}

fn default_preload_count() -> usize {
    3
}

/// Coordinator startup timing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StartupConfig {
    /// Delay before either loop starts, to stay out of the way of
    /// whatever else the process is bringing up
    #[serde(default = "default_startup_delay_ms")]
    pub delay_ms: u64,
    /// Delay before the one-shot image preload after initialization
    #[serde(default = "default_preload_after_ms")]
    pub preload_after_ms: u64,
}

impl StartupConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn preload_after(&self) -> Duration {
        Duration::from_millis(self.preload_after_ms)
    }
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_startup_delay_ms(),
            preload_after_ms: default_preload_after_ms(),
        }
    }
}

fn default_startup_delay_ms() -> u64 {
    3_000
}

fn default_preload_after_ms() -> u64 {
    5_000
}

/// Development-only diagnostics surface
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DiagnosticsConfig {
    /// When false the warming status/trigger routes are not mounted at all
    #[serde(default)]
    pub enabled: bool,
}
