pub mod client;
pub mod config;
pub mod coordinator;
pub mod monitor;
pub mod pinger;
pub mod server;
pub mod store;
pub mod warmer;
