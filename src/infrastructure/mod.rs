//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces:
//! frame-source cameras, the HTTP backend and the XDG config store.

pub mod capture;
pub mod config;
pub mod gateway;

// Re-export adapters
pub use capture::{StillImageDevice, UnavailableDevice};
pub use config::XdgConfigStore;
pub use gateway::HttpGateway;
