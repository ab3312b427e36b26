pub mod cache;
pub mod config;
pub mod error;
pub mod manager;
pub mod reconciler;
pub mod sse;
pub mod transport;

pub use cache::{StatusCache, StatusEntry, StatusNotification};
pub use config::{SyncConfig, TransportConfig};
pub use error::SyncError;
pub use manager::StatusSync;
pub use reconciler::Reconciler;
pub use transport::{HealthSource, HttpHealthSource, TransportAdapter, TransportMode, TransportUpdate};
