//! Persistent history of observed public IP addresses.
//!
//! The history is append-only. The most recent observation is the
//! *baseline* the sync engine compares the freshly resolved IP against.
//! "Most recent" always means last inserted, never newest timestamp, since
//! two runs may land within the same clock tick.

mod file;
mod memory;

pub use file::FileStateStore;
pub use memory::MemoryStateStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A public IP address as seen at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpObservation {
    /// Textual IPv4 address, stored exactly as resolved.
    pub ip: String,
    /// When the observation was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl IpObservation {
    pub(crate) fn now(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Append-only store of IP observations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateStore: Send + Sync {
    /// The last inserted observation, or `None` when history is empty.
    async fn latest(&self) -> Result<Option<IpObservation>>;

    /// Append a new observation stamped with the current time.
    ///
    /// Every call adds a row; callers are responsible for only recording
    /// real changes.
    async fn record(&self, ip: &str) -> Result<IpObservation>;

    /// Every observation in insertion order.
    async fn history(&self) -> Result<Vec<IpObservation>>;
}
