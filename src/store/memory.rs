//! In-memory state store.

use super::{IpObservation, StateStore};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

/// Volatile state store, useful when embedding the engine or in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    observations: Arc<Mutex<Vec<IpObservation>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing history (oldest first).
    pub fn with_history<I, S>(ips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let observations = ips.into_iter().map(IpObservation::now).collect();
        Self {
            observations: Arc::new(Mutex::new(observations)),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<IpObservation>> {
        // The vector stays consistent even if a holder panicked.
        self.observations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn latest(&self) -> Result<Option<IpObservation>> {
        Ok(self.lock().last().cloned())
    }

    async fn record(&self, ip: &str) -> Result<IpObservation> {
        let observation = IpObservation::now(ip);
        self.lock().push(observation.clone());
        Ok(observation)
    }

    async fn history(&self) -> Result<Vec<IpObservation>> {
        Ok(self.lock().clone())
    }
}
