//! Offscreen surface ownership.
//!
//! Each export acquires one lease at its start. The lease is released exactly
//! once: explicitly, on drop (every error path), or after a safety timeout when
//! the output was handed to a print host that may never report back.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    live: HashMap<Uuid, &'static str>,
    released: u64,
}

/// Tracks live surfaces across all exports.
#[derive(Clone, Default)]
pub struct SurfaceRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn acquire(&self, export_id: Uuid, purpose: &'static str) -> SurfaceLease {
        self.lock().live.insert(export_id, purpose);
        debug!(%export_id, purpose, "Surface acquired");
        SurfaceLease {
            registry: self.clone(),
            export_id,
            released: false,
        }
    }

    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }

    pub fn released_count(&self) -> u64 {
        self.lock().released
    }

    pub fn is_live(&self, export_id: Uuid) -> bool {
        self.lock().live.contains_key(&export_id)
    }
}

/// Exclusive ownership of one export's offscreen surface.
pub struct SurfaceLease {
    registry: SurfaceRegistry,
    export_id: Uuid,
    released: bool,
}

impl SurfaceLease {
    pub fn export_id(&self) -> Uuid {
        self.export_id
    }

    pub fn release(mut self) {
        self.release_once();
    }

    /// Keeps the surface alive for `timeout`, then releases it.
    pub fn release_after(self, timeout: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            self.release();
        })
    }

    fn release_once(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let mut inner = self.registry.lock();
        if inner.live.remove(&self.export_id).is_some() {
            inner.released += 1;
        }
        debug!(export_id = %self.export_id, "Surface released");
    }
}

impl Drop for SurfaceLease {
    fn drop(&mut self) {
        self.release_once();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_release_counts_once() {
        let registry = SurfaceRegistry::new();
        let lease = registry.acquire(Uuid::new_v4(), "raster");
        assert_eq!(registry.live_count(), 1);
        lease.release();
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.released_count(), 1);
    }

    #[test]
    fn test_drop_releases() {
        let registry = SurfaceRegistry::new();
        {
            let _lease = registry.acquire(Uuid::new_v4(), "raster");
        }
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.released_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_after_timeout() {
        let registry = SurfaceRegistry::new();
        let id = Uuid::new_v4();
        let handle = registry.acquire(id, "print").release_after(Duration::from_secs(30));
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(registry.is_live(id));
        handle.await.unwrap();
        assert!(!registry.is_live(id));
        assert_eq!(registry.released_count(), 1);
    }
}
