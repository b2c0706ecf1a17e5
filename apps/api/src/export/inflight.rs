//! One export at a time per document.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InFlightRegistry {
    active: Arc<Mutex<HashSet<Uuid>>>,
}

impl InFlightRegistry {
    /// Claims `document_id`, or returns `None` if an export for it is running.
    pub fn try_begin(&self, document_id: Uuid) -> Option<InFlightGuard> {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if !active.insert(document_id) {
            return None;
        }
        Some(InFlightGuard {
            registry: self.clone(),
            document_id,
        })
    }

    #[cfg(test)]
    pub fn is_active(&self, document_id: Uuid) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(&document_id)
    }
}

pub struct InFlightGuard {
    registry: InFlightRegistry,
    document_id: Uuid,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry
            .active
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.document_id);
    }
}
