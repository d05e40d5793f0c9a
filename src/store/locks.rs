use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::{timeout_at, Instant};
use tracing::warn;

use crate::error::StoreError;
use crate::models::EventId;

/// Registry of per-event inventory locks.
///
/// Writers of different events never wait on each other. Slots are created
/// on first use and kept for the life of the registry, so callers lock only
/// events that exist.
#[derive(Debug, Default)]
pub struct EventLocks {
    slots: Mutex<HashMap<EventId, Arc<AsyncMutex<()>>>>,
}

impl EventLocks {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn slot(&self, event_id: EventId) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(event_id).or_default())
    }

    /// Locks every event in `events` within one shared deadline.
    ///
    /// Ids are sorted and deduplicated first so two writers touching the same
    /// pair of events always queue in the same order. Guards already taken
    /// are released if a later one times out.
    pub async fn acquire(
        &self,
        events: &[EventId],
        timeout: Duration,
    ) -> Result<Vec<OwnedMutexGuard<()>>, StoreError> {
        let mut ids = events.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let deadline = Instant::now() + timeout;
        let mut guards = Vec::with_capacity(ids.len());
        for event_id in ids {
            let slot = self.slot(event_id);
            match timeout_at(deadline, slot.lock_owned()).await {
                Ok(guard) => guards.push(guard),
                Err(_) => {
                    warn!(event_id = %event_id, ?timeout, "timed out waiting for inventory lock");
                    return Err(StoreError::Contention);
                }
            }
        }
        Ok(guards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn held_lock_times_out_as_contention() {
        let locks = EventLocks::new();
        let _held = locks
            .acquire(&[EventId(1)], Duration::from_millis(50))
            .await
            .unwrap();

        let second = locks.acquire(&[EventId(1)], Duration::from_millis(20)).await;
        assert!(matches!(second, Err(StoreError::Contention)));
    }

    #[tokio::test]
    async fn unrelated_events_do_not_block() {
        let locks = EventLocks::new();
        let _held = locks
            .acquire(&[EventId(1)], Duration::from_millis(50))
            .await
            .unwrap();

        let other = locks.acquire(&[EventId(2)], Duration::from_millis(20)).await;
        assert_eq!(other.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_ids_take_one_guard() {
        let locks = EventLocks::new();
        let guards = locks
            .acquire(&[EventId(3), EventId(3)], Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(guards.len(), 1);
    }

    #[tokio::test]
    async fn lock_is_released_on_drop() {
        let locks = EventLocks::new();
        {
            let _held = locks
                .acquire(&[EventId(7), EventId(4)], Duration::from_millis(50))
                .await
                .unwrap();
        }
        let again = locks
            .acquire(&[EventId(4), EventId(7)], Duration::from_millis(20))
            .await;
        assert_eq!(again.unwrap().len(), 2);
    }
}
