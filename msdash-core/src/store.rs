use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use tokio::sync::{RwLock, RwLockReadGuard, broadcast};

use crate::model::ActionKind;
use crate::reducer::{DashEvent, EventEnvelope, reduce};
use crate::state::DashState;

/// Shared handle to the dashboard state.
///
/// Every mutation is a [`DashEvent`] applied through the reducer under
/// the write lock. Applied envelopes are rebroadcast for observers.
#[derive(Clone)]
pub struct Store {
    state: Arc<RwLock<DashState>>,
    next_id: Arc<AtomicU64>,
    events: broadcast::Sender<EventEnvelope>,
}

impl Store {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(1_000);
        Self {
            state: Arc::new(RwLock::new(DashState::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            events,
        }
    }

    fn envelope(&self, event: DashEvent) -> EventEnvelope {
        EventEnvelope {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            at: SystemTime::now(),
            event,
        }
    }

    /// Apply one event and return its id
    pub async fn apply(&self, event: DashEvent) -> u64 {
        let env = self.envelope(event);
        {
            let mut state = self.state.write().await;
            reduce(&mut state, &env);
        }
        let id = env.id;
        let _ = self.events.send(env);
        id
    }

    /// Mark an action in flight unless one already is for this folder.
    /// Check and set happen under one write lock.
    pub async fn begin_action(&self, folder: &str, action: ActionKind) -> bool {
        let env = {
            let mut state = self.state.write().await;
            if state.is_action_loading(folder) {
                return false;
            }
            let env = self.envelope(DashEvent::ActionStarted {
                folder: folder.to_string(),
                action,
            });
            reduce(&mut state, &env);
            env
        };
        let _ = self.events.send(env);
        true
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, DashState> {
        self.state.read().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_begin_action_is_exclusive_per_folder() {
        let store = Store::new();
        assert!(store.begin_action("a", ActionKind::Start).await);
        assert!(!store.begin_action("a", ActionKind::Start).await);
        assert!(store.begin_action("b", ActionKind::Start).await);

        store
            .apply(DashEvent::ActionFinished {
                folder: "a".into(),
                action: ActionKind::Start,
                error: None,
            })
            .await;
        assert!(store.begin_action("a", ActionKind::Stop).await);
    }

    #[tokio::test]
    async fn test_events_are_numbered_and_broadcast() {
        let store = Store::new();
        let mut rx = store.subscribe();
        let first = store.apply(DashEvent::CatalogRequested).await;
        let second = store.apply(DashEvent::AlertDismissed).await;
        assert!(second > first);

        assert_eq!(rx.recv().await.unwrap().id, first);
        assert_eq!(rx.recv().await.unwrap().id, second);
    }
}
