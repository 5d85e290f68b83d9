use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::control::ControlPlane;
use crate::reducer::DashEvent;
use crate::store::Store;

/// Why a status refresh was requested
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollTrigger {
    Mount,
    ActionCompleted { folder: String },
    Manual,
    Interval,
}

/// Keeps the running map in step with the control server.
///
/// A successful fetch replaces the map wholesale. A failed fetch leaves
/// the previous map in place and is only logged; the next trigger tries
/// again.
pub struct StatusPoller {
    control: Arc<dyn ControlPlane>,
    store: Store,
}

impl StatusPoller {
    pub fn new(control: Arc<dyn ControlPlane>, store: Store) -> Self {
        Self { control, store }
    }

    /// Fetch one snapshot. Returns whether the map was replaced.
    pub async fn refresh(&self, trigger: PollTrigger) -> bool {
        match self.control.running_status().await {
            Ok(running) => {
                debug!(?trigger, running = running.len(), "status refreshed");
                self.store.apply(DashEvent::StatusRefreshed { running }).await;
                true
            }
            Err(e) => {
                warn!(?trigger, error = %e, "status refresh failed, keeping previous map");
                false
            }
        }
    }

    /// Refresh on every trigger, and on every tick when `interval` is set.
    /// Returns once the trigger channel closes.
    pub async fn run(&self, mut triggers: mpsc::Receiver<PollTrigger>, interval: Option<Duration>) {
        let Some(interval) = interval else {
            while let Some(trigger) = triggers.recv().await {
                self.refresh(trigger).await;
            }
            return;
        };

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh(PollTrigger::Interval).await;
                }
                maybe_trigger = triggers.recv() => {
                    let Some(trigger) = maybe_trigger else {
                        return;
                    };
                    self.refresh(trigger).await;
                }
            }
        }
    }
}
