use std::sync::Arc;

use tracing::{info, warn};

use crate::control::ControlPlane;
use crate::model::ActionKind;
use crate::poller::{PollTrigger, StatusPoller};
use crate::reducer::DashEvent;
use crate::store::Store;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The command went out. The poll that followed decides what the UI shows.
    Completed,
    /// The command failed; an alert was queued
    Failed { error: String },
    /// An action for this folder is already in flight
    Busy,
    /// The folder is not in the catalog
    UnknownFolder,
}

/// Sends start/stop commands, at most one in flight per folder.
///
/// The response body is never trusted for UI state: every completed or
/// failed command is followed by a status refresh, and only then is the
/// folder's in-flight flag cleared.
#[derive(Clone)]
pub struct ActionDispatcher {
    control: Arc<dyn ControlPlane>,
    poller: Arc<StatusPoller>,
    store: Store,
}

impl ActionDispatcher {
    pub fn new(control: Arc<dyn ControlPlane>, poller: Arc<StatusPoller>, store: Store) -> Self {
        Self {
            control,
            poller,
            store,
        }
    }

    pub async fn start(&self, folder: &str) -> DispatchOutcome {
        self.dispatch(folder, ActionKind::Start).await
    }

    pub async fn stop(&self, folder: &str) -> DispatchOutcome {
        self.dispatch(folder, ActionKind::Stop).await
    }

    pub async fn dispatch(&self, folder: &str, action: ActionKind) -> DispatchOutcome {
        if self.store.read().await.descriptor(folder).is_none() {
            return DispatchOutcome::UnknownFolder;
        }
        if !self.store.begin_action(folder, action).await {
            return DispatchOutcome::Busy;
        }

        info!(folder, action = action.verb(), "dispatching");
        let result = match action {
            ActionKind::Start => self.control.start(folder).await,
            ActionKind::Stop => self.control.stop(folder).await,
        };
        let error = result.err().map(|e| e.to_string());
        if let Some(e) = &error {
            warn!(folder, action = action.verb(), error = %e, "action failed");
        }

        self.poller
            .refresh(PollTrigger::ActionCompleted {
                folder: folder.to_string(),
            })
            .await;
        self.store
            .apply(DashEvent::ActionFinished {
                folder: folder.to_string(),
                action,
                error: error.clone(),
            })
            .await;

        match error {
            Some(error) => DispatchOutcome::Failed { error },
            None => DispatchOutcome::Completed,
        }
    }
}
