use std::sync::Arc;

use tracing::{info, warn};

use crate::control::{ControlPlane, ProbeClient};
use crate::dispatcher::ActionDispatcher;
use crate::poller::{PollTrigger, StatusPoller};
use crate::reducer::DashEvent;
use crate::request_probe::RequestProbe;
use crate::state::CATALOG_ERROR;
use crate::store::Store;

/// The list view's collaborators, wired to one store
#[derive(Clone)]
pub struct Dashboard {
    pub store: Store,
    pub control: Arc<dyn ControlPlane>,
    pub poller: Arc<StatusPoller>,
    pub dispatcher: ActionDispatcher,
    pub probe: RequestProbe,
}

impl Dashboard {
    pub fn new(control: Arc<dyn ControlPlane>, probe_client: Arc<dyn ProbeClient>) -> Self {
        let store = Store::new();
        let poller = Arc::new(StatusPoller::new(control.clone(), store.clone()));
        let dispatcher = ActionDispatcher::new(control.clone(), poller.clone(), store.clone());
        let probe = RequestProbe::new(probe_client, store.clone());
        Self {
            store,
            control,
            poller,
            dispatcher,
            probe,
        }
    }

    /// Fetch the catalog once, then the running map.
    /// Returns whether the catalog loaded.
    pub async fn mount(&self) -> bool {
        self.store.apply(DashEvent::CatalogRequested).await;
        let loaded = match self.control.list_microservices().await {
            Ok(microservices) => {
                info!(count = microservices.len(), backend = self.control.name(), "catalog loaded");
                self.store
                    .apply(DashEvent::CatalogLoaded { microservices })
                    .await;
                true
            }
            Err(e) => {
                warn!(error = %e, "catalog fetch failed");
                self.store
                    .apply(DashEvent::CatalogFailed {
                        message: CATALOG_ERROR.to_string(),
                    })
                    .await;
                false
            }
        };
        self.poller.refresh(PollTrigger::Mount).await;
        loaded
    }
}
