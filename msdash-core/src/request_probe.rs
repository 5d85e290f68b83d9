use std::sync::Arc;

use tracing::{debug, warn};

use crate::control::ProbeClient;
use crate::probe::ProbeRequest;
use crate::reducer::DashEvent;
use crate::state::PROBE_ERROR;
use crate::store::Store;

/// Sends the open probe panel's request and records what came back
#[derive(Clone)]
pub struct RequestProbe {
    client: Arc<dyn ProbeClient>,
    store: Store,
}

impl RequestProbe {
    pub fn new(client: Arc<dyn ProbeClient>, store: Store) -> Self {
        Self { client, store }
    }

    /// Submit the form of the probe panel `session`.
    ///
    /// Returns `false` without sending when that panel is gone, already
    /// waiting on a response, or has no path.
    pub async fn submit(&self, session: u64) -> bool {
        let Some((port, request)) = self.prepare(session).await else {
            return false;
        };
        self.store.apply(DashEvent::ProbeSent { session }).await;

        debug!(port, method = %request.method, path = %request.path, "sending probe");
        let event = match self.client.send(port, &request).await {
            Ok(response) => DashEvent::ProbeCompleted { session, response },
            Err(e) => {
                warn!(port, error = %e, "probe failed");
                DashEvent::ProbeFailed {
                    session,
                    message: PROBE_ERROR.to_string(),
                }
            }
        };
        // dropped by the reducer if the panel was closed meanwhile
        self.store.apply(event).await;
        true
    }

    async fn prepare(&self, session: u64) -> Option<(u16, ProbeRequest)> {
        let state = self.store.read().await;
        let probe = state.open_probe.as_ref().filter(|p| p.session == session)?;
        if probe.loading {
            return None;
        }
        Some((state.probe_port()?, probe.form.build()?))
    }
}
