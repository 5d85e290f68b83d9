use std::time::SystemTime;

use crate::model::{ActionKind, Folder, MicroserviceDescriptor, RunningStatusMap};
use crate::probe::{ProbeForm, ProbeResponse};
use crate::state::{Alert, CatalogState, DashState};

#[derive(Clone, Debug)]
pub enum DashEvent {
    CatalogRequested,
    CatalogLoaded {
        microservices: Vec<MicroserviceDescriptor>,
    },
    CatalogFailed {
        message: String,
    },
    StatusRefreshed {
        running: RunningStatusMap,
    },
    ActionStarted {
        folder: Folder,
        action: ActionKind,
    },
    ActionFinished {
        folder: Folder,
        action: ActionKind,
        error: Option<String>,
    },
    AlertDismissed,
    ProbeToggled {
        folder: Folder,
    },
    ProbeClosed,
    ProbeFormChanged {
        session: u64,
        form: ProbeForm,
    },
    ProbeSent {
        session: u64,
    },
    ProbeCompleted {
        session: u64,
        response: ProbeResponse,
    },
    ProbeFailed {
        session: u64,
        message: String,
    },
}

#[derive(Clone, Debug)]
pub struct EventEnvelope {
    pub id: u64,
    pub at: SystemTime,
    pub event: DashEvent,
}

pub fn reduce(state: &mut DashState, env: &EventEnvelope) {
    match &env.event {
        DashEvent::CatalogRequested => state.set_catalog(CatalogState::Loading),
        DashEvent::CatalogLoaded { microservices } => {
            state.set_catalog(CatalogState::Loaded(microservices.clone()));
        }
        DashEvent::CatalogFailed { message } => {
            state.set_catalog(CatalogState::Failed(message.clone()));
        }
        DashEvent::StatusRefreshed { running } => {
            state.set_status_map(running.clone());
            // a probe whose service went away has nothing left to talk to
            let stale = state
                .open_probe
                .as_ref()
                .is_some_and(|p| !state.running.contains_key(&p.folder));
            if stale {
                state.set_open_probe(None);
            }
        }
        DashEvent::ActionStarted { folder, .. } => state.set_action_loading(folder, true),
        DashEvent::ActionFinished {
            folder,
            action,
            error,
        } => {
            if error.is_some() {
                state.push_alert(Alert {
                    folder: folder.clone(),
                    message: action.failure_message(),
                });
            }
            state.set_action_loading(folder, false);
        }
        DashEvent::AlertDismissed => {
            state.dismiss_alert();
        }
        DashEvent::ProbeToggled { folder } => {
            state.toggle_probe(folder);
        }
        DashEvent::ProbeClosed => {
            state.set_open_probe(None);
        }
        DashEvent::ProbeFormChanged { session, form } => {
            if let Some(probe) = state.probe_session_mut(*session) {
                probe.form = form.clone();
            }
        }
        DashEvent::ProbeSent { session } => {
            if let Some(probe) = state.probe_session_mut(*session) {
                probe.loading = true;
                probe.response = None;
                probe.error = None;
            }
        }
        DashEvent::ProbeCompleted { session, response } => {
            if let Some(probe) = state.probe_session_mut(*session) {
                probe.loading = false;
                probe.response = Some(response.clone());
            }
        }
        DashEvent::ProbeFailed { session, message } => {
            if let Some(probe) = state.probe_session_mut(*session) {
                probe.loading = false;
                probe.error = Some(message.clone());
            }
        }
    }
}
