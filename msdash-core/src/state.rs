use std::collections::{BTreeMap, VecDeque};

use crate::model::{ActionKind, Folder, MicroserviceDescriptor, RunningStatusMap};
use crate::probe::{ProbeForm, ProbeResponse};

/// Message shown when the initial catalog fetch fails
pub const CATALOG_ERROR: &str = "Failed to fetch microservices.";

/// Message shown in the probe panel when the request itself fails
pub const PROBE_ERROR: &str = "Request failed";

/// Progress of the one-off catalog fetch
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CatalogState {
    #[default]
    Loading,
    Loaded(Vec<MicroserviceDescriptor>),
    Failed(String),
}

/// A blocking message that stays up until the operator dismisses it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    pub folder: Folder,
    pub message: String,
}

/// The single open probe panel
#[derive(Clone, Debug, PartialEq)]
pub struct OpenProbe {
    pub folder: Folder,
    /// Identifies this panel instance; results for older sessions are dropped
    pub session: u64,
    pub form: ProbeForm,
    pub loading: bool,
    pub response: Option<ProbeResponse>,
    pub error: Option<String>,
}

impl OpenProbe {
    pub fn new(folder: Folder, session: u64) -> Self {
        Self {
            folder,
            session,
            form: ProbeForm::default(),
            loading: false,
            response: None,
            error: None,
        }
    }
}

/// Controls offered for one row of the list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowControls {
    /// Not running: Start only
    Start,
    /// Running: Stop and Test API, scoped to the assigned port
    Running { port: u16, probe_open: bool },
}

/// One microservice joined with its live state
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceRow<'a> {
    pub descriptor: &'a MicroserviceDescriptor,
    pub controls: RowControls,
    /// An action is in flight; the control is disabled
    pub busy: bool,
}

impl ServiceRow<'_> {
    pub fn port(&self) -> Option<u16> {
        match self.controls {
            RowControls::Running { port, .. } => Some(port),
            RowControls::Start => None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.port().is_some()
    }

    /// The action the primary control triggers
    pub fn primary_action(&self) -> ActionKind {
        if self.is_running() {
            ActionKind::Stop
        } else {
            ActionKind::Start
        }
    }

    pub fn primary_label(&self) -> &'static str {
        match (self.primary_action(), self.busy) {
            (action, true) => action.progress_label(),
            (ActionKind::Start, false) => "Start",
            (ActionKind::Stop, false) => "Stop",
        }
    }

    pub fn status_line(&self) -> String {
        match self.port() {
            Some(port) => format!("Running on port {}", port),
            None => "Not running".to_string(),
        }
    }
}

/// All dashboard state. Each field has exactly one writer; every
/// mutation goes through the transition functions below.
#[derive(Debug, Default)]
pub struct DashState {
    pub catalog: CatalogState,
    pub running: RunningStatusMap,
    pub action_loading: BTreeMap<Folder, bool>,
    pub open_probe: Option<OpenProbe>,
    pub alerts: VecDeque<Alert>,
    next_probe_session: u64,
}

impl DashState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_catalog(&mut self, catalog: CatalogState) {
        self.catalog = catalog;
    }

    /// Replace the running map wholesale
    pub fn set_status_map(&mut self, running: RunningStatusMap) {
        self.running = running;
    }

    pub fn set_action_loading(&mut self, folder: &str, loading: bool) {
        if loading {
            self.action_loading.insert(folder.to_string(), true);
        } else {
            self.action_loading.remove(folder);
        }
    }

    pub fn is_action_loading(&self, folder: &str) -> bool {
        self.action_loading.get(folder).copied().unwrap_or(false)
    }

    /// Open the probe for `folder` (closing any other), or close it with `None`.
    /// Opening needs the folder to be running.
    pub fn set_open_probe(&mut self, folder: Option<&str>) -> bool {
        let Some(folder) = folder else {
            self.open_probe = None;
            return true;
        };
        if !self.running.contains_key(folder) {
            return false;
        }
        self.next_probe_session += 1;
        self.open_probe = Some(OpenProbe::new(folder.to_string(), self.next_probe_session));
        true
    }

    /// Port the open probe talks to, read from the running map
    pub fn probe_port(&self) -> Option<u16> {
        let probe = self.open_probe.as_ref()?;
        self.running.get(&probe.folder).map(|info| info.port)
    }

    /// Open the probe for `folder`, or close it if it is already open
    pub fn toggle_probe(&mut self, folder: &str) -> bool {
        if self.probe_open_for(folder) {
            self.set_open_probe(None)
        } else {
            self.set_open_probe(Some(folder))
        }
    }

    pub fn probe_open_for(&self, folder: &str) -> bool {
        self.open_probe.as_ref().is_some_and(|p| p.folder == folder)
    }

    /// Probe panel for `session`, if it is still the one on screen
    pub fn probe_session_mut(&mut self, session: u64) -> Option<&mut OpenProbe> {
        self.open_probe.as_mut().filter(|p| p.session == session)
    }

    pub fn push_alert(&mut self, alert: Alert) {
        self.alerts.push_back(alert);
    }

    pub fn dismiss_alert(&mut self) -> Option<Alert> {
        self.alerts.pop_front()
    }

    pub fn catalog_items(&self) -> &[MicroserviceDescriptor] {
        match &self.catalog {
            CatalogState::Loaded(items) => items,
            CatalogState::Loading | CatalogState::Failed(_) => &[],
        }
    }

    pub fn descriptor(&self, folder: &str) -> Option<&MicroserviceDescriptor> {
        self.catalog_items().iter().find(|ms| ms.folder == folder)
    }

    /// Join the catalog with live state. Recomputed on every call.
    pub fn rows(&self) -> Vec<ServiceRow<'_>> {
        self.catalog_items()
            .iter()
            .map(|descriptor| {
                let controls = match self.running.get(&descriptor.folder) {
                    Some(info) => RowControls::Running {
                        port: info.port,
                        probe_open: self.probe_open_for(&descriptor.folder),
                    },
                    None => RowControls::Start,
                };
                ServiceRow {
                    descriptor,
                    controls,
                    busy: self.is_action_loading(&descriptor.folder),
                }
            })
            .collect()
    }

    /// Running count over catalog size
    pub fn running_summary(&self) -> (usize, usize) {
        let items = self.catalog_items();
        let running = items
            .iter()
            .filter(|ms| self.running.contains_key(&ms.folder))
            .count();
        (running, items.len())
    }
}
