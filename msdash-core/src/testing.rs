//! Scripted control plane for unit tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::control::{ControlError, ControlPlane, ProbeClient};
use crate::model::{MicroserviceDescriptor, RunningStatusMap, UploadOutcome, UploadRequest};
use crate::probe::{ProbeRequest, ProbeResponse};

pub struct ScriptedControlPlane {
    catalog: Mutex<Option<Vec<MicroserviceDescriptor>>>,
    running: Mutex<Option<RunningStatusMap>>,
    fail_actions: AtomicBool,
    hold_actions: AtomicBool,
    release: Notify,
    entered: Notify,
    status_calls: AtomicUsize,
    calls: Mutex<Vec<String>>,
    probe_reply: Mutex<Option<(u16, String)>>,
    probes: Mutex<Vec<(u16, ProbeRequest)>>,
}

impl ScriptedControlPlane {
    pub fn new() -> Self {
        Self {
            catalog: Mutex::new(Some(Vec::new())),
            running: Mutex::new(Some(RunningStatusMap::new())),
            fail_actions: AtomicBool::new(false),
            hold_actions: AtomicBool::new(false),
            release: Notify::new(),
            entered: Notify::new(),
            status_calls: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            probe_reply: Mutex::new(Some((200, "ok".into()))),
            probes: Mutex::new(Vec::new()),
        }
    }

    /// `None` makes the catalog fetch fail
    pub fn set_catalog(&self, catalog: Option<Vec<MicroserviceDescriptor>>) {
        *self.catalog.lock().unwrap() = catalog;
    }

    /// `None` makes status fetches fail
    pub fn set_running(&self, running: Option<RunningStatusMap>) {
        *self.running.lock().unwrap() = running;
    }

    pub fn fail_actions(&self, fail: bool) {
        self.fail_actions.store(fail, Ordering::SeqCst);
    }

    /// Make start/stop wait for [`release_action`](Self::release_action)
    pub fn hold_actions(&self, hold: bool) {
        self.hold_actions.store(hold, Ordering::SeqCst);
    }

    pub fn release_action(&self) {
        self.release.notify_one();
    }

    /// Resolves once a held start/stop call has been entered
    pub async fn action_entered(&self) {
        self.entered.notified().await;
    }

    /// `None` makes probes fail at the transport level
    pub fn set_probe_reply(&self, reply: Option<(u16, &str)>) {
        *self.probe_reply.lock().unwrap() = reply.map(|(s, b)| (s, b.to_string()));
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Every request seen, in order, as `METHOD path`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn probes(&self) -> Vec<(u16, ProbeRequest)> {
        self.probes.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn action(&self, path: String) -> Result<serde_json::Value, ControlError> {
        self.record(format!("POST {}", path));
        if self.hold_actions.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        if self.fail_actions.load(Ordering::SeqCst) {
            return Err(ControlError::Transport("connection refused".into()));
        }
        Ok(serde_json::json!({"status": "ok"}))
    }
}

#[async_trait]
impl ControlPlane for ScriptedControlPlane {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn base_url(&self) -> &str {
        "http://localhost:8000"
    }

    async fn list_microservices(&self) -> Result<Vec<MicroserviceDescriptor>, ControlError> {
        self.record("GET /list-microservices".into());
        self.catalog
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ControlError::Transport("connection refused".into()))
    }

    async fn running_status(&self) -> Result<RunningStatusMap, ControlError> {
        self.record("GET /status-microservices".into());
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.running
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ControlError::Transport("connection refused".into()))
    }

    async fn start(&self, folder: &str) -> Result<serde_json::Value, ControlError> {
        self.action(format!("/start-microservice/{}", folder)).await
    }

    async fn stop(&self, folder: &str) -> Result<serde_json::Value, ControlError> {
        self.action(format!("/stop-microservice/{}", folder)).await
    }

    async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, ControlError> {
        self.record(format!("POST /upload-microservice {}", request.name));
        Ok(UploadOutcome::Uploaded)
    }

    async fn download(&self, folder: &str, filename: &str) -> Result<Vec<u8>, ControlError> {
        self.record(format!("GET {}", crate::model::download_path(folder, filename)));
        Ok(Vec::new())
    }
}

#[async_trait]
impl ProbeClient for ScriptedControlPlane {
    async fn send(&self, port: u16, request: &ProbeRequest) -> Result<ProbeResponse, ControlError> {
        self.probes.lock().unwrap().push((port, request.clone()));
        let reply = self.probe_reply.lock().unwrap().clone();
        match reply {
            Some((status, body)) => Ok(ProbeResponse::from_text(status, &body)),
            None => Err(ControlError::Transport("connection refused".into())),
        }
    }
}
