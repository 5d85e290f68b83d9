//! Seams to the outside world
//!
//! The dashboard never manages processes itself. It talks to a control
//! server that owns the catalog, the running map and port assignment,
//! and it talks directly to running microservices when probing them.
//! Both are traits so the HTTP client and the in-process demo backend
//! are interchangeable, and so tests can script failures.

use async_trait::async_trait;

use crate::model::{MicroserviceDescriptor, RunningStatusMap, UploadOutcome, UploadRequest};
use crate::probe::{ProbeRequest, ProbeResponse};

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// The request never produced a response (refused, timed out, ...)
    #[error("request failed: {0}")]
    Transport(String),
    /// A response arrived but its body was not what the contract promises
    #[error("unexpected response body: {0}")]
    Decode(String),
    /// The server answered with an error status where one is not expected
    #[error("server returned {status}{}", detail_suffix(.detail))]
    Status { status: u16, detail: Option<String> },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

/// The control server's HTTP contract
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Human-readable name of this backend
    fn name(&self) -> &'static str;

    /// Base address shown in the UI and used for download links
    fn base_url(&self) -> &str;

    /// `GET /list-microservices`
    async fn list_microservices(&self) -> Result<Vec<MicroserviceDescriptor>, ControlError>;

    /// `GET /status-microservices`
    async fn running_status(&self) -> Result<RunningStatusMap, ControlError>;

    /// `POST /start-microservice/{folder}`. Succeeds when the body is JSON,
    /// whatever it says.
    async fn start(&self, folder: &str) -> Result<serde_json::Value, ControlError>;

    /// `POST /stop-microservice/{folder}`, same contract as `start`
    async fn stop(&self, folder: &str) -> Result<serde_json::Value, ControlError>;

    /// `POST /upload-microservice` as multipart form data
    async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, ControlError>;

    /// `GET /download/{folder}/{filename}`
    async fn download(&self, folder: &str, filename: &str) -> Result<Vec<u8>, ControlError>;

    /// Absolute download URL for a file
    fn download_url(&self, folder: &str, filename: &str) -> String {
        format!(
            "{}{}",
            self.base_url().trim_end_matches('/'),
            crate::model::download_path(folder, filename)
        )
    }
}

/// Sends probe requests straight to a microservice's port
#[async_trait]
pub trait ProbeClient: Send + Sync {
    /// Any HTTP status is `Ok`; only transport failures are errors.
    async fn send(&self, port: u16, request: &ProbeRequest) -> Result<ProbeResponse, ControlError>;
}
