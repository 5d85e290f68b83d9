use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use msdash_core::control::{ControlError, ControlPlane, ProbeClient};
use msdash_core::model::{
    MicroserviceDescriptor, RunningInfo, RunningStatusMap, UploadOutcome, UploadRequest,
};
use msdash_core::probe::{ProbeMethod, ProbeRequest, ProbeResponse};

const FIRST_PORT: u16 = 9001;

#[derive(Debug)]
struct FakeServer {
    catalog: Vec<MicroserviceDescriptor>,
    running: RunningStatusMap,
    next_port: u16,
    uploads: u32,
}

/// In-process stand-in for the control server, for `--demo`.
///
/// Starting assigns the next free port, stopping forgets it, and the
/// "microservices" answer probes on their assigned ports.
pub struct FakeControlPlane {
    server: Mutex<FakeServer>,
    latency: Duration,
}

impl FakeControlPlane {
    pub fn new() -> Self {
        let catalog = [
            ("echo_20250427101500", "echo", "Echoes request bodies back", &["app.py", "Dockerfile"][..]),
            ("demo_login_20250427", "demo_login", "Toy login endpoint", &["app.py", "requirements.txt", "Dockerfile"][..]),
            ("reports_20250501093000", "reports", "", &["main.py", "report template.html"][..]),
        ]
        .into_iter()
        .map(|(folder, name, description, files)| MicroserviceDescriptor {
            folder: folder.to_string(),
            name: name.to_string(),
            description: Some(description.to_string()),
            files: files.iter().map(|f| f.to_string()).collect(),
        })
        .collect();

        Self {
            server: Mutex::new(FakeServer {
                catalog,
                running: RunningStatusMap::new(),
                next_port: FIRST_PORT,
                uploads: 0,
            }),
            latency: Duration::from_millis(400),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn server(&self) -> std::sync::MutexGuard<'_, FakeServer> {
        // a panic while holding the lock leaves plain data behind; keep serving it
        self.server.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for FakeControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    fn name(&self) -> &'static str {
        "demo"
    }

    fn base_url(&self) -> &str {
        "http://localhost:8000"
    }

    async fn list_microservices(&self) -> Result<Vec<MicroserviceDescriptor>, ControlError> {
        Ok(self.server().catalog.clone())
    }

    async fn running_status(&self) -> Result<RunningStatusMap, ControlError> {
        Ok(self.server().running.clone())
    }

    async fn start(&self, folder: &str) -> Result<serde_json::Value, ControlError> {
        tokio::time::sleep(self.latency).await;
        let mut server = self.server();
        if !server.catalog.iter().any(|ms| ms.folder == folder) {
            return Ok(json!({"detail": "Dockerfile not found."}));
        }
        let port = server.next_port;
        server.next_port += 1;
        server.running.insert(folder.to_string(), RunningInfo { port });
        Ok(json!({"status": "started", "port": port}))
    }

    async fn stop(&self, folder: &str) -> Result<serde_json::Value, ControlError> {
        tokio::time::sleep(self.latency).await;
        match self.server().running.remove(folder) {
            Some(_) => Ok(json!({"status": "stopped"})),
            None => Ok(json!({"detail": "Microservice not running."})),
        }
    }

    async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, ControlError> {
        let mut server = self.server();
        server.uploads += 1;
        let folder = format!("{}_{}", request.name, server.uploads);
        server.catalog.push(MicroserviceDescriptor {
            folder,
            name: request.name,
            description: Some(request.description),
            files: request.files.into_iter().map(|f| f.filename).collect(),
        });
        Ok(UploadOutcome::Uploaded)
    }

    async fn download(&self, folder: &str, filename: &str) -> Result<Vec<u8>, ControlError> {
        let server = self.server();
        let known = server
            .catalog
            .iter()
            .any(|ms| ms.folder == folder && ms.files.iter().any(|f| f == filename));
        if !known {
            return Err(ControlError::Status {
                status: 404,
                detail: Some("File not found.".into()),
            });
        }
        Ok(format!("# {}/{} (demo content)\n", folder, filename).into_bytes())
    }
}

#[async_trait]
impl ProbeClient for FakeControlPlane {
    async fn send(&self, port: u16, request: &ProbeRequest) -> Result<ProbeResponse, ControlError> {
        let folder = self
            .server()
            .running
            .iter()
            .find(|(_, info)| info.port == port)
            .map(|(folder, _)| folder.clone());
        let Some(folder) = folder else {
            return Err(ControlError::Transport(format!(
                "connection refused (localhost:{})",
                port
            )));
        };

        let (status, body) = match (request.method, request.path.as_str()) {
            (ProbeMethod::Get, "/health") => (200, "ok".to_string()),
            (ProbeMethod::Get, "/") => (200, json!({"message": format!("{} is up", folder)}).to_string()),
            (_, "/echo") => (200, request.body().unwrap_or_default().to_string()),
            _ => (404, json!({"detail": "Not Found"}).to_string()),
        };
        Ok(ProbeResponse::from_text(status, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake() -> FakeControlPlane {
        FakeControlPlane::new().with_latency(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_start_assigns_ports_and_stop_frees() {
        let fake = fake();
        fake.start("echo_20250427101500").await.unwrap();
        fake.start("demo_login_20250427").await.unwrap();

        let running = fake.running_status().await.unwrap();
        assert_eq!(running["echo_20250427101500"].port, FIRST_PORT);
        assert_eq!(running["demo_login_20250427"].port, FIRST_PORT + 1);

        fake.stop("echo_20250427101500").await.unwrap();
        let running = fake.running_status().await.unwrap();
        assert!(!running.contains_key("echo_20250427101500"));
    }

    #[tokio::test]
    async fn test_stop_when_not_running_still_answers_json() {
        let body = fake().stop("reports_20250501093000").await.unwrap();
        assert_eq!(body["detail"], "Microservice not running.");
    }

    #[tokio::test]
    async fn test_probe_only_reaches_running_ports() {
        let fake = fake();
        let req = ProbeRequest::new(ProbeMethod::Get, "/health");
        assert!(fake.send(FIRST_PORT, &req).await.is_err());

        fake.start("echo_20250427101500").await.unwrap();
        let resp = fake.send(FIRST_PORT, &req).await.unwrap();
        assert_eq!(resp.summary(), "Response (200): ok");

        let missing = ProbeRequest::new(ProbeMethod::Delete, "/nope");
        assert_eq!(fake.send(FIRST_PORT, &missing).await.unwrap().status, 404);
    }

    #[tokio::test]
    async fn test_upload_extends_catalog() {
        let fake = fake();
        let outcome = fake
            .upload(UploadRequest {
                name: "pinger".into(),
                description: "pings".into(),
                files: vec![msdash_core::model::UploadFile {
                    filename: "app.py".into(),
                    bytes: b"print(1)".to_vec(),
                }],
            })
            .await
            .unwrap();
        assert_eq!(outcome, UploadOutcome::Uploaded);
        let catalog = fake.list_microservices().await.unwrap();
        assert!(catalog.iter().any(|ms| ms.folder == "pinger_1"));
        assert!(fake.download("pinger_1", "app.py").await.is_ok());
        assert!(fake.download("pinger_1", "other.py").await.is_err());
    }
}
