use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use msdash_core::control::{ControlError, ControlPlane, ProbeClient};
use msdash_core::model::{
    ActionKind, CatalogPayload, MicroserviceDescriptor, RunningStatusMap, StatusPayload,
    UploadOutcome, UploadRequest, download_path,
};
use msdash_core::probe::{ProbeMethod, ProbeRequest, ProbeResponse};

fn transport(e: reqwest::Error) -> ControlError {
    ControlError::Transport(e.to_string())
}

fn decode(e: impl std::fmt::Display) -> ControlError {
    ControlError::Decode(e.to_string())
}

fn build_client(timeout: Duration) -> Result<Client, ControlError> {
    Client::builder().timeout(timeout).build().map_err(transport)
}

/// Turn a non-2xx response into `ControlError::Status`, picking up the
/// server's `detail` message when it sent one
async fn ensure_success(resp: Response) -> Result<Response, ControlError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let detail = resp
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string));
    Err(ControlError::Status {
        status: status.as_u16(),
        detail,
    })
}

/// Control plane backed by the control server's HTTP API
pub struct HttpControlPlane {
    client: Client,
    base_url: String,
}

impl HttpControlPlane {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ControlError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ControlError> {
        debug!(path, "GET");
        let resp = self.client.get(self.url(path)).send().await.map_err(transport)?;
        let resp = ensure_success(resp).await?;
        resp.json::<T>().await.map_err(decode)
    }

    async fn action(&self, action: ActionKind, folder: &str) -> Result<serde_json::Value, ControlError> {
        let path = action.endpoint(folder);
        debug!(path = %path, "POST");
        let resp = self.client.post(self.url(&path)).send().await.map_err(transport)?;
        let status = resp.status();
        // the body only has to be JSON; its content and the status are not trusted
        let body = resp.json::<serde_json::Value>().await.map_err(decode)?;
        info!(folder, action = action.verb(), status = status.as_u16(), "action answered");
        Ok(body)
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    fn name(&self) -> &'static str {
        "http"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn list_microservices(&self) -> Result<Vec<MicroserviceDescriptor>, ControlError> {
        let payload: CatalogPayload = self.get_json("/list-microservices").await?;
        Ok(payload.microservices)
    }

    async fn running_status(&self) -> Result<RunningStatusMap, ControlError> {
        let payload: StatusPayload = self.get_json("/status-microservices").await?;
        Ok(payload.running)
    }

    async fn start(&self, folder: &str) -> Result<serde_json::Value, ControlError> {
        self.action(ActionKind::Start, folder).await
    }

    async fn stop(&self, folder: &str) -> Result<serde_json::Value, ControlError> {
        self.action(ActionKind::Stop, folder).await
    }

    async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, ControlError> {
        let mut form = Form::new()
            .text("name", request.name)
            .text("description", request.description);
        for file in request.files {
            form = form.part("files", Part::bytes(file.bytes).file_name(file.filename));
        }

        debug!("POST /upload-microservice");
        let resp = self
            .client
            .post(self.url("/upload-microservice"))
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        // error responses still carry {status, detail}
        let payload = resp.json::<serde_json::Value>().await.map_err(decode)?;
        Ok(UploadOutcome::from_payload(&payload))
    }

    async fn download(&self, folder: &str, filename: &str) -> Result<Vec<u8>, ControlError> {
        let path = download_path(folder, filename);
        debug!(path = %path, "GET");
        let resp = self.client.get(self.url(&path)).send().await.map_err(transport)?;
        let resp = ensure_success(resp).await?;
        let bytes = resp.bytes().await.map_err(transport)?;
        Ok(bytes.to_vec())
    }
}

fn method(m: ProbeMethod) -> Method {
    match m {
        ProbeMethod::Get => Method::GET,
        ProbeMethod::Post => Method::POST,
        ProbeMethod::Put => Method::PUT,
        ProbeMethod::Delete => Method::DELETE,
        ProbeMethod::Patch => Method::PATCH,
    }
}

/// Sends probes to `http://<host>:<port><path>`
pub struct HttpProbeClient {
    client: Client,
    host: String,
}

impl HttpProbeClient {
    pub fn new(host: &str, timeout: Duration) -> Result<Self, ControlError> {
        Ok(Self {
            client: build_client(timeout)?,
            host: host.to_string(),
        })
    }
}

#[async_trait]
impl ProbeClient for HttpProbeClient {
    async fn send(&self, port: u16, request: &ProbeRequest) -> Result<ProbeResponse, ControlError> {
        let url = request.url(&self.host, port);
        let mut builder = self.client.request(method(request.method), &url);
        if let (Some(body), Some(content_type)) = (request.body(), request.content_type()) {
            builder = builder
                .header(CONTENT_TYPE, content_type)
                .body(body.to_string());
        }

        let resp = builder.send().await.map_err(transport)?;
        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(transport)?;
        debug!(url = %url, status, "probe answered");
        Ok(ProbeResponse::from_text(status, &text))
    }
}
