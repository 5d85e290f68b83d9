use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Folder name of an uploaded microservice on the control server.
/// Unique and stable, used as the key everywhere.
pub type Folder = String;

/// Catalog record for one uploaded microservice
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct MicroserviceDescriptor {
    pub folder: Folder,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

impl MicroserviceDescriptor {
    /// Description for display, `None` when missing or blank
    pub fn description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// Where a running microservice can be reached
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct RunningInfo {
    pub port: u16,
}

/// Server-authoritative map of running microservices. A folder that is
/// absent is not running.
pub type RunningStatusMap = BTreeMap<Folder, RunningInfo>;

/// `GET /list-microservices`
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CatalogPayload {
    #[serde(default)]
    pub microservices: Vec<MicroserviceDescriptor>,
}

/// `GET /status-microservices`
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct StatusPayload {
    #[serde(default)]
    pub running: RunningStatusMap,
}

/// Lifecycle commands the dashboard can send for a folder
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Start,
    Stop,
}

impl ActionKind {
    pub fn verb(&self) -> &'static str {
        match self {
            ActionKind::Start => "start",
            ActionKind::Stop => "stop",
        }
    }

    /// Label shown on a control while the action is in flight
    pub fn progress_label(&self) -> &'static str {
        match self {
            ActionKind::Start => "Starting...",
            ActionKind::Stop => "Stopping...",
        }
    }

    /// Server path for this action, with the folder percent-encoded
    pub fn endpoint(&self, folder: &str) -> String {
        format!("/{}-microservice/{}", self.verb(), urlencoding::encode(folder))
    }

    /// Message shown in the blocking alert when the action fails
    pub fn failure_message(&self) -> String {
        format!("Failed to {} microservice.", self.verb())
    }
}

/// Path of a file download on the control server
pub fn download_path(folder: &str, filename: &str) -> String {
    format!(
        "/download/{}/{}",
        urlencoding::encode(folder),
        urlencoding::encode(filename)
    )
}

/// One file attached to an upload
#[derive(Clone, Debug)]
pub struct UploadFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Multipart upload of a new microservice package
#[derive(Clone, Debug)]
pub struct UploadRequest {
    pub name: String,
    pub description: String,
    pub files: Vec<UploadFile>,
}

/// What the control server said about an upload
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    Rejected { detail: Option<String> },
}

impl UploadOutcome {
    /// Interpret an upload response body. Only `status: "success"` counts.
    pub fn from_payload(payload: &serde_json::Value) -> Self {
        if payload.get("status").and_then(|s| s.as_str()) == Some("success") {
            UploadOutcome::Uploaded
        } else {
            UploadOutcome::Rejected {
                detail: payload
                    .get("detail")
                    .and_then(|d| d.as_str())
                    .map(str::to_string),
            }
        }
    }

    pub fn message(&self) -> String {
        match self {
            UploadOutcome::Uploaded => "Upload successful!".to_string(),
            UploadOutcome::Rejected { detail: Some(d) } => format!("Upload failed. {}", d),
            UploadOutcome::Rejected { detail: None } => "Upload failed.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_payload_defaults() {
        let payload: CatalogPayload = serde_json::from_str(
            r#"{"microservices":[{"folder":"svc1","name":"Echo"}]}"#,
        )
        .unwrap();
        let ms = &payload.microservices[0];
        assert_eq!(ms.folder, "svc1");
        assert!(ms.files.is_empty());
        assert_eq!(ms.description(), None);
    }

    #[test]
    fn test_blank_description_is_none() {
        let ms = MicroserviceDescriptor {
            folder: "a".into(),
            name: "A".into(),
            description: Some("   ".into()),
            files: vec![],
        };
        assert_eq!(ms.description(), None);
    }

    #[test]
    fn test_status_payload_ignores_extra_fields() {
        let payload: StatusPayload = serde_json::from_str(
            r#"{"running":{"svc1":{"id":"abc123","port":9001}}}"#,
        )
        .unwrap();
        assert_eq!(payload.running.get("svc1"), Some(&RunningInfo { port: 9001 }));
    }

    #[test]
    fn test_missing_running_key_is_empty_map() {
        let payload: StatusPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.running.is_empty());
    }

    #[test]
    fn test_action_endpoints() {
        assert_eq!(ActionKind::Start.endpoint("svc1"), "/start-microservice/svc1");
        assert_eq!(ActionKind::Stop.endpoint("my svc"), "/stop-microservice/my%20svc");
        assert_eq!(ActionKind::Stop.failure_message(), "Failed to stop microservice.");
    }

    #[test]
    fn test_download_path_encodes_filename() {
        assert_eq!(
            download_path("demo_login_20250427", "my file#1.py"),
            "/download/demo_login_20250427/my%20file%231.py"
        );
    }

    #[test]
    fn test_upload_outcome() {
        let ok = serde_json::json!({"status": "success", "microservice": "x"});
        assert_eq!(UploadOutcome::from_payload(&ok), UploadOutcome::Uploaded);

        let err = serde_json::json!({"status": "error", "detail": "disk full"});
        let outcome = UploadOutcome::from_payload(&err);
        assert_eq!(outcome.message(), "Upload failed. disk full");

        let odd = serde_json::json!({"ok": true});
        assert_eq!(UploadOutcome::from_payload(&odd).message(), "Upload failed.");
    }
}
