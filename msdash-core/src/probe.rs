//! Ad-hoc HTTP requests against a running microservice
//!
//! A probe is one request the operator builds by hand (method, path and
//! an optional body) and sends straight to the port the control server
//! assigned to the microservice. Whatever comes back is shown as-is: an
//! HTTP error status is a valid answer, not a failure.

use std::fmt;
use std::str::FromStr;

/// HTTP methods offered by the probe form
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ProbeMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl ProbeMethod {
    pub const ALL: [ProbeMethod; 5] = [
        ProbeMethod::Get,
        ProbeMethod::Post,
        ProbeMethod::Put,
        ProbeMethod::Delete,
        ProbeMethod::Patch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeMethod::Get => "GET",
            ProbeMethod::Post => "POST",
            ProbeMethod::Put => "PUT",
            ProbeMethod::Delete => "DELETE",
            ProbeMethod::Patch => "PATCH",
        }
    }

    /// Whether a request body may be sent with this method
    pub fn allows_body(&self) -> bool {
        !matches!(self, ProbeMethod::Get)
    }

    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|m| m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> Self {
        let idx = Self::ALL.iter().position(|m| m == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unsupported method '{0}', expected one of GET, POST, PUT, DELETE, PATCH")]
pub struct UnknownMethod(pub String);

impl FromStr for ProbeMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

/// A fully built probe request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeRequest {
    pub method: ProbeMethod,
    pub path: String,
    body: Option<String>,
}

impl ProbeRequest {
    pub fn new(method: ProbeMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    /// Attach a body. Ignored for GET, and an empty body counts as none.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        let body = body.into();
        self.body = if self.method.allows_body() && !body.is_empty() {
            Some(body)
        } else {
            None
        };
        self
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// `Content-Type` to send, present only when a body is sent
    pub fn content_type(&self) -> Option<&'static str> {
        self.body.as_ref().map(|_| "application/json")
    }

    /// Target URL on the microservice's own port. The path is used as typed.
    pub fn url(&self, host: &str, port: u16) -> String {
        format!("http://{}:{}{}", host, port, self.path)
    }
}

/// Response body, JSON when it parses and raw text otherwise
#[derive(Clone, Debug, PartialEq)]
pub enum ProbeBody {
    Json(serde_json::Value),
    Text(String),
}

impl ProbeBody {
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(value) => ProbeBody::Json(value),
            Err(_) => ProbeBody::Text(text.to_string()),
        }
    }

    /// Display form: text verbatim, JSON strings unquoted, other JSON
    /// pretty-printed
    pub fn render(&self) -> String {
        match self {
            ProbeBody::Text(text) => text.clone(),
            ProbeBody::Json(serde_json::Value::String(s)) => s.clone(),
            ProbeBody::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

/// One completed probe transaction
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: ProbeBody,
}

impl ProbeResponse {
    pub fn from_text(status: u16, text: &str) -> Self {
        Self {
            status,
            body: ProbeBody::parse(text),
        }
    }

    pub fn heading(&self) -> String {
        format!("Response ({}):", self.status)
    }

    pub fn summary(&self) -> String {
        format!("{} {}", self.heading(), self.body.render())
    }
}

/// Form field that has input focus in the probe panel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProbeField {
    Method,
    #[default]
    Path,
    Body,
}

/// Editable contents of the probe panel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeForm {
    pub method: ProbeMethod,
    pub path: String,
    pub body: String,
    pub focus: ProbeField,
}

impl Default for ProbeForm {
    fn default() -> Self {
        Self {
            method: ProbeMethod::Get,
            path: "/".to_string(),
            body: String::new(),
            focus: ProbeField::Path,
        }
    }
}

impl ProbeForm {
    /// Move focus to the next field, skipping the body for GET
    pub fn focus_next(&mut self) {
        self.focus = match self.focus {
            ProbeField::Method => ProbeField::Path,
            ProbeField::Path if self.method.allows_body() => ProbeField::Body,
            ProbeField::Path | ProbeField::Body => ProbeField::Method,
        };
    }

    pub fn cycle_method(&mut self, forward: bool) {
        self.method = if forward {
            self.method.next()
        } else {
            self.method.prev()
        };
        if !self.method.allows_body() && self.focus == ProbeField::Body {
            self.focus = ProbeField::Path;
        }
    }

    pub fn push_char(&mut self, c: char) {
        match self.focus {
            ProbeField::Method => {}
            ProbeField::Path => self.path.push(c),
            ProbeField::Body => self.body.push(c),
        }
    }

    pub fn pop_char(&mut self) {
        match self.focus {
            ProbeField::Method => {}
            ProbeField::Path => {
                self.path.pop();
            }
            ProbeField::Body => {
                self.body.pop();
            }
        }
    }

    /// Build the request, or `None` while the path is empty
    pub fn build(&self) -> Option<ProbeRequest> {
        if self.path.trim().is_empty() {
            return None;
        }
        Some(ProbeRequest::new(self.method, self.path.clone()).with_body(self.body.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_and_cycle() {
        assert_eq!("patch".parse::<ProbeMethod>(), Ok(ProbeMethod::Patch));
        assert!("TRACE".parse::<ProbeMethod>().is_err());
        assert_eq!(ProbeMethod::Patch.next(), ProbeMethod::Get);
        assert_eq!(ProbeMethod::Get.prev(), ProbeMethod::Patch);
    }

    #[test]
    fn test_get_never_carries_body() {
        let req = ProbeRequest::new(ProbeMethod::Get, "/health").with_body(r#"{"a":1}"#);
        assert_eq!(req.body(), None);
        assert_eq!(req.content_type(), None);
        assert_eq!(req.url("localhost", 9001), "http://localhost:9001/health");
    }

    #[test]
    fn test_content_type_only_with_nonempty_body() {
        let empty = ProbeRequest::new(ProbeMethod::Post, "/items").with_body("");
        assert_eq!(empty.content_type(), None);

        let full = ProbeRequest::new(ProbeMethod::Post, "/items").with_body(r#"{"a":1}"#);
        assert_eq!(full.content_type(), Some("application/json"));
        assert_eq!(full.body(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_body_parse_with_fallback() {
        assert_eq!(ProbeBody::parse("ok"), ProbeBody::Text("ok".into()));
        assert_eq!(
            ProbeBody::parse(r#"{"status":"up"}"#),
            ProbeBody::Json(serde_json::json!({"status": "up"}))
        );
    }

    #[test]
    fn test_summary_formats() {
        let text = ProbeResponse::from_text(200, "ok");
        assert_eq!(text.summary(), "Response (200): ok");

        let json_str = ProbeResponse::from_text(200, "\"ok\"");
        assert_eq!(json_str.summary(), "Response (200): ok");

        let json = ProbeResponse::from_text(404, r#"{"detail":"Not Found"}"#);
        assert_eq!(
            json.summary(),
            "Response (404): {\n  \"detail\": \"Not Found\"\n}"
        );
    }

    #[test]
    fn test_form_focus_skips_body_for_get() {
        let mut form = ProbeForm::default();
        assert_eq!(form.focus, ProbeField::Path);
        form.focus_next();
        assert_eq!(form.focus, ProbeField::Method);

        form.cycle_method(true);
        assert_eq!(form.method, ProbeMethod::Post);
        form.focus_next();
        form.focus_next();
        assert_eq!(form.focus, ProbeField::Body);

        form.cycle_method(false);
        assert_eq!(form.focus, ProbeField::Path);
    }

    #[test]
    fn test_form_build_requires_path() {
        let mut form = ProbeForm::default();
        form.path.clear();
        assert!(form.build().is_none());

        form.path.push_str("/health");
        let req = form.build().unwrap();
        assert_eq!(req.method, ProbeMethod::Get);
        assert_eq!(req.path, "/health");
    }
}
