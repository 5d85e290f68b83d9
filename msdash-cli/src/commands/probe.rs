use std::io::Write;

use anyhow::{Context, Result, bail};

use msdash_core::dashboard::Dashboard;
use msdash_core::poller::PollTrigger;
use msdash_core::probe::{ProbeField, ProbeForm, ProbeMethod};
use msdash_core::reducer::DashEvent;

/// `msdash probe`: drive the same probe panel the TUI uses, once
pub async fn run_probe(
    dash: &Dashboard,
    folder: &str,
    method: ProbeMethod,
    path: &str,
    data: Option<&str>,
    out: &mut dyn Write,
) -> Result<()> {
    if !dash.poller.refresh(PollTrigger::Manual).await {
        bail!("Failed to fetch running status ({})", dash.control.base_url());
    }

    dash.store
        .apply(DashEvent::ProbeToggled {
            folder: folder.to_string(),
        })
        .await;
    let session = dash
        .store
        .read()
        .await
        .open_probe
        .as_ref()
        .map(|p| p.session)
        .with_context(|| format!("'{}' is not running", folder))?;

    let form = ProbeForm {
        method,
        path: path.to_string(),
        body: data.unwrap_or_default().to_string(),
        focus: ProbeField::Path,
    };
    dash.store
        .apply(DashEvent::ProbeFormChanged { session, form })
        .await;

    if !dash.probe.submit(session).await {
        bail!("Nothing to send: path is empty");
    }

    let state = dash.store.read().await;
    let probe = state
        .open_probe
        .as_ref()
        .context("probe panel closed before the response arrived")?;
    if let Some(error) = &probe.error {
        bail!("{}", error);
    }
    if let Some(response) = &probe.response {
        writeln!(out, "{}", response.summary())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::backends::FakeControlPlane;
    use msdash_core::control::ControlPlane;

    const ECHO: &str = "echo_20250427101500";

    async fn running_dash() -> Dashboard {
        let fake = Arc::new(FakeControlPlane::new().with_latency(Duration::ZERO));
        fake.start(ECHO).await.unwrap();
        Dashboard::new(fake.clone(), fake)
    }

    #[tokio::test]
    async fn test_probe_prints_summary() {
        let dash = running_dash().await;
        let mut out = Vec::new();
        run_probe(&dash, ECHO, ProbeMethod::Get, "/health", None, &mut out)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Response (200): ok\n");
    }

    #[tokio::test]
    async fn test_probe_echoes_json_body() {
        let dash = running_dash().await;
        let mut out = Vec::new();
        run_probe(
            &dash,
            ECHO,
            ProbeMethod::Post,
            "/echo",
            Some(r#"{"a":1}"#),
            &mut out,
        )
        .await
        .unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("Response (200):"));
        assert!(out.contains("\"a\": 1"));
    }

    #[tokio::test]
    async fn test_probe_not_running_fails() {
        let dash = running_dash().await;
        let err = run_probe(
            &dash,
            "reports_20250501093000",
            ProbeMethod::Get,
            "/",
            None,
            &mut Vec::new(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("is not running"));
    }
}
