use std::io::Write;

use anyhow::{Context, Result, anyhow, bail};

use msdash_core::dashboard::Dashboard;
use msdash_core::dispatcher::DispatchOutcome;
use msdash_core::model::ActionKind;
use msdash_core::poller::PollTrigger;
use msdash_core::state::CATALOG_ERROR;

async fn mount(dash: &Dashboard) -> Result<()> {
    if !dash.mount().await {
        bail!("{} ({})", CATALOG_ERROR, dash.control.base_url());
    }
    Ok(())
}

/// `msdash list`: the catalog joined with the running map
pub async fn run_list(dash: &Dashboard, out: &mut dyn Write) -> Result<()> {
    mount(dash).await?;
    let state = dash.store.read().await;
    let rows = state.rows();
    if rows.is_empty() {
        writeln!(out, "No microservices found.")?;
        return Ok(());
    }

    writeln!(out, "{:<28} {:<16} STATE", "FOLDER", "NAME")?;
    for row in &rows {
        let run_state = match row.port() {
            Some(port) => format!("running :{}", port),
            None => "stopped".to_string(),
        };
        writeln!(
            out,
            "{:<28} {:<16} {}",
            row.descriptor.folder, row.descriptor.name, run_state
        )?;
        if let Some(description) = row.descriptor.description() {
            writeln!(out, "  {}", description)?;
        }
    }
    let (running, total) = state.running_summary();
    writeln!(out, "\n{}/{} running", running, total)?;
    Ok(())
}

/// `msdash status`: the raw running map
pub async fn run_status(dash: &Dashboard, out: &mut dyn Write) -> Result<()> {
    if !dash.poller.refresh(PollTrigger::Manual).await {
        bail!(
            "Failed to fetch running status ({})",
            dash.control.base_url()
        );
    }
    let state = dash.store.read().await;
    if state.running.is_empty() {
        writeln!(out, "No microservices running.")?;
    }
    for (folder, info) in &state.running {
        writeln!(out, "{:<28} {}", folder, info.port)?;
    }
    Ok(())
}

/// `msdash start` / `msdash stop`: one action, then the refreshed row
pub async fn run_action(
    dash: &Dashboard,
    folder: &str,
    action: ActionKind,
    out: &mut dyn Write,
) -> Result<()> {
    mount(dash).await?;
    writeln!(out, "{} {}", action.progress_label(), folder)?;

    match dash.dispatcher.dispatch(folder, action).await {
        DispatchOutcome::Completed => {}
        DispatchOutcome::Failed { error } => {
            return Err(anyhow!(error)).context(action.failure_message());
        }
        DispatchOutcome::Busy => bail!("'{}' already has an action in flight", folder),
        DispatchOutcome::UnknownFolder => bail!("No microservice in folder '{}'", folder),
    }

    let state = dash.store.read().await;
    let rows = state.rows();
    let row = rows
        .iter()
        .find(|r| r.descriptor.folder == folder)
        .context("microservice disappeared from the catalog")?;
    writeln!(out, "{}: {}", folder, row.status_line())?;
    Ok(())
}
