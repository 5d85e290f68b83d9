use std::io;
use std::time::Duration;

use crossterm::event::{self, Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{Terminal, backend::Backend};
use tokio::sync::mpsc;
use tracing::debug;

use msdash_core::dashboard::Dashboard;
use msdash_core::model::{ActionKind, Folder};
use msdash_core::poller::PollTrigger;
use msdash_core::probe::{ProbeField, ProbeForm};
use msdash_core::reducer::DashEvent;
use msdash_core::state::CatalogState;

use crate::ui::{self, Chrome};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// What the key handler needs to know about the current frame
struct KeyContext {
    alert: bool,
    probe: Option<(u64, ProbeForm)>,
    rows: usize,
    row: Option<(Folder, bool, ActionKind)>,
    catalog_failed: bool,
}

/// Interactive dashboard: owns selection and overlays, forwards everything
/// else to the dashboard's store and collaborators.
pub struct App {
    dash: Dashboard,
    triggers: mpsc::Sender<PollTrigger>,
    server_url: String,
    probe_host: String,
    selected: usize,
    help_open: bool,
}

impl App {
    pub fn new(
        dash: Dashboard,
        triggers: mpsc::Sender<PollTrigger>,
        server_url: impl Into<String>,
        probe_host: impl Into<String>,
    ) -> Self {
        Self {
            dash,
            triggers,
            server_url: server_url.into(),
            probe_host: probe_host.into(),
            selected: 0,
            help_open: false,
        }
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dash
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Load the catalog in the background; the first frames show "Loading..."
    pub fn spawn_mount(&self) {
        let dash = self.dash.clone();
        tokio::spawn(async move {
            dash.mount().await;
        });
    }

    async fn context(&self) -> KeyContext {
        let state = self.dash.store.read().await;
        let rows = state.rows();
        let row = rows.get(self.selected.min(rows.len().saturating_sub(1))).map(|r| {
            (
                r.descriptor.folder.clone(),
                r.is_running(),
                r.primary_action(),
            )
        });
        KeyContext {
            alert: !state.alerts.is_empty(),
            probe: state
                .open_probe
                .as_ref()
                .map(|p| (p.session, p.form.clone())),
            rows: rows.len(),
            row,
            catalog_failed: matches!(state.catalog, CatalogState::Failed(_)),
        }
    }

    fn spawn_action(&self, folder: Folder, action: ActionKind) {
        let dispatcher = self.dash.dispatcher.clone();
        tokio::spawn(async move {
            let outcome = dispatcher.dispatch(&folder, action).await;
            debug!(folder = %folder, ?outcome, "action finished");
        });
    }

    pub async fn handle_key(&mut self, key: KeyEvent) -> Flow {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Flow::Quit;
        }

        let ctx = self.context().await;

        // an alert blocks everything until acknowledged
        if ctx.alert {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.dash.store.apply(DashEvent::AlertDismissed).await;
            }
            return Flow::Continue;
        }

        if let Some((session, form)) = ctx.probe {
            self.handle_probe_key(key, session, form).await;
            return Flow::Continue;
        }

        if self.help_open {
            match key.code {
                KeyCode::Char('q') => return Flow::Quit,
                KeyCode::Char('?') | KeyCode::Esc | KeyCode::Enter => self.help_open = false,
                _ => {}
            }
            return Flow::Continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Flow::Quit,
            KeyCode::Char('?') => self.help_open = true,
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < ctx.rows {
                    self.selected += 1;
                }
            }
            KeyCode::Char('r') => {
                if ctx.catalog_failed {
                    self.spawn_mount();
                } else {
                    // a full queue already has a refresh pending
                    let _ = self.triggers.try_send(PollTrigger::Manual);
                }
            }
            KeyCode::Char('s') => {
                if let Some((folder, false, _)) = ctx.row {
                    self.spawn_action(folder, ActionKind::Start);
                }
            }
            KeyCode::Char('x') => {
                if let Some((folder, true, _)) = ctx.row {
                    self.spawn_action(folder, ActionKind::Stop);
                }
            }
            KeyCode::Enter => {
                if let Some((folder, _, action)) = ctx.row {
                    self.spawn_action(folder, action);
                }
            }
            KeyCode::Char('t') => {
                if let Some((folder, true, _)) = ctx.row {
                    self.dash.store.apply(DashEvent::ProbeToggled { folder }).await;
                }
            }
            _ => {}
        }
        Flow::Continue
    }

    async fn handle_probe_key(&mut self, key: KeyEvent, session: u64, mut form: ProbeForm) {
        match key.code {
            KeyCode::Esc => {
                self.dash.store.apply(DashEvent::ProbeClosed).await;
                return;
            }
            KeyCode::Enter => {
                let probe = self.dash.probe.clone();
                tokio::spawn(async move {
                    probe.submit(session).await;
                });
                return;
            }
            KeyCode::Tab => form.focus_next(),
            KeyCode::Left if form.focus == ProbeField::Method => form.cycle_method(false),
            KeyCode::Right if form.focus == ProbeField::Method => form.cycle_method(true),
            KeyCode::Backspace => form.pop_char(),
            KeyCode::Char(c) => form.push_char(c),
            _ => return,
        }
        self.dash
            .store
            .apply(DashEvent::ProbeFormChanged { session, form })
            .await;
    }

    fn chrome(&self) -> Chrome<'_> {
        Chrome {
            server_url: &self.server_url,
            probe_host: &self.probe_host,
            backend: self.dash.control.name(),
            selected: self.selected,
            help_open: self.help_open,
        }
    }

    /// Draw, wait briefly for a key, repeat until quit
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            {
                let snapshot = self.dash.store.read().await;
                let chrome = self.chrome();
                terminal.draw(|f| ui::draw(f, &snapshot, &chrome))?;
            }

            if !event::poll(Duration::from_millis(50))? {
                continue;
            }
            let CEvent::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if self.handle_key(key).await == Flow::Quit {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::backends::FakeControlPlane;
    use msdash_core::state::DashState;

    const ECHO: &str = "echo_20250427101500";

    async fn app() -> (App, mpsc::Receiver<PollTrigger>) {
        let fake = Arc::new(FakeControlPlane::new().with_latency(Duration::ZERO));
        let dash = Dashboard::new(fake.clone(), fake);
        assert!(dash.mount().await);
        let (tx, rx) = mpsc::channel(4);
        (App::new(dash, tx, "http://localhost:8000", "localhost"), rx)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    /// Wait for spawned work to land in the store
    async fn until(app: &App, check: impl Fn(&DashState) -> bool) {
        for _ in 0..200 {
            if check(&*app.dashboard().store.read().await) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_start_then_probe_then_stop() {
        let (mut app, _rx) = app().await;

        assert_eq!(app.handle_key(key(KeyCode::Char('s'))).await, Flow::Continue);
        until(&app, |s| s.running.contains_key(ECHO) && !s.is_action_loading(ECHO)).await;

        app.handle_key(key(KeyCode::Char('t'))).await;
        assert!(app.dashboard().store.read().await.probe_open_for(ECHO));

        // path starts as "/"; type "health"
        for c in "health".chars() {
            app.handle_key(key(KeyCode::Char(c))).await;
        }
        app.handle_key(key(KeyCode::Enter)).await;
        until(&app, |s| {
            s.open_probe
                .as_ref()
                .and_then(|p| p.response.as_ref())
                .is_some_and(|r| r.summary() == "Response (200): ok")
        })
        .await;

        app.handle_key(key(KeyCode::Esc)).await;
        assert!(app.dashboard().store.read().await.open_probe.is_none());

        app.handle_key(key(KeyCode::Char('x'))).await;
        until(&app, |s| !s.running.contains_key(ECHO) && !s.is_action_loading(ECHO)).await;
    }

    #[tokio::test]
    async fn test_stop_ignored_for_stopped_row() {
        let (mut app, _rx) = app().await;
        app.handle_key(key(KeyCode::Char('x'))).await;
        app.handle_key(key(KeyCode::Char('t'))).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let state = app.dashboard().store.read().await;
        assert!(state.action_loading.is_empty());
        assert!(state.open_probe.is_none());
    }

    #[tokio::test]
    async fn test_selection_is_clamped() {
        let (mut app, _rx) = app().await;
        for _ in 0..10 {
            app.handle_key(key(KeyCode::Down)).await;
        }
        assert_eq!(app.selected(), 2);
        app.handle_key(key(KeyCode::Char('k'))).await;
        assert_eq!(app.selected(), 1);
    }

    #[tokio::test]
    async fn test_alert_blocks_other_keys() {
        let (mut app, _rx) = app().await;
        app.dashboard()
            .store
            .apply(DashEvent::ActionFinished {
                folder: ECHO.into(),
                action: ActionKind::Stop,
                error: Some("boom".into()),
            })
            .await;

        assert_eq!(app.handle_key(key(KeyCode::Char('q'))).await, Flow::Continue);
        app.handle_key(key(KeyCode::Char('s'))).await;
        assert!(app.dashboard().store.read().await.action_loading.is_empty());

        app.handle_key(key(KeyCode::Enter)).await;
        assert!(app.dashboard().store.read().await.alerts.is_empty());
        assert_eq!(app.handle_key(key(KeyCode::Char('q'))).await, Flow::Quit);
    }

    #[tokio::test]
    async fn test_refresh_key_sends_manual_trigger() {
        let (mut app, mut rx) = app().await;
        app.handle_key(key(KeyCode::Char('r'))).await;
        assert_eq!(rx.try_recv().ok(), Some(PollTrigger::Manual));
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_from_probe() {
        let (mut app, _rx) = app().await;
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(app.handle_key(ctrl_c).await, Flow::Quit);
    }
}
