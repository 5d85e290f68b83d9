use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

use msdash_core::model::{MicroserviceDescriptor, download_path};
use msdash_core::probe::ProbeField;
use msdash_core::state::{Alert, CatalogState, DashState, OpenProbe, RowControls, ServiceRow};

use super::theme::styles;

/// Everything the frame needs besides the dashboard state
pub struct Chrome<'a> {
    pub server_url: &'a str,
    pub probe_host: &'a str,
    pub backend: &'a str,
    pub selected: usize,
    pub help_open: bool,
}

pub fn draw(f: &mut Frame<'_>, state: &DashState, chrome: &Chrome<'_>) {
    let area = f.area();

    // Layout:
    // [ top bar ]
    // [ main (list + detail) ]
    // [ footer ]
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    render_top_bar(f, outer[0], state, chrome);

    let rows = state.rows();
    let selected = chrome.selected.min(rows.len().saturating_sub(1));
    match &state.catalog {
        CatalogState::Loading => render_message(f, outer[1], "Loading...", None),
        CatalogState::Failed(message) => {
            render_message(f, outer[1], message, Some("Press r to retry."));
        }
        CatalogState::Loaded(_) if rows.is_empty() => {
            render_message(f, outer[1], "No microservices found.", None);
        }
        CatalogState::Loaded(_) => render_services(f, outer[1], &rows, selected, chrome),
    }

    render_footer(f, outer[2], state, rows.get(selected));

    if let (Some(probe), Some(port)) = (&state.open_probe, state.probe_port()) {
        render_probe(f, area, probe, port, state.descriptor(&probe.folder), chrome);
    }
    if chrome.help_open {
        render_help(f, area);
    }
    if let Some(alert) = state.alerts.front() {
        render_alert(f, area, alert);
    }
}

fn render_top_bar(f: &mut Frame<'_>, area: Rect, state: &DashState, chrome: &Chrome<'_>) {
    let (running, total) = state.running_summary();
    let line = Line::from(vec![
        Span::styled(" msdash ", styles::accent_bold()),
        Span::styled(chrome.server_url, styles::text()),
        Span::styled(format!(" ({})", chrome.backend), styles::text_muted()),
        Span::raw("  "),
        Span::styled(format!("{}/{} running", running, total), styles::success()),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn render_message(f: &mut Frame<'_>, area: Rect, message: &str, hint: Option<&str>) {
    let is_error = hint.is_some();
    let mut lines = vec![Line::from(Span::styled(
        message.to_string(),
        if is_error { styles::error() } else { styles::text_dim() },
    ))];
    if let Some(hint) = hint {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(hint.to_string(), styles::text_muted())));
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_subtle())
        .title(" Uploaded Microservices ");
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn status_label(row: &ServiceRow<'_>) -> String {
    if row.busy {
        return row.primary_label().to_string();
    }
    match row.port() {
        Some(port) => format!(":{}", port),
        None => "stopped".to_string(),
    }
}

fn render_services(
    f: &mut Frame<'_>,
    area: Rect,
    rows: &[ServiceRow<'_>],
    selected: usize,
    chrome: &Chrome<'_>,
) {
    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let items: Vec<ListItem> = rows
        .iter()
        .map(|row| {
            let style = styles::row(row);
            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", styles::row_icon(row)), style),
                Span::styled(row.descriptor.name.clone(), styles::text()),
                Span::raw(" "),
                Span::styled(status_label(row), style),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(styles::border_focused())
                .title(" Uploaded Microservices "),
        )
        .highlight_style(styles::selection())
        .highlight_symbol("> ");
    let mut list_state = ListState::default().with_selected(Some(selected));
    f.render_stateful_widget(list, main[0], &mut list_state);

    if let Some(row) = rows.get(selected) {
        render_detail(f, main[1], row, chrome);
    }
}

fn render_detail(f: &mut Frame<'_>, area: Rect, row: &ServiceRow<'_>, chrome: &Chrome<'_>) {
    let ms = row.descriptor;
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Name:        ", styles::text_dim()),
            Span::styled(ms.name.clone(), styles::text()),
        ]),
        Line::from(vec![
            Span::styled("Folder:      ", styles::text_dim()),
            Span::styled(ms.folder.clone(), styles::text_muted()),
        ]),
        Line::from(vec![
            Span::styled("Description: ", styles::text_dim()),
            match ms.description() {
                Some(d) => Span::styled(d.to_string(), styles::text()),
                None => Span::styled("(none)", styles::text_muted()),
            },
        ]),
        Line::from(""),
        Line::from(Span::styled("Files:", styles::section_header())),
    ];

    for file in &ms.files {
        lines.push(Line::from(vec![
            Span::styled(format!("  {}  ", file), styles::text()),
            Span::styled(
                format!("{}{}", chrome.server_url, download_path(&ms.folder, file)),
                styles::text_muted(),
            ),
        ]));
    }
    lines.push(Line::from(""));

    match row.controls {
        RowControls::Running { port, probe_open } => {
            lines.push(Line::from(Span::styled(
                format!("Running on port {}", port),
                styles::success(),
            )));
            lines.push(Line::from(vec![
                control_span("x", row.primary_label(), !row.busy),
                Span::raw("  "),
                control_span(
                    "t",
                    if probe_open { "Hide API Tester" } else { "Test API" },
                    true,
                ),
            ]));
        }
        RowControls::Start => {
            lines.push(Line::from(Span::styled("Not running", styles::text_muted())));
            lines.push(Line::from(control_span("s", row.primary_label(), !row.busy)));
        }
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_subtle())
        .title(format!(" {} ", ms.name));
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn control_span(key: &str, label: &str, enabled: bool) -> Span<'static> {
    let style = if enabled {
        styles::key_hint()
    } else {
        styles::text_muted()
    };
    Span::styled(format!("[{}] {}", key, label), style)
}

fn render_footer(f: &mut Frame<'_>, area: Rect, state: &DashState, row: Option<&ServiceRow<'_>>) {
    let mut hints: Vec<(&str, &str)> = Vec::new();
    if state.alerts.front().is_some() {
        hints.push(("enter", "dismiss"));
    } else if state.open_probe.is_some() {
        hints.extend([
            ("tab", "field"),
            ("←→", "method"),
            ("enter", "send"),
            ("esc", "close"),
        ]);
    } else if matches!(state.catalog, CatalogState::Failed(_)) {
        hints.extend([("r", "retry"), ("q", "quit")]);
    } else {
        hints.push(("↑↓", "select"));
        match row {
            Some(row) if row.is_running() => hints.extend([("x", "stop"), ("t", "probe")]),
            Some(_) => hints.push(("s", "start")),
            None => {}
        }
        hints.extend([("r", "refresh"), ("?", "help"), ("q", "quit")]);
    }

    let mut spans = Vec::new();
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), styles::key_hint()));
        spans.push(Span::styled(format!("{} ", label), styles::text_dim()));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// A `width` x `height` rect centered in `area`, clamped to fit
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn field_label(label: &str, focused: bool) -> Span<'static> {
    let style = if focused {
        styles::accent_bold()
    } else {
        styles::text_dim()
    };
    Span::styled(format!("{:<8}", label), style)
}

fn render_probe(
    f: &mut Frame<'_>,
    area: Rect,
    probe: &OpenProbe,
    port: u16,
    descriptor: Option<&MicroserviceDescriptor>,
    chrome: &Chrome<'_>,
) {
    let rect = centered_rect(area.width * 3 / 4, area.height * 2 / 3, area);
    f.render_widget(Clear, rect);

    let name = descriptor.map(|d| d.name.as_str()).unwrap_or(&probe.folder);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_focused())
        .title(format!(" Test API Endpoint: {} ", name));

    let form = &probe.form;
    let cursor = |field: ProbeField| if form.focus == field { "_" } else { "" };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Target: ", styles::text_dim()),
            Span::styled(
                format!("http://{}:{}", chrome.probe_host, port),
                styles::text_muted(),
            ),
        ]),
        Line::from(vec![
            field_label("Method:", form.focus == ProbeField::Method),
            Span::styled(format!("< {} >", form.method), styles::text()),
        ]),
        Line::from(vec![
            field_label("Path:", form.focus == ProbeField::Path),
            Span::styled(format!("{}{}", form.path, cursor(ProbeField::Path)), styles::text()),
        ]),
    ];
    if form.method.allows_body() {
        let body = if form.body.is_empty() && form.focus != ProbeField::Body {
            Span::styled("JSON body (optional)", styles::text_muted())
        } else {
            Span::styled(format!("{}{}", form.body, cursor(ProbeField::Body)), styles::text())
        };
        lines.push(Line::from(vec![field_label("Body:", form.focus == ProbeField::Body), body]));
    }
    lines.push(Line::from(""));
    lines.push(if probe.loading {
        Line::from(Span::styled("Sending...", styles::warn()))
    } else {
        Line::from(vec![
            Span::styled("[enter] Send", styles::key_hint()),
            Span::raw("  "),
            Span::styled("[esc] Close", styles::key_hint()),
        ])
    });

    if let Some(error) = &probe.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(error.clone(), styles::error())));
    }
    if let Some(response) = &probe.response {
        lines.push(Line::from(""));
        for line in response.summary().lines() {
            lines.push(Line::from(Span::styled(line.to_string(), styles::text())));
        }
    }

    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        rect,
    );
}

fn render_alert(f: &mut Frame<'_>, area: Rect, alert: &Alert) {
    let width = (alert.message.chars().count() as u16 + 6).max(30);
    let rect = centered_rect(width, 6, area);
    f.render_widget(Clear, rect);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::error())
        .title(" Alert ");
    let lines = vec![
        Line::from(Span::styled(alert.message.clone(), styles::text())),
        Line::from(Span::styled(alert.folder.clone(), styles::text_muted())),
        Line::from(""),
        Line::from(Span::styled("[enter] OK", styles::key_hint())),
    ];
    f.render_widget(Paragraph::new(lines).block(block), rect);
}

fn render_help(f: &mut Frame<'_>, area: Rect) {
    let rect = centered_rect(46, 14, area);
    f.render_widget(Clear, rect);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_focused())
        .title(" Help ");
    let entries = [
        ("↑/k ↓/j", "Select microservice"),
        ("s", "Start selected"),
        ("x", "Stop selected"),
        ("enter", "Start or stop selected"),
        ("t", "Open/close API tester"),
        ("r", "Refresh status (retry list)"),
        ("?", "Toggle this help"),
        ("q", "Quit"),
    ];
    let lines: Vec<Line> = entries
        .iter()
        .map(|(key, label)| {
            Line::from(vec![
                Span::styled(format!("  {:<9}", key), styles::key_hint()),
                Span::styled(label.to_string(), styles::text()),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines).block(block), rect);
}
