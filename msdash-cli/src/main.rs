use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{debug, warn};

use msdash_cli::app::App;
use msdash_cli::{backends, commands, logging};
use msdash_core::config::DashConfig;
use msdash_core::dashboard::Dashboard;
use msdash_core::model::ActionKind;
use msdash_core::probe::ProbeMethod;

#[derive(Parser)]
#[command(name = "msdash")]
#[command(about = "Browse, start, stop and probe microservices on a control server", long_about = None)]
struct Cli {
    /// Control server base URL (overrides the config file)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Config file to use instead of searching for msdash.yml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run against a built-in demo control server
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive dashboard (default)
    Tui,
    /// Print the catalog with run state
    List,
    /// Print the running map
    Status,
    Start {
        folder: String,
    },
    Stop {
        folder: String,
    },
    /// Send one request to a running microservice
    Probe {
        folder: String,
        #[arg(short = 'X', long, default_value = "GET")]
        method: ProbeMethod,
        #[arg(long, default_value = "/")]
        path: String,
        #[arg(short = 'd', long)]
        data: Option<String>,
    },
    /// Upload files as a new microservice
    Upload {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Save one file of a microservice
    Download {
        folder: String,
        filename: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn load_config(cli: &Cli) -> Result<DashConfig> {
    let config = match &cli.config {
        Some(path) => {
            DashConfig::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => {
            let cwd = std::env::current_dir().context("reading current directory")?;
            match DashConfig::discover(&cwd).context("loading config")? {
                Some((_, config)) => config,
                None => DashConfig::default(),
            }
        }
    };
    match &cli.server {
        Some(url) => Ok(config.with_server_url(url.as_str())?),
        None => Ok(config),
    }
}

// --- Terminal setup/teardown ---
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_tui(dash: Dashboard, config: &DashConfig) -> Result<()> {
    let (trigger_tx, trigger_rx) = mpsc::channel(16);
    let poller = dash.poller.clone();
    let interval = config.poll_interval();
    tokio::spawn(async move { poller.run(trigger_rx, interval).await });

    let mut events = dash.store.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(env) => debug!(id = env.id, event = ?env.event, "applied"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event log lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let server_url = dash.control.base_url().to_string();
    let mut app = App::new(dash, trigger_tx, server_url, config.probe_host.clone());
    app.spawn_mount();

    let mut terminal = setup_terminal()?;
    let result = app.run(&mut terminal).await;
    restore_terminal(terminal)?;
    result?;
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let command = cli.command.unwrap_or(Commands::Tui);

    if matches!(command, Commands::Tui) {
        let log_file = config.log_file();
        logging::init_file(&log_file)
            .with_context(|| format!("opening log file {}", log_file.display()))?;
    } else {
        logging::init_stderr();
    }

    let (control, probe) = backends::connect(&config, cli.demo)?;
    let dash = Dashboard::new(control.clone(), probe);
    let mut out = io::stdout();

    match command {
        Commands::Tui => run_tui(dash, &config).await,
        Commands::List => commands::run_list(&dash, &mut out).await,
        Commands::Status => commands::run_status(&dash, &mut out).await,
        Commands::Start { folder } => {
            commands::run_action(&dash, &folder, ActionKind::Start, &mut out).await
        }
        Commands::Stop { folder } => {
            commands::run_action(&dash, &folder, ActionKind::Stop, &mut out).await
        }
        Commands::Probe {
            folder,
            method,
            path,
            data,
        } => commands::run_probe(&dash, &folder, method, &path, data.as_deref(), &mut out).await,
        Commands::Upload {
            name,
            description,
            files,
        } => commands::run_upload(control.as_ref(), &name, &description, &files, &mut out).await,
        Commands::Download {
            folder,
            filename,
            output,
        } => {
            commands::run_download(control.as_ref(), &folder, &filename, output.as_deref(), &mut out)
                .await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
