mod activity;
mod app;
mod command;
mod error;
mod link;
mod settings;
mod speedtest;
mod ui;

use anyhow::{Context, Result};
use app::{poll_event, spawn_link_probe, spawn_speed_test, App, AppAction, WorkerEvent};
use clap::{Parser, Subcommand};
use crossterm::event::Event;
use ratatui::DefaultTerminal;
use settings::{Backend, Settings};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use ui::draw_ui;

#[derive(Parser, Debug)]
#[command(name = "wifispeed", version, about = "Wi-Fi link rate and internet speed test")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Wireless interface queried with `iw` (Linux)
    #[arg(long, global = true)]
    interface: Option<String>,

    /// Timeout for each link speed command, in seconds
    #[arg(long, global = true, default_value_t = 6)]
    probe_timeout: u64,

    /// Timeout for the external speed test CLI, in seconds
    #[arg(long, global = true, default_value_t = 300)]
    test_timeout: u64,

    #[arg(long, global = true, value_enum, default_value_t = Backend::Auto)]
    backend: Backend,

    /// Speed test server base URL; repeat to choose among several
    #[arg(long = "server", global = true)]
    servers: Vec<String>,

    /// Where the window's log is saved
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Write diagnostic tracing output to this file (interactive mode)
    #[arg(long, global = true)]
    trace_file: Option<PathBuf>,

    /// More diagnostic output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current link speed and exit
    Link {
        #[arg(long)]
        json: bool,
    },
    /// Run one speed test and exit
    Test {
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    fn settings(&self) -> Settings {
        let mut settings = Settings {
            interface: self.interface.clone(),
            probe_timeout_secs: self.probe_timeout.max(1),
            speedtest_timeout_secs: self.test_timeout.max(1),
            backend: self.backend,
            ..Settings::default()
        };
        if !self.servers.is_empty() {
            settings.servers = self.servers.clone();
        }
        if let Some(path) = &self.log_file {
            settings.log_path = path.clone();
        }
        settings
    }
}

fn init_tracing(cli: &Cli) -> Result<()> {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match (&cli.command, &cli.trace_file) {
        (Some(_), _) => builder.with_writer(std::io::stderr).init(),
        (None, Some(path)) => {
            let file = File::create(path)
                .with_context(|| format!("creating trace file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        // the terminal belongs to the window
        (None, None) => builder.with_writer(std::io::sink).init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;
    let settings = cli.settings();

    match cli.command {
        Some(Command::Link { json }) => run_link_once(&settings, json).await,
        Some(Command::Test { json }) => run_test_once(&settings, json).await,
        None => {
            let mut terminal = ratatui::init();
            terminal.clear()?;

            let result = run_app(&mut terminal, settings).await;

            ratatui::restore();
            result
        }
    }
}

async fn run_link_once(settings: &Settings, json: bool) -> Result<()> {
    let reading = link::probe_link_speed(settings).await;
    if json {
        println!("{}", serde_json::json!({ "link_speed_mbps": reading }));
    } else {
        match reading {
            Some(mbps) => println!("{mbps:.1} Mbps"),
            None => println!("Unknown or not connected"),
        }
    }
    Ok(())
}

async fn run_test_once(settings: &Settings, json: bool) -> Result<()> {
    let result = speedtest::run_speed_test(settings, |message: &str| eprintln!("{message}")).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Ping:     {:.1} ms", result.ping_ms);
        println!("Download: {}", speedtest::format_bps(result.download_bps));
        println!("Upload:   {}", speedtest::format_bps(result.upload_bps));
        println!("Source:   {}", result.source);
    }
    Ok(())
}

async fn run_app(terminal: &mut DefaultTerminal, settings: Settings) -> Result<()> {
    let mut app = App::new(settings);
    let (tx, mut rx) = mpsc::unbounded_channel::<WorkerEvent>();

    app.log(format!(
        "App started on {} ({} {})",
        app.platform,
        std::env::consts::OS,
        std::env::consts::ARCH
    ));
    if app.begin_link_probe() {
        spawn_link_probe(tx.clone(), app.settings.clone());
    }

    loop {
        terminal.draw(|frame| draw_ui(frame, &app))?;

        // Drain worker results
        while let Ok(event) = rx.try_recv() {
            app.apply(event);
        }

        // Handle input
        if let Some(Event::Key(key)) = poll_event(Duration::from_millis(30))? {
            if let Some(action) = app.handle_key_event(key) {
                match action {
                    AppAction::Quit => break,
                    AppAction::RefreshLink => {
                        if app.begin_link_probe() {
                            spawn_link_probe(tx.clone(), app.settings.clone());
                        }
                    }
                    AppAction::StartTest => {
                        if app.begin_speed_test() {
                            spawn_speed_test(tx.clone(), app.settings.clone());
                        }
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
