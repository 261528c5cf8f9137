use crate::activity::ActivityLog;
use crate::error::SpeedTestError;
use crate::link::{self, PlatformKind};
use crate::settings::{Settings, SettingsField};
use crate::speedtest::{self, format_bps, SpeedTestResult};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppView {
    Main,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkState {
    NotRead,
    Probing,
    Known(f64),
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Popup {
    Info { title: String, message: String },
    Error { title: String, message: String },
}

/// Results handed from background workers to the foreground loop.
#[derive(Debug)]
pub enum WorkerEvent {
    LinkSpeed(Option<f64>),
    Progress(String),
    SpeedTest(Result<SpeedTestResult, SpeedTestError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Quit,
    RefreshLink,
    StartTest,
}

pub struct App {
    pub should_quit: bool,
    pub platform: PlatformKind,

    pub view: AppView,
    pub settings: Settings,
    pub selected_setting: SettingsField,

    pub link: LinkState,
    pub result: Option<SpeedTestResult>,
    pub status: String,
    pub popup: Option<Popup>,

    pub log: ActivityLog,
    /// Lines scrolled up from the newest entry.
    pub log_scroll: usize,

    link_probe_running: bool,
    speed_test_running: bool,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        Self {
            should_quit: false,
            platform: PlatformKind::current(),
            view: AppView::Main,
            settings,
            selected_setting: SettingsField::ProbeTimeout,
            link: LinkState::NotRead,
            result: None,
            status: "Ready".to_string(),
            popup: None,
            log: ActivityLog::new(),
            log_scroll: 0,
            link_probe_running: false,
            speed_test_running: false,
        }
    }

    pub fn can_refresh(&self) -> bool {
        !self.link_probe_running && !self.speed_test_running
    }

    pub fn can_start_test(&self) -> bool {
        !self.speed_test_running
    }

    pub fn speed_test_running(&self) -> bool {
        self.speed_test_running
    }

    pub fn handle_key_event(&mut self, key: event::KeyEvent) -> Option<AppAction> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        if self.popup.is_some() {
            return self.handle_popup_key(key);
        }

        match self.view {
            AppView::Main => self.handle_main_key(key),
            AppView::Settings => self.handle_settings_key(key),
        }
    }

    fn handle_popup_key(&mut self, key: event::KeyEvent) -> Option<AppAction> {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                Some(AppAction::Quit)
            }
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ') => {
                self.popup = None;
                None
            }
            _ => None,
        }
    }

    fn handle_main_key(&mut self, key: event::KeyEvent) -> Option<AppAction> {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                Some(AppAction::Quit)
            }
            KeyCode::Char('r') if self.can_refresh() => Some(AppAction::RefreshLink),
            KeyCode::Enter | KeyCode::Char('t') if self.can_start_test() => Some(AppAction::StartTest),
            KeyCode::Char('s') => {
                if !self.speed_test_running {
                    self.view = AppView::Settings;
                }
                None
            }
            KeyCode::Char('c') => {
                self.clear_log();
                None
            }
            KeyCode::Char('w') => {
                self.save_log();
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll_log_up(1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll_log_down(1);
                None
            }
            KeyCode::PageUp => {
                self.scroll_log_up(10);
                None
            }
            KeyCode::PageDown => {
                self.scroll_log_down(10);
                None
            }
            KeyCode::Home => {
                self.log_scroll = self.log.len().saturating_sub(1);
                None
            }
            KeyCode::End => {
                self.log_scroll = 0;
                None
            }
            _ => None,
        }
    }

    fn handle_settings_key(&mut self, key: event::KeyEvent) -> Option<AppAction> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter => {
                self.view = AppView::Main;
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_setting = self.selected_setting.prev();
                None
            }
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => {
                self.selected_setting = self.selected_setting.next();
                None
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.settings.decrease(self.selected_setting);
                None
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.settings.increase(self.selected_setting);
                None
            }
            _ => None,
        }
    }

    /// Marks a link probe as running. Returns `false` if one may not start.
    pub fn begin_link_probe(&mut self) -> bool {
        if !self.can_refresh() {
            return false;
        }
        self.link_probe_running = true;
        self.link = LinkState::Probing;
        self.status = "Refreshing link speed...".to_string();
        true
    }

    /// Marks a speed test as running. Returns `false` if one may not start.
    pub fn begin_speed_test(&mut self) -> bool {
        if !self.can_start_test() {
            return false;
        }
        self.speed_test_running = true;
        self.status = "Starting speedtest...".to_string();
        self.log("Speedtest: selecting best server...");
        true
    }

    pub fn apply(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::LinkSpeed(reading) => self.finish_link_probe(reading),
            WorkerEvent::Progress(message) => {
                if self.speed_test_running {
                    self.status = message;
                }
            }
            WorkerEvent::SpeedTest(outcome) => self.finish_speed_test(outcome),
        }
    }

    fn finish_link_probe(&mut self, reading: Option<f64>) {
        self.link_probe_running = false;
        match reading {
            Some(mbps) => {
                self.link = LinkState::Known(mbps);
                self.log(format!("Link speed: {mbps:.1} Mbps"));
            }
            None => {
                self.link = LinkState::Unknown;
                self.log("Link speed: unknown");
            }
        }
        if !self.speed_test_running {
            self.status = "Ready".to_string();
        }
    }

    fn finish_speed_test(&mut self, outcome: Result<SpeedTestResult, SpeedTestError>) {
        self.speed_test_running = false;
        match outcome {
            Ok(result) => {
                self.log(format!(
                    "Speedtest result - Ping: {:.1} ms, Download: {}, Upload: {} (via {})",
                    result.ping_ms,
                    format_bps(result.download_bps),
                    format_bps(result.upload_bps),
                    result.source,
                ));
                self.result = Some(result);
                self.status = "Speedtest completed".to_string();
            }
            Err(e) => {
                self.status = "Error during speedtest".to_string();
                self.log(format!("Speedtest error: {e}"));
                self.popup = Some(Popup::Error {
                    title: "Speedtest error".to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    pub fn log(&mut self, text: impl AsRef<str>) {
        self.log.push(text);
        if self.log_scroll > 0 {
            // keep the viewed lines in place while new ones arrive
            self.log_scroll += 1;
        }
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
        self.log_scroll = 0;
    }

    pub fn save_log(&mut self) {
        let path = self.settings.log_path.clone();
        self.popup = Some(match self.log.save(&path) {
            Ok(()) => Popup::Info {
                title: "Saved".to_string(),
                message: format!("Log saved to: {}", path.display()),
            },
            Err(e) => Popup::Error {
                title: "Save failed".to_string(),
                message: format!("{e:#}"),
            },
        });
    }

    fn scroll_log_up(&mut self, lines: usize) {
        let max = self.log.len().saturating_sub(1);
        self.log_scroll = (self.log_scroll + lines).min(max);
    }

    fn scroll_log_down(&mut self, lines: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(lines);
    }
}

/// Probes the link speed on its own task and reports back once.
pub fn spawn_link_probe(tx: mpsc::UnboundedSender<WorkerEvent>, settings: Settings) {
    tokio::spawn(async move {
        let reading = link::probe_link_speed(&settings).await;
        let _ = tx.send(WorkerEvent::LinkSpeed(reading));
    });
}

/// Runs a speed test on its own task, forwarding progress lines as it goes.
pub fn spawn_speed_test(tx: mpsc::UnboundedSender<WorkerEvent>, settings: Settings) {
    tokio::spawn(async move {
        let progress_tx = tx.clone();
        let outcome = speedtest::run_speed_test(&settings, move |message: &str| {
            let _ = progress_tx.send(WorkerEvent::Progress(message.to_string()));
        })
        .await;
        let _ = tx.send(WorkerEvent::SpeedTest(outcome));
    });
}

pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}
