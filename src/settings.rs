use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

pub const DEFAULT_SERVER: &str = "https://speed.cloudflare.com";
pub const LOG_FILE_DEFAULT: &str = "wifi_speed_log.txt";

/// Which measurement paths a speed test may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Backend {
    /// In-process HTTP client first, external CLI as fallback.
    #[default]
    Auto,
    /// In-process HTTP client only.
    Http,
    /// External speed test CLI only.
    External,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Wireless interface for `iw`; discovered when unset.
    pub interface: Option<String>,
    pub probe_timeout_secs: u64,
    pub speedtest_timeout_secs: u64,
    pub backend: Backend,
    pub servers: Vec<String>,
    pub ping_count: usize,
    pub download_size_mb: u64,
    pub upload_size_mb: u64,
    pub speedtest_binaries: Vec<String>,
    pub log_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interface: None,
            probe_timeout_secs: 6,
            speedtest_timeout_secs: 300,
            backend: Backend::Auto,
            servers: vec![DEFAULT_SERVER.to_string()],
            ping_count: 5,
            download_size_mb: 25,
            upload_size_mb: 10,
            speedtest_binaries: vec!["speedtest-cli".to_string(), "speedtest".to_string()],
            log_path: PathBuf::from(LOG_FILE_DEFAULT),
        }
    }
}

impl Settings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn speedtest_timeout(&self) -> Duration {
        Duration::from_secs(self.speedtest_timeout_secs)
    }

    pub fn download_size_bytes(&self) -> u64 {
        self.download_size_mb * 1_000_000
    }

    pub fn upload_size_bytes(&self) -> usize {
        (self.upload_size_mb * 1_000_000) as usize
    }

    pub fn increase(&mut self, field: SettingsField) {
        match field {
            SettingsField::ProbeTimeout => {
                self.probe_timeout_secs = (self.probe_timeout_secs + 1).min(30);
            }
            SettingsField::SpeedtestTimeout => {
                self.speedtest_timeout_secs = (self.speedtest_timeout_secs + 30).min(900);
            }
            SettingsField::DownloadSize => {
                self.download_size_mb = (self.download_size_mb + 25).min(500);
            }
            SettingsField::UploadSize => {
                self.upload_size_mb = (self.upload_size_mb + 10).min(250);
            }
        }
    }

    pub fn decrease(&mut self, field: SettingsField) {
        match field {
            SettingsField::ProbeTimeout => {
                self.probe_timeout_secs = self.probe_timeout_secs.saturating_sub(1).max(1);
            }
            SettingsField::SpeedtestTimeout => {
                self.speedtest_timeout_secs = self.speedtest_timeout_secs.saturating_sub(30).max(30);
            }
            SettingsField::DownloadSize => {
                self.download_size_mb = self.download_size_mb.saturating_sub(25).max(25);
            }
            SettingsField::UploadSize => {
                self.upload_size_mb = self.upload_size_mb.saturating_sub(10).max(10);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    ProbeTimeout,
    SpeedtestTimeout,
    DownloadSize,
    UploadSize,
}

impl SettingsField {
    pub fn next(self) -> Self {
        match self {
            SettingsField::ProbeTimeout => SettingsField::SpeedtestTimeout,
            SettingsField::SpeedtestTimeout => SettingsField::DownloadSize,
            SettingsField::DownloadSize => SettingsField::UploadSize,
            SettingsField::UploadSize => SettingsField::ProbeTimeout,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            SettingsField::ProbeTimeout => SettingsField::UploadSize,
            SettingsField::SpeedtestTimeout => SettingsField::ProbeTimeout,
            SettingsField::DownloadSize => SettingsField::SpeedtestTimeout,
            SettingsField::UploadSize => SettingsField::DownloadSize,
        }
    }
}
