pub mod client;
pub mod download;
pub mod external;
pub mod normalize;
pub mod ping;
pub mod upload;

use std::fmt;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::SpeedTestError;
use crate::settings::{Backend, Settings};
use client::SpeedTestClient;

/// The three numbers every measurement path must produce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub download_bps: f64,
    pub upload_bps: f64,
    pub ping_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeasurementSource {
    Http { server: String },
    External { program: String },
}

impl fmt::Display for MeasurementSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementSource::Http { server } => write!(f, "{server}"),
            MeasurementSource::External { program } => write!(f, "{program}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeedTestResult {
    pub download_bps: f64,
    pub upload_bps: f64,
    pub ping_ms: f64,
    pub timestamp: DateTime<Local>,
    pub source: MeasurementSource,
}

impl SpeedTestResult {
    pub fn new(measurement: Measurement, source: MeasurementSource) -> Self {
        Self {
            download_bps: measurement.download_bps,
            upload_bps: measurement.upload_bps,
            ping_ms: measurement.ping_ms,
            timestamp: Local::now(),
            source,
        }
    }
}

/// Runs a full download/upload/ping measurement.
///
/// With [`Backend::Auto`] the in-process client runs first and any failure
/// there falls back to the external CLI. Only running out of options is
/// reported as an error.
pub async fn run_speed_test<P>(settings: &Settings, progress: P) -> Result<SpeedTestResult, SpeedTestError>
where
    P: Fn(&str) + Send + Sync,
{
    let result = match settings.backend {
        Backend::Http => run_in_process(settings, &progress)
            .await
            .map_err(|e| SpeedTestError::Http(format!("{e:#}")))?,
        Backend::External => run_fallback(settings, &progress).await?,
        Backend::Auto => match run_in_process(settings, &progress).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "in-process speed test failed, trying external tool");
                run_fallback(settings, &progress).await?
            }
        },
    };

    info!(
        download_bps = result.download_bps,
        upload_bps = result.upload_bps,
        ping_ms = result.ping_ms,
        source = %result.source,
        "speed test complete"
    );
    Ok(result)
}

async fn run_in_process<P>(settings: &Settings, progress: &P) -> Result<SpeedTestResult>
where
    P: Fn(&str) + Sync,
{
    let mut client = SpeedTestClient::new(settings)?;
    progress("Selecting best server...");
    let server = client.get_best_server().await?.url.clone();

    progress("Running download test...");
    let download_bps = client.download(progress).await?;
    progress("Running upload test...");
    let upload_bps = client.upload(progress).await?;
    let ping_ms = client.ping_ms().context("no ping recorded")?;

    Ok(SpeedTestResult::new(
        Measurement { download_bps, upload_bps, ping_ms },
        MeasurementSource::Http { server },
    ))
}

async fn run_fallback<P>(settings: &Settings, progress: &P) -> Result<SpeedTestResult, SpeedTestError>
where
    P: Fn(&str) + Sync,
{
    progress("Running external speed test...");
    let (measurement, program) = external::run_external(settings).await?;
    Ok(SpeedTestResult::new(measurement, MeasurementSource::External { program }))
}

/// Tracks bytes moved and produces a status line at most every 250ms.
pub struct TransferMeter {
    label: &'static str,
    total: u64,
    transferred: u64,
    last_update: Instant,
    last_transferred: u64,
}

impl TransferMeter {
    const INTERVAL: Duration = Duration::from_millis(250);

    pub fn new(label: &'static str, total: u64) -> Self {
        Self {
            label,
            total,
            transferred: 0,
            last_update: Instant::now(),
            last_transferred: 0,
        }
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn advance(&mut self, bytes: u64) -> Option<String> {
        self.transferred += bytes;

        let now = Instant::now();
        let interval = now.duration_since(self.last_update);
        if interval < Self::INTERVAL {
            return None;
        }

        let delta = self.transferred - self.last_transferred;
        let bps = delta as f64 * 8.0 / interval.as_secs_f64();
        self.last_update = now;
        self.last_transferred = self.transferred;

        let percent = if self.total > 0 {
            (self.transferred as f64 / self.total as f64 * 100.0).min(100.0)
        } else {
            0.0
        };
        Some(format!("{} {:.0}% · {}", self.label, percent, format_bps(bps)))
    }
}

/// Human-friendly bit rate, stepping by 1000.
pub fn format_bps(bps: f64) -> String {
    const UNITS: [&str; 4] = ["bps", "Kbps", "Mbps", "Gbps"];
    let mut value = bps;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn format_bps_steps_by_thousand() {
        assert_eq!(format_bps(0.0), "0.00 bps");
        assert_eq!(format_bps(999.0), "999.00 bps");
        assert_eq!(format_bps(54_000_000.0), "54.00 Mbps");
        assert_eq!(format_bps(12_500.0), "12.50 Kbps");
        assert_eq!(format_bps(2_500_000_000.0), "2.50 Gbps");
        assert_eq!(format_bps(4_000_000_000_000.0), "4000.00 Gbps");
    }

    #[test]
    fn result_keeps_measurement_values() {
        let m = Measurement { download_bps: 54e6, upload_bps: 12e6, ping_ms: 12.3 };
        let result = SpeedTestResult::new(m, MeasurementSource::External { program: "speedtest-cli".into() });
        assert_eq!(result.download_bps, 54e6);
        assert_eq!(result.upload_bps, 12e6);
        assert_eq!(result.ping_ms, 12.3);
        assert_eq!(result.source.to_string(), "speedtest-cli");
    }

    #[test]
    fn result_serializes_source_kind() {
        let m = Measurement { download_bps: 1.0, upload_bps: 2.0, ping_ms: 3.0 };
        let result = SpeedTestResult::new(m, MeasurementSource::Http { server: "https://example.net".into() });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["source"]["kind"], "http");
        assert_eq!(json["download_bps"], 1.0);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn meter_is_throttled() {
        let mut meter = TransferMeter::new("Download", 1000);
        assert_eq!(meter.advance(100), None);
        assert_eq!(meter.transferred(), 100);

        std::thread::sleep(Duration::from_millis(300));
        let status = meter.advance(400).unwrap();
        assert!(status.starts_with("Download 50% · "), "{status}");
        assert_eq!(meter.advance(1), None);
    }

    #[tokio::test]
    async fn external_backend_without_tool_reports_no_tool() {
        let settings = Settings {
            backend: Backend::External,
            speedtest_binaries: vec!["no-such-speedtest-binary-xyz".to_string()],
            ..Settings::default()
        };
        let seen = Mutex::new(Vec::new());
        let err = run_speed_test(&settings, |msg: &str| seen.lock().unwrap().push(msg.to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, SpeedTestError::NoTool));
        assert_eq!(*seen.lock().unwrap(), vec!["Running external speed test..."]);
    }

    #[tokio::test]
    async fn auto_falls_back_when_no_server_answers() {
        let settings = Settings {
            servers: vec!["http://127.0.0.1:9".to_string()],
            ping_count: 1,
            speedtest_binaries: vec!["no-such-speedtest-binary-xyz".to_string()],
            ..Settings::default()
        };
        let seen = Mutex::new(Vec::new());
        let err = run_speed_test(&settings, |msg: &str| seen.lock().unwrap().push(msg.to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, SpeedTestError::NoTool));
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["Selecting best server...", "Running external speed test..."]
        );
    }

    #[tokio::test]
    async fn http_backend_does_not_fall_back() {
        let settings = Settings {
            backend: Backend::Http,
            servers: vec!["http://127.0.0.1:9".to_string()],
            ping_count: 1,
            ..Settings::default()
        };
        let err = run_speed_test(&settings, |_: &str| {}).await.unwrap_err();
        assert!(matches!(err, SpeedTestError::Http(_)));
    }
}
