use std::path::Path;
use std::time::Duration;

use tokio::process::Command;
use tracing::{info, warn};

use crate::command::{capture, find_executable};
use crate::error::{AttemptError, SpeedTestError};
use crate::settings::Settings;

use super::{normalize::normalize, Measurement};

/// Argument sets that ask the known CLIs for JSON, tried in order.
pub const JSON_VARIANTS: &[&[&str]] = &[
    &["--json"],
    &["--format=json"],
    &["--format=json", "--accept-license", "--accept-gdpr"],
];

/// Runs the first speed test CLI found on `PATH`.
pub async fn run_external(settings: &Settings) -> Result<(Measurement, String), SpeedTestError> {
    let program = find_executable(&settings.speedtest_binaries).ok_or(SpeedTestError::NoTool)?;
    info!(program = %program.display(), "using external speed test");

    let measurement = run_variants(&program, JSON_VARIANTS, settings.speedtest_timeout()).await?;
    let name = program
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string());
    Ok((measurement, name))
}

pub async fn run_variants(
    program: &Path,
    variants: &[&[&str]],
    limit: Duration,
) -> Result<Measurement, SpeedTestError> {
    for args in variants {
        match attempt(program, args, limit).await {
            Ok(measurement) => return Ok(measurement),
            Err(e) => warn!(program = %program.display(), ?args, error = %e, "speed test attempt failed"),
        }
    }
    Err(SpeedTestError::Exhausted)
}

/// One invocation: run, pick stdout (or stderr when stdout is empty), parse.
pub async fn attempt(program: &Path, args: &[&str], limit: Duration) -> Result<Measurement, AttemptError> {
    let mut command = Command::new(program);
    command.args(args);
    let output = capture(command, limit).await?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = match stdout.trim() {
        "" => stderr.trim(),
        out => out,
    };
    if text.is_empty() {
        return Err(AttemptError::EmptyOutput);
    }

    let doc: serde_json::Value = serde_json::from_str(text)?;
    normalize(&doc)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    const LIMIT: Duration = Duration::from_secs(5);

    fn sh() -> &'static Path {
        Path::new("sh")
    }

    #[tokio::test]
    async fn parses_stdout() {
        let m = attempt(
            sh(),
            &["-c", r#"echo '{"ping": 12.3, "download": 54000000, "upload": 12000000}'"#],
            LIMIT,
        )
        .await
        .unwrap();
        assert_eq!(m.ping_ms, 12.3);
        assert_eq!(m.download_bps, 54_000_000.0);
    }

    #[tokio::test]
    async fn falls_back_to_stderr() {
        let script = r#"echo '{"download": {"bandwidth": 6750000}, "upload": {"bandwidth": 1500000}, "ping": 8.0}' 1>&2"#;
        let m = attempt(sh(), &["-c", script], LIMIT).await.unwrap();
        assert_eq!(m.download_bps, 54_000_000.0);
        assert_eq!(m.upload_bps, 12_000_000.0);
    }

    #[tokio::test]
    async fn empty_output() {
        let err = attempt(sh(), &["-c", "true"], LIMIT).await.unwrap_err();
        assert!(matches!(err, AttemptError::EmptyOutput));
    }

    #[tokio::test]
    async fn malformed_json() {
        let err = attempt(sh(), &["-c", "echo 'Retrieving speedtest.net configuration...'"], LIMIT)
            .await
            .unwrap_err();
        assert!(matches!(err, AttemptError::Json(_)));
    }

    #[tokio::test]
    async fn missing_executable() {
        let err = attempt(Path::new("/nonexistent/speedtest"), &["--json"], LIMIT)
            .await
            .unwrap_err();
        assert!(matches!(err, AttemptError::Spawn { .. }));
    }

    #[tokio::test]
    async fn later_variant_wins() {
        let variants: &[&[&str]] = &[
            &["-c", r#"echo '{"ping": 5}'"#],
            &["-c", r#"echo '{"ping": 5, "download": 100, "upload": 50}'"#],
        ];
        let m = run_variants(sh(), variants, LIMIT).await.unwrap();
        assert_eq!(m.download_bps, 100.0);
        assert_eq!(m.upload_bps, 50.0);
    }

    #[tokio::test]
    async fn all_variants_failing_is_exhausted() {
        let variants: &[&[&str]] = &[&["-c", "exit 1"], &["-c", "echo '{}'"]];
        let err = run_variants(sh(), variants, LIMIT).await.unwrap_err();
        assert!(matches!(err, SpeedTestError::Exhausted));
    }

    #[tokio::test]
    async fn missing_tool() {
        let settings = Settings {
            speedtest_binaries: vec!["no-such-speedtest-binary-xyz".to_string()],
            ..Settings::default()
        };
        let err = run_external(&settings).await.unwrap_err();
        assert!(matches!(err, SpeedTestError::NoTool));
    }
}
