//! Error types for speed test measurement.
//!
//! Link speed probing has no error type: every failure there collapses to an
//! unknown reading.

use std::time::Duration;

use thiserror::Error;

const INSTALL_HINT: &str =
    "Install with: pip install speedtest-cli, or install the Ookla Speedtest CLI.";
const HTTP_HINT: &str = "Check your connection or use --backend auto.";

/// A failure the user gets to see once every measurement path is used up.
#[derive(Error, Debug)]
pub enum SpeedTestError {
    #[error("No measurement tool available. {}", INSTALL_HINT)]
    NoTool,

    #[error("Unable to run speed test via any method. {}", INSTALL_HINT)]
    Exhausted,

    #[error("In-process speed test failed: {0}. {hint}", hint = HTTP_HINT)]
    Http(String),
}

/// Why one invocation of the external tool produced no result.
#[derive(Error, Debug)]
pub enum AttemptError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("no output")]
    EmptyOutput,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not numeric: {value}")]
    Coercion { field: &'static str, value: String },
}
