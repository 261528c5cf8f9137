//! Normalizes the JSON printed by the various speed test CLIs.
//!
//! `speedtest-cli --json` prints bit rates at the top level. The Ookla CLI
//! prints nested byte rates under `bandwidth` and an object for `ping`. Each
//! field is looked up through an ordered list of candidates; the first one
//! present wins.

use serde_json::Value;

use crate::error::AttemptError;

use super::Measurement;

struct Candidate {
    pointer: &'static str,
    scale: f64,
}

const fn at(pointer: &'static str) -> Candidate {
    Candidate { pointer, scale: 1.0 }
}

/// Byte rate that must be turned into a bit rate.
const fn bytes_at(pointer: &'static str) -> Candidate {
    Candidate { pointer, scale: 8.0 }
}

const PING: &[Candidate] = &[at("/ping"), at("/ping/latency"), at("/server/ping"), at("/latency")];
const DOWNLOAD: &[Candidate] = &[at("/download"), bytes_at("/download/bandwidth")];
const UPLOAD: &[Candidate] = &[at("/upload"), bytes_at("/upload/bandwidth")];

pub fn normalize(doc: &Value) -> Result<Measurement, AttemptError> {
    Ok(Measurement {
        download_bps: lookup(doc, "download", DOWNLOAD)?,
        upload_bps: lookup(doc, "upload", UPLOAD)?,
        ping_ms: lookup(doc, "ping", PING)?,
    })
}

fn lookup(doc: &Value, field: &'static str, candidates: &[Candidate]) -> Result<f64, AttemptError> {
    for candidate in candidates {
        if let Some(value) = coerce(doc.pointer(candidate.pointer), field)? {
            return Ok(value * candidate.scale);
        }
    }
    Err(AttemptError::MissingField(field))
}

/// `Ok(None)` means "not here, try the next candidate". Objects count as
/// absent since they are where the nested candidates live.
fn coerce(value: Option<&Value>, field: &'static str) -> Result<Option<f64>, AttemptError> {
    let parsed = match value {
        None | Some(Value::Null) | Some(Value::Object(_)) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    parsed.map(Some).ok_or_else(|| AttemptError::Coercion {
        field,
        value: value.map(Value::to_string).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn top_level_values_pass_through() {
        let doc = json!({"ping": 12.3, "download": 54000000, "upload": 12000000});
        let m = normalize(&doc).unwrap();
        assert_eq!(m.ping_ms, 12.3);
        assert_eq!(m.download_bps, 54_000_000.0);
        assert_eq!(m.upload_bps, 12_000_000.0);
    }

    #[test]
    fn nested_bandwidth_is_multiplied_by_eight() {
        let doc = json!({
            "download": {"bandwidth": 6750000},
            "upload": {"bandwidth": 1500000},
            "ping": 8.0
        });
        let m = normalize(&doc).unwrap();
        assert_eq!(m.download_bps, 54_000_000.0);
        assert_eq!(m.upload_bps, 12_000_000.0);
        assert_eq!(m.ping_ms, 8.0);
    }

    #[test]
    fn ookla_shape() {
        let doc = json!({
            "type": "result",
            "ping": {"jitter": 0.4, "latency": 9.75, "low": 9.1, "high": 10.2},
            "download": {"bandwidth": 12500000, "bytes": 150000000, "elapsed": 12000},
            "upload": {"bandwidth": 2500000, "bytes": 30000000, "elapsed": 12000},
            "server": {"id": 1234, "name": "Example"}
        });
        let m = normalize(&doc).unwrap();
        assert_eq!(m.ping_ms, 9.75);
        assert_eq!(m.download_bps, 100_000_000.0);
        assert_eq!(m.upload_bps, 20_000_000.0);
    }

    #[test]
    fn ping_from_server_then_latency() {
        let doc = json!({"download": 1.0, "upload": 2.0, "server": {"ping": 15.5}, "latency": 99});
        assert_eq!(normalize(&doc).unwrap().ping_ms, 15.5);

        let doc = json!({"download": 1.0, "upload": 2.0, "latency": 21});
        assert_eq!(normalize(&doc).unwrap().ping_ms, 21.0);
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let doc = json!({"ping": "12.5", "download": "1000", "upload": " 500 "});
        let m = normalize(&doc).unwrap();
        assert_eq!(m.ping_ms, 12.5);
        assert_eq!(m.download_bps, 1000.0);
        assert_eq!(m.upload_bps, 500.0);
    }

    #[test]
    fn missing_field_is_reported_not_fabricated() {
        let doc = json!({"ping": 12.3, "download": 54000000});
        match normalize(&doc) {
            Err(AttemptError::MissingField(field)) => assert_eq!(field, "upload"),
            other => panic!("expected missing upload, got {other:?}"),
        }

        let doc = json!({"download": 1, "upload": 2});
        assert!(matches!(normalize(&doc), Err(AttemptError::MissingField("ping"))));
    }

    #[test]
    fn null_counts_as_missing() {
        let doc = json!({"ping": null, "download": 1, "upload": 2});
        assert!(matches!(normalize(&doc), Err(AttemptError::MissingField("ping"))));
    }

    #[test]
    fn uncoercible_value_is_hard_failure() {
        let doc = json!({"ping": "fast", "download": 1, "upload": 2, "latency": 5});
        assert!(matches!(normalize(&doc), Err(AttemptError::Coercion { field: "ping", .. })));

        let doc = json!({"ping": 1, "download": true, "upload": 2});
        assert!(matches!(normalize(&doc), Err(AttemptError::Coercion { field: "download", .. })));
    }

    #[test]
    fn non_object_document_is_missing_everything() {
        assert!(matches!(normalize(&json!([1, 2, 3])), Err(AttemptError::MissingField(_))));
    }
}
