//! Wireless link rate probing.
//!
//! Each platform is an ordered list of sources. A source is a command plus the
//! parsers tried against its output; the first parser to produce a number
//! wins. Rates are reported as-is in Mb/s, whatever unit label the tool
//! printed. On Linux a zero from `iwconfig` or `iw` moves on to the next tool.

pub mod parse;
pub mod platform;

use tracing::{debug, info};

use crate::command::{CommandRunner, SystemRunner};
use crate::settings::Settings;
pub use platform::PlatformKind;

type Parser = fn(&str) -> Option<f64>;

const AIRPORT_PATH: &str =
    "/System/Library/PrivateFrameworks/Apple80211.framework/Versions/Current/Resources/airport";
const DEFAULT_INTERFACE: &str = "wlan0";

const NETSH_PARSERS: &[Parser] =
    &[parse::netsh_receive_rate, parse::netsh_transmit_rate, parse::bare_mbps];
const IWCONFIG_PARSERS: &[Parser] = &[parse::iwconfig_bit_rate, parse::iw_bitrate];
const IW_PARSERS: &[Parser] = &[parse::iw_bitrate, parse::iwconfig_bit_rate];
const NMCLI_PARSERS: &[Parser] = &[parse::nmcli_active_bitrate];
const AIRPORT_PARSERS: &[Parser] = &[parse::airport_last_tx_rate, parse::bare_mb_per_s];
const PROFILER_PARSERS: &[Parser] = &[parse::profiler_transmit_rate];

struct Source {
    program: &'static str,
    args: Vec<String>,
    parsers: &'static [Parser],
    /// A zero reading counts as no reading and the next source is tried.
    zero_is_absent: bool,
}

/// Link rate of the active wireless adapter in Mb/s, or `None` when unknown.
pub async fn probe_link_speed(settings: &Settings) -> Option<f64> {
    let runner = SystemRunner::new(settings.probe_timeout());
    probe_with(PlatformKind::current(), &runner, settings.interface.as_deref()).await
}

pub async fn probe_with<R: CommandRunner>(
    platform: PlatformKind,
    runner: &R,
    interface: Option<&str>,
) -> Option<f64> {
    let sources = match platform {
        PlatformKind::Windows => windows_sources(),
        PlatformKind::Linux => {
            let iface = match interface {
                Some(name) => name.to_string(),
                None => discover_interface(runner).await,
            };
            linux_sources(&iface)
        }
        PlatformKind::MacOs => macos_sources(),
        PlatformKind::Unknown => {
            debug!("unrecognized platform, link speed unknown");
            return None;
        }
    };

    for source in &sources {
        let args: Vec<&str> = source.args.iter().map(String::as_str).collect();
        let output = runner.run(source.program, &args).await;
        if output.is_empty() {
            debug!(program = source.program, "no output");
            continue;
        }

        match source.parsers.iter().find_map(|parse| parse(&output)) {
            Some(rate) if rate == 0.0 && source.zero_is_absent => {
                debug!(program = source.program, "zero rate, trying next source");
            }
            Some(rate) => {
                info!(program = source.program, rate, "link speed detected");
                return Some(rate);
            }
            None => debug!(program = source.program, "no rate in output"),
        }
    }

    None
}

async fn discover_interface<R: CommandRunner>(runner: &R) -> String {
    let output = runner.run("iw", &["dev"]).await;
    parse::iw_interface(&output).unwrap_or_else(|| DEFAULT_INTERFACE.to_string())
}

fn windows_sources() -> Vec<Source> {
    vec![Source {
        program: "netsh",
        args: vec!["wlan".into(), "show".into(), "interfaces".into()],
        parsers: NETSH_PARSERS,
        zero_is_absent: false,
    }]
}

fn linux_sources(iface: &str) -> Vec<Source> {
    vec![
        Source {
            program: "iwconfig",
            args: Vec::new(),
            parsers: IWCONFIG_PARSERS,
            zero_is_absent: true,
        },
        Source {
            program: "iw",
            args: vec!["dev".into(), iface.to_string(), "link".into()],
            parsers: IW_PARSERS,
            zero_is_absent: true,
        },
        Source {
            program: "nmcli",
            args: ["-t", "-f", "ACTIVE,SSID,BITRATE", "dev", "wifi"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            parsers: NMCLI_PARSERS,
            zero_is_absent: false,
        },
    ]
}

fn macos_sources() -> Vec<Source> {
    vec![
        Source {
            program: AIRPORT_PATH,
            args: vec!["-I".into()],
            parsers: AIRPORT_PARSERS,
            zero_is_absent: false,
        },
        Source {
            program: "system_profiler",
            args: vec!["SPAirPortDataType".into()],
            parsers: PROFILER_PARSERS,
            zero_is_absent: false,
        },
    ]
}
