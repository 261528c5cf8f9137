//! Text parsers for the output of native wireless tools.
//!
//! Every parser is pure and returns `None` when its pattern is absent or the
//! captured token is not a number. A rate of zero is still a reading.

use std::sync::LazyLock;

use regex::Regex;

static NETSH_RECEIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Receive rate \(Mbps\)\s*:\s*(\d+(?:\.\d+)?)").unwrap());
static NETSH_TRANSMIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Transmit rate \(Mbps\)\s*:\s*(\d+(?:\.\d+)?)").unwrap());
static BARE_MBPS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*Mbps").unwrap());
static BIT_RATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Bit Rate[:=]\s*(\d+(?:\.\d+)?)\s*Mb").unwrap());
static TX_RX_BITRATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:tx|rx) bitrate[:=]?\s*(\d+(?:\.\d+)?)\s*M").unwrap());
static TRAILING_M: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*M").unwrap());
static LAST_TX_RATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"lastTxRate:\s*(\d+(?:\.\d+)?)").unwrap());
static BARE_MB_PER_S: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*Mb/s").unwrap());
static TRANSMIT_RATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Transmit Rate:\s*(\d+(?:\.\d+)?)").unwrap());
static IW_INTERFACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*Interface\s+(\S+)").unwrap());

fn capture_rate(re: &Regex, text: &str) -> Option<f64> {
    let token = re.captures(text)?.get(1)?.as_str();
    token
        .parse::<f64>()
        .ok()
        .filter(|rate| rate.is_finite())
}

/// `netsh wlan show interfaces`: `Receive rate (Mbps) : 866.7`
pub fn netsh_receive_rate(text: &str) -> Option<f64> {
    capture_rate(&NETSH_RECEIVE, text)
}

/// `netsh wlan show interfaces`: `Transmit rate (Mbps) : 780`
pub fn netsh_transmit_rate(text: &str) -> Option<f64> {
    capture_rate(&NETSH_TRANSMIT, text)
}

/// First `<x> Mbps` anywhere in the text.
pub fn bare_mbps(text: &str) -> Option<f64> {
    capture_rate(&BARE_MBPS, text)
}

/// `iwconfig`: `Bit Rate=54 Mb/s`
pub fn iwconfig_bit_rate(text: &str) -> Option<f64> {
    capture_rate(&BIT_RATE, text)
}

/// `iw dev <iface> link`: `tx bitrate: 144.4 MBit/s` or the rx equivalent.
pub fn iw_bitrate(text: &str) -> Option<f64> {
    capture_rate(&TX_RX_BITRATE, text)
}

/// `nmcli -t -f ACTIVE,SSID,BITRATE dev wifi`, active row only.
///
/// The SSID column may itself contain digits or escaped colons, so only the
/// last column of the row is inspected.
pub fn nmcli_active_bitrate(text: &str) -> Option<f64> {
    text.lines()
        .filter(|line| line.starts_with("yes:"))
        .find_map(|line| {
            let bitrate = line.rsplit(':').next()?;
            capture_rate(&TRAILING_M, bitrate)
        })
}

/// `airport -I`: `lastTxRate: 866`
pub fn airport_last_tx_rate(text: &str) -> Option<f64> {
    capture_rate(&LAST_TX_RATE, text)
}

/// First `<x> Mb/s` anywhere in the text.
pub fn bare_mb_per_s(text: &str) -> Option<f64> {
    capture_rate(&BARE_MB_PER_S, text)
}

/// `system_profiler SPAirPortDataType`: `Transmit Rate: 585`
pub fn profiler_transmit_rate(text: &str) -> Option<f64> {
    capture_rate(&TRANSMIT_RATE, text)
}

/// First wireless interface name listed by `iw dev`.
pub fn iw_interface(text: &str) -> Option<String> {
    IW_INTERFACE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
