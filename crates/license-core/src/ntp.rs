//! # External Time Sourcing
//!
//! A minimal blocking SNTP client (RFC 4330 §4) over `std::net::UdpSocket`,
//! plus the OS-level "is the system clock NTP-synchronized" indicator the
//! oracle treats as a corroborating extra source.
//!
//! Both are exposed behind traits ([`ExternalTimeSource`], [`SystemSyncProbe`])
//! so [`crate::time_oracle::TrustedTimeOracle`] can be driven by a fake clock
//! source in tests (notably a rollback simulation that requires "all external
//! probes unreachable" on demand) without touching a real network socket.

use std::fmt;
use std::net::{ToSocketAddrs, UdpSocket};
use std::process::Command;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NTP_PORT: u16 = 123;
const NTP_PACKET_LEN: usize = 48;
/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch (1970-01-01).
const NTP_UNIX_EPOCH_DELTA: u64 = 2_208_988_800;

/// Default external time source hostnames.
pub const DEFAULT_EXTERNAL_TIME_SOURCES: &[&str] =
    &["pool.ntp.org", "time.windows.com", "time.apple.com", "time.google.com"];

/// A source of external wall-clock readings, one host at a time.
///
/// Implemented by [`SntpTimeSource`] for production use; fakeable in tests.
pub trait ExternalTimeSource: fmt::Debug + Send + Sync {
    /// Attempts to read the current time from `host`, bounded by `timeout`.
    /// Returns `None` on any failure (unreachable host, malformed reply,
    /// timeout) — this is a best-effort probe, never a hard error.
    fn probe(&self, host: &str, timeout: Duration) -> Option<SystemTime>;
}

/// Probes `hosts` in order, stopping at the first successful response.
///
/// This has a named weakness: a malicious or broken answer for the first
/// host blinds the oracle to every host after it. See `DESIGN.md` for the
/// quorum-probing alternative this implementation deliberately does not take.
pub fn probe_first_success(
    source: &dyn ExternalTimeSource,
    hosts: &[String],
    timeout: Duration,
) -> Option<(String, SystemTime)> {
    hosts.iter().find_map(|host| source.probe(host, timeout).map(|t| (host.clone(), t)))
}

/// Real SNTP client over a UDP socket, one request/response per call.
#[derive(Debug, Default)]
pub struct SntpTimeSource;

impl ExternalTimeSource for SntpTimeSource {
    fn probe(&self, host: &str, timeout: Duration) -> Option<SystemTime> {
        query(host, timeout).ok()
    }
}

/// Sends a single SNTP request to `host` and parses the transmit timestamp
/// out of its reply.
///
/// # Errors
/// Returns an [`std::io::Error`] if the host cannot be resolved, the socket
/// cannot be bound, the request cannot be sent, no reply arrives within
/// `timeout`, or the reply is shorter than a well-formed NTP packet.
pub fn query(host: &str, timeout: Duration) -> std::io::Result<SystemTime> {
    let addr = (host, NTP_PORT)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| std::io::Error::other(format!("could not resolve {host}")))?;

    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.set_read_timeout(Some(timeout))?;
    socket.set_write_timeout(Some(timeout))?;
    socket.connect(addr)?;

    let mut request = [0u8; NTP_PACKET_LEN];
    // LI = 0 (no warning), VN = 3, Mode = 3 (client).
    request[0] = 0b00_011_011;
    socket.send(&request)?;

    let mut reply = [0u8; NTP_PACKET_LEN];
    let received = socket.recv(&mut reply)?;
    if received < NTP_PACKET_LEN {
        return Err(std::io::Error::other("truncated NTP reply"));
    }

    parse_transmit_timestamp(&reply)
}

fn parse_transmit_timestamp(packet: &[u8; NTP_PACKET_LEN]) -> std::io::Result<SystemTime> {
    let seconds = u32::from_be_bytes(packet[40..44].try_into().expect("4-byte slice"));
    let fraction = u32::from_be_bytes(packet[44..48].try_into().expect("4-byte slice"));

    let seconds = u64::from(seconds);
    if seconds < NTP_UNIX_EPOCH_DELTA {
        return Err(std::io::Error::other("NTP reply predates the Unix epoch"));
    }
    let unix_seconds = seconds - NTP_UNIX_EPOCH_DELTA;
    let nanos = (f64::from(fraction) / f64::from(u32::MAX) * 1_000_000_000.0) as u32;

    Ok(UNIX_EPOCH + Duration::new(unix_seconds, nanos))
}

/// Reads the OS-level "clock is NTP-synchronized" indicator.
///
/// Implemented by [`TimedatectlSyncProbe`] on systems that carry
/// `timedatectl`; fakeable in tests. Absence of an answer is not an error —
/// the oracle treats it as simply not having this corroborating source.
pub trait SystemSyncProbe: fmt::Debug + Send + Sync {
    /// `Some(true)`/`Some(false)` if the indicator is available, `None` if
    /// it could not be queried (missing binary, non-systemd host, ...).
    fn is_synchronized(&self) -> Option<bool>;
}

/// Queries `timedatectl show -p NTPSynchronized --value`.
#[derive(Debug, Default)]
pub struct TimedatectlSyncProbe;

impl SystemSyncProbe for TimedatectlSyncProbe {
    fn is_synchronized(&self) -> Option<bool> {
        let output = Command::new("timedatectl")
            .args(["show", "-p", "NTPSynchronized", "--value"])
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        match String::from_utf8(output.stdout).ok()?.trim() {
            "yes" => Some(true),
            "no" => Some(false),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet_with_transmit_timestamp(unix_seconds: u64) -> [u8; NTP_PACKET_LEN] {
        let mut packet = [0u8; NTP_PACKET_LEN];
        let ntp_seconds = (unix_seconds + NTP_UNIX_EPOCH_DELTA) as u32;
        packet[40..44].copy_from_slice(&ntp_seconds.to_be_bytes());
        packet
    }

    #[test]
    fn parses_transmit_timestamp_back_to_unix_time() {
        let packet = packet_with_transmit_timestamp(1_700_000_000);
        let parsed = parse_transmit_timestamp(&packet).unwrap();
        let secs = parsed.duration_since(UNIX_EPOCH).unwrap().as_secs();
        assert_eq!(secs, 1_700_000_000);
    }

    #[test]
    fn rejects_a_reply_that_predates_the_unix_epoch() {
        let packet = [0u8; NTP_PACKET_LEN];
        assert!(parse_transmit_timestamp(&packet).is_err());
    }

    #[derive(Debug)]
    struct StubSource {
        answers: Vec<Option<SystemTime>>,
    }

    impl ExternalTimeSource for StubSource {
        fn probe(&self, host: &str, _timeout: Duration) -> Option<SystemTime> {
            let index: usize = host.parse().unwrap();
            self.answers[index]
        }
    }

    #[test]
    fn probe_first_success_stops_at_first_reachable_host() {
        let t = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let source = StubSource { answers: vec![None, Some(t), Some(t + Duration::from_secs(1))] };
        let hosts = vec!["0".to_owned(), "1".to_owned(), "2".to_owned()];
        let (host, time) = probe_first_success(&source, &hosts, Duration::from_millis(1)).unwrap();
        assert_eq!(host, "1");
        assert_eq!(time, t);
    }

    #[test]
    fn probe_first_success_returns_none_when_all_hosts_fail() {
        let source = StubSource { answers: vec![None, None] };
        let hosts = vec!["0".to_owned(), "1".to_owned()];
        assert!(probe_first_success(&source, &hosts, Duration::from_millis(1)).is_none());
    }
}
