//! `catcher mock` command handler
//!
//! Sends sample device syslog lines to the daemon over UDP. The sequence is
//! deterministic: the n-th datagram is always the same line, which makes a
//! mock run reproducible against a subscription.

use std::io::Write;
use std::time::Duration;

use serde::Serialize;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::cli::MockArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Number of distinct line shapes in one generator cycle.
const LINE_SHAPES: u64 = 10;

/// Deterministic sample line generator.
///
/// Cycles through link up/down and loop-detect lines for hosts in
/// `192.168.1.0/24` and `172.16.0.0/24`, a line with an unrecognised layout,
/// and unmatched noise.
#[derive(Debug, Default)]
pub struct SampleGenerator {
    seq: u64,
}

impl SampleGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lines produced so far.
    pub fn produced(&self) -> u64 {
        self.seq
    }

    fn line_for(seq: u64) -> String {
        // spread hosts across 1..=254 and ports across 1..=10
        let host = (seq * 37) % 254 + 1;
        let port = (seq * 7) % 10 + 1;
        match seq % LINE_SHAPES {
            0 => format!("192.168.1.{host} - - - port {port} change link state to up with 10MB FULL"),
            1 => format!(
                "192.168.1.{host} - - - port Eth1/0/{port} change link state to up with 100MB half-duplex"
            ),
            2 => format!("192.168.1.{host} - - - port {port} change link state to down"),
            3 => format!("192.168.1.{host} - - - port {port} disabled by loop detect service"),
            4 => format!(
                "172.16.0.{host} - - - port Ethernet1/{port} change link state to up with 100MB half-duplex"
            ),
            5 => format!("172.16.0.{host} - - - port {port} change link state to up with 10 full-duplex"),
            6 => format!("172.16.0.{host} - - - port Eth1/0/{port} change link state to 100MB full-duplex"),
            7 => format!("172.16.0.{host} - - - port {port} disabled by loop detect service"),
            _ => "127.0.0.1 - - - random flood message".to_owned(),
        }
    }
}

impl Iterator for SampleGenerator {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let line = Self::line_for(self.seq);
        self.seq += 1;
        Some(line)
    }
}

/// Execute the `mock` command.
pub async fn execute(args: MockArgs, writer: &OutputWriter) -> Result<(), CliError> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket
        .connect(&args.target)
        .await
        .map_err(|e| CliError::DaemonUnavailable(format!("{}: {}", args.target, e)))?;
    info!(target = %args.target, interval_ms = args.interval_ms, count = ?args.count, "sending mock syslog traffic");

    let mut generator = SampleGenerator::new();
    let mut interval = tokio::time::interval(Duration::from_millis(args.interval_ms));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        if args.count.is_some_and(|limit| generator.produced() >= limit) {
            break;
        }
        tokio::select! {
            _ = interval.tick() => {
                let seq = generator.produced();
                let Some(line) = generator.next() else { break };
                if let Err(e) = socket.send(line.as_bytes()).await {
                    // ICMP unreachable from a previous datagram surfaces here
                    warn!(error = %e, "send failed");
                    continue;
                }
                writer.render_line(&SentLine { seq, line: &line })?;
            }
            _ = &mut ctrl_c => {
                debug!("mock interrupted");
                break;
            }
        }
    }

    writer.render(&MockSummary {
        target: args.target,
        sent: generator.produced(),
    })
}

/// One sent datagram.
#[derive(Serialize)]
struct SentLine<'a> {
    seq: u64,
    line: &'a str,
}

impl Render for SentLine<'_> {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "send message - {}", self.line)
    }
}

/// Final report of a mock run.
#[derive(Serialize)]
pub struct MockSummary {
    /// Syslog target address
    pub target: String,
    /// Datagrams generated
    pub sent: u64,
}

impl Render for MockSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;
        writeln!(w, "Sent {} lines to {}", self.sent.to_string().bold(), self.target)
    }
}
