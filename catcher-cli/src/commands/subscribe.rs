//! `catcher subscribe` command handler
//!
//! Opens one subscription on the daemon's stream server, prints every
//! received event, and reports the running count every `--summary-secs`.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use catcher_core::event::Event;
use catcher_core::stream::{StreamMessage, SubscribeRequest};

use crate::cli::SubscribeArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `subscribe` command until Ctrl-C or the server closes the stream.
pub async fn execute(args: SubscribeArgs, writer: &OutputWriter) -> Result<(), CliError> {
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    let received = stream_events(&args, writer, shutdown).await?;
    eprintln!("client {} recv {} messages (total)", args.name, received);
    Ok(())
}

/// Subscribe and render events until `shutdown` resolves or the stream ends.
///
/// Returns the number of events received.
pub async fn stream_events(
    args: &SubscribeArgs,
    writer: &OutputWriter,
    shutdown: impl Future<Output = ()>,
) -> Result<u64, CliError> {
    let request = SubscribeRequest {
        client_name: args.name.clone(),
        events: args.events.clone(),
        nets: args.nets.clone(),
    };
    // unknown kinds would be refused by the server anyway
    request.kinds().map_err(CliError::Command)?;

    let stream = TcpStream::connect(&args.target)
        .await
        .map_err(|e| CliError::DaemonUnavailable(format!("{}: {}", args.target, e)))?;
    let (read_half, mut write_half) = stream.into_split();

    let mut payload = serde_json::to_vec(&request)?;
    payload.push(b'\n');
    write_half.write_all(&payload).await?;
    info!(target = %args.target, name = %args.name, "subscription request sent");

    let mut lines = BufReader::new(read_half).lines();
    let mut summary = tokio::time::interval(Duration::from_secs(args.summary_secs));
    summary.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    summary.tick().await;
    let mut received = 0u64;

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("stream closed by server");
                    break;
                };
                match serde_json::from_str::<StreamMessage>(&line) {
                    Ok(StreamMessage::Event(event)) => {
                        received += 1;
                        writer.render_line(&ReceivedEvent { client: &args.name, event: &event })?;
                    }
                    Ok(StreamMessage::Error(response)) => {
                        return Err(CliError::Rejected(response.error));
                    }
                    Err(e) => warn!(error = %e, "ignoring malformed stream line"),
                }
            }
            _ = summary.tick() => {
                eprintln!("client {} recv {} messages", args.name, received);
            }
            _ = &mut shutdown => {
                debug!("subscribe interrupted");
                break;
            }
        }
    }

    Ok(received)
}

/// One received event; serializes exactly like the wire event.
#[derive(Serialize)]
struct ReceivedEvent<'a> {
    #[serde(skip)]
    client: &'a str,
    #[serde(flatten)]
    event: &'a Event,
}

impl Render for ReceivedEvent<'_> {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "client {} recv {}", self.client, super::event_summary(self.event))
    }
}
