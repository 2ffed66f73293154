//! Command handlers -- one module per subcommand

pub mod config;
pub mod mock;
pub mod parse;
pub mod subscribe;

use colored::{ColoredString, Colorize};

use catcher_core::event::{Event, EventKind};

/// Colored event kind name for text output.
fn kind_label(kind: EventKind) -> ColoredString {
    let name = format!("{:<16}", kind.as_str());
    match kind {
        EventKind::PortUp => name.green(),
        EventKind::PortDown => name.red(),
        EventKind::PortLoopDetect => name.yellow(),
        EventKind::Unknown => name.dimmed(),
    }
}

/// One-line text form of an event.
fn event_summary(event: &Event) -> String {
    format!(
        "{} {:<15} port {:<5} {:<7} {}",
        kind_label(event.kind),
        event.host,
        event.port,
        event.speed.as_str(),
        event.duplex.as_str()
    )
}
