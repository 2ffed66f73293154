//! `catcher parse` command handler
//!
//! Runs the configured templates over lines from a file or stdin, without a
//! daemon, and reports each line's event or classified failure.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use catcher_core::config::{CatcherConfig, default_templates};
use catcher_core::error::ParseError;
use catcher_core::event::Event;
use catcher_log_pipeline::TemplateParser;

use crate::cli::ParseArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `parse` command.
pub async fn execute(
    args: ParseArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let templates = load_templates(config_path).await?;
    let parser = TemplateParser::new(&templates)?;

    let input = match &args.file {
        Some(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
            CliError::Command(format!("failed to read {}: {}", path.display(), e))
        })?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };

    let report = parse_lines(&parser, &input);
    info!(
        total = report.results.len(),
        parsed = report.parsed,
        "parse finished"
    );
    writer.render(&report)
}

/// Templates from the config file, or the built-in set when the file is absent.
async fn load_templates(config_path: &Path) -> Result<Vec<String>, CliError> {
    if tokio::fs::try_exists(config_path).await.unwrap_or(false) {
        Ok(CatcherConfig::load(config_path).await?.syslog.templates)
    } else {
        warn!(path = %config_path.display(), "config file not found, using default templates");
        Ok(default_templates())
    }
}

/// Parse every non-blank line of `input`.
pub fn parse_lines(parser: &TemplateParser, input: &str) -> ParseReport {
    let mut report = ParseReport::default();
    for (idx, raw) in input.lines().enumerate() {
        let line = raw.trim_end_matches(['\r', '\0']).trim_end();
        if line.trim().is_empty() {
            continue;
        }
        let result = match parser.parse(line) {
            Ok(event) => {
                report.parsed += 1;
                LineResult::parsed(idx + 1, line, event)
            }
            Err(e) => {
                match e {
                    ParseError::UnknownFormat { .. } => report.unknown_format += 1,
                    ParseError::MalformedField { .. } => report.malformed += 1,
                }
                LineResult::failed(idx + 1, line, &e)
            }
        };
        report.results.push(result);
    }
    report
}

/// Outcome of one input line.
#[derive(Debug, Serialize)]
pub struct LineResult {
    /// 1-based line number in the input
    pub line_no: usize,
    /// The input line
    pub line: String,
    /// Parsed event, when successful
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<Event>,
    /// Failure class (`unknown_format`, `malformed_field`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    /// Failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LineResult {
    fn parsed(line_no: usize, line: &str, event: Event) -> Self {
        Self {
            line_no,
            line: line.to_owned(),
            event: Some(event),
            reason: None,
            error: None,
        }
    }

    fn failed(line_no: usize, line: &str, error: &ParseError) -> Self {
        Self {
            line_no,
            line: line.to_owned(),
            event: None,
            reason: Some(error.reason_label()),
            error: Some(error.to_string()),
        }
    }
}

/// Per-line results plus totals.
#[derive(Debug, Default, Serialize)]
pub struct ParseReport {
    pub results: Vec<LineResult>,
    pub parsed: usize,
    pub unknown_format: usize,
    pub malformed: usize,
}

impl Render for ParseReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        for result in &self.results {
            match (&result.event, &result.error) {
                (Some(event), _) => writeln!(
                    w,
                    "{:>5} {}  {}",
                    result.line_no,
                    "OK   ".green(),
                    super::event_summary(event)
                )?,
                (None, Some(error)) if result.reason == Some("unknown_format") => {
                    writeln!(w, "{:>5} {}  {}", result.line_no, "SKIP ".dimmed(), error)?
                }
                (None, error) => writeln!(
                    w,
                    "{:>5} {}  {}",
                    result.line_no,
                    "ERROR".red().bold(),
                    error.as_deref().unwrap_or("")
                )?,
            }
        }

        writeln!(w)?;
        writeln!(
            w,
            "{} lines: {} parsed, {} unknown format, {} malformed",
            self.results.len(),
            self.parsed.to_string().green(),
            self.unknown_format,
            self.malformed.to_string().red()
        )?;
        Ok(())
    }
}
