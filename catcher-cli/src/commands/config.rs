//! `catcher config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use catcher_core::config::CatcherConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Section names accepted by `config show --section`.
const SECTIONS: [&str; 5] = ["general", "syslog", "broker", "stream", "metrics"];

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Load and validate the configuration file, reporting any errors.
///
/// Template compile errors are reported too, since the daemon would refuse
/// to start with them.
///
/// # Errors
///
/// Returns `CliError::Config` if validation fails.
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let errors = match CatcherConfig::load(config_path).await {
        Ok(config) => match catcher_log_pipeline::TemplateParser::new(&config.syslog.templates) {
            Ok(_) => Vec::new(),
            Err(e) => vec![e.to_string()],
        },
        Err(e) => vec![e.to_string()],
    };

    let report = ConfigValidationReport {
        source: config_path.display().to_string(),
        valid: errors.is_empty(),
        errors,
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Load and display the effective configuration (file + env overrides + defaults).
///
/// # Errors
///
/// Returns `CliError::Core` if loading fails or `CliError::Command` if the
/// section name is invalid.
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let config = CatcherConfig::load(config_path).await?;
    let report = build_report(&config, config_path, section)?;
    writer.render(&report)
}

fn build_report(
    config: &CatcherConfig,
    config_path: &Path,
    section: Option<String>,
) -> Result<ConfigReport, CliError> {
    let config_toml = match section.as_deref() {
        None => to_toml(config),
        Some("general") => to_toml(&config.general),
        Some("syslog") => to_toml(&config.syslog),
        Some("broker") => to_toml(&config.broker),
        Some("stream") => to_toml(&config.stream),
        Some("metrics") => to_toml(&config.metrics),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    };

    Ok(ConfigReport {
        source: config_path.display().to_string(),
        section,
        config_toml,
        config: serde_json::to_value(config)?,
    })
}

fn to_toml<T: Serialize>(value: &T) -> String {
    toml::to_string_pretty(value).unwrap_or_else(|e| format!("(serialization error: {})", e))
}

/// Configuration display report.
///
/// Text output prints the TOML form; JSON output carries the full config.
#[derive(Serialize)]
pub struct ConfigReport {
    /// Configuration file path
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Serialized TOML configuration
    #[serde(skip)]
    pub config_toml: String,
    /// Effective configuration
    pub config: serde_json::Value,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
///
/// Contains validation result and any error messages encountered.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    /// Configuration file path
    pub source: String,
    /// Whether the configuration is valid
    pub valid: bool,
    /// Validation error messages (empty if valid)
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;

    #[test]
    fn test_build_report_full_config() {
        let config = CatcherConfig::default();
        let report = build_report(&config, Path::new("catcher.toml"), None).unwrap();
        assert!(report.config_toml.contains("[syslog]"));
        assert!(report.config_toml.contains("[stream]"));
        assert_eq!(report.config["stream"]["idle_timeout_secs"], 180);
    }

    #[test]
    fn test_build_report_single_section() {
        let config = CatcherConfig::default();
        let report =
            build_report(&config, Path::new("catcher.toml"), Some("broker".to_owned())).unwrap();
        assert!(report.config_toml.contains("queue_capacity"));
        assert!(!report.config_toml.contains("templates"));
    }

    #[test]
    fn test_build_report_unknown_section() {
        let config = CatcherConfig::default();
        let err = build_report(&config, Path::new("catcher.toml"), Some("alerts".to_owned()))
            .err()
            .expect("unknown section must fail");
        assert!(err.to_string().contains("general, syslog, broker, stream, metrics"));
    }

    #[test]
    fn test_validation_report_text() {
        let report = ConfigValidationReport {
            source: "catcher.toml".to_owned(),
            valid: false,
            errors: vec!["broker.queue_capacity: must be greater than 0".to_owned()],
        };
        let mut buf = Vec::new();
        report.render_text(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("INVALID"));
        assert!(text.contains("queue_capacity"));
    }

    #[tokio::test]
    async fn test_validate_reports_bad_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catcher.toml");
        std::fs::write(&path, "[syslog]\ntemplates = [\"link_flap ~ $device_addr$\"]\n").unwrap();

        let writer = OutputWriter::new(OutputFormat::Json);
        let err = execute_validate(&path, &writer).await.unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_validate_accepts_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catcher.toml");
        std::fs::write(&path, "").unwrap();

        let writer = OutputWriter::new(OutputFormat::Json);
        execute_validate(&path, &writer).await.unwrap();
    }
}
