//! CLI argument parsing for calltrace

use crate::config::TraceConfig;
use crate::dot::DotTheme;
use crate::scenarios::Scenario;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "calltrace")]
#[command(version)]
#[command(about = "Trace a demo program's calls and export graphs and path profiles", long_about = None)]
pub struct Cli {
    /// Demo call pattern to run
    #[arg(long, value_enum, default_value = "basic")]
    pub scenario: Scenario,

    /// Directory for reports (overrides [output] directory)
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Event log file (overrides [event_log] path)
    #[arg(long = "event-log", value_name = "FILE", conflicts_with = "no_event_log")]
    pub event_log: Option<PathBuf>,

    /// Do not write an event log
    #[arg(long = "no-event-log")]
    pub no_event_log: bool,

    /// Color theme of the DOT graphs
    #[arg(long, value_enum)]
    pub theme: Option<DotTheme>,

    /// Render the DOT graphs with the configured program (Graphviz `dot` by default)
    #[arg(long)]
    pub render: bool,

    /// Also write the path profile as JSON
    #[arg(long)]
    pub json: bool,

    /// Panic on out-of-order tracer disposal
    #[arg(long = "strict-nesting")]
    pub strict_nesting: bool,

    /// Enable debug tracing output (to stderr)
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Configuration file (or defaults) with command-line overrides applied
    pub fn resolve_config(&self) -> Result<TraceConfig> {
        let mut config = match &self.config {
            Some(path) => TraceConfig::from_file(path)?,
            None => TraceConfig::default(),
        };

        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
        if let Some(path) = &self.event_log {
            config.event_log.enabled = true;
            config.event_log.path = path.clone();
        }
        if self.no_event_log {
            config.event_log.enabled = false;
        }
        if let Some(theme) = self.theme {
            config.output.theme = theme;
        }
        if self.render {
            config.render.enabled = true;
        }
        if self.json && config.output.profile_json_file.is_none() {
            config.output.profile_json_file = Some("path_profiles.json".to_string());
        }
        config.strict_nesting |= self.strict_nesting;

        Ok(config)
    }
}
