//! TOML configuration for a tracing session
//!
//! Every key is optional; an empty file yields the defaults below, which
//! reproduce the file names the tool has always written. Relative paths,
//! including the event log path, are resolved against `output.directory`.
//!
//! # Example calltrace.toml
//!
//! ```toml
//! strict_nesting = false
//!
//! [event_log]
//! enabled = true
//! path = "event_log.txt"
//! append = true
//!
//! [output]
//! directory = "trace-out"
//! hierarchy_file = "call_graph.txt"
//! dynamic_graph_file = "dynamic_call_graph.dot"
//! static_graph_file = "call_context_tree.dot"
//! profile_file = "path_profiles.txt"
//! profile_json_file = "path_profiles.json"
//! theme = "dark"
//!
//! [render]
//! enabled = true
//! program = "dot"
//! format = "svg"
//! ```

use crate::dot::DotTheme;
use crate::render::GraphRenderer;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TraceConfig {
    /// Panic on out-of-order guard disposal instead of recording a violation
    pub strict_nesting: bool,

    pub event_log: EventLogConfig,

    pub output: OutputConfig,

    pub render: RenderConfig,
}

impl TraceConfig {
    /// Load configuration from a TOML file
    ///
    /// # Example
    ///
    /// ```no_run
    /// use calltrace::config::TraceConfig;
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = TraceConfig::from_file("calltrace.toml")?;
    /// println!("Reports go to {}", config.output.directory.display());
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML")
    }

    /// Event log location, relative paths resolved against the output directory
    pub fn event_log_path(&self) -> PathBuf {
        self.output.directory.join(&self.event_log.path)
    }

    /// Renderer to run after export, if rendering is enabled
    pub fn renderer(&self) -> Option<GraphRenderer> {
        self.render
            .enabled
            .then(|| GraphRenderer::new(&self.render.program, &self.render.format))
    }
}

/// `[event_log]` section
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EventLogConfig {
    pub enabled: bool,
    pub path: PathBuf,
    /// Keep lines from previous runs
    pub append: bool,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("event_log.txt"),
            append: true,
        }
    }
}

/// `[output]` section: where exports are written
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub hierarchy_file: String,
    /// Raw-edge DOT file (one node per call instance)
    pub dynamic_graph_file: String,
    /// Aggregated-edge DOT file (edges labeled with counts)
    pub static_graph_file: String,
    pub profile_file: String,
    pub profile_json_file: Option<String>,
    pub theme: DotTheme,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            hierarchy_file: "call_graph.txt".to_string(),
            dynamic_graph_file: "dynamic_call_graph.dot".to_string(),
            static_graph_file: "call_context_tree.dot".to_string(),
            profile_file: "path_profiles.txt".to_string(),
            profile_json_file: None,
            theme: DotTheme::Light,
        }
    }
}

impl OutputConfig {
    /// Defaults rooted at `directory`
    pub fn in_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }
}

/// `[render]` section: external graph renderer
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub enabled: bool,
    pub program: String,
    /// Output format passed as `-T<format>`, also the image extension
    pub format: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            program: "dot".to_string(),
            format: "png".to_string(),
        }
    }
}
