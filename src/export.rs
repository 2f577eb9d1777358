//! Writing a session's reports to disk
//!
//! One call writes every report named in [`OutputConfig`]:
//!
//! - the indented hierarchy (`call_graph.txt`)
//! - the raw-edge DOT graph, one node per call instance (`dynamic_call_graph.dot`)
//! - the aggregated DOT graph with call counts (`call_context_tree.dot`)
//! - the path profile table (`path_profiles.txt`) and optionally its JSON form
//!
//! A report that cannot be written does not stop the others, and a failing
//! renderer never invalidates the DOT files already written. Every failure is
//! collected in the returned [`ExportSummary`].

use crate::config::OutputConfig;
use crate::dot::DotMode;
use crate::error::TraceError;
use crate::render::GraphRenderer;
use crate::session::Session;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Outcome of [`export_reports`]
#[derive(Debug, Default)]
pub struct ExportSummary {
    /// Report files written
    pub written: Vec<PathBuf>,
    /// Images produced by the renderer
    pub rendered: Vec<PathBuf>,
    /// Sink and renderer failures, in the order they happened
    pub failures: Vec<TraceError>,
}

impl ExportSummary {
    /// Whether every report (and image, if requested) was produced
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn write(&mut self, path: PathBuf, contents: &str) {
        match fs::write(&path, contents) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), bytes = contents.len(), "report written");
                self.written.push(path);
            }
            Err(e) => self.fail(TraceError::sink(path.display().to_string(), e)),
        }
    }

    fn fail(&mut self, error: TraceError) {
        tracing::warn!(error = %error, "report export failed");
        self.failures.push(error);
    }
}

/// Write all reports of `session` into `output.directory`
///
/// The directory is created if missing. With a `renderer`, both DOT files are
/// rendered next to themselves after they have been written.
pub fn export_reports(
    session: &Session,
    output: &OutputConfig,
    renderer: Option<&GraphRenderer>,
) -> ExportSummary {
    let mut summary = ExportSummary::default();
    let dir = output.directory.as_path();

    if let Err(e) = fs::create_dir_all(dir) {
        summary.fail(TraceError::sink(dir.display().to_string(), e));
    }

    let graph = session.call_graph();
    let profile = session.path_profile();

    let dynamic_graph = dir.join(&output.dynamic_graph_file);
    let static_graph = dir.join(&output.static_graph_file);

    summary.write(dir.join(&output.hierarchy_file), &graph.export_hierarchy());
    summary.write(
        dynamic_graph.clone(),
        &graph.export_graph_description(DotMode::RawEdges, output.theme),
    );
    summary.write(
        static_graph.clone(),
        &graph.export_graph_description(DotMode::AggregatedEdges, output.theme),
    );
    summary.write(dir.join(&output.profile_file), &profile.export());

    if let Some(json_file) = &output.profile_json_file {
        let path = dir.join(json_file);
        match profile.to_json() {
            Ok(json) => summary.write(path, &json),
            Err(e) => summary.fail(TraceError::sink(
                path.display().to_string(),
                io::Error::new(io::ErrorKind::InvalidData, e),
            )),
        }
    }

    if let Some(renderer) = renderer {
        for dot in [dynamic_graph, static_graph] {
            render_written(&mut summary, renderer, &dot);
        }
    }

    summary
}

fn render_written(summary: &mut ExportSummary, renderer: &GraphRenderer, dot: &Path) {
    if !summary.written.iter().any(|p| p == dot) {
        return;
    }
    match renderer.render(dot) {
        Ok(image) => {
            tracing::info!(image = %image.display(), "graph rendered");
            summary.rendered.push(image);
        }
        Err(e) => summary.fail(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dot::DotTheme;

    fn demo_session() -> Session {
        let session = Session::new();
        session.instrument("D", || {
            session.instrument("A", || session.instrument("C", || ()));
            session.instrument("B", || ());
        });
        session
    }

    #[test]
    fn test_writes_all_reports() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputConfig::in_directory(dir.path());

        let summary = export_reports(&demo_session(), &output, None);

        assert!(summary.is_complete());
        assert_eq!(summary.written.len(), 4);
        assert!(summary.rendered.is_empty());

        let hierarchy = fs::read_to_string(dir.path().join("call_graph.txt")).unwrap();
        assert_eq!(hierarchy, "Call Graph Tree:\nD\n  A\n    C\n  B\n");

        let dynamic = fs::read_to_string(dir.path().join("dynamic_call_graph.dot")).unwrap();
        assert!(dynamic.contains("\"A\" -> \"C#1\";"));

        let aggregated = fs::read_to_string(dir.path().join("call_context_tree.dot")).unwrap();
        assert!(aggregated.contains("\"D\" -> \"A\" [label=\"1\"];"));

        let table = fs::read_to_string(dir.path().join("path_profiles.txt")).unwrap();
        assert!(table.contains("D -> A -> C"));
    }

    #[test]
    fn test_optional_json_and_theme() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputConfig {
            profile_json_file: Some("path_profiles.json".to_string()),
            theme: DotTheme::Dark,
            ..OutputConfig::in_directory(dir.path())
        };

        let summary = export_reports(&demo_session(), &output, None);

        assert_eq!(summary.written.len(), 5);
        let json = fs::read_to_string(dir.path().join("path_profiles.json")).unwrap();
        assert!(json.contains("\"D -> B\""));
        let dot = fs::read_to_string(dir.path().join("call_context_tree.dot")).unwrap();
        assert!(dot.contains("bgcolor=\"black\""));
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let summary = export_reports(&demo_session(), &OutputConfig::in_directory(&nested), None);

        assert!(summary.is_complete());
        assert!(nested.join("call_graph.txt").exists());
    }

    #[test]
    fn test_unwritable_directory_collects_failures() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "").unwrap();

        let summary = export_reports(&demo_session(), &OutputConfig::in_directory(&blocker), None);

        assert!(summary.written.is_empty());
        assert_eq!(summary.failures.len(), 5);
        assert!(summary
            .failures
            .iter()
            .all(|e| matches!(e, TraceError::SinkUnavailable { .. })));
    }

    #[test]
    fn test_render_failure_keeps_dot_files() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = GraphRenderer::new("calltrace-no-such-renderer", "png");

        let summary = export_reports(
            &demo_session(),
            &OutputConfig::in_directory(dir.path()),
            Some(&renderer),
        );

        assert_eq!(summary.written.len(), 4);
        assert_eq!(summary.failures.len(), 2);
        assert!(summary
            .failures
            .iter()
            .all(|e| matches!(e, TraceError::RenderFailed { .. })));
        assert!(dir.path().join("dynamic_call_graph.dot").exists());
    }
}
