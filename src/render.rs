//! Invocation of the external graph renderer
//!
//! The core only writes DOT text. Turning it into an image is delegated to a
//! Graphviz-compatible program run as `<program> -T<format> <dot> -o <image>`.
//! A failing renderer is reported to the caller, who treats it as a
//! diagnostic: the trace data already written is never affected.

use crate::error::{Result, TraceError};
use std::path::{Path, PathBuf};
use std::process::Command;

/// External renderer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphRenderer {
    program: String,
    format: String,
}

impl Default for GraphRenderer {
    fn default() -> Self {
        Self::new("dot", "png")
    }
}

impl GraphRenderer {
    pub fn new(program: &str, format: &str) -> Self {
        Self {
            program: program.to_string(),
            format: format.to_string(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// Image path for `dot_path`: same stem, format as extension
    pub fn image_path(&self, dot_path: &Path) -> PathBuf {
        dot_path.with_extension(&self.format)
    }

    /// Render `dot_path` next to itself, returning the image path
    pub fn render(&self, dot_path: &Path) -> Result<PathBuf> {
        let image_path = self.image_path(dot_path);
        self.render_to(dot_path, &image_path)?;
        Ok(image_path)
    }

    /// Render `dot_path` into `image_path`
    ///
    /// Fails with `RenderFailed` if the program cannot be started or exits
    /// unsuccessfully.
    pub fn render_to(&self, dot_path: &Path, image_path: &Path) -> Result<()> {
        tracing::debug!(
            program = %self.program,
            input = %dot_path.display(),
            output = %image_path.display(),
            "running graph renderer"
        );

        let output = Command::new(&self.program)
            .arg(format!("-T{}", self.format))
            .arg(dot_path)
            .arg("-o")
            .arg(image_path)
            .output()
            .map_err(|e| TraceError::RenderFailed {
                program: self.program.clone(),
                reason: format!("failed to start: {e}"),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = match stderr.trim() {
            "" => format!("exited with {}", output.status),
            detail => format!("exited with {}: {}", output.status, detail),
        };
        Err(TraceError::RenderFailed {
            program: self.program.clone(),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_renderer_is_graphviz_png() {
        let renderer = GraphRenderer::default();
        assert_eq!(renderer.program(), "dot");
        assert_eq!(renderer.format(), "png");
    }

    #[test]
    fn test_image_path_swaps_extension() {
        let renderer = GraphRenderer::new("dot", "svg");
        assert_eq!(
            renderer.image_path(Path::new("out/call_context_tree.dot")),
            PathBuf::from("out/call_context_tree.svg")
        );
    }

    #[test]
    fn test_missing_program_is_render_failure() {
        let renderer = GraphRenderer::new("calltrace-no-such-renderer", "png");
        let err = renderer.render(Path::new("graph.dot")).unwrap_err();
        match err {
            TraceError::RenderFailed { program, reason } => {
                assert_eq!(program, "calltrace-no-such-renderer");
                assert!(reason.contains("failed to start"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_render_failure() {
        let renderer = GraphRenderer::new("false", "png");
        let err = renderer.render(Path::new("graph.dot")).unwrap_err();
        assert!(matches!(err, TraceError::RenderFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_exit() {
        let renderer = GraphRenderer::new("true", "png");
        let image = renderer.render(Path::new("graph.dot")).unwrap();
        assert_eq!(image, PathBuf::from("graph.png"));
    }
}
