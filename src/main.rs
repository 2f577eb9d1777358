use anyhow::{Context, Result};
use calltrace::cli::Cli;
use calltrace::export::export_reports;
use calltrace::Session;
use clap::Parser;
use std::fs;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = args.resolve_config()?;
    fs::create_dir_all(&config.output.directory).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output.directory.display()
        )
    })?;

    let session = Session::from_config(&config);
    {
        calltrace::trace_scope!(session, "main");
        args.scenario.run(&session);
    }

    print!("{}", session.export_adjacency());

    if let Err(e) = session.flush() {
        eprintln!("warning: {e}");
    }

    let renderer = config.renderer();
    let summary = export_reports(&session, &config.output, renderer.as_ref());

    for path in &summary.written {
        eprintln!("Wrote {}", path.display());
    }
    for image in &summary.rendered {
        eprintln!("Rendered {}", image.display());
    }
    // Rendering and sink failures are reported but never change the exit status
    for failure in &summary.failures {
        eprintln!("warning: {failure}");
    }

    let diagnostics = session.diagnostics();
    if !diagnostics.is_clean() {
        eprintln!(
            "warning: {} rejected frames, {} clock regressions, {} nesting violations, {} lost calls, {} sink failures",
            diagnostics.rejected_frames,
            diagnostics.clock_regressions,
            diagnostics.nesting_violations,
            diagnostics.lost_calls,
            diagnostics.sink_failures
        );
    }

    Ok(())
}
