//! Calltrace - in-process call graph and path profiling
//!
//! Instrumented functions arm a scope-bound [`Tracer`]. While the program
//! runs, the tracers build a call graph (who called whom, and how often), a
//! per-path timing profile and an optional `Entering` / `Exiting` event log.
//! Afterwards the session exports a textual hierarchy, Graphviz DOT graphs and
//! a path profile table.
//!
//! ```
//! use calltrace::{DotMode, DotTheme, Session};
//!
//! let session = Session::new();
//! session.instrument("main", || {
//!     session.instrument("load", || ());
//!     session.instrument("render", || ());
//! });
//!
//! assert_eq!(
//!     session.export_hierarchy(),
//!     "Call Graph Tree:\nmain\n  load\n  render\n"
//! );
//! let dot = session.export_graph_description(DotMode::AggregatedEdges, DotTheme::Light);
//! assert!(dot.contains("\"main\" -> \"load\" [label=\"1\"];"));
//! ```

pub mod call_graph;
pub mod call_stack;
pub mod cli;
pub mod clock;
pub mod config;
pub mod dot;
pub mod error;
pub mod event_log;
pub mod export;
pub mod frame;
pub mod path_profile;
pub mod render;
pub mod scenarios;
pub mod session;
pub mod tracer;

pub use call_graph::CallGraph;
pub use dot::{DotMode, DotTheme};
pub use error::{Result, TraceError};
pub use frame::{CallPath, Frame};
pub use path_profile::{PathProfile, PathStats};
pub use session::{global, install_global, Diagnostics, Session, SessionBuilder};
pub use tracer::{CallRecord, Tracer};
