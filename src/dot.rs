//! DOT graph descriptions of a call graph
//!
//! The output is consumed by an external Graphviz-style renderer (see
//! [`crate::render`]). Three views are derived from the same raw edge
//! multiset:
//!
//! - [`DotMode::RawEdges`]: one edge per recorded call. Each callee gets a
//!   synthetic instance node (`"C#3"`) labeled with the real name, so repeated
//!   calls render as separate nodes (dynamic call tree). The `#` separator is
//!   lengthened when frame names contain `#`, so an instance id never equals
//!   a real frame name.
//! - [`DotMode::AggregatedEdges`]: one edge per distinct pair labeled with its
//!   occurrence count (weighted static call graph).
//! - [`DotMode::UniqueEdges`]: one unlabeled edge per distinct pair (call
//!   context tree).

use crate::call_graph::CallGraph;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;

/// Which view of the call graph to emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DotMode {
    /// One edge per call occurrence, one node per callee instance
    RawEdges,
    /// One edge per distinct pair, labeled with its count
    AggregatedEdges,
    /// One unlabeled edge per distinct pair
    UniqueEdges,
}

/// Color scheme of the emitted graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DotTheme {
    /// Light gray background, black edges
    #[default]
    Light,
    /// Black background, white edges
    Dark,
}

impl DotTheme {
    fn background(self) -> &'static str {
        match self {
            DotTheme::Light => "lightgray",
            DotTheme::Dark => "black",
        }
    }

    fn edge_color(self) -> &'static str {
        match self {
            DotTheme::Light => "black",
            DotTheme::Dark => "white",
        }
    }
}

/// Quote a DOT identifier, escaping embedded quotes and backslashes
pub fn quote_id(id: &str) -> String {
    let mut quoted = String::with_capacity(id.len() + 2);
    quoted.push('"');
    for c in id.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Render `graph` as a `digraph CallGraph { ... }` description
pub fn render(graph: &CallGraph, mode: DotMode, theme: DotTheme) -> String {
    let mut out = String::new();
    out.push_str("digraph CallGraph {\n");
    let _ = writeln!(out, "    bgcolor=\"{}\";", theme.background());
    out.push_str("    node [style=filled, color=lightblue, shape=oval, fontname=\"Arial\"];\n");
    out.push_str("    edge [fontname=\"Arial\", fontsize=10];\n");
    let _ = writeln!(out, "    edge [color={}];", theme.edge_color());

    match mode {
        DotMode::RawEdges => write_raw_edges(graph, &mut out),
        DotMode::AggregatedEdges => write_aggregated_edges(graph, &mut out),
        DotMode::UniqueEdges => write_unique_edges(graph, &mut out),
    }

    out.push_str("}\n");
    out
}

/// Separator between a callee name and its instance number
///
/// One `#` longer than the longest `#` run in any node name.
fn instance_separator(graph: &CallGraph) -> String {
    let longest = graph
        .nodes()
        .map(|frame| longest_hash_run(frame.as_str()))
        .max()
        .unwrap_or(0);
    "#".repeat(longest + 1)
}

fn longest_hash_run(name: &str) -> usize {
    name.split(|c| c != '#').map(str::len).max().unwrap_or(0)
}

fn write_raw_edges(graph: &CallGraph, out: &mut String) {
    let separator = instance_separator(graph);
    // Instance numbering restarts per export so repeated exports are identical
    for (instance, (caller, callee)) in (1u64..).zip(graph.edges()) {
        let node = quote_id(&format!("{callee}{separator}{instance}"));
        let _ = writeln!(out, "    {} -> {};", quote_id(caller.as_str()), node);
        let _ = writeln!(out, "    {} [label={}];", node, quote_id(callee.as_str()));
    }
}

fn write_aggregated_edges(graph: &CallGraph, out: &mut String) {
    for ((caller, callee), count) in graph.edge_counts() {
        let _ = writeln!(
            out,
            "    {} -> {} [label=\"{}\"];",
            quote_id(caller.as_str()),
            quote_id(callee.as_str()),
            count
        );
    }
}

fn write_unique_edges(graph: &CallGraph, out: &mut String) {
    let mut seen = BTreeSet::new();
    for (caller, callee) in graph.edges() {
        if seen.insert((caller, callee)) {
            let _ = writeln!(
                out,
                "    {} -> {};",
                quote_id(caller.as_str()),
                quote_id(callee.as_str())
            );
        }
    }
}
