//! Caller → callee call graph with multiplicities
//!
//! The graph stores the raw multiset of observed edges: every call appends
//! its callee to the caller's adjacency list, duplicates and self-edges
//! included. The aggregated `(caller, callee) → count` view and the DOT
//! exports are derived from that single representation.
//!
//! # Ordering
//!
//! Callers are kept in a `BTreeMap`, so every export iterates callers
//! lexicographically and callees in insertion order. Two graphs built from the
//! same event sequence always export byte-identical text.
//!
//! # Example
//!
//! ```
//! use calltrace::call_graph::CallGraph;
//!
//! # fn main() -> calltrace::Result<()> {
//! let mut graph = CallGraph::new();
//! graph.add_call("main", "parse")?;
//! graph.add_call("parse", "lex")?;
//! graph.add_call("parse", "lex")?;
//!
//! assert_eq!(graph.edge_count(), 3);
//! assert_eq!(
//!     graph.export_hierarchy(),
//!     "Call Graph Tree:\nmain\n  parse\n    lex\n"
//! );
//! # Ok(())
//! # }
//! ```

use crate::dot::{self, DotMode, DotTheme};
use crate::error::Result;
use crate::frame::Frame;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// One node emitted by a depth-first traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalStep {
    /// Distance from the traversal's start node
    pub depth: usize,
    pub frame: Frame,
}

/// Multiset of caller → callee edges
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    /// Caller → callees in call order (duplicates preserved)
    adjacency: BTreeMap<Frame, Vec<Frame>>,

    /// Every frame seen as caller or callee
    nodes: BTreeSet<Frame>,

    /// Frames seen at least once as a callee
    called: HashSet<Frame>,

    edge_count: usize,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one call from `caller` to `callee`
    ///
    /// Both names are validated before anything is recorded; an invalid name
    /// leaves the graph unchanged and returns `InvalidIdentifier`.
    pub fn add_call(&mut self, caller: &str, callee: &str) -> Result<()> {
        let caller = Frame::new(caller)?;
        let callee = Frame::new(callee)?;
        self.add_edge(caller, callee);
        Ok(())
    }

    /// Record one call between already validated frames
    pub fn add_edge(&mut self, caller: Frame, callee: Frame) {
        self.nodes.insert(caller.clone());
        self.nodes.insert(callee.clone());
        self.called.insert(callee.clone());
        self.adjacency.entry(caller).or_default().push(callee);
        self.edge_count += 1;
    }

    /// Number of recorded calls (raw edges, duplicates counted)
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Number of distinct frames
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }

    /// All frames in lexicographic order
    pub fn nodes(&self) -> impl Iterator<Item = &Frame> {
        self.nodes.iter()
    }

    /// Whether `name` appears anywhere in the graph
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains(name)
    }

    /// Callees of `caller` in call order, duplicates included
    pub fn callees(&self, caller: &str) -> &[Frame] {
        self.adjacency
            .get(caller)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Raw edges: callers lexicographic, callees in call order
    pub fn edges(&self) -> impl Iterator<Item = (&Frame, &Frame)> {
        self.adjacency
            .iter()
            .flat_map(|(caller, callees)| callees.iter().map(move |callee| (caller, callee)))
    }

    /// Aggregated view: occurrences of each distinct `(caller, callee)` pair
    pub fn edge_counts(&self) -> BTreeMap<(Frame, Frame), u64> {
        let mut counts = BTreeMap::new();
        for (caller, callee) in self.edges() {
            *counts.entry((caller.clone(), callee.clone())).or_insert(0) += 1;
        }
        counts
    }

    /// Frames never called by another frame, lexicographic
    pub fn roots(&self) -> Vec<Frame> {
        self.nodes
            .iter()
            .filter(|frame| !self.called.contains(*frame))
            .cloned()
            .collect()
    }

    /// Depth-first pre-order traversal from `start`
    ///
    /// The visited set lives only for this call: a node reached twice (a
    /// cycle, self recursion, or a shared callee) is emitted once and not
    /// expanded again. An unknown start node yields an empty traversal.
    pub fn traverse(&self, start: &str) -> Vec<TraversalStep> {
        match self.nodes.get(start) {
            Some(frame) => self.traverse_from(frame),
            None => Vec::new(),
        }
    }

    fn traverse_from(&self, start: &Frame) -> Vec<TraversalStep> {
        let mut steps = Vec::new();
        let mut visited: HashSet<&Frame> = HashSet::new();
        let mut pending: Vec<(&Frame, usize)> = vec![(start, 0)];

        while let Some((frame, depth)) = pending.pop() {
            if !visited.insert(frame) {
                continue;
            }
            steps.push(TraversalStep {
                depth,
                frame: frame.clone(),
            });

            if let Some(callees) = self.adjacency.get(frame) {
                // Reversed so the first callee is expanded first
                for callee in callees.iter().rev() {
                    if !visited.contains(callee) {
                        pending.push((callee, depth + 1));
                    }
                }
            }
        }

        steps
    }

    /// Indented depth-first listing of the whole graph
    ///
    /// Every root gets its own traversal. Nodes not reached from any root
    /// (pure cycles) are then used as fallback roots, so every node is listed
    /// at least once.
    pub fn export_hierarchy(&self) -> String {
        let mut out = String::from("Call Graph Tree:\n");
        let mut covered: HashSet<Frame> = HashSet::new();

        let roots = self.roots();
        let fallback = self.nodes.iter();

        for root in roots.iter().chain(fallback) {
            if covered.contains(root) {
                continue;
            }
            for step in self.traverse_from(root) {
                out.push_str(&"  ".repeat(step.depth));
                out.push_str(step.frame.as_str());
                out.push('\n');
                covered.insert(step.frame);
            }
        }

        out
    }

    /// Flat listing: one `<caller> calls: <callee> ...` line per caller
    pub fn export_adjacency(&self) -> String {
        let mut out = String::from("Call Graph:\n");
        for (caller, callees) in &self.adjacency {
            out.push_str(caller.as_str());
            out.push_str(" calls: ");
            for callee in callees {
                out.push_str(callee.as_str());
                out.push(' ');
            }
            out.push('\n');
        }
        out
    }

    /// DOT graph description for an external renderer
    pub fn export_graph_description(&self, mode: DotMode, theme: DotTheme) -> String {
        dot::render(self, mode, theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TraceError;

    fn graph_of(edges: &[(&str, &str)]) -> CallGraph {
        let mut graph = CallGraph::new();
        for (caller, callee) in edges {
            graph.add_call(caller, callee).unwrap();
        }
        graph
    }

    fn names(steps: &[TraversalStep]) -> Vec<(usize, &str)> {
        steps.iter().map(|s| (s.depth, s.frame.as_str())).collect()
    }

    #[test]
    fn test_empty_graph() {
        let graph = CallGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.node_count(), 0);
        assert!(graph.roots().is_empty());
        assert_eq!(graph.export_hierarchy(), "Call Graph Tree:\n");
    }

    #[test]
    fn test_duplicates_are_preserved() {
        let graph = graph_of(&[("D", "A"), ("D", "A"), ("D", "B")]);
        assert_eq!(graph.edge_count(), 3);
        let callees: Vec<_> = graph.callees("D").iter().map(Frame::as_str).collect();
        assert_eq!(callees, vec!["A", "A", "B"]);
    }

    #[test]
    fn test_self_edge_allowed() {
        let graph = graph_of(&[("fact", "fact"), ("fact", "fact")]);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.node_count(), 1);
        assert!(graph.roots().is_empty());
    }

    #[test]
    fn test_add_call_rejects_empty_identifier() {
        let mut graph = CallGraph::new();
        let err = graph.add_call("main", "").unwrap_err();
        assert!(matches!(err, TraceError::InvalidIdentifier { .. }));
        assert!(graph.add_call("", "main").is_err());
        assert!(graph.is_empty());
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn test_edge_counts_aggregate_pairs() {
        let graph = graph_of(&[("D", "A"), ("D", "B"), ("D", "A"), ("B", "C")]);
        let counts = graph.edge_counts();
        let key = |a: &str, b: &str| (Frame::new(a).unwrap(), Frame::new(b).unwrap());

        assert_eq!(counts.len(), 3);
        assert_eq!(counts[&key("D", "A")], 2);
        assert_eq!(counts[&key("D", "B")], 1);
        assert_eq!(counts[&key("B", "C")], 1);
    }

    #[test]
    fn test_roots_never_called() {
        let graph = graph_of(&[("main", "D"), ("D", "A"), ("other", "A")]);
        let roots: Vec<_> = graph.roots().iter().map(|f| f.to_string()).collect();
        assert_eq!(roots, vec!["main", "other"]);
    }

    #[test]
    fn test_traverse_mutual_recursion_terminates() {
        let graph = graph_of(&[("A", "B"), ("B", "A")]);
        let steps = graph.traverse("A");
        assert_eq!(names(&steps), vec![(0, "A"), (1, "B")]);
    }

    #[test]
    fn test_traverse_unknown_start() {
        let graph = graph_of(&[("A", "B")]);
        assert!(graph.traverse("Z").is_empty());
    }

    #[test]
    fn test_traverse_preorder_matches_call_order() {
        let graph = graph_of(&[("A", "B"), ("A", "C"), ("B", "C"), ("C", "D")]);
        let steps = graph.traverse("A");
        assert_eq!(
            names(&steps),
            vec![(0, "A"), (1, "B"), (2, "C"), (3, "D")]
        );
    }

    #[test]
    fn test_visited_set_is_per_traversal() {
        let graph = graph_of(&[("A", "C"), ("B", "C")]);
        assert_eq!(names(&graph.traverse("A")), vec![(0, "A"), (1, "C")]);
        assert_eq!(names(&graph.traverse("B")), vec![(0, "B"), (1, "C")]);
    }

    #[test]
    fn test_hierarchy_lists_shared_callee_under_each_root() {
        let graph = graph_of(&[("A", "C"), ("B", "C")]);
        assert_eq!(
            graph.export_hierarchy(),
            "Call Graph Tree:\nA\n  C\nB\n  C\n"
        );
    }

    #[test]
    fn test_hierarchy_covers_pure_cycles() {
        let graph = graph_of(&[("main", "run"), ("X", "Y"), ("Y", "X")]);
        assert_eq!(
            graph.export_hierarchy(),
            "Call Graph Tree:\nmain\n  run\nX\n  Y\n"
        );
    }

    #[test]
    fn test_hierarchy_of_demo_trace() {
        let graph = graph_of(&[
            ("D", "A"),
            ("A", "C"),
            ("D", "B"),
            ("B", "A"),
            ("A", "C"),
            ("B", "C"),
        ]);
        assert_eq!(
            graph.export_hierarchy(),
            "Call Graph Tree:\nD\n  A\n    C\n  B\n"
        );
    }

    #[test]
    fn test_adjacency_listing() {
        let graph = graph_of(&[("main", "D"), ("D", "A"), ("D", "B"), ("main", "B")]);
        assert_eq!(
            graph.export_adjacency(),
            "Call Graph:\nD calls: A B \nmain calls: D B \n"
        );
    }

    #[test]
    fn test_exports_are_idempotent() {
        let graph = graph_of(&[("A", "B"), ("B", "A"), ("A", "A")]);
        assert_eq!(graph.export_hierarchy(), graph.export_hierarchy());
        assert_eq!(graph.export_adjacency(), graph.export_adjacency());
    }
}
