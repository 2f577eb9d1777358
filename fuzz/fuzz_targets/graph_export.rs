#![no_main]

use calltrace::call_graph::CallGraph;
use calltrace::{DotMode, DotTheme};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Each line is "caller callee"; invalid names must be rejected, never panic
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let mut graph = CallGraph::new();
    for line in input.lines() {
        if let Some((caller, callee)) = line.split_once(' ') {
            let _ = graph.add_call(caller, callee);
        }
    }

    let _ = graph.export_hierarchy();
    for mode in [DotMode::RawEdges, DotMode::AggregatedEdges, DotMode::UniqueEdges] {
        let _ = graph.export_graph_description(mode, DotTheme::Dark);
    }
    for node in graph.nodes() {
        let _ = graph.traverse(node.as_str());
    }
});
