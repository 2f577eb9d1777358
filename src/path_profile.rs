//! Per-path timing aggregation
//!
//! Every completed call is attributed to its full root-to-leaf [`CallPath`].
//! The profile keeps, per path, the accumulated wall-clock time and the number
//! of completions, and renders them as a fixed-width table or JSON.

use crate::frame::CallPath;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Display, Write as _};

/// Width of the `Path` column
pub const PATH_COLUMN_WIDTH: usize = 60;
/// Width of the `Total Time (µs)` column
pub const TIME_COLUMN_WIDTH: usize = 20;
/// Width of the `Call Count` column
pub const COUNT_COLUMN_WIDTH: usize = 15;
/// Length of the dashed rule under the header
pub const RULE_WIDTH: usize = 95;

/// Aggregate statistics for one call path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PathStats {
    /// Total time spent on this path (microseconds)
    pub total_time_us: u128,
    /// Number of completed calls with exactly this path
    pub call_count: u64,
}

impl PathStats {
    /// Mean duration per call in microseconds
    pub fn average_us(&self) -> u128 {
        if self.call_count == 0 {
            0
        } else {
            self.total_time_us / u128::from(self.call_count)
        }
    }
}

#[derive(Serialize)]
struct JsonPathEntry<'a> {
    path: &'a CallPath,
    key: String,
    total_time_us: u128,
    call_count: u64,
}

/// Aggregated timing per call path, ordered by path
#[derive(Debug, Clone, Default)]
pub struct PathProfile {
    paths: BTreeMap<CallPath, PathStats>,
}

impl PathProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute one completed call of `duration_us` to `path`
    pub fn record_path(&mut self, path: CallPath, duration_us: u64) {
        let entry = self.paths.entry(path).or_default();
        entry.total_time_us += u128::from(duration_us);
        entry.call_count += 1;
    }

    /// Statistics for `path`, if it was ever recorded
    pub fn get(&self, path: &CallPath) -> Option<&PathStats> {
        self.paths.get(path)
    }

    /// Number of distinct paths
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Entries in path order
    pub fn iter(&self) -> impl Iterator<Item = (&CallPath, &PathStats)> {
        self.paths.iter()
    }

    /// Completed calls across all paths
    pub fn total_calls(&self) -> u64 {
        self.paths.values().map(|stats| stats.call_count).sum()
    }

    /// Fixed-width table: `Path`, `Total Time (µs)`, `Call Count`
    ///
    /// Columns are left aligned and padded in characters. A cell that fills
    /// its column is still followed by one space, so long paths never run
    /// into the time column. Rows follow path order (frame-by-frame
    /// lexicographic), so identical event sequences always produce identical
    /// tables.
    pub fn export(&self) -> String {
        let mut out = String::new();
        write_row(&mut out, &"Path", &"Total Time (µs)", &"Call Count");
        out.push_str(&"-".repeat(RULE_WIDTH));
        out.push('\n');

        for (path, stats) in &self.paths {
            write_row(&mut out, &path.key(), &stats.total_time_us, &stats.call_count);
        }
        out
    }

    /// Pretty JSON array of `{ path, key, total_time_us, call_count }`
    pub fn to_json(&self) -> serde_json::Result<String> {
        let entries: Vec<_> = self
            .paths
            .iter()
            .map(|(path, stats)| JsonPathEntry {
                path,
                key: path.key(),
                total_time_us: stats.total_time_us,
                call_count: stats.call_count,
            })
            .collect();
        serde_json::to_string_pretty(&entries)
    }
}

fn write_row(out: &mut String, path: &dyn Display, time: &dyn Display, count: &dyn Display) {
    let _ = writeln!(
        out,
        "{:<pw$} {:<tw$} {:<cw$}",
        path,
        time,
        count,
        pw = PATH_COLUMN_WIDTH - 1,
        tw = TIME_COLUMN_WIDTH - 1,
        cw = COUNT_COLUMN_WIDTH
    );
}
