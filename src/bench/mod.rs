//! Benchmark results as reported by the harness.
//!
//! A [`BenchmarkRun`] is one parsed result line; a [`BenchmarkRunCollection`]
//! keeps runs sorted and unique by name; a [`BenchFilter`] selects runs by
//! name the same way the harness does.

mod collection;
mod filter;

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::styling::{delta_style, paint};

pub use collection::BenchmarkRunCollection;
pub use filter::BenchFilter;

/// `<Name>[-<Parallelism>]  <N>  <NsPerOp>[.<frac>] ns/op`
static BENCHMARK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(Benchmark[^-\s]*)(-\d+)?\s+(\d+)\s+(\d*(\.\d+)?) ns/op\s*$")
        .expect("benchmark line pattern is valid")
});

/// One measured benchmark result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRun {
    /// Harness output this run was parsed from, without the line terminator.
    pub line: String,
    pub name: String,
    pub iterations: u64,
    pub ns_per_op: f32,
    /// Percentage change against a baseline; 0 until [`BenchmarkRun::annotate`].
    #[serde(skip)]
    pub ns_per_op_change: f32,
}

impl BenchmarkRun {
    /// Parse a harness output line. Returns `None` for anything that is not a
    /// benchmark result (build chatter, `PASS`, `ok  pkg 1.2s`, ...).
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\n', '\r']);
        let groups = BENCHMARK_LINE.captures(line)?;

        let iterations = groups[3].parse().ok()?;
        let ns_per_op = groups[4].parse().ok()?;

        Some(Self {
            line: line.to_string(),
            name: groups[1].to_string(),
            iterations,
            ns_per_op,
            ns_per_op_change: 0.0,
        })
    }

    /// Set `ns_per_op_change` relative to `prev`, a run of the same benchmark.
    pub fn annotate(&mut self, prev: &BenchmarkRun) {
        self.ns_per_op_change = percent_change(self.ns_per_op, prev.ns_per_op);
    }

    /// The original line with the change appended, coloured by sign when
    /// `colored` is set.
    pub fn display(&self, colored: bool) -> RunDisplay<'_> {
        RunDisplay { run: self, colored }
    }
}

/// `100 × (current − previous) / previous`, exactly 0 when both are equal.
pub fn percent_change(current: f32, previous: f32) -> f32 {
    if current == previous {
        0.0
    } else {
        100.0 * (current - previous) / previous
    }
}

/// Display adapter returned by [`BenchmarkRun::display`].
pub struct RunDisplay<'a> {
    run: &'a BenchmarkRun,
    colored: bool,
}

impl fmt::Display for RunDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.run.line)?;
        let change = self.run.ns_per_op_change;
        if change != 0.0 {
            let delta = format!("{change:+.2}%");
            write!(f, "\t{}", paint(&delta, delta_style(change), self.colored))?;
        }
        Ok(())
    }
}
