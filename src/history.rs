//! Walking the commit log and annotating each commit's benchmarks with the
//! change against its parent.
//!
//! Commits arrive from `git log` newest first, so the parent of the commit
//! being printed is the next one the walk will print. Each commit's results
//! are fetched once: the first commit's are streamed live, and every later
//! commit reuses what was fetched when it was the previous commit's parent.

use std::io::Write;

use crate::bench::{BenchFilter, BenchmarkRun};
use crate::config::validate_threshold;
use crate::error::BenchError;
use crate::harness::Harness;
use crate::package::PackageSet;
use crate::snapshot::{FetchOptions, PackageSetSnapshot, SnapshotBenchmarks};
use crate::styling::{ERROR, paint};

/// Settings for one `benchlog log` invocation.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Passed to `git log`; `None` walks all of `HEAD`'s history.
    pub revision_range: Option<String>,
    pub filter: BenchFilter,
    /// Minimum absolute change, in percent, for a result to be shown.
    pub threshold: f64,
    pub caching: bool,
    pub colored: bool,
}

impl LogOptions {
    /// Validate the threshold and benchmark pattern before anything runs.
    pub fn new(
        revision_range: Option<String>,
        bench: &str,
        threshold: f64,
        caching: bool,
        colored: bool,
    ) -> Result<Self, BenchError> {
        validate_threshold(threshold).map_err(BenchError::invalid_argument)?;
        Ok(Self {
            revision_range,
            filter: BenchFilter::new(bench)?,
            threshold,
            caching,
            colored,
        })
    }
}

/// What fetching one commit's benchmarks produced. Lives for one step of
/// the walk.
#[derive(Debug)]
pub enum CommitTestRun {
    Completed(SnapshotBenchmarks),
    /// The harness exited non-zero in `package`. `stderr` was echoed live
    /// and is kept here as well.
    Failed { package: String, stderr: String },
}

impl CommitTestRun {
    /// A harness failure is a result of the commit; any other error is not.
    pub fn from_fetch(fetched: Result<SnapshotBenchmarks, BenchError>) -> Result<Self, BenchError> {
        match fetched {
            Ok(benchmarks) => Ok(CommitTestRun::Completed(benchmarks)),
            Err(BenchError::HarnessFailure { package, stderr }) => {
                Ok(CommitTestRun::Failed { package, stderr })
            }
            Err(e) => Err(e),
        }
    }

    fn benchmarks(&self) -> Option<&SnapshotBenchmarks> {
        match self {
            CommitTestRun::Completed(benchmarks) => Some(benchmarks),
            CommitTestRun::Failed { .. } => None,
        }
    }
}

/// Print the log of `set`'s repository with benchmark results under each
/// commit.
///
/// A commit whose benchmarks fail gets a "benchmarks failed" line and the
/// walk goes on; any other error stops it.
pub fn walk_history<W: Write>(
    set: &PackageSet,
    harness: &Harness,
    options: &LogOptions,
    out: &mut W,
) -> anyhow::Result<()> {
    let repo = set.repo();
    let mut commits = repo.commit_log(options.revision_range.as_deref())?;
    let Some(mut commit) = commits.next().transpose()? else {
        return Ok(());
    };

    // Results of the current commit, fetched when it was the previous
    // commit's parent.
    let mut reused: Option<CommitTestRun> = None;
    let mut first = true;
    loop {
        let parent = commits.next().transpose()?;

        if !first {
            writeln!(out)?;
        }
        first = false;
        write!(out, "{}", repo.show_commit(&commit)?)?;
        writeln!(out)?;
        out.flush()?;

        let parent_run = match &parent {
            Some(parent) => Some(fetch(set, harness, options, parent, &mut |_, _| {})?),
            None => None,
        };
        let baseline = parent_run.as_ref().and_then(CommitTestRun::benchmarks);

        let current = match reused.take() {
            Some(run) => {
                if let Some(benchmarks) = run.benchmarks() {
                    for package in set.packages() {
                        for result in benchmarks.get(package).into_iter().flatten() {
                            emit(out, package, result, baseline, options)?;
                        }
                    }
                }
                run
            }
            None => {
                let mut write_error = None;
                let run = fetch(set, harness, options, &commit, &mut |package, run| {
                    if write_error.is_none()
                        && let Err(e) = emit(out, package, run, baseline, options)
                    {
                        write_error = Some(e);
                    }
                })?;
                if let Some(e) = write_error {
                    return Err(e.into());
                }
                run
            }
        };
        if let CommitTestRun::Failed { package, stderr } = &current {
            log::debug!(
                "Benchmarks of {commit} failed in {package}: {}",
                stderr.lines().last().unwrap_or_default()
            );
            writeln!(out, "{}", paint("benchmarks failed", ERROR, options.colored))?;
        }
        out.flush()?;

        let Some(parent) = parent else {
            break;
        };
        commit = parent;
        reused = parent_run;
    }
    Ok(())
}

/// Fetch one revision's benchmarks through a snapshot that is torn down
/// before returning. A harness failure is a result, not an error.
fn fetch(
    set: &PackageSet,
    harness: &Harness,
    options: &LogOptions,
    revision: &str,
    on_result: &mut dyn FnMut(&str, &BenchmarkRun),
) -> Result<CommitTestRun, BenchError> {
    let mut snapshot = PackageSetSnapshot::new(set, revision)?;
    let fetched = snapshot.get_benchmarks(
        FetchOptions {
            harness,
            filter: &options.filter,
            caching: options.caching,
        },
        on_result,
    );
    CommitTestRun::from_fetch(fetched)
}

/// Annotate `run` against `baseline` and print it if it passes the
/// threshold.
fn emit<W: Write>(
    out: &mut W,
    package: &str,
    run: &BenchmarkRun,
    baseline: Option<&SnapshotBenchmarks>,
    options: &LogOptions,
) -> std::io::Result<()> {
    let mut run = run.clone();
    if let Some(prev) = baseline
        .and_then(|b| b.get(package))
        .and_then(|runs| runs.find(&run.name))
    {
        run.annotate(prev);
    }
    if should_display(run.ns_per_op_change, baseline.is_some(), options.threshold) {
        writeln!(out, "{}", run.display(options.colored))?;
    }
    Ok(())
}

/// Without a baseline everything is shown; with one, only changes of at
/// least `threshold` percent either way.
pub fn should_display(change: f32, has_baseline: bool, threshold: f64) -> bool {
    !has_baseline || f64::from(change).abs() >= threshold
}
