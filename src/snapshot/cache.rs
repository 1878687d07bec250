//! Persisted benchmark results, one file per (tree, package).
//!
//! The cache is keyed by tree id rather than commit id, so every commit that
//! produces the same tree shares one entry. Read and write failures are
//! logged and otherwise ignored: a broken cache behaves like an empty one.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bench::{BenchFilter, BenchmarkRun, BenchmarkRunCollection};
use crate::error::BenchError;
use crate::git::Repository;

const CACHE_FILE: &str = "dir-cache.json";

/// On-disk state of one package's cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageSnapshotCache {
    #[serde(default)]
    pub benchmarks: BenchmarkRunCollection,
    /// Set once the package has been run with the unrestricted filter;
    /// `benchmarks` is then every benchmark the package has.
    #[serde(default)]
    pub benchmarks_is_complete: bool,
    /// Every benchmark name in the package, `None` until enumerated.
    #[serde(default)]
    pub all_benchmark_names: Option<Vec<String>>,
}

/// A loaded cache bound to its file. Every mutation is flushed immediately.
#[derive(Debug)]
pub struct PackageCache {
    path: PathBuf,
    state: PackageSnapshotCache,
}

impl PackageCache {
    /// Load the cache at `path`. A missing file is an empty cache; an
    /// unreadable or corrupt one is logged and treated as empty.
    pub fn load(path: PathBuf) -> Self {
        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                log::warn!("Ignoring corrupt cache {}: {e}", path.display());
                PackageSnapshotCache::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                PackageSnapshotCache::default()
            }
            Err(e) => {
                log::warn!("Could not load cache {}: {e}", path.display());
                PackageSnapshotCache::default()
            }
        };
        Self { path, state }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &PackageSnapshotCache {
        &self.state
    }

    pub fn is_empty(&self) -> bool {
        self.state.benchmarks.is_empty()
    }

    /// Cached runs matching `filter`, and whether they are known to be every
    /// matching benchmark in the package.
    pub fn query(&self, filter: &BenchFilter) -> (BenchmarkRunCollection, bool) {
        let found = self
            .state
            .benchmarks
            .filtered(|run| filter.is_match(&run.name));
        (found, self.state.benchmarks_is_complete)
    }

    pub fn all_benchmark_names(&self) -> Option<&[String]> {
        self.state.all_benchmark_names.as_deref()
    }

    pub fn set_all_benchmark_names(&mut self, names: Vec<String>) {
        self.state.all_benchmark_names = Some(names);
        self.flush();
    }

    /// Record one run and persist it.
    pub fn record(&mut self, run: BenchmarkRun) -> Result<(), BenchError> {
        self.state.benchmarks.insert(run)?;
        self.flush();
        Ok(())
    }

    /// Mark the cache as holding every benchmark in the package.
    pub fn mark_complete(&mut self, names: Vec<String>) {
        self.state.benchmarks_is_complete = true;
        self.state.all_benchmark_names = Some(names);
        self.flush();
    }

    /// Write the cache atomically. Failures are logged.
    pub fn flush(&self) {
        if let Err(e) = self.save() {
            log::warn!("Could not save cache {}: {e}", self.path.display());
        }
    }

    fn save(&self) -> std::io::Result<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| std::io::Error::other("cache path has no parent directory"))?;
        std::fs::create_dir_all(dir)?;

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut file, &self.state)?;
        file.write_all(b"\n")?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Names from `all_names` matching `filter` that `found` does not contain.
pub fn missing_names(
    all_names: &[String],
    filter: &BenchFilter,
    found: &BenchmarkRunCollection,
) -> Vec<String> {
    all_names
        .iter()
        .filter(|name| filter.is_match(name) && !found.contains(name))
        .cloned()
        .collect()
}

/// Directory holding every cached tree of `repo`.
pub fn cache_root(repo: &Repository) -> PathBuf {
    repo.git_dir().join("benchlog").join("tree-cache")
}

/// Cache file for `package` (slash-separated, `.` for the root) in
/// `tree_id`.
pub fn cache_path(repo: &Repository, tree_id: &str, package: &str) -> PathBuf {
    let mut path = cache_root(repo).join(tree_id);
    path.extend(package.split('/').filter(|s| !s.is_empty() && *s != "."));
    path.join(CACHE_FILE)
}

/// Remove the cache of one tree, or the whole cache. Returns whether
/// anything was there to remove.
pub fn clear(repo: &Repository, tree_id: Option<&str>) -> std::io::Result<bool> {
    let root = cache_root(repo);
    let target = match tree_id {
        Some(tree) => root.join(tree),
        None => root,
    };
    match std::fs::remove_dir_all(&target) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
