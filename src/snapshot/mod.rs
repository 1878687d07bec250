//! Benchmark results of a package set at one revision.
//!
//! [`PackageSetSnapshot`] ties a revision's tree to a [`Sandbox`] and one
//! [`PackageCache`] per package. Results come from the cache when it can
//! answer the request; otherwise the harness runs, in the sandbox, only the
//! benchmarks the cache is missing. The sandbox is opened on the first cache
//! miss and removed when the snapshot is dropped.

mod cache;
mod sandbox;

use std::collections::BTreeMap;

use crate::bench::{BenchFilter, BenchmarkRun, BenchmarkRunCollection};
use crate::error::BenchError;
use crate::harness::Harness;
use crate::package::PackageSet;

pub use cache::{
    PackageCache, PackageSnapshotCache, cache_path, cache_root, clear as clear_cache,
    missing_names,
};
pub use sandbox::{Sandbox, Workspace};

/// Benchmark results per package (relative path), for one revision.
pub type SnapshotBenchmarks = BTreeMap<String, BenchmarkRunCollection>;

/// How results are fetched.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions<'a> {
    pub harness: &'a Harness,
    pub filter: &'a BenchFilter,
    /// Read and write the on-disk cache.
    pub caching: bool,
}

/// One revision of a [`PackageSet`].
pub struct PackageSetSnapshot<'a> {
    set: &'a PackageSet,
    sandbox: Sandbox<'a>,
    packages: Vec<PackageSnapshot>,
}

impl<'a> PackageSetSnapshot<'a> {
    /// Resolve `revision` to its tree. Nothing is checked out yet.
    pub fn new(set: &'a PackageSet, revision: &str) -> Result<Self, BenchError> {
        let tree_id = set.repo().tree_id(revision)?;
        log::debug!("Tree of {revision} is {tree_id}");

        let packages = set
            .packages()
            .iter()
            .map(|package| PackageSnapshot {
                package: package.clone(),
                cache: None,
            })
            .collect();
        Ok(Self {
            set,
            sandbox: Sandbox::new(set.repo(), revision, &tree_id, set.root_import_path()),
            packages,
        })
    }

    pub fn tree_id(&self) -> &str {
        self.sandbox.tree_id()
    }

    /// Fetch results for every package, in resolution order.
    ///
    /// `on_result` is called with the package path and each run as soon as
    /// it is available, from the cache or from the running harness.
    pub fn get_benchmarks(
        &mut self,
        options: FetchOptions<'_>,
        on_result: &mut dyn FnMut(&str, &BenchmarkRun),
    ) -> Result<SnapshotBenchmarks, BenchError> {
        let set = self.set;
        let sandbox = &mut self.sandbox;

        let mut results = SnapshotBenchmarks::new();
        for snapshot in &mut self.packages {
            let package = snapshot.package.clone();
            let mut report = |run: &BenchmarkRun| on_result(&package, run);
            let runs = snapshot.get_benchmarks(set, sandbox, options, &mut report)?;
            results.insert(snapshot.package.clone(), runs);
        }
        Ok(results)
    }
}

/// One package inside a [`PackageSetSnapshot`].
struct PackageSnapshot {
    package: String,
    /// Loaded on first use.
    cache: Option<PackageCache>,
}

impl PackageSnapshot {
    fn get_benchmarks(
        &mut self,
        set: &PackageSet,
        sandbox: &mut Sandbox<'_>,
        options: FetchOptions<'_>,
        on_result: &mut dyn FnMut(&BenchmarkRun),
    ) -> Result<BenchmarkRunCollection, BenchError> {
        if !options.caching {
            return self.run(sandbox, options.harness, options.filter, on_result);
        }

        let cache = self.cache.get_or_insert_with(|| {
            PackageCache::load(cache_path(set.repo(), sandbox.tree_id(), &self.package))
        });
        let (mut found, complete) = cache.query(options.filter);

        if !complete && cache.is_empty() {
            log::debug!("Nothing cached for {}", self.package);
            return self.run(sandbox, options.harness, options.filter, on_result);
        }

        for run in &found {
            on_result(run);
        }
        if complete {
            return Ok(found);
        }

        log::debug!(
            "Cache for {} may be incomplete, checking benchmark names",
            self.package
        );
        let all_names = self.benchmark_names(sandbox, options.harness)?;
        let missing = missing_names(&all_names, options.filter, &found);
        if missing.is_empty() {
            return Ok(found);
        }

        log::debug!("Running uncached benchmarks: {}", missing.join(" "));
        let exact = BenchFilter::exact(missing.iter().map(String::as_str))?;
        let ran = self.run(sandbox, options.harness, &exact, on_result)?;
        for name in &missing {
            let run = ran.find(name).ok_or_else(|| {
                BenchError::execution(format!("requested benchmark {name} did not run"))
            })?;
            found.insert(run.clone())?;
        }
        Ok(found)
    }

    /// Every benchmark name in the package, enumerated once per tree.
    fn benchmark_names(
        &mut self,
        sandbox: &mut Sandbox<'_>,
        harness: &Harness,
    ) -> Result<Vec<String>, BenchError> {
        if let Some(names) = self.cache.as_ref().and_then(|c| c.all_benchmark_names()) {
            return Ok(names.to_vec());
        }

        let workspace = sandbox.ensure_open()?;
        let names = harness.list_names(&workspace, &self.package)?;
        if let Some(cache) = &mut self.cache {
            cache.set_all_benchmark_names(names.clone());
        }
        Ok(names)
    }

    /// Run the harness with `filter`, recording each run in the cache when
    /// one is loaded. Only an unrestricted run marks the cache complete.
    fn run(
        &mut self,
        sandbox: &mut Sandbox<'_>,
        harness: &Harness,
        filter: &BenchFilter,
        on_result: &mut dyn FnMut(&BenchmarkRun),
    ) -> Result<BenchmarkRunCollection, BenchError> {
        let workspace = sandbox.ensure_open()?;
        let mut cache = self.cache.as_mut();

        let result = harness.run(&workspace, &self.package, filter, |run| {
            on_result(run);
            match cache.as_mut() {
                Some(cache) => cache.record(run.clone()),
                None => Ok(()),
            }
        })?;

        if filter.is_unrestricted()
            && let Some(cache) = &mut self.cache
        {
            cache.mark_complete(result.names().map(str::to_string).collect());
        }
        Ok(result)
    }
}
