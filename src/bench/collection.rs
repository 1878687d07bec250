use serde::{Deserialize, Serialize};

use super::BenchmarkRun;
use crate::error::BenchError;

/// Benchmark runs kept sorted by name, with at most one run per name.
///
/// Lookup and insertion position are found by binary search. Deserializing
/// goes through [`BenchmarkRunCollection::insert`], so a persisted list with
/// a repeated name is rejected rather than silently accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<BenchmarkRun>", into = "Vec<BenchmarkRun>")]
pub struct BenchmarkRunCollection {
    runs: Vec<BenchmarkRun>,
}

impl BenchmarkRunCollection {
    pub fn new() -> Self {
        Self::default()
    }

    fn search(&self, name: &str) -> Result<usize, usize> {
        self.runs.binary_search_by(|run| run.name.as_str().cmp(name))
    }

    /// Find a run by benchmark name.
    pub fn find(&self, name: &str) -> Option<&BenchmarkRun> {
        self.search(name).ok().map(|i| &self.runs[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.search(name).is_ok()
    }

    /// Insert `run` at its sorted position.
    ///
    /// Fails without modifying the collection if a run with the same name is
    /// already present.
    pub fn insert(&mut self, run: BenchmarkRun) -> Result<(), BenchError> {
        match self.search(&run.name) {
            Ok(_) => Err(BenchError::DuplicateBenchmark { name: run.name }),
            Err(i) => {
                self.runs.insert(i, run);
                Ok(())
            }
        }
    }

    /// The runs for which `keep` holds, still sorted and unique.
    pub fn filtered(&self, mut keep: impl FnMut(&BenchmarkRun) -> bool) -> Self {
        Self {
            runs: self.runs.iter().filter(|run| keep(run)).cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BenchmarkRun> {
        self.runs.iter()
    }

    /// Names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.runs.iter().map(|run| run.name.as_str())
    }
}

impl TryFrom<Vec<BenchmarkRun>> for BenchmarkRunCollection {
    type Error = BenchError;

    fn try_from(runs: Vec<BenchmarkRun>) -> Result<Self, Self::Error> {
        let mut collection = Self::new();
        for run in runs {
            collection.insert(run)?;
        }
        Ok(collection)
    }
}

impl From<BenchmarkRunCollection> for Vec<BenchmarkRun> {
    fn from(collection: BenchmarkRunCollection) -> Self {
        collection.runs
    }
}

impl<'a> IntoIterator for &'a BenchmarkRunCollection {
    type Item = &'a BenchmarkRun;
    type IntoIter = std::slice::Iter<'a, BenchmarkRun>;

    fn into_iter(self) -> Self::IntoIter {
        self.runs.iter()
    }
}

impl IntoIterator for BenchmarkRunCollection {
    type Item = BenchmarkRun;
    type IntoIter = std::vec::IntoIter<BenchmarkRun>;

    fn into_iter(self) -> Self::IntoIter {
        self.runs.into_iter()
    }
}
