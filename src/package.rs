//! Resolving package selectors to a [`PackageSet`] inside one repository.

use std::path::Path;

use path_slash::PathExt as _;

use crate::error::BenchError;
use crate::git::{Repository, canonical};
use crate::harness::{Harness, ListEntry};

/// Packages the user asked to benchmark, all under one git repository.
#[derive(Debug, Clone)]
pub struct PackageSet {
    repo: Repository,
    root_import_path: String,
    /// Slash-separated paths relative to the repository root, `.` for the
    /// root itself. Kept in resolution order.
    packages: Vec<String>,
    selectors: Vec<String>,
}

impl PackageSet {
    /// Resolve `selectors` (run from `cwd`) and check that every package
    /// lives in the same repository.
    pub fn open(harness: &Harness, cwd: &Path, selectors: &[String]) -> Result<Self, BenchError> {
        if selectors.is_empty() {
            return Err(BenchError::invalid_argument("packages are not specified"));
        }

        let entries = harness.list_packages(cwd, selectors)?;
        if entries.is_empty() {
            return Err(BenchError::resolution("packages not found"));
        }
        log::debug!(
            "Resolved packages: {}",
            entries
                .iter()
                .map(|e| e.import_path.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut resolved: Option<(Repository, String)> = None;
        let mut packages = Vec::with_capacity(entries.len());
        for entry in &entries {
            let (repo, rel) = locate(entry)?;
            match &resolved {
                None => {
                    let root = root_import_path(&entry.import_path, &rel).ok_or_else(|| {
                        BenchError::resolution(format!(
                            "import path {} does not end with {rel}",
                            entry.import_path
                        ))
                    })?;
                    resolved = Some((repo, root));
                }
                Some((first, root)) => {
                    if *first != repo {
                        return Err(BenchError::multiple_repositories());
                    }
                    if join_import_path(root, &rel) != entry.import_path {
                        return Err(BenchError::resolution(format!(
                            "import path {} is not {rel} under {root}",
                            entry.import_path
                        )));
                    }
                }
            }
            if !packages.contains(&rel) {
                packages.push(rel);
            }
        }

        let Some((repo, root_import_path)) = resolved else {
            return Err(BenchError::resolution("packages not found"));
        };
        Ok(Self {
            repo,
            root_import_path,
            packages,
            selectors: selectors.to_vec(),
        })
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Import path of the repository root.
    pub fn root_import_path(&self) -> &str {
        &self.root_import_path
    }

    /// Package paths relative to the repository root, in resolution order.
    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    /// Selectors as given on the command line.
    pub fn selectors(&self) -> &[String] {
        &self.selectors
    }

    pub fn import_path(&self, package: &str) -> String {
        join_import_path(&self.root_import_path, package)
    }
}

/// Repository containing the package, and the package path relative to its
/// root.
fn locate(entry: &ListEntry) -> Result<(Repository, String), BenchError> {
    let dir = entry.dir.display();
    if entry.import_path == format!("_{dir}") {
        return Err(BenchError::resolution(format!(
            "package {dir} is not under a GOPATH or module import root"
        )));
    }

    let repo = Repository::discover(&entry.dir).map_err(|e| {
        BenchError::resolution(format!("package {dir} is not in a git repository: {e}"))
    })?;
    let rel = pathdiff::diff_paths(canonical(&entry.dir), repo.root())
        .filter(|rel| !rel.starts_with(".."))
        .ok_or_else(|| {
            BenchError::resolution(format!(
                "package {dir} is outside {}",
                repo.root().display()
            ))
        })?;

    let rel = rel.to_slash_lossy();
    let rel = if rel.is_empty() { ".".to_string() } else { rel.into_owned() };
    Ok((repo, rel))
}

/// Strip the package's relative path off its import path, one segment per
/// directory level. `None` when the import path does not end with `rel`.
pub fn root_import_path(import_path: &str, rel: &str) -> Option<String> {
    if rel == "." {
        return Some(import_path.to_string());
    }
    let root = import_path.strip_suffix(rel)?.strip_suffix('/')?;
    (!root.is_empty()).then(|| root.to_string())
}

fn join_import_path(root: &str, rel: &str) -> String {
    if rel == "." {
        root.to_string()
    } else {
        format!("{root}/{rel}")
    }
}
