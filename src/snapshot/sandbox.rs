use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::BenchError;
use crate::git::Repository;

/// Paths inside an open sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Root of the temporary directory; used as a `GOPATH` entry.
    pub gopath: PathBuf,
    /// Where the tree is exported: `<gopath>/src/<root import path>`.
    pub checkout: PathBuf,
}

impl Workspace {
    /// Directory of `package` (slash-separated, `.` for the root).
    pub fn package_dir(&self, package: &str) -> PathBuf {
        let mut dir = self.checkout.clone();
        dir.extend(package.split('/').filter(|s| !s.is_empty() && *s != "."));
        dir
    }
}

/// A disposable checkout of one revision's tree.
///
/// Created closed. [`Sandbox::ensure_open`] exports the tree the first time
/// a workspace is needed; the directory is removed on [`Sandbox::close`] or
/// drop.
#[derive(Debug)]
pub struct Sandbox<'a> {
    repo: &'a Repository,
    revision: String,
    tree_id: String,
    root_import_path: String,
    open: Option<(TempDir, Workspace)>,
}

impl<'a> Sandbox<'a> {
    pub fn new(
        repo: &'a Repository,
        revision: &str,
        tree_id: &str,
        root_import_path: &str,
    ) -> Self {
        Self {
            repo,
            revision: revision.to_string(),
            tree_id: tree_id.to_string(),
            root_import_path: root_import_path.to_string(),
            open: None,
        }
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    pub fn tree_id(&self) -> &str {
        &self.tree_id
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Export the tree into a fresh temporary directory.
    ///
    /// Fails if already open. On a failed export the directory is removed
    /// before returning.
    pub fn open(&mut self) -> Result<Workspace, BenchError> {
        if self.open.is_some() {
            return Err(BenchError::SandboxAlreadyOpen {
                revision: self.revision.clone(),
            });
        }

        let dir = tempfile::Builder::new()
            .prefix("benchlog-")
            .tempdir()
            .map_err(|e| self.checkout_error(Path::new(""), e.to_string()))?;
        let gopath = dir.path().to_path_buf();
        let mut checkout = gopath.join("src");
        checkout.extend(self.root_import_path.split('/').filter(|s| !s.is_empty()));
        std::fs::create_dir_all(&checkout)
            .map_err(|e| self.checkout_error(&checkout, e.to_string()))?;

        log::debug!("Sandboxing {} to {}", self.revision, checkout.display());
        let index = gopath.join("index");
        self.repo
            .export_tree(&self.tree_id, &checkout, &index)
            .map_err(|output| self.checkout_error(&checkout, output))?;
        // The index is only needed for the export.
        let _ = std::fs::remove_file(&index);

        let workspace = Workspace { gopath, checkout };
        self.open = Some((dir, workspace.clone()));
        Ok(workspace)
    }

    /// The workspace, opening the sandbox if this is the first request.
    pub fn ensure_open(&mut self) -> Result<Workspace, BenchError> {
        match &self.open {
            Some((_, workspace)) => Ok(workspace.clone()),
            None => self.open(),
        }
    }

    /// Remove the workspace. A no-op when never opened; removal failures are
    /// logged, not returned.
    pub fn close(&mut self) {
        if let Some((dir, workspace)) = self.open.take() {
            log::debug!("Removing sandbox {}", workspace.gopath.display());
            if let Err(e) = dir.close() {
                log::warn!(
                    "Could not delete checkout {}: {e}",
                    workspace.gopath.display()
                );
            }
        }
    }

    fn checkout_error(&self, path: &Path, output: String) -> BenchError {
        BenchError::Checkout {
            revision: self.revision.clone(),
            path: path.to_path_buf(),
            output,
        }
    }
}

impl Drop for Sandbox<'_> {
    fn drop(&mut self) {
        self.close();
    }
}
