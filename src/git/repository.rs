use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::error::BenchError;
use crate::shell_exec;

/// A git repository: its worktree root and its metadata directory.
///
/// Immutable once discovered; every git command runs with `-C <root>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    root: PathBuf,
    git_dir: PathBuf,
}

impl Repository {
    /// Find the repository containing `path`.
    pub fn discover(path: &Path) -> Result<Self, BenchError> {
        let output = git_output(
            path,
            &["rev-parse", "--show-toplevel", "--absolute-git-dir"],
        )?;
        let mut lines = output.lines();
        let (Some(root), Some(git_dir)) = (lines.next(), lines.next()) else {
            return Err(BenchError::Git {
                command: "git rev-parse --show-toplevel --absolute-git-dir".into(),
                stderr: format!("unexpected output: {output}"),
            });
        };

        Ok(Self {
            root: canonical(Path::new(root)),
            git_dir: canonical(Path::new(git_dir)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The metadata directory (usually `<root>/.git`).
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Run a git command in the repository and return its trimmed stdout.
    pub fn run_command(&self, args: &[&str]) -> Result<String, BenchError> {
        git_output(&self.root, args)
    }

    /// Content-tree identity of `revision`. Side-effect free.
    pub fn tree_id(&self, revision: &str) -> Result<String, BenchError> {
        let spec = format!("{revision}^{{tree}}");
        self.run_command(&["rev-parse", "--verify", "--quiet", &spec])
            .map_err(|e| match e {
                BenchError::Git { command, stderr } if stderr.is_empty() => BenchError::Git {
                    command,
                    stderr: format!("unknown revision '{revision}'"),
                },
                other => other,
            })
    }

    /// Write the files of `tree_id` into `dest`.
    ///
    /// Uses `index_file` as a private index so the user's index and working
    /// tree are never touched. On failure the git diagnostic is returned as
    /// the error string.
    pub fn export_tree(
        &self,
        tree_id: &str,
        dest: &Path,
        index_file: &Path,
    ) -> Result<(), String> {
        let work_tree = format!("--work-tree={}", dest.display());
        let steps: [&[&str]; 2] = [
            &["read-tree", tree_id],
            &[work_tree.as_str(), "checkout-index", "--all", "--force"],
        ];
        for args in steps {
            let mut cmd = self.command(args);
            cmd.env("GIT_INDEX_FILE", index_file);
            let output = shell_exec::run(&mut cmd).map_err(|e| e.to_string())?;
            if !output.status.success() {
                return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
            }
        }
        Ok(())
    }

    /// `git log -1 <commit>`, exactly as git prints it.
    pub fn show_commit(&self, commit: &str) -> Result<String, BenchError> {
        let mut cmd = self.command(&["log", "-1", commit]);
        let output = shell_exec::run(&mut cmd).map_err(|e| spawn_error(&cmd, e))?;
        if !output.status.success() {
            return Err(failed(&cmd, &output.stderr));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Stream commit ids from `git log --format=%H [range]`.
    pub fn commit_log(&self, range: Option<&str>) -> Result<CommitLog, BenchError> {
        let mut args = vec!["log", "--format=%H"];
        args.extend(range);
        let mut cmd = self.command(&args);
        log::debug!("$ {}", shell_exec::describe(&cmd));
        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&cmd, e))?;
        let stdout = child.stdout.take().expect("stdout is piped");
        Ok(CommitLog {
            command: shell_exec::describe(&cmd),
            child,
            lines: BufReader::new(stdout).lines(),
            finished: false,
        })
    }

    fn command(&self, args: &[&str]) -> Command {
        git_command(&self.root, args)
    }
}

/// Commit ids from a running `git log`, newest first unless the range says
/// otherwise. The process is killed if the iterator is dropped early.
pub struct CommitLog {
    command: String,
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    finished: bool,
}

impl Iterator for CommitLog {
    type Item = Result<String, BenchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.lines.next() {
            Some(Ok(line)) => Some(Ok(line.trim().to_string())),
            Some(Err(e)) => {
                self.finished = true;
                Some(Err(BenchError::Git {
                    command: self.command.clone(),
                    stderr: e.to_string(),
                }))
            }
            None => {
                self.finished = true;
                match self.child.wait() {
                    Ok(status) if status.success() => None,
                    Ok(status) => Some(Err(BenchError::Git {
                        command: self.command.clone(),
                        stderr: format!("exited with {status}"),
                    })),
                    Err(e) => Some(Err(BenchError::Git {
                        command: self.command.clone(),
                        stderr: e.to_string(),
                    })),
                }
            }
        }
    }
}

impl Drop for CommitLog {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

fn git_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(dir).args(args);
    cmd
}

fn git_output(dir: &Path, args: &[&str]) -> Result<String, BenchError> {
    let mut cmd = git_command(dir, args);
    let output = shell_exec::run(&mut cmd).map_err(|e| spawn_error(&cmd, e))?;
    if !output.status.success() {
        return Err(failed(&cmd, &output.stderr));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn spawn_error(cmd: &Command, e: std::io::Error) -> BenchError {
    BenchError::Git {
        command: shell_exec::describe(cmd),
        stderr: format!("could not run git: {e}"),
    }
}

fn failed(cmd: &Command, stderr: &[u8]) -> BenchError {
    BenchError::Git {
        command: shell_exec::describe(cmd),
        stderr: String::from_utf8_lossy(stderr).trim().to_string(),
    }
}

/// Canonicalize without Windows verbatim prefixes, falling back to the
/// path as given.
pub(crate) fn canonical(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
