//! The benchmark harness: the Go toolchain, or anything that speaks its
//! `list` and `test -bench` protocol.
//!
//! Output is consumed while the harness runs so results reach the caller
//! before the process exits. A non-zero exit becomes
//! [`BenchError::HarnessFailure`] carrying the captured stderr; anything
//! else that goes wrong is a [`BenchError::Execution`].

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::bench::{BenchFilter, BenchmarkRun, BenchmarkRunCollection};
use crate::config::HarnessConfig;
use crate::error::BenchError;
use crate::snapshot::Workspace;
use crate::shell_exec;
use crate::styling::ERROR;

/// One package reported by `<harness> list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub dir: PathBuf,
    pub import_path: String,
}

#[derive(Debug, Clone, Copy, strum::Display)]
#[strum(serialize_all = "kebab-case")]
enum HarnessMode {
    ListPackages,
    ListNames,
    Run,
}

/// Invokes the harness executable. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Harness {
    command: String,
    colored: bool,
}

impl Harness {
    /// `colored` controls whether echoed harness stderr is painted red.
    pub fn new(config: &HarnessConfig, colored: bool) -> Self {
        Self {
            command: config.command.clone(),
            colored,
        }
    }

    /// Resolve package selectors (which may be patterns such as `./...`)
    /// into directories and import paths, running in `cwd`.
    pub fn list_packages(
        &self,
        cwd: &Path,
        selectors: &[String],
    ) -> Result<Vec<ListEntry>, BenchError> {
        let mut cmd = Command::new(&self.command);
        cmd.current_dir(cwd)
            .args(["list", "-f", "{{.Dir}}:{{.ImportPath}}"])
            .args(selectors);
        log::debug!("{} {}", HarnessMode::ListPackages, selectors.join(" "));

        let output = shell_exec::run(&mut cmd).map_err(|e| self.spawn_error(e))?;
        if !output.status.success() {
            return Err(BenchError::resolution(format!(
                "cannot resolve packages {}: {}",
                selectors.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        parse_list_output(&String::from_utf8_lossy(&output.stdout))
    }

    /// Names of every benchmark in `package`, without timing them.
    pub fn list_names(
        &self,
        workspace: &Workspace,
        package: &str,
    ) -> Result<Vec<String>, BenchError> {
        let mut cmd = self.test_command(workspace, package);
        cmd.args(["-run=@", "-bench=.", "-benchtime=0", "."]);
        log::debug!("{} {package}", HarnessMode::ListNames);

        let mut names = Vec::new();
        let output = shell_exec::stream_lines(&mut cmd, self.stderr_style(), |line| {
            if let Some(run) = BenchmarkRun::parse(line) {
                names.push(run.name);
            }
            Ok::<_, BenchError>(())
        })?;
        if !output.status.success() {
            return Err(harness_failure(package, &output.stderr));
        }
        Ok(names)
    }

    /// Run the benchmarks of `package` that match `filter`.
    ///
    /// `on_result` sees each run as soon as its line is printed; an error
    /// from it stops the harness and is returned as is.
    pub fn run<F>(
        &self,
        workspace: &Workspace,
        package: &str,
        filter: &BenchFilter,
        mut on_result: F,
    ) -> Result<BenchmarkRunCollection, BenchError>
    where
        F: FnMut(&BenchmarkRun) -> Result<(), BenchError>,
    {
        let mut cmd = self.test_command(workspace, package);
        cmd.arg("-run=@")
            .arg(format!("-bench={}", filter.as_str()))
            .arg(".");
        log::debug!("{} {package} -bench={filter}", HarnessMode::Run);

        let mut result = BenchmarkRunCollection::new();
        let output = shell_exec::stream_lines(&mut cmd, self.stderr_style(), |line| {
            log::debug!("\t{line}");
            let Some(run) = BenchmarkRun::parse(line) else {
                return Ok(());
            };
            on_result(&run)?;
            result.insert(run)
        })?;
        if !output.status.success() {
            return Err(harness_failure(package, &output.stderr));
        }
        Ok(result)
    }

    /// `<harness> test` in the package's sandboxed directory, with the
    /// sandbox root prepended to `GOPATH`.
    fn test_command(&self, workspace: &Workspace, package: &str) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.current_dir(workspace.package_dir(package))
            .env("GOPATH", gopath(&workspace.gopath))
            .arg("test");
        cmd
    }

    fn stderr_style(&self) -> Option<anstyle::Style> {
        self.colored.then_some(ERROR)
    }

    fn spawn_error(&self, e: std::io::Error) -> BenchError {
        BenchError::execution(format!(
            "could not run benchmark harness '{}': {e}",
            self.command
        ))
    }
}

fn harness_failure(package: &str, stderr: &[u8]) -> BenchError {
    BenchError::HarnessFailure {
        package: package.to_string(),
        stderr: String::from_utf8_lossy(stderr).into_owned(),
    }
}

/// `sandbox` followed by whatever `GOPATH` we inherited.
fn gopath(sandbox: &Path) -> OsString {
    let inherited = std::env::var_os("GOPATH").unwrap_or_default();
    let mut paths = vec![sandbox.to_path_buf()];
    paths.extend(std::env::split_paths(&inherited).filter(|p| !p.as_os_str().is_empty()));
    std::env::join_paths(paths).unwrap_or_else(|_| sandbox.as_os_str().to_os_string())
}

/// Parse `<dir>:<import path>` lines. The split is on the last colon so
/// Windows drive letters survive.
fn parse_list_output(output: &str) -> Result<Vec<ListEntry>, BenchError> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (dir, import_path) = line.rsplit_once(':').ok_or_else(|| {
                BenchError::execution(format!("unexpected package list output: {line}"))
            })?;
            Ok(ListEntry {
                dir: PathBuf::from(dir),
                import_path: import_path.to_string(),
            })
        })
        .collect()
}
