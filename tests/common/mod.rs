//! Shared fixtures: a scratch git repository and a stand-in for the go tool.
//!
//! The stand-in understands `list -f ... <selectors>` and
//! `test -run=@ -bench=<re> [-benchtime=0] .`. Each package's benchmarks
//! come from a committed `bench.txt` with one `<Name> <ns/op>` pair per
//! line; a committed `fail.txt` makes `test` fail with its contents on
//! stderr. Every invocation is appended to a log file so tests can count
//! harness runs.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use rstest::fixture;
use tempfile::TempDir;

const FAKE_HARNESS: &str = r#"#!/bin/sh
echo "$*" >> "$FAKE_HARNESS_LOG"
case "$1" in
list)
    shift 3
    for sel in "$@"; do
        case "$sel" in
        ./...) dirs=$(find . -name bench.txt -not -path './.git/*' | sed 's|/bench.txt$||' | sort) ;;
        *) dirs=$sel ;;
        esac
        for d in $dirs; do
            if [ ! -d "$d" ]; then
                echo "cannot find package \"$d\"" >&2
                exit 1
            fi
            abs=$(cd "$d" && pwd -P)
            rel=${d#.}
            rel=${rel#/}
            if [ -n "$FAKE_HARNESS_NO_IMPORT_PATH" ]; then
                echo "$abs:_$abs"
            elif [ -z "$rel" ]; then
                echo "$abs:example.com/proj"
            else
                echo "$abs:example.com/proj/$rel"
            fi
        done
    done
    ;;
test)
    gopath_root=$(cd "${GOPATH%%:*}" && pwd -P)
    case "$(pwd -P)" in
    "$gopath_root"/src/example.com/proj*) ;;
    *)
        echo "not inside the GOPATH sandbox: $(pwd -P)" >&2
        exit 3
        ;;
    esac
    pattern=.
    for arg in "$@"; do
        case "$arg" in
        -bench=*) pattern=${arg#-bench=} ;;
        esac
    done
    if [ -f fail.txt ]; then
        cat fail.txt >&2
        exit 1
    fi
    if [ ! -f bench.txt ]; then
        echo "no benchmarks here" >&2
        exit 1
    fi
    echo "goos: linux"
    while read -r name ns; do
        [ -z "$name" ] && continue
        if printf '%s\n' "$name" | grep -Eq -- "$pattern"; then
            printf '%s-8\t%s\t%s ns/op\n' "$name" 1000 "$ns"
        fi
    done < bench.txt
    echo "PASS"
    ;;
*)
    echo "unsupported: $*" >&2
    exit 2
    ;;
esac
"#;

/// Environment that keeps git independent of the user's configuration.
const GIT_ENV: &[(&str, &str)] = &[
    ("GIT_CONFIG_GLOBAL", "/dev/null"),
    ("GIT_CONFIG_SYSTEM", "/dev/null"),
    ("GIT_AUTHOR_NAME", "Test User"),
    ("GIT_AUTHOR_EMAIL", "test@example.com"),
    ("GIT_AUTHOR_DATE", "2025-01-01T00:00:00Z"),
    ("GIT_COMMITTER_NAME", "Test User"),
    ("GIT_COMMITTER_EMAIL", "test@example.com"),
    ("GIT_COMMITTER_DATE", "2025-01-01T00:00:00Z"),
    ("LC_ALL", "C"),
];

pub struct TestRepo {
    _temp_dir: TempDir,
    root: PathBuf,
    harness: PathBuf,
    harness_log: PathBuf,
    config_path: PathBuf,
}

impl TestRepo {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let base = dunce::canonicalize(temp_dir.path()).unwrap();

        let root = base.join("repo");
        std::fs::create_dir(&root).unwrap();

        let harness = base.join("fake-go");
        std::fs::write(&harness, FAKE_HARNESS).unwrap();
        std::fs::set_permissions(&harness, std::fs::Permissions::from_mode(0o755)).unwrap();

        let repo = Self {
            _temp_dir: temp_dir,
            root,
            harness,
            harness_log: base.join("harness.log"),
            config_path: base.join("config.toml"),
        };
        repo.run_git(&["init", "-q"]);
        repo
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// Where `BENCHLOG_CONFIG_PATH` points; the file does not exist until a
    /// test writes it.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn git_dir(&self) -> PathBuf {
        self.root.join(".git")
    }

    pub fn configure_git_cmd(&self, cmd: &mut Command) {
        for (key, value) in GIT_ENV {
            cmd.env(key, value);
        }
    }

    pub fn run_git(&self, args: &[&str]) -> String {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.root);
        self.configure_git_cmd(&mut cmd);
        let output = cmd.output().unwrap();
        assert!(
            output.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }

    /// Write `<package>/bench.txt`; `package` is `.` for the root.
    pub fn write_benchmarks(&self, package: &str, benchmarks: &[(&str, u32)]) {
        let contents: String = benchmarks
            .iter()
            .map(|(name, ns)| format!("{name} {ns}\n"))
            .collect();
        self.write_file(&format!("{package}/bench.txt"), &contents);
    }

    pub fn write_file(&self, path: &str, contents: &str) {
        let path = self.root.join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    pub fn remove_file(&self, path: &str) {
        std::fs::remove_file(self.root.join(path)).unwrap();
    }

    /// Commit everything in the worktree and return the new commit id.
    pub fn commit(&self, message: &str) -> String {
        self.run_git(&["add", "-A"]);
        self.run_git(&["commit", "-q", "--allow-empty", "-m", message]);
        self.run_git(&["rev-parse", "HEAD"])
    }

    pub fn tree_id(&self, revision: &str) -> String {
        self.run_git(&["rev-parse", &format!("{revision}^{{tree}}")])
    }

    /// Harness invocations so far, one argument string per call.
    pub fn harness_calls(&self) -> Vec<String> {
        std::fs::read_to_string(&self.harness_log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Harness invocations that ran (or enumerated) benchmarks.
    pub fn test_calls(&self) -> Vec<String> {
        self.harness_calls()
            .into_iter()
            .filter(|call| call.starts_with("test "))
            .collect()
    }

    pub fn clear_harness_calls(&self) {
        let _ = std::fs::remove_file(&self.harness_log);
    }

    /// Remove ambient configuration that would change benchlog's behaviour.
    pub fn clean_cli_env(&self, cmd: &mut Command) {
        for (key, _) in std::env::vars_os() {
            if key.to_string_lossy().starts_with("BENCHLOG_") {
                cmd.env_remove(&key);
            }
        }
        cmd.env_remove("RUST_LOG")
            .env_remove("FAKE_HARNESS_NO_IMPORT_PATH")
            .env("BENCHLOG_CONFIG_PATH", &self.config_path)
            .env("BENCHLOG_HARNESS__COMMAND", &self.harness)
            .env("BENCHLOG_COLORED", "false")
            .env("FAKE_HARNESS_LOG", &self.harness_log);
        self.configure_git_cmd(cmd);
    }
}

pub fn benchlog_command() -> Command {
    Command::new(insta_cmd::get_cargo_bin("benchlog"))
}

/// `benchlog <args>` in the repository root with a hermetic environment.
pub fn make_benchlog_cmd(repo: &TestRepo, args: &[&str]) -> Command {
    let mut cmd = benchlog_command();
    repo.clean_cli_env(&mut cmd);
    cmd.args(args).current_dir(repo.root_path());
    cmd
}

pub fn run_benchlog(repo: &TestRepo, args: &[&str]) -> Output {
    make_benchlog_cmd(repo, args).output().unwrap()
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Benchmark result lines from `benchlog log` output.
pub fn benchmark_lines(output: &Output) -> Vec<String> {
    stdout(output)
        .lines()
        .filter(|line| line.starts_with("Benchmark"))
        .map(str::to_string)
        .collect()
}

/// Commit headers, messages (as `> message`), benchmark lines and
/// failure notes, with commit ids masked and tabs shown as spaces. Author
/// and date lines are dropped.
pub fn log_digest(output: &Output) -> String {
    stdout(output)
        .lines()
        .filter_map(|line| {
            if line.starts_with("commit ") {
                Some("commit [SHA]".to_string())
            } else if line.starts_with("Benchmark") || line == "benchmarks failed" {
                Some(line.replace('\t', " "))
            } else {
                line.strip_prefix("    ").map(|message| format!("> {message}"))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// A repository with the harness installed and no commits.
#[fixture]
pub fn repo() -> TestRepo {
    TestRepo::new()
}
