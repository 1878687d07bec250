use crate::common::{TestRepo, benchmark_lines, make_benchlog_cmd, repo, run_benchlog, stderr};
use rstest::rstest;

#[rstest]
fn test_recursive_selector_covers_every_package(repo: TestRepo) {
    repo.write_benchmarks(".", &[("BenchmarkRoot", 10)]);
    repo.write_benchmarks("store", &[("BenchmarkStore", 20)]);
    repo.commit("Add two packages");

    let output = run_benchlog(&repo, &["log", "--", "./..."]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        benchmark_lines(&output),
        vec![
            "BenchmarkRoot-8\t1000\t10 ns/op",
            "BenchmarkStore-8\t1000\t20 ns/op"
        ]
    );

    let tree_cache = repo
        .git_dir()
        .join("benchlog/tree-cache")
        .join(repo.tree_id("HEAD"));
    assert!(tree_cache.join("dir-cache.json").is_file());
    assert!(tree_cache.join("store/dir-cache.json").is_file());
}

#[rstest]
fn test_single_subpackage(repo: TestRepo) {
    repo.write_benchmarks(".", &[("BenchmarkRoot", 10)]);
    repo.write_benchmarks("store", &[("BenchmarkStore", 20)]);
    repo.commit("Add two packages");

    let output = run_benchlog(&repo, &["log", "--", "./store"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        benchmark_lines(&output),
        vec!["BenchmarkStore-8\t1000\t20 ns/op"]
    );
    assert_eq!(repo.test_calls().len(), 1);
}

#[rstest]
fn test_unknown_package_fails(repo: TestRepo) {
    repo.write_benchmarks(".", &[("BenchmarkX", 10)]);
    repo.commit("Add BenchmarkX");

    let output = run_benchlog(&repo, &["log", "--", "./missing"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr(&output);
    assert!(stderr.contains("Cannot resolve packages"), "{stderr}");
    assert!(stderr.contains("cannot find package"), "{stderr}");
    assert!(!stderr.contains("one git repository"), "{stderr}");
    assert!(repo.test_calls().is_empty());
}

#[rstest]
fn test_package_without_import_path_fails(repo: TestRepo) {
    repo.write_benchmarks(".", &[("BenchmarkX", 10)]);
    repo.commit("Add BenchmarkX");

    let mut cmd = make_benchlog_cmd(&repo, &["log", "--", "."]);
    cmd.env("FAKE_HARNESS_NO_IMPORT_PATH", "1");
    let output = cmd.output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr(&output);
    assert!(stderr.contains("is not under a GOPATH"), "{stderr}");
    assert!(repo.test_calls().is_empty());
}

#[rstest]
fn test_packages_in_two_repositories_fail(repo: TestRepo) {
    repo.write_benchmarks(".", &[("BenchmarkX", 10)]);
    repo.commit("Add BenchmarkX");
    repo.write_benchmarks("other", &[("BenchmarkY", 10)]);
    repo.run_git(&["init", "-q", "other"]);

    let output = run_benchlog(&repo, &["log", "--", ".", "./other"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr(&output);
    assert!(
        stderr.contains("packages span multiple git repositories"),
        "{stderr}"
    );
    assert!(stderr.contains("Packages must all live in one git repository"), "{stderr}");
    assert!(repo.test_calls().is_empty());
}

#[rstest]
fn test_packages_are_required(repo: TestRepo) {
    let output = run_benchlog(&repo, &["log"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(repo.harness_calls().is_empty());
}
