use crate::common::{TestRepo, repo, run_benchlog, stderr, stdout};
use rstest::rstest;

fn populate(repo: &TestRepo) {
    repo.write_benchmarks(".", &[("BenchmarkX", 100)]);
    repo.commit("Add BenchmarkX");
    let output = run_benchlog(repo, &["log", "--", "."]);
    assert!(output.status.success(), "{}", stderr(&output));
    repo.clear_harness_calls();
}

#[rstest]
fn test_cache_dir(repo: TestRepo) {
    let output = run_benchlog(&repo, &["cache", "dir"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        stdout(&output).trim_end(),
        repo.git_dir().join("benchlog/tree-cache").display().to_string()
    );
}

#[rstest]
fn test_cache_file_contents(repo: TestRepo) {
    populate(&repo);
    let path = repo
        .git_dir()
        .join("benchlog/tree-cache")
        .join(repo.tree_id("HEAD"))
        .join("dir-cache.json");
    let cache: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(cache["benchmarks_is_complete"], true);
    assert_eq!(cache["benchmarks"][0]["name"], "BenchmarkX");
    assert_eq!(cache["benchmarks"][0]["ns_per_op"], 100.0);
}

#[rstest]
fn test_clear_one_tree(repo: TestRepo) {
    populate(&repo);
    let tree = repo.tree_id("HEAD");

    let output = run_benchlog(&repo, &["cache", "clear", &tree]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        stdout(&output).trim_end(),
        format!("✅ Removed cached results for tree {tree}")
    );
    assert!(!repo.git_dir().join("benchlog/tree-cache").join(&tree).exists());

    let output = run_benchlog(&repo, &["log", "--", "."]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(repo.test_calls().len(), 1);

    let output = run_benchlog(&repo, &["cache", "clear", "abc123"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        stdout(&output).trim_end(),
        "🟡 No cached results for tree abc123"
    );
}

#[rstest]
fn test_clear_everything(repo: TestRepo) {
    populate(&repo);

    let output = run_benchlog(&repo, &["cache", "clear"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output).trim_end(), "✅ Removed all cached results");
    assert!(!repo.git_dir().join("benchlog/tree-cache").exists());

    let output = run_benchlog(&repo, &["cache", "clear"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output).trim_end(), "🟡 No cached results");
}

#[rstest]
fn test_clear_rejects_paths(repo: TestRepo) {
    populate(&repo);

    let output = run_benchlog(&repo, &["cache", "clear", "../x"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("is not a tree id"), "{}", stderr(&output));
    assert!(repo.git_dir().join("benchlog/tree-cache").exists());
}
