use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use uuid::Uuid;

fn unique_workspace(prefix: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("{prefix}-{}", Uuid::now_v7()));
    std::fs::create_dir_all(path.join("_guides")).expect("workspace should be creatable");
    path
}

fn run_guidechain(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_guidechain"))
        .arg("--root")
        .arg(root)
        .args(args)
        .env_remove("GUIDECHAIN_GUIDES_DIR")
        .env_remove("GUIDECHAIN_CATALOG")
        .env("NO_COLOR", "1")
        .output()
        .expect("guidechain should run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

fn write_guide(root: &Path, file: &str, body: &str) -> PathBuf {
    let path = root.join("_guides").join(file);
    std::fs::write(&path, body).expect("guide should be writable");
    path
}

fn series_guide(part: u32, total: u32, previous: Option<&str>, next: Option<&str>) -> String {
    let mut raw = format!(
        "---\nlayout: guide\ntitle: \"Intro to X, Part {part}\"\nseries:\n  name: \"Intro to X\"\n  part: {part}\n  total: {total}\n"
    );
    if let Some(previous) = previous {
        raw.push_str(&format!("  previous: \"{previous}\"\n"));
    }
    if let Some(next) = next {
        raw.push_str(&format!("  next: \"{next}\"\n"));
    }
    raw.push_str("---\n\nSome   text  that must survive.\n");
    raw
}

#[test]
fn validate_exit_code_follows_defects() {
    let root = unique_workspace("guidechain-validate");
    write_guide(&root, "2024-01-01-part-1.md", &series_guide(1, 2, None, Some("part-2")));
    write_guide(&root, "2024-01-02-part-2.md", &series_guide(2, 2, Some("part-1"), None));

    let clean = run_guidechain(&root, &["validate"]);
    assert!(clean.status.success(), "stderr: {}", stderr(&clean));
    assert!(stdout(&clean).contains("Intro to X [OK]"));

    write_guide(&root, "2024-01-02-part-2.md", &series_guide(2, 2, None, None));
    let broken = run_guidechain(&root, &["validate", "--json"]);
    assert!(!broken.status.success());
    assert!(stderr(&broken).contains("validation found 2 defect(s)"));
    let report = json(&broken);
    let kinds = report["series"][0]["defects"]
        .as_array()
        .expect("defects array")
        .iter()
        .map(|defect| defect["kind"].as_str().expect("kind").to_string())
        .collect::<Vec<_>>();
    assert_eq!(kinds, vec!["asymmetric_link", "missing_previous"]);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn repair_is_idempotent_and_preserves_unrelated_bytes() {
    let root = unique_workspace("guidechain-repair");
    let one = write_guide(&root, "part-1.md", &series_guide(1, 3, None, Some("part-2")));
    let two = write_guide(&root, "part-2.md", &series_guide(2, 3, None, None));
    let three = write_guide(&root, "part-3.md", &series_guide(3, 3, None, None));
    let untouched = series_guide(1, 3, None, Some("part-2"));

    let first = run_guidechain(&root, &["repair", "--json"]);
    assert!(first.status.success(), "stderr: {}", stderr(&first));
    let report = json(&first);
    assert_eq!(report["converged"], Value::Bool(true));
    assert_eq!(report["written"], serde_json::json!(["part-2", "part-3"]));

    assert_eq!(
        std::fs::read_to_string(&one).expect("read"),
        untouched,
        "part 1 was already correct"
    );
    assert_eq!(
        std::fs::read_to_string(&two).expect("read"),
        series_guide(2, 3, Some("part-1"), Some("part-3"))
    );
    assert_eq!(
        std::fs::read_to_string(&three).expect("read"),
        series_guide(3, 3, Some("part-2"), None)
    );

    let second = run_guidechain(&root, &["repair", "--json"]);
    assert!(second.status.success());
    let report = json(&second);
    assert_eq!(report["edits"], serde_json::json!([]));
    assert_eq!(report["written"], serde_json::json!([]));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn repair_reports_unresolved_defects_with_failure_exit() {
    let root = unique_workspace("guidechain-intro");
    write_guide(&root, "part-1.md", &series_guide(1, 3, None, Some("part-2")));
    let two = write_guide(&root, "part-2.md", &series_guide(2, 3, None, Some("part-3")));

    let output = run_guidechain(&root, &["repair"]);
    assert!(!output.status.success());
    let text = stdout(&output);
    assert!(text.contains("part-2.previous = \"part-1\""));
    assert!(text.contains("part-2.next removed"));
    assert!(text.contains("[MISSING_NEXT]"));
    assert!(stderr(&output).contains("repair left 0 conflict(s) and 1 unresolved defect(s)"));
    assert_eq!(
        std::fs::read_to_string(&two).expect("read"),
        series_guide(2, 3, Some("part-1"), None)
    );

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn dry_run_leaves_files_untouched() {
    let root = unique_workspace("guidechain-dry");
    let two = write_guide(&root, "part-2.md", &series_guide(2, 2, None, None));
    write_guide(&root, "part-1.md", &series_guide(1, 2, None, Some("part-2")));
    let before = std::fs::read_to_string(&two).expect("read");

    let output = run_guidechain(&root, &["repair", "--dry-run"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("dry run, nothing written"));
    assert_eq!(std::fs::read_to_string(&two).expect("read"), before);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn insert_navigation_links_neighbors_and_flags_conflicts() {
    let root = unique_workspace("guidechain-insert");
    let one = write_guide(&root, "part-1.md", &series_guide(1, 3, None, None));
    write_guide(&root, "part-2.md", &series_guide(2, 3, Some("part-1"), Some("part-3")));
    let three = write_guide(&root, "part-3.md", &series_guide(3, 3, Some("stale"), None));
    write_guide(&root, "stale.md", "---\ntitle: \"Stale\"\n---\n");

    let output = run_guidechain(&root, &["insert-navigation", "part-2", "--json"]);
    assert!(!output.status.success());
    let report = json(&output);
    assert_eq!(report["edits"].as_array().map(Vec::len), Some(1));
    assert_eq!(report["conflicts"][0]["document_id"], "part-3");
    assert_eq!(report["conflicts"][0]["existing"], "stale");
    assert!(std::fs::read_to_string(&one)
        .expect("read")
        .contains("  next: \"part-2\"\n"));
    assert!(std::fs::read_to_string(&three)
        .expect("read")
        .contains("  previous: \"stale\"\n"));

    let missing = run_guidechain(&root, &["insert-navigation", "nope"]);
    assert!(!missing.status.success());
    assert!(stderr(&missing).contains("guide 'nope' not found"));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn seed_uses_catalog_and_config_file() {
    let root = unique_workspace("guidechain-seed");
    std::fs::create_dir_all(root.join("content")).expect("content dir");
    std::fs::write(
        root.join("guidechain.toml"),
        "guides_dir = \"content\"\ncatalog = \"data/topics.json\"\n",
    )
    .expect("config");
    std::fs::create_dir_all(root.join("data")).expect("data dir");
    std::fs::write(
        root.join("data/topics.json"),
        r#"[{"title": "Intro to X, Part 1", "series": {"name": "Intro to X", "part": 1, "total": 1}},
            {"title": "Not Written Yet", "series": {"name": "Y", "part": 1, "total": 1}}]"#,
    )
    .expect("catalog");
    let guide = root.join("content/2024-02-03-intro-to-x-part-1.md");
    std::fs::write(
        &guide,
        "---\ntitle: \"Intro to X, Part 1\"\ntags: [\"x\"]\ndescription: \"d\"\n---\nBody\n",
    )
    .expect("guide");

    let output = run_guidechain(&root, &["seed"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("1 seeded, 0 already present, 1 not found, 0 unparsed"));
    assert_eq!(
        std::fs::read_to_string(&guide).expect("read"),
        "---\ntitle: \"Intro to X, Part 1\"\ntags: [\"x\"]\nseries:\n  name: \"Intro to X\"\n  part: 1\n  total: 1\ndescription: \"d\"\n---\nBody\n"
    );
    assert!(run_guidechain(&root, &["validate"]).status.success());

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn invalid_config_and_missing_directory_are_errors() {
    let root = unique_workspace("guidechain-errors");
    std::fs::write(root.join("guidechain.toml"), "max_repair_passes = \"many\"\n").expect("config");
    let bad = run_guidechain(&root, &["validate"]);
    assert!(!bad.status.success());
    assert!(stderr(&bad).contains("invalid guidechain.toml TOML"));

    std::fs::remove_file(root.join("guidechain.toml")).expect("remove config");
    let missing = run_guidechain(&root, &["--guides-dir", "nowhere", "validate"]);
    assert!(!missing.status.success());
    assert!(stderr(&missing).contains("does not exist"));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn completions_print_for_bash() {
    let root = unique_workspace("guidechain-completions");
    let output = run_guidechain(&root, &["completions", "bash"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("insert-navigation"));
    let _ = std::fs::remove_dir_all(root);
}
