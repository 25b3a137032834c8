use super::{insert_into_snapshot, repair_snapshot, seed_snapshot, validate_snapshot, App, AppError};
use crate::catalog::Catalog;
use crate::config::{Config, ConfigOverrides};
use crate::domain::series::LinkField;
use crate::store::Snapshot;
use crate::validate::DefectKind;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use uuid::Uuid;

fn unique_workspace() -> PathBuf {
    let root = std::env::temp_dir().join(format!("guidechain-app-test-{}", Uuid::now_v7()));
    std::fs::create_dir_all(root.join("_guides")).expect("temp workspace should be creatable");
    root
}

fn guide(name: &str, part: u32, total: u32, previous: Option<&str>, next: Option<&str>) -> String {
    let mut raw = format!(
        "---\nlayout: guide\ntitle: \"{name} part {part}\"\nseries:\n  name: \"{name}\"\n  part: {part}\n  total: {total}\n"
    );
    if let Some(previous) = previous {
        raw.push_str(&format!("  previous: \"{previous}\"\n"));
    }
    if let Some(next) = next {
        raw.push_str(&format!("  next: \"{next}\"\n"));
    }
    raw.push_str("image: \"/assets/cover.png\"\n---\n\nBody text.\n");
    raw
}

fn open(root: &Path) -> App {
    App::open(Config::load(root, ConfigOverrides::default()).expect("config should load"))
}

fn link_of(snapshot: &Snapshot, id: &str) -> crate::domain::series::SeriesLink {
    snapshot
        .get(id)
        .and_then(|doc| doc.parsed.series().cloned())
        .expect("guide should have a series link")
}

#[test]
fn intro_scenario_repairs_what_it_can_and_reports_the_rest() {
    let mut snapshot = Snapshot::from_sources([
        ("part-1".to_string(), guide("Intro to X", 1, 3, None, Some("part-2"))),
        ("part-2".to_string(), guide("Intro to X", 2, 3, None, Some("part-3"))),
    ]);
    let report = repair_snapshot(&mut snapshot, 8).expect("repair should run");

    assert!(report.converged);
    assert_eq!(report.edits.len(), 2);
    let part_two = link_of(&snapshot, "part-2");
    assert_eq!(part_two.previous.as_deref(), Some("part-1"));
    assert_eq!(part_two.next, None);
    let remaining = report
        .remaining
        .defects()
        .map(|defect| defect.kind())
        .collect::<Vec<_>>();
    assert_eq!(remaining, vec![DefectKind::MissingNext]);
    assert!(!report.ok());
}

#[test]
fn second_repair_run_proposes_nothing() {
    let mut snapshot = Snapshot::from_sources([
        ("a".to_string(), guide("S", 1, 4, None, None)),
        ("b".to_string(), guide("S", 2, 4, Some("a"), Some("ghost"))),
        ("c".to_string(), guide("S", 3, 4, None, Some("d"))),
        ("d".to_string(), guide("S", 4, 4, None, None)),
    ]);
    let first = repair_snapshot(&mut snapshot, 8).expect("first repair");
    assert!(!first.edits.is_empty());
    assert!(first.ok(), "remaining: {:?}", first.remaining);

    let second = repair_snapshot(&mut snapshot, 8).expect("second repair");
    assert!(second.edits.is_empty());
    assert_eq!(second.passes, 1);
}

#[test]
fn repaired_series_is_mutually_consistent_and_fabricates_nothing() {
    let sources = [
        ("a".to_string(), guide("S", 1, 3, None, None)),
        ("b".to_string(), guide("S", 2, 3, None, Some("c"))),
        ("c".to_string(), guide("S", 3, 3, Some("missing"), None)),
        ("z".to_string(), "---\ntitle: \"Unrelated\"\n---\n".to_string()),
    ];
    let known = sources
        .iter()
        .map(|(id, _)| id.clone())
        .collect::<BTreeSet<_>>();
    let mut snapshot = Snapshot::from_sources(sources);
    let report = repair_snapshot(&mut snapshot, 8).expect("repair should run");
    assert!(report.ok(), "remaining: {:?}", report.remaining);

    for edit in &report.edits {
        if let Some(value) = edit.new_value.as_deref() {
            assert!(known.contains(value), "fabricated id {value}");
        }
    }

    let mut forward = vec!["a".to_string()];
    while let Some(next) = link_of(&snapshot, forward.last().expect("non-empty")).next {
        forward.push(next);
    }
    let mut backward = vec!["c".to_string()];
    while let Some(previous) = link_of(&snapshot, backward.last().expect("non-empty")).previous {
        backward.push(previous);
    }
    backward.reverse();
    assert_eq!(forward, vec!["a", "b", "c"]);
    assert_eq!(forward, backward);
}

#[test]
fn repair_respects_pass_limit() {
    let mut snapshot = Snapshot::from_sources([
        ("a".to_string(), guide("S", 1, 2, None, None)),
        ("b".to_string(), guide("S", 2, 2, None, None)),
    ]);
    let report = repair_snapshot(&mut snapshot, 1).expect("repair should run");
    assert_eq!(report.passes, 1);
    assert!(!report.converged);
    assert!(report.remaining.ok());
    assert!(!report.ok());
}

#[test]
fn insertion_is_symmetric_and_idempotent() {
    let mut snapshot = Snapshot::from_sources([
        ("a".to_string(), guide("S", 1, 3, None, None)),
        ("b".to_string(), guide("S", 2, 3, Some("a"), Some("c"))),
        ("c".to_string(), guide("S", 3, 3, None, None)),
    ]);
    let report = insert_into_snapshot(&mut snapshot, "b").expect("insert should run");
    assert_eq!(report.edits.len(), 2);
    assert!(report.conflicts.is_empty());
    assert_eq!(link_of(&snapshot, "a").next.as_deref(), Some("b"));
    assert_eq!(link_of(&snapshot, "c").previous.as_deref(), Some("b"));
    assert!(validate_snapshot(&snapshot).ok());

    let again = insert_into_snapshot(&mut snapshot, "b").expect("second insert should run");
    assert!(again.edits.is_empty());
    assert!(again.conflicts.is_empty());
}

#[test]
fn insertion_applies_clean_side_and_reports_conflicting_side() {
    let mut snapshot = Snapshot::from_sources([
        ("a".to_string(), guide("S", 1, 3, None, Some("old"))),
        ("old".to_string(), guide("S", 2, 3, Some("a"), None)),
        ("b".to_string(), guide("S", 2, 3, Some("a"), Some("c"))),
        ("c".to_string(), guide("S", 3, 3, None, None)),
    ]);
    let report = insert_into_snapshot(&mut snapshot, "b").expect("insert should run");
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].document_id, "a");
    assert_eq!(report.conflicts[0].field, LinkField::Next);
    assert_eq!(link_of(&snapshot, "a").next.as_deref(), Some("old"));
    assert_eq!(link_of(&snapshot, "c").previous.as_deref(), Some("b"));
}

#[test]
fn insertion_errors_for_unknown_or_unlinked_guides() {
    let mut snapshot = Snapshot::from_sources([(
        "plain".to_string(),
        "---\ntitle: \"Plain\"\n---\n".to_string(),
    )]);
    assert!(matches!(
        insert_into_snapshot(&mut snapshot, "ghost"),
        Err(AppError::NotFound(id)) if id == "ghost"
    ));
    assert!(matches!(
        insert_into_snapshot(&mut snapshot, "plain"),
        Err(AppError::InvalidArgument(message)) if message.contains("no series section")
    ));
}

#[test]
fn seeding_fills_missing_sections_from_catalog() {
    let mut snapshot = Snapshot::from_sources([
        (
            "intro-to-x-part-1".to_string(),
            "---\ntitle: \"Intro to X, Part 1\"\ntags: [\"x\"]\n---\nBody\n".to_string(),
        ),
        (
            "renamed-file".to_string(),
            "---\ntitle: \"Intro to X, Part 2\"\n---\nBody\n".to_string(),
        ),
        (
            "already".to_string(),
            guide("Other", 1, 1, None, None).replace("Other part 1", "Already"),
        ),
        ("no-block".to_string(), "just text".to_string()),
    ]);
    let catalog = Catalog::from_json(
        r#"[
            {"title": "Intro to X, Part 1", "series": {"name": "Intro to X", "part": 1, "total": 2, "next": "renamed-file"}},
            {"title": "Intro to X, Part 2", "series": {"name": "Intro to X", "part": 2, "total": 2, "previous": "intro-to-x-part-1"}},
            {"title": "Already", "series": {"name": "Other", "part": 1, "total": 1}},
            {"title": "No Block", "series": {"name": "N", "part": 1, "total": 1}},
            {"title": "Missing Guide", "series": {"name": "M", "part": 1, "total": 1}},
            {"title": "No Series"}
        ]"#,
    )
    .expect("catalog should parse");

    let report = seed_snapshot(&mut snapshot, &catalog).expect("seed should run");
    let seeded = report
        .seeded
        .iter()
        .map(|entry| entry.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(seeded, vec!["intro-to-x-part-1", "renamed-file"]);
    assert_eq!(report.already_present, vec!["already"]);
    assert_eq!(report.unparsed, vec!["no-block"]);
    assert_eq!(report.not_found, vec!["Missing Guide"]);
    assert!(validate_snapshot(&snapshot).ok());

    let again = seed_snapshot(&mut snapshot, &catalog).expect("second seed should run");
    assert!(again.seeded.is_empty());
    assert_eq!(again.already_present.len(), 3);
}

#[test]
fn app_repair_writes_only_changed_files_and_dry_run_writes_none() {
    let root = unique_workspace();
    let guides = root.join("_guides");
    let part_one = guides.join("2024-05-01-part-1.md");
    let part_two = guides.join("2024-05-02-part-2.md");
    let standalone = guides.join("standalone.md");
    std::fs::write(&part_one, guide("Intro to X", 1, 2, None, Some("part-2"))).expect("write");
    std::fs::write(&part_two, guide("Intro to X", 2, 2, None, None)).expect("write");
    std::fs::write(&standalone, "---\ntitle: \"Alone\"\n---\n").expect("write");
    let original_two = std::fs::read_to_string(&part_two).expect("read");

    let app = open(&root);
    assert!(!app.validate().expect("validate").ok());

    let dry = app.repair(true).expect("dry run should work");
    assert!(dry.dry_run);
    assert_eq!(dry.edits.len(), 1);
    assert!(dry.written.is_empty());
    assert_eq!(std::fs::read_to_string(&part_two).expect("read"), original_two);

    let applied = app.repair(false).expect("repair should work");
    assert_eq!(applied.written, vec!["part-2"]);
    assert!(applied.ok());
    assert!(app.validate().expect("validate").ok());
    assert!(app.repair(false).expect("rerun").edits.is_empty());

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn app_reports_missing_guides_directory_and_catalog() {
    let root = std::env::temp_dir().join(format!("guidechain-app-empty-{}", Uuid::now_v7()));
    std::fs::create_dir_all(&root).expect("root should be creatable");
    let app = open(&root);
    assert!(matches!(app.validate(), Err(AppError::Store(_))));
    assert!(matches!(app.seed(true), Err(AppError::Catalog(_))));
    let _ = std::fs::remove_dir_all(root);
}
