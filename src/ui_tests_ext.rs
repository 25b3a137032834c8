use super::{format_insertion, format_repair, format_seed, format_validation, kind_color_code, Palette};
use crate::app::{repair_snapshot, InsertionReport, SeedReport, SeededGuide};
use crate::domain::series::LinkField;
use crate::reconcile::{Conflict, Edit, EditReason};
use crate::store::Snapshot;
use crate::validate::validate_documents;

const PLAIN: Palette = Palette { enabled: false };

fn intro_snapshot() -> Snapshot {
    Snapshot::from_sources([
        (
            "part-1",
            "---\nseries:\n  name: \"Intro to X\"\n  part: 1\n  total: 3\n  next: \"part-2\"\n---\n",
        ),
        (
            "part-2",
            "---\nseries:\n  name: \"Intro to X\"\n  part: 2\n  total: 3\n  next: \"part-3\"\n---\n",
        ),
    ])
}

#[test]
fn validation_lists_defects_under_their_series() {
    let snapshot = intro_snapshot();
    let report = validate_documents(snapshot.parsed());
    let text = format_validation(&report, &PLAIN);
    assert!(text.starts_with("Series\nIntro to X [3 DEFECT(S)] 2 of 3 part(s)\n"));
    assert!(text.contains("  [DANGLING_REFERENCE] part-2 (part 2): next link \"part-3\" doesn't exist\n"));
    assert!(text.ends_with("2 guide(s), 1 series, 3 defect(s)\n"));
}

#[test]
fn repair_summary_counts_fixed_and_unresolved() {
    let mut snapshot = intro_snapshot();
    let report = repair_snapshot(&mut snapshot, 8).expect("repair should run");
    let text = format_repair(&report, &PLAIN);
    assert!(text.contains("  part-2.previous = \"part-1\"\n"));
    assert!(text.contains("  part-2.next removed\n"));
    assert!(text.contains("unresolved [MISSING_NEXT] part-2: missing next link (part 2 of 3) in \"Intro to X\"\n"));
    assert!(text.ends_with("2 fixed, 1 skipped, 0 conflicted, 1 unresolved; 0 file(s) written\n"));
}

#[test]
fn insertion_output_shows_edits_conflicts_and_dry_run() {
    let report = InsertionReport {
        id: "b".to_string(),
        dry_run: true,
        edits: vec![Edit {
            document_id: "c".to_string(),
            field: LinkField::Previous,
            old_value: None,
            new_value: Some("b".to_string()),
            reason: EditReason::InsertNavigation,
        }],
        conflicts: vec![Conflict {
            document_id: "a".to_string(),
            field: LinkField::Next,
            existing: Some("old".to_string()),
            proposed: Some("b".to_string()),
            detail: "a already has next \"old\"".to_string(),
        }],
        written: Vec::new(),
    };
    let text = format_insertion(&report, &PLAIN);
    assert!(text.contains("  c.previous = \"b\"\n"));
    assert!(text.contains("  conflict a.next: a already has next \"old\"\n"));
    assert!(text.ends_with("1 edit(s), 1 conflict(s); dry run, nothing written\n"));
}

#[test]
fn seed_output_reports_each_bucket() {
    let report = SeedReport {
        dry_run: false,
        seeded: vec![SeededGuide {
            id: "intro".to_string(),
            series: "Intro to X".to_string(),
            part: 1,
            total: 3,
        }],
        already_present: vec!["other".to_string()],
        not_found: vec!["Missing Title".to_string()],
        unparsed: Vec::new(),
        written: vec!["intro".to_string()],
    };
    let text = format_seed(&report, &PLAIN);
    assert!(text.contains("  intro Intro to X (part 1/3)\n"));
    assert!(text.contains("  not found Missing Title\n"));
    assert!(text.ends_with("1 seeded, 1 already present, 1 not found, 0 unparsed; 1 file(s) written\n"));
}

#[test]
fn palette_paints_only_when_enabled() {
    let colored = Palette { enabled: true };
    assert_eq!(colored.bad("x"), "\x1b[31mx\x1b[0m");
    assert_eq!(PLAIN.kind("asymmetric_link"), "[ASYMMETRIC_LINK]");
    assert_eq!(kind_color_code("unexpected_boundary_link"), "37");
}
