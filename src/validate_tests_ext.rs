use super::{validate, validate_documents, Defect, DefectKind};
use crate::chain::{build_series, DocumentIndex};
use crate::domain::series::LinkField;
use crate::frontmatter::{parse, ParsedDocument};

fn guide(
    id: &str,
    part: u32,
    total: u32,
    previous: Option<&str>,
    next: Option<&str>,
) -> ParsedDocument {
    let mut raw = format!(
        "---\ntitle: \"{id}\"\nseries:\n  name: \"Intro to X\"\n  part: {part}\n  total: {total}\n"
    );
    if let Some(previous) = previous {
        raw.push_str(&format!("  previous: \"{previous}\"\n"));
    }
    if let Some(next) = next {
        raw.push_str(&format!("  next: \"{next}\"\n"));
    }
    raw.push_str("---\n\nBody\n");
    parse(id, raw)
}

fn kinds(docs: &[ParsedDocument]) -> Vec<DefectKind> {
    let index = DocumentIndex::new(docs);
    let series = build_series(docs);
    let mut kinds = validate(&series["Intro to X"], &index)
        .iter()
        .map(Defect::kind)
        .collect::<Vec<_>>();
    kinds.sort();
    kinds
}

#[test]
fn consistent_chain_has_no_defects() {
    let docs = vec![
        guide("part-1", 1, 3, None, Some("part-2")),
        guide("part-2", 2, 3, Some("part-1"), Some("part-3")),
        guide("part-3", 3, 3, Some("part-2"), None),
    ];
    assert!(kinds(&docs).is_empty());
    assert!(validate_documents(&docs).ok());
}

#[test]
fn one_sided_link_reports_asymmetry_and_missing_previous() {
    let docs = vec![
        guide("part-1", 1, 2, None, Some("part-2")),
        guide("part-2", 2, 2, None, None),
    ];
    assert_eq!(
        kinds(&docs),
        vec![DefectKind::AsymmetricLink, DefectKind::MissingPrevious]
    );
}

#[test]
fn dangling_reference_is_checked_against_all_documents() {
    let outside = parse("other-guide", "---\ntitle: \"Other\"\n---\n");
    let docs = vec![
        guide("part-1", 1, 2, None, Some("part-2")),
        guide("part-2", 2, 2, Some("part-1"), Some("part-3")),
        guide("lonely", 1, 2, None, Some("other-guide")),
        outside,
    ];
    let index = DocumentIndex::new(&docs);
    let series = build_series(&docs);
    let defects = validate(&series["Intro to X"], &index);

    assert!(defects.iter().any(|defect| matches!(
        defect,
        Defect::DanglingReference { id, field: LinkField::Next, target, .. }
            if id == "part-2" && target == "part-3"
    )));
    assert!(!defects.iter().any(|defect| matches!(
        defect,
        Defect::DanglingReference { id, .. } if id == "lonely"
    )));
    assert!(defects.iter().any(|defect| matches!(
        defect,
        Defect::AsymmetricLink { id, reciprocal: None, .. } if id == "lonely"
    )));
}

#[test]
fn boundary_links_are_flagged() {
    let docs = vec![
        guide("part-1", 1, 2, Some("part-2"), Some("part-2")),
        guide("part-2", 2, 2, Some("part-1"), Some("part-1")),
    ];
    let found = kinds(&docs);
    assert_eq!(
        found
            .iter()
            .filter(|kind| **kind == DefectKind::UnexpectedBoundaryLink)
            .count(),
        2
    );
}

#[test]
fn duplicate_parts_and_inconsistent_totals_are_reported() {
    let docs = vec![
        guide("a", 1, 3, None, None),
        guide("b", 2, 3, None, None),
        guide("c", 2, 3, None, None),
        guide("d", 3, 4, None, None),
    ];
    let index = DocumentIndex::new(&docs);
    let series = build_series(&docs);
    let defects = validate(&series["Intro to X"], &index);

    assert!(defects.iter().any(|defect| matches!(
        defect,
        Defect::DuplicatePart { part: 2, ids, .. } if ids == &vec!["b".to_string(), "c".to_string()]
    )));
    assert!(defects.iter().any(|defect| matches!(
        defect,
        Defect::PartOutOfRange { id, total: 4, expected_total: 3, .. } if id == "d"
    )));
}

#[test]
fn part_zero_is_out_of_range() {
    let docs = vec![guide("zero", 0, 1, None, None)];
    assert!(kinds(&docs).contains(&DefectKind::PartOutOfRange));
}

#[test]
fn zero_total_puts_every_member_out_of_range() {
    let docs = vec![
        guide("a", 1, 0, None, Some("b")),
        guide("b", 2, 0, Some("a"), None),
    ];
    let index = DocumentIndex::new(&docs);
    let series = build_series(&docs);
    let out_of_range = validate(&series["Intro to X"], &index)
        .into_iter()
        .filter_map(|defect| match defect {
            Defect::PartOutOfRange {
                id, expected_total, ..
            } => Some((id, expected_total)),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(
        out_of_range,
        vec![("a".to_string(), 0), ("b".to_string(), 0)]
    );
}

#[test]
fn validate_does_not_mutate_documents() {
    let docs = vec![
        guide("part-1", 1, 2, None, Some("ghost")),
        guide("part-2", 2, 2, None, None),
    ];
    let before = docs.clone();
    let _ = validate_documents(&docs);
    assert_eq!(docs, before);
}

#[test]
fn report_collects_parse_issues_without_failing() {
    let docs = vec![
        guide("part-1", 1, 1, None, None),
        parse("bad", "---\nseries:\n  name: S\n  part: x\n  total: 1\n---\n"),
    ];
    let report = validate_documents(&docs);
    assert!(report.ok());
    assert_eq!(report.documents_scanned, 2);
    assert!(!report.parse_issues.is_empty());
}

#[test]
fn describe_mentions_ids_and_parts() {
    let defect = Defect::MissingNext {
        series: "Intro to X".to_string(),
        id: "part-2".to_string(),
        part: 2,
        total: 3,
    };
    assert_eq!(defect.describe(), "part-2: missing next link (part 2 of 3)");
    assert_eq!(defect.series(), "Intro to X");
}
