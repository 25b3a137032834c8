use super::{plan_insertion, plan_repair, Edit, EditReason, Plan, PlanBuilder};
use crate::chain::{build_series, DocumentIndex};
use crate::domain::series::LinkField;
use crate::frontmatter::{parse, ParsedDocument};
use crate::validate::DefectKind;

fn guide(
    id: &str,
    name: &str,
    part: u32,
    total: u32,
    previous: Option<&str>,
    next: Option<&str>,
) -> ParsedDocument {
    let mut raw = format!("---\nseries:\n  name: \"{name}\"\n  part: {part}\n  total: {total}\n");
    if let Some(previous) = previous {
        raw.push_str(&format!("  previous: \"{previous}\"\n"));
    }
    if let Some(next) = next {
        raw.push_str(&format!("  next: \"{next}\"\n"));
    }
    raw.push_str("---\n");
    parse(id, raw)
}

fn repair(docs: &[ParsedDocument]) -> Plan {
    let index = DocumentIndex::new(docs);
    let chains = build_series(docs);
    plan_repair(chains.values(), &index)
}

fn has_edit(plan: &Plan, id: &str, field: LinkField, value: Option<&str>) -> bool {
    plan.edits.iter().any(|edit| {
        edit.document_id == id && edit.field == field && edit.new_value.as_deref() == value
    })
}

#[test]
fn intro_scenario_fixes_asymmetry_and_removes_dangling_next() {
    let docs = vec![
        guide("part-1", "Intro to X", 1, 3, None, Some("part-2")),
        guide("part-2", "Intro to X", 2, 3, None, Some("part-3")),
    ];
    let plan = repair(&docs);

    assert_eq!(plan.edits.len(), 2, "edits: {:?}", plan.edits);
    assert!(has_edit(&plan, "part-2", LinkField::Previous, Some("part-1")));
    assert!(has_edit(&plan, "part-2", LinkField::Next, None));
    assert!(plan.conflicts.is_empty());
}

#[test]
fn missing_links_are_inferred_from_adjacent_parts() {
    let docs = vec![
        guide("a", "S", 1, 3, None, None),
        guide("b", "S", 2, 3, None, None),
        guide("c", "S", 3, 3, None, None),
    ];
    let plan = repair(&docs);
    assert!(has_edit(&plan, "a", LinkField::Next, Some("b")));
    assert!(has_edit(&plan, "b", LinkField::Previous, Some("a")));
    assert!(has_edit(&plan, "b", LinkField::Next, Some("c")));
    assert!(has_edit(&plan, "c", LinkField::Previous, Some("b")));
    assert_eq!(plan.edits.len(), 4);
    assert!(plan
        .edits
        .iter()
        .all(|edit| edit.reason == EditReason::InferNeighbor));
}

#[test]
fn inference_refuses_to_contradict_an_existing_neighbor_pointer() {
    let docs = vec![
        guide("a", "S", 1, 2, None, None),
        guide("b", "S", 2, 2, Some("elsewhere"), None),
        guide("elsewhere", "Other", 1, 1, None, None),
    ];
    let plan = repair(&docs);
    assert!(!has_edit(&plan, "a", LinkField::Next, Some("b")));
    assert!(!plan
        .edits
        .iter()
        .any(|edit| edit.document_id == "b" && edit.field == LinkField::Previous));
    assert!(plan
        .conflicts
        .iter()
        .any(|conflict| conflict.document_id == "a" && conflict.field == LinkField::Next));
}

#[test]
fn higher_member_previous_is_authoritative() {
    let docs = vec![
        guide("a", "S", 1, 2, None, Some("stale")),
        guide("b", "S", 2, 2, Some("a"), None),
        guide("stale", "Other", 1, 1, None, None),
    ];
    let plan = repair(&docs);
    let edit = plan
        .edits
        .iter()
        .find(|edit| edit.document_id == "a" && edit.field == LinkField::Next)
        .expect("a.next should be corrected");
    assert_eq!(edit.old_value.as_deref(), Some("stale"));
    assert_eq!(edit.new_value.as_deref(), Some("b"));
    assert_eq!(edit.reason, EditReason::PropagateLink);
}

#[test]
fn links_that_skip_parts_become_conflicts() {
    let docs = vec![
        guide("a", "S", 1, 3, None, Some("c")),
        guide("b", "S", 2, 3, None, None),
        guide("c", "S", 3, 3, None, None),
    ];
    let plan = repair(&docs);
    assert!(!has_edit(&plan, "c", LinkField::Previous, Some("a")));
    assert!(plan
        .conflicts
        .iter()
        .any(|conflict| conflict.detail.contains("skipping the part order")));
}

#[test]
fn ordering_defects_are_reported_and_block_link_inference() {
    let docs = vec![
        guide("a", "S", 1, 2, None, Some("ghost")),
        guide("b", "S", 2, 2, None, None),
        guide("c", "S", 2, 2, None, None),
    ];
    let plan = repair(&docs);
    assert_eq!(
        plan.edits,
        vec![Edit {
            document_id: "a".to_string(),
            field: LinkField::Next,
            old_value: Some("ghost".to_string()),
            new_value: None,
            reason: EditReason::RemoveDangling,
        }]
    );
    assert!(plan
        .skipped
        .iter()
        .any(|defect| defect.kind() == DefectKind::DuplicatePart));
    assert!(plan
        .skipped
        .iter()
        .any(|defect| defect.kind() == DefectKind::MissingPrevious));
}

#[test]
fn boundary_links_to_existing_documents_are_left_alone() {
    let docs = vec![
        guide("a", "S", 1, 1, Some("z"), None),
        guide("z", "S2", 1, 1, None, Some("a")),
    ];
    let plan = repair(&docs);
    assert!(plan.edits.is_empty());
    assert!(plan
        .skipped
        .iter()
        .all(|defect| defect.kind() == DefectKind::UnexpectedBoundaryLink));
    assert_eq!(plan.skipped.len(), 2);
}

#[test]
fn consistent_corpus_yields_empty_plan() {
    let docs = vec![
        guide("a", "S", 1, 2, None, Some("b")),
        guide("b", "S", 2, 2, Some("a"), None),
    ];
    assert_eq!(repair(&docs), Plan::default());
}

#[test]
fn insertion_links_both_neighbors_back_to_new_document() {
    let docs = vec![
        guide("a", "S", 1, 3, None, None),
        guide("b", "S", 2, 3, Some("a"), Some("c")),
        guide("c", "S", 3, 3, None, None),
    ];
    let index = DocumentIndex::new(&docs);
    let plan = plan_insertion("b", &index).expect("b should be known");
    assert!(has_edit(&plan, "a", LinkField::Next, Some("b")));
    assert!(has_edit(&plan, "c", LinkField::Previous, Some("b")));
    assert!(plan
        .edits
        .iter()
        .all(|edit| edit.reason == EditReason::InsertNavigation));
    assert!(plan.conflicts.is_empty());
}

#[test]
fn insertion_is_idempotent_once_links_exist() {
    let docs = vec![
        guide("a", "S", 1, 2, None, Some("b")),
        guide("b", "S", 2, 2, Some("a"), None),
    ];
    let index = DocumentIndex::new(&docs);
    let plan = plan_insertion("b", &index).expect("b should be known");
    assert_eq!(plan, Plan::default());
}

#[test]
fn insertion_flags_conflicts_and_missing_targets() {
    let docs = vec![
        guide("a", "S", 1, 3, None, Some("other")),
        guide("b", "S", 2, 3, Some("a"), Some("missing")),
        guide("other", "S", 2, 3, None, None),
    ];
    let index = DocumentIndex::new(&docs);
    let plan = plan_insertion("b", &index).expect("b should be known");
    assert!(plan.edits.is_empty());
    assert_eq!(plan.conflicts.len(), 2);
    assert!(plan
        .conflicts
        .iter()
        .any(|conflict| conflict.existing.as_deref() == Some("other")));
    assert!(plan
        .conflicts
        .iter()
        .any(|conflict| conflict.detail.contains("does not exist")));
}

#[test]
fn insertion_of_unknown_document_returns_none() {
    let docs = vec![guide("a", "S", 1, 1, None, None)];
    let index = DocumentIndex::new(&docs);
    assert!(plan_insertion("nope", &index).is_none());
}

fn proposal(id: &str, field: LinkField, value: Option<&str>, reason: EditReason) -> Edit {
    Edit {
        document_id: id.to_string(),
        field,
        old_value: None,
        new_value: value.map(str::to_string),
        reason,
    }
}

#[test]
fn concrete_link_wins_over_dangling_removal() {
    let docs = vec![
        guide("a", "S", 1, 2, None, Some("ghost")),
        guide("b", "S", 2, 2, Some("a"), None),
    ];
    let plan = repair(&docs);
    assert!(plan.conflicts.is_empty(), "conflicts: {:?}", plan.conflicts);
    assert_eq!(
        plan.edits,
        vec![Edit {
            document_id: "a".to_string(),
            field: LinkField::Next,
            old_value: Some("ghost".to_string()),
            new_value: Some("b".to_string()),
            reason: EditReason::PropagateLink,
        }]
    );
}

#[test]
fn builder_collapses_identical_proposals() {
    let mut builder = PlanBuilder::default();
    builder.propose(proposal("a", LinkField::Next, Some("b"), EditReason::InferNeighbor));
    builder.propose(proposal("a", LinkField::Next, Some("b"), EditReason::PropagateLink));
    builder.propose(proposal("a", LinkField::Next, None, EditReason::RemoveDangling));
    let plan = builder.finish();
    assert_eq!(plan.edits.len(), 1);
    assert_eq!(plan.edits[0].new_value.as_deref(), Some("b"));
    assert_eq!(plan.edits[0].reason, EditReason::InferNeighbor);
    assert!(plan.conflicts.is_empty());
}

#[test]
fn builder_turns_disagreeing_targets_into_one_conflict() {
    let mut builder = PlanBuilder::default();
    builder.propose(proposal("a", LinkField::Next, Some("b"), EditReason::InferNeighbor));
    builder.propose(proposal("a", LinkField::Next, Some("c"), EditReason::PropagateLink));
    builder.propose(proposal("a", LinkField::Next, Some("b"), EditReason::InferNeighbor));
    builder.propose(proposal("a", LinkField::Previous, Some("z"), EditReason::InferNeighbor));
    let plan = builder.finish();

    assert_eq!(plan.conflicts.len(), 1);
    let conflict = &plan.conflicts[0];
    assert_eq!(conflict.document_id, "a");
    assert_eq!(conflict.field, LinkField::Next);
    assert_eq!(conflict.detail, "repairs disagree: \"b\" vs \"c\"");
    assert_eq!(plan.edits.len(), 1);
    assert_eq!(plan.edits[0].field, LinkField::Previous);
}

#[test]
fn insertion_target_with_incomplete_series_section_is_a_conflict() {
    let docs = vec![
        parse(
            "a",
            "---\nseries:\n  name: \"S\"\n  part: one\n  total: 2\n---\n",
        ),
        guide("b", "S", 2, 2, Some("a"), Some("plain")),
        parse("plain", "---\ntitle: \"Plain\"\n---\n"),
    ];
    let index = DocumentIndex::new(&docs);
    let plan = plan_insertion("b", &index).expect("b should be known");
    assert!(plan.edits.is_empty());
    let details = plan
        .conflicts
        .iter()
        .map(|conflict| conflict.detail.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        details,
        vec![
            "previous document \"a\" has an incomplete series section",
            "next document \"plain\" has no series section",
        ]
    );
}
