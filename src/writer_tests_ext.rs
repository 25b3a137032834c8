use super::{apply, insert_series_section, set_field, WriteError};
use crate::domain::series::{LinkField, SeriesLink};
use crate::frontmatter::parse;
use crate::reconcile::{Edit, EditReason};

const GUIDE: &str = concat!(
    "---\n",
    "layout: guide\n",
    "title: \"Intro to X, Part 2\"\n",
    "series:\n",
    "  name: \"Intro to X\"\n",
    "  part: 2\n",
    "  total: 3\n",
    "  next: \"part-3\"\n",
    "image: \"/assets/x.jpg\"\n",
    "---\n",
    "\n",
    "Body with   odd   spacing\n",
    "next: \"not-metadata\"\n",
);

fn edit(field: LinkField, value: Option<&str>) -> Edit {
    Edit {
        document_id: "part-2".to_string(),
        field,
        old_value: None,
        new_value: value.map(str::to_string),
        reason: EditReason::InferNeighbor,
    }
}

#[test]
fn empty_edit_set_is_byte_identical() {
    assert_eq!(apply(GUIDE, &[]).expect("apply should work"), GUIDE);
    let no_block = "plain text\n";
    assert_eq!(apply(no_block, &[]).expect("apply should work"), no_block);
}

#[test]
fn absent_previous_is_inserted_after_total() {
    let updated = set_field(GUIDE, LinkField::Previous, Some("part-1")).expect("set should work");
    assert_eq!(
        updated,
        GUIDE.replace(
            "  total: 3\n",
            "  total: 3\n  previous: \"part-1\"\n"
        )
    );
    let link = parse("part-2", updated).series().cloned().expect("link");
    assert_eq!(link.previous.as_deref(), Some("part-1"));
    assert_eq!(link.next.as_deref(), Some("part-3"));
}

#[test]
fn removal_deletes_only_the_field_line() {
    let updated = set_field(GUIDE, LinkField::Next, None).expect("remove should work");
    assert_eq!(updated, GUIDE.replace("  next: \"part-3\"\n", ""));
    assert!(updated.ends_with("next: \"not-metadata\"\n"));
}

#[test]
fn existing_value_is_replaced_in_place_keeping_quote_style() {
    let single = GUIDE.replace("\"part-3\"", "'part-3'");
    let updated = set_field(&single, LinkField::Next, Some("part-4")).expect("set should work");
    assert_eq!(updated, single.replace("'part-3'", "'part-4'"));

    let bare = GUIDE.replace("\"part-3\"", "part-3");
    let updated = set_field(&bare, LinkField::Next, Some("part-4")).expect("set should work");
    assert_eq!(updated, bare.replace("next: part-3", "next: part-4"));
}

#[test]
fn empty_value_gets_a_quoted_value() {
    let empty = GUIDE.replace("  next: \"part-3\"\n", "  next:\n");
    let updated = set_field(&empty, LinkField::Next, Some("part-3")).expect("set should work");
    assert_eq!(updated, GUIDE);
}

#[test]
fn next_anchors_after_previous_and_copies_indentation() {
    let raw = concat!(
        "---\n",
        "series:\n",
        "    name: S\n",
        "    part: 1\n",
        "    total: 2\n",
        "    previous: \"zero\"\n",
        "---\n",
    );
    let updated = set_field(raw, LinkField::Next, Some("two")).expect("set should work");
    assert!(updated.contains("    previous: \"zero\"\n    next: \"two\"\n---\n"));
}

#[test]
fn header_only_section_gets_default_indent() {
    let raw = "---\nseries:\ntitle: \"T\"\n---\n";
    let updated = set_field(raw, LinkField::Previous, Some("a")).expect("set should work");
    assert_eq!(updated, "---\nseries:\n  previous: \"a\"\ntitle: \"T\"\n---\n");
}

#[test]
fn crlf_line_endings_are_preserved_on_insert() {
    let raw = "---\r\nseries:\r\n  name: S\r\n  part: 2\r\n  total: 2\r\n---\r\nbody\r\n";
    let updated = set_field(raw, LinkField::Previous, Some("a")).expect("set should work");
    assert_eq!(
        updated,
        "---\r\nseries:\r\n  name: S\r\n  part: 2\r\n  total: 2\r\n  previous: \"a\"\r\n---\r\nbody\r\n"
    );
}

#[test]
fn multiple_edits_apply_in_sequence() {
    let updated = apply(
        GUIDE,
        &[
            edit(LinkField::Next, None),
            edit(LinkField::Previous, Some("part-1")),
        ],
    )
    .expect("apply should work");
    let link = parse("part-2", updated.clone()).series().cloned().expect("link");
    assert_eq!(link.previous.as_deref(), Some("part-1"));
    assert_eq!(link.next, None);
    assert!(updated.ends_with("Body with   odd   spacing\nnext: \"not-metadata\"\n"));
}

#[test]
fn errors_without_block_or_section() {
    assert_eq!(
        set_field("no block", LinkField::Next, Some("x")),
        Err(WriteError::MissingMetadata)
    );
    assert_eq!(
        set_field("---\ntitle: t\n---\n", LinkField::Next, Some("x")),
        Err(WriteError::MissingSeriesSection)
    );
}

#[test]
fn series_section_is_seeded_after_tags() {
    let raw = concat!(
        "---\n",
        "layout: guide\n",
        "title: \"Intro to X\"\n",
        "difficulty: beginner\n",
        "tags: [\"a\", \"b\"]\n",
        "description: \"d\"\n",
        "---\n",
        "Body\n",
    );
    let link = SeriesLink {
        name: "Intro to X".to_string(),
        part: 1,
        total: 3,
        previous: None,
        next: Some("part-2".to_string()),
    };
    let updated = insert_series_section(raw, &link).expect("seed should work");
    assert_eq!(
        updated,
        raw.replace(
            "tags: [\"a\", \"b\"]\n",
            concat!(
                "tags: [\"a\", \"b\"]\n",
                "series:\n",
                "  name: \"Intro to X\"\n",
                "  part: 1\n",
                "  total: 3\n",
                "  next: \"part-2\"\n",
            )
        )
    );
    assert_eq!(parse("part-1", updated).series(), Some(&link));
}

#[test]
fn series_section_falls_back_to_description_then_block_end() {
    let link = SeriesLink {
        name: "S".to_string(),
        part: 1,
        total: 1,
        previous: None,
        next: None,
    };
    let with_description = "---\ntitle: t\ndescription: d\n---\n";
    let updated = insert_series_section(with_description, &link).expect("seed should work");
    assert!(updated.starts_with("---\ntitle: t\nseries:\n"));
    assert!(updated.ends_with("  total: 1\ndescription: d\n---\n"));

    let bare = "---\ntitle: t\n---\n";
    let updated = insert_series_section(bare, &link).expect("seed should work");
    assert!(updated.ends_with("  total: 1\n---\n"));
}

#[test]
fn seeding_refuses_existing_series_key() {
    let link = SeriesLink {
        name: "S".to_string(),
        part: 1,
        total: 1,
        previous: None,
        next: None,
    };
    assert_eq!(
        insert_series_section(GUIDE, &link),
        Err(WriteError::SeriesSectionExists)
    );
}

#[test]
fn rewriting_a_commented_value_keeps_the_comment() {
    let raw = concat!(
        "---\n",
        "series:\n",
        "  name: S\n",
        "  part: 2 # second\n",
        "  total: 3\n",
        "  previous: stale # back link\n",
        "  next: # todo\n",
        "---\n",
    );
    let updated = set_field(raw, LinkField::Previous, Some("a")).expect("set previous");
    assert!(updated.contains("  previous: a # back link\n"));
    let updated = set_field(&updated, LinkField::Next, Some("c")).expect("set next");
    assert!(updated.contains("  next: \"c\" # todo\n"));
    assert!(updated.contains("  part: 2 # second\n"));

    let link = parse("b", updated).series().cloned().expect("link");
    assert_eq!(link.previous.as_deref(), Some("a"));
    assert_eq!(link.next.as_deref(), Some("c"));
}
