use super::{parse, scan, Quote};

const GUIDE: &str = concat!(
    "---\n",
    "layout: guide\n",
    "title: \"Neural Networks, Part 2\"\n",
    "tags: [\"ml\", \"basics\"]\n",
    "series:\n",
    "  name: \"Intro to X\"\n",
    "  part: 2\n",
    "  total: 3\n",
    "  previous: \"part-1\"\n",
    "  next: 'part-3'\n",
    "description: \"A beginner-friendly introduction\"\n",
    "---\n",
    "\n",
    "## Body\n",
    "next: not-metadata\n",
);

#[test]
fn parses_title_and_complete_series_link() {
    let doc = parse("part-2", GUIDE);
    assert!(doc.issues.is_empty(), "unexpected issues: {:?}", doc.issues);
    assert_eq!(doc.title(), Some("Neural Networks, Part 2"));
    let link = doc.series().expect("series link should parse");
    assert_eq!(link.name, "Intro to X");
    assert_eq!(link.part, 2);
    assert_eq!(link.total, 3);
    assert_eq!(link.previous.as_deref(), Some("part-1"));
    assert_eq!(link.next.as_deref(), Some("part-3"));
}

#[test]
fn missing_block_yields_null_metadata_record() {
    let doc = parse("loose", "# Just a heading\n\nseries:\n  part: 1\n");
    assert!(doc.metadata.is_none());
    assert!(doc.series().is_none());
    assert_eq!(doc.raw, "# Just a heading\n\nseries:\n  part: 1\n");
    assert_eq!(doc.issues.len(), 1);
}

#[test]
fn unterminated_block_is_treated_as_absent() {
    let doc = parse("open", "---\ntitle: \"Open\"\nseries:\n  name: \"S\"\n");
    assert!(doc.metadata.is_none());
}

#[test]
fn malformed_part_is_absent_and_reported() {
    let raw = concat!(
        "---\n",
        "title: \"Broken\"\n",
        "series:\n",
        "  name: \"Intro to X\"\n",
        "  part: two\n",
        "  total: 3\n",
        "---\n",
    );
    let doc = parse("broken", raw);
    let meta = doc.metadata.as_ref().expect("metadata should exist");
    assert_eq!(meta.fields.part, None);
    assert_eq!(meta.fields.total, Some(3));
    assert!(meta.series.is_none());
    assert!(doc
        .issues
        .iter()
        .any(|issue| issue.message.contains("not an unsigned integer")));
    assert!(doc
        .issues
        .iter()
        .any(|issue| issue.message.contains("missing part")));
}

#[test]
fn empty_and_null_neighbors_are_absent() {
    let raw = concat!(
        "---\n",
        "series:\n",
        "  name: S\n",
        "  part: 1\n",
        "  total: 2\n",
        "  previous: \"\"\n",
        "  next: ~\n",
        "---\n",
    );
    let link = parse("a", raw).series().cloned().expect("link should parse");
    assert_eq!(link.previous, None);
    assert_eq!(link.next, None);
}

#[test]
fn series_section_ends_at_next_top_level_key() {
    let raw = concat!(
        "---\n",
        "series:\n",
        "  name: S\n",
        "  # comment inside the section\n",
        "\n",
        "  part: 1\n",
        "  total: 1\n",
        "next: \"outside\"\n",
        "---\n",
    );
    let doc = parse("a", raw);
    let link = doc.series().expect("link should parse");
    assert_eq!(link.part, 1);
    assert_eq!(link.next, None);
}

#[test]
fn inline_series_value_is_flagged_and_not_a_section() {
    let doc = parse("a", "---\nseries: \"Intro\"\n---\n");
    let meta = doc.metadata.as_ref().expect("metadata should exist");
    assert!(meta.has_series_key);
    assert!(meta.series.is_none());
    assert_eq!(doc.issues.len(), 1);
}

#[test]
fn crlf_documents_scan_with_crlf_newline() {
    let raw = "---\r\ntitle: \"W\"\r\nseries:\r\n  name: S\r\n  part: 1\r\n  total: 1\r\n---\r\nbody\r\n";
    let frontmatter = scan(raw).expect("block should scan");
    assert_eq!(frontmatter.newline, "\r\n");
    let doc = parse("w", raw);
    assert_eq!(doc.title(), Some("W"));
    assert_eq!(doc.series().map(|link| link.total), Some(1));
}

#[test]
fn scan_records_value_spans_and_quote_style() {
    let frontmatter = scan(GUIDE).expect("block should scan");
    let section = frontmatter.series.as_ref().expect("series section");
    let previous = section.field("previous").expect("previous entry");
    assert_eq!(previous.raw_value(GUIDE), "\"part-1\"");
    assert_eq!(previous.quote, Quote::Double);
    assert_eq!(previous.indentation(GUIDE), "  ");
    let next = section.field("next").expect("next entry");
    assert_eq!(next.quote, Quote::Single);
    let part = section.field("part").expect("part entry");
    assert_eq!(part.quote, Quote::None);

    let tags = frontmatter.entry("tags").expect("tags entry");
    let series_header = frontmatter.entry("series").expect("series entry");
    assert_eq!(tags.block_next, series_header.line_start);
    let description = frontmatter.entry("description").expect("description");
    assert_eq!(description.block_next, frontmatter.closing_start);
}

#[test]
fn duplicate_sub_keys_keep_first_value() {
    let raw = concat!(
        "---\n",
        "series:\n",
        "  name: S\n",
        "  part: 1\n",
        "  part: 2\n",
        "  total: 2\n",
        "---\n",
    );
    let doc = parse("a", raw);
    assert_eq!(doc.series().map(|link| link.part), Some(1));
    assert!(doc
        .issues
        .iter()
        .any(|issue| issue.message.contains("duplicate series.part")));
}

#[test]
fn trailing_comments_are_not_part_of_unquoted_values() {
    let raw = concat!(
        "---\n",
        "series:\n",
        "  name: C# basics\n",
        "  part: 2 # second\n",
        "  total: 3\n",
        "  previous: a # back link\n",
        "  next: # todo\n",
        "---\n",
    );
    let doc = parse("b", raw);
    assert!(doc.issues.is_empty(), "unexpected issues: {:?}", doc.issues);
    let link = doc.series().expect("series link should parse");
    assert_eq!(link.name, "C# basics");
    assert_eq!(link.part, 2);
    assert_eq!(link.previous.as_deref(), Some("a"));
    assert_eq!(link.next, None);

    let frontmatter = scan(raw).expect("block should scan");
    let section = frontmatter.series.expect("series section");
    let next = section.field("next").expect("next entry");
    assert!(next.is_empty());
    assert_eq!(next.value_start, next.colon_end);
    let previous = section.field("previous").expect("previous entry");
    assert_eq!(previous.raw_value(raw), "a");
}

#[test]
fn quoted_values_keep_hash_characters() {
    let raw = "---\ntitle: \"Part #2 # not a comment\" # comment\n---\n";
    let doc = parse("hash", raw);
    assert_eq!(doc.title(), Some("Part #2 # not a comment"));
}
