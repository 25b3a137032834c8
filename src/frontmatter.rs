use serde::Serialize;

use crate::domain::series::SeriesLink;

const DELIMITER: &str = "---";
const TITLE_KEY: &str = "title";
pub const SERIES_KEY: &str = "series";
pub const SERIES_FIELD_KEYS: [&str; 5] = ["name", "part", "total", "previous", "next"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    None,
    Single,
    Double,
}

/// One `key: value` line of the metadata block, with byte offsets into the
/// raw document so the writer can splice without re-rendering anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub indent: usize,
    pub line_start: usize,
    pub line_end: usize,
    pub line_next: usize,
    /// Start of the next column-0 line; only tracked for top-level entries.
    pub block_next: usize,
    pub colon_end: usize,
    pub value_start: usize,
    pub value_end: usize,
    pub quote: Quote,
}

impl Entry {
    pub fn raw_value<'a>(&self, raw: &'a str) -> &'a str {
        &raw[self.value_start..self.value_end]
    }

    pub fn is_empty(&self) -> bool {
        self.value_start == self.value_end
    }

    pub fn indentation<'a>(&self, raw: &'a str) -> &'a str {
        &raw[self.line_start..self.line_start + self.indent]
    }

    /// Unquoted value, or `None` when the value is empty or a YAML null.
    pub fn scalar<'a>(&self, raw: &'a str) -> Option<&'a str> {
        let text = self.raw_value(raw);
        let inner = match self.quote {
            Quote::None => text,
            Quote::Single | Quote::Double => &text[1..text.len() - 1],
        }
        .trim();
        if inner.is_empty() {
            return None;
        }
        if self.quote == Quote::None && matches!(inner, "~" | "null" | "Null" | "NULL") {
            return None;
        }
        Some(inner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesSection {
    pub header: Entry,
    pub fields: Vec<Entry>,
}

impl SeriesSection {
    pub fn field(&self, key: &str) -> Option<&Entry> {
        self.fields.iter().find(|entry| entry.key == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frontmatter {
    pub closing_start: usize,
    pub newline: &'static str,
    pub entries: Vec<Entry>,
    pub series: Option<SeriesSection>,
}

impl Frontmatter {
    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.entry(key).is_some()
    }
}

#[derive(Debug, Clone, Copy)]
struct LineSpan {
    start: usize,
    end: usize,
    next: usize,
}

fn line_spans(raw: &str) -> impl Iterator<Item = LineSpan> + '_ {
    let mut pos = 0;
    std::iter::from_fn(move || {
        if pos >= raw.len() {
            return None;
        }
        let start = pos;
        let (end, next) = match raw[start..].find('\n') {
            Some(offset) => {
                let newline = start + offset;
                let end = if raw[start..newline].ends_with('\r') {
                    newline - 1
                } else {
                    newline
                };
                (end, newline + 1)
            }
            None => (raw.len(), raw.len()),
        };
        pos = next;
        Some(LineSpan { start, end, next })
    })
}

/// Locates the `---` delimited block at the top of `raw` and indexes its
/// entries. Returns `None` when the block is absent or never closed.
pub fn scan(raw: &str) -> Option<Frontmatter> {
    let mut lines = line_spans(raw);
    let opening = lines.next()?;
    if &raw[opening.start..opening.end] != DELIMITER {
        return None;
    }
    let newline = if raw[opening.end..opening.next].starts_with('\r') {
        "\r\n"
    } else {
        "\n"
    };

    let mut entries: Vec<Entry> = Vec::new();
    let mut series: Option<SeriesSection> = None;
    let mut in_series = false;
    let mut last_top: Option<usize> = None;

    for line in lines {
        let text = &raw[line.start..line.end];
        if text == DELIMITER {
            if let Some(idx) = last_top {
                entries[idx].block_next = line.start;
            }
            return Some(Frontmatter {
                closing_start: line.start,
                newline,
                entries,
                series,
            });
        }

        let trimmed = text.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = text.len() - trimmed.len();
        let entry = parse_entry(raw, line, indent);

        if indent > 0 {
            if in_series {
                if let (Some(section), Some(entry)) = (series.as_mut(), entry) {
                    section.fields.push(entry);
                }
            }
            continue;
        }

        in_series = false;
        if let Some(idx) = last_top.take() {
            entries[idx].block_next = line.start;
        }
        let Some(entry) = entry else {
            continue;
        };
        if entry.key == SERIES_KEY && entry.is_empty() && series.is_none() {
            series = Some(SeriesSection {
                header: entry.clone(),
                fields: Vec::new(),
            });
            in_series = true;
        }
        last_top = Some(entries.len());
        entries.push(entry);
    }

    None
}

fn parse_entry(raw: &str, line: LineSpan, indent: usize) -> Option<Entry> {
    let body_start = line.start + indent;
    let body = &raw[body_start..line.end];
    let colon = body.find(':')?;
    let key = &body[..colon];
    if key.is_empty()
        || !key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        return None;
    }

    let colon_end = body_start + colon + 1;
    let rest = &raw[colon_end..line.end];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }

    let value_offset = colon_end + (rest.len() - rest.trim_start().len());
    let value = rest.trim();
    let (value_start, value_end, quote) = match value.chars().next() {
        Some(mark @ ('"' | '\'')) => match value[1..].find(mark) {
            Some(offset) => {
                let quote = if mark == '"' {
                    Quote::Double
                } else {
                    Quote::Single
                };
                (value_offset, value_offset + offset + 2, quote)
            }
            None => plain_value(value, value_offset, colon_end),
        },
        _ => plain_value(value, value_offset, colon_end),
    };

    Some(Entry {
        key: key.to_string(),
        indent,
        line_start: line.start,
        line_end: line.end,
        line_next: line.next,
        block_next: line.next,
        colon_end,
        value_start,
        value_end,
        quote,
    })
}

/// Span of an unquoted value, ending before a `#` comment that follows
/// whitespace. A comment-only value is empty and anchored at the colon.
fn plain_value(value: &str, value_offset: usize, colon_end: usize) -> (usize, usize, Quote) {
    let mut after_blank = true;
    let mut end = value.len();
    for (idx, ch) in value.char_indices() {
        if ch == '#' && after_blank {
            end = value[..idx].trim_end().len();
            break;
        }
        after_blank = ch == ' ' || ch == '\t';
    }
    if end == 0 {
        (colon_end, colon_end, Quote::None)
    } else {
        (value_offset, value_offset + end, Quote::None)
    }
}

/// Every series sub-field with an explicit presence marker.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SeriesFields {
    pub name: Option<String>,
    pub part: Option<u32>,
    pub total: Option<u32>,
    pub previous: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub title: Option<String>,
    pub has_series_key: bool,
    pub fields: SeriesFields,
    pub series: Option<SeriesLink>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ParseIssue {
    pub id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub id: String,
    pub raw: String,
    pub metadata: Option<Metadata>,
    pub issues: Vec<ParseIssue>,
}

impl ParsedDocument {
    pub fn series(&self) -> Option<&SeriesLink> {
        self.metadata.as_ref().and_then(|meta| meta.series.as_ref())
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|meta| meta.title.as_deref())
    }
}

/// Lenient parse: never fails, malformed fields come back absent with an
/// accompanying issue.
pub fn parse(id: impl Into<String>, raw: impl Into<String>) -> ParsedDocument {
    let id = id.into();
    let raw = raw.into();
    let mut issues = Vec::new();

    let Some(frontmatter) = scan(&raw) else {
        issues.push(issue(&id, "no metadata block; document skipped"));
        return ParsedDocument {
            id,
            raw,
            metadata: None,
            issues,
        };
    };

    let title = frontmatter
        .entry(TITLE_KEY)
        .and_then(|entry| entry.scalar(&raw))
        .map(str::to_string);
    let has_series_key = frontmatter.has_key(SERIES_KEY);

    let (fields, series) = match &frontmatter.series {
        Some(section) => {
            let fields = read_series_fields(&raw, section, &id, &mut issues);
            let series = complete_link(&fields, &id, &mut issues);
            (fields, series)
        }
        None => {
            if has_series_key {
                issues.push(issue(
                    &id,
                    "'series' must be a nested section of name/part/total fields",
                ));
            }
            (SeriesFields::default(), None)
        }
    };

    ParsedDocument {
        metadata: Some(Metadata {
            title,
            has_series_key,
            fields,
            series,
        }),
        id,
        raw,
        issues,
    }
}

fn read_series_fields(
    raw: &str,
    section: &SeriesSection,
    id: &str,
    issues: &mut Vec<ParseIssue>,
) -> SeriesFields {
    for key in SERIES_FIELD_KEYS {
        if section.fields.iter().filter(|entry| entry.key == key).count() > 1 {
            issues.push(issue(
                id,
                &format!("duplicate series.{key}; the first value is used"),
            ));
        }
    }

    let text = |key: &str| {
        section
            .field(key)
            .and_then(|entry| entry.scalar(raw))
            .map(str::to_string)
    };
    let mut count = |key: &str| {
        let value = section.field(key).and_then(|entry| entry.scalar(raw))?;
        match value.parse::<u32>() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                issues.push(issue(
                    id,
                    &format!("series.{key} '{value}' is not an unsigned integer"),
                ));
                None
            }
        }
    };

    SeriesFields {
        part: count("part"),
        total: count("total"),
        name: text("name"),
        previous: text("previous"),
        next: text("next"),
    }
}

fn complete_link(
    fields: &SeriesFields,
    id: &str,
    issues: &mut Vec<ParseIssue>,
) -> Option<SeriesLink> {
    match (&fields.name, fields.part, fields.total) {
        (Some(name), Some(part), Some(total)) => Some(SeriesLink {
            name: name.clone(),
            part,
            total,
            previous: fields.previous.clone(),
            next: fields.next.clone(),
        }),
        _ => {
            let missing = [
                ("name", fields.name.is_none()),
                ("part", fields.part.is_none()),
                ("total", fields.total.is_none()),
            ]
            .iter()
            .filter(|(_, absent)| *absent)
            .map(|(key, _)| *key)
            .collect::<Vec<_>>();
            issues.push(issue(
                id,
                &format!(
                    "series section is missing {}; document left out of series checks",
                    missing.join(", ")
                ),
            ));
            None
        }
    }
}

fn issue(id: &str, message: &str) -> ParseIssue {
    ParseIssue {
        id: id.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
#[path = "frontmatter_tests_ext.rs"]
mod tests_ext;
