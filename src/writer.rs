use std::error::Error;
use std::fmt;

use crate::domain::series::{LinkField, SeriesLink};
use crate::frontmatter::{scan, Entry, Frontmatter, Quote, SERIES_KEY};
use crate::reconcile::Edit;

const DEFAULT_INDENT: &str = "  ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    MissingMetadata,
    MissingSeriesSection,
    SeriesSectionExists,
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::MissingMetadata => write!(f, "document has no metadata block"),
            WriteError::MissingSeriesSection => {
                write!(f, "metadata block has no series section")
            }
            WriteError::SeriesSectionExists => {
                write!(f, "metadata block already has a series key")
            }
        }
    }
}

impl Error for WriteError {}

/// Applies `edits` to the series section of `raw`. Only the spans of the
/// touched fields change; an empty edit list returns `raw` unchanged.
pub fn apply(raw: &str, edits: &[Edit]) -> Result<String, WriteError> {
    let mut current = raw.to_string();
    for edit in edits {
        current = set_field(&current, edit.field, edit.new_value.as_deref())?;
    }
    Ok(current)
}

pub fn set_field(raw: &str, field: LinkField, value: Option<&str>) -> Result<String, WriteError> {
    let frontmatter = scan(raw).ok_or(WriteError::MissingMetadata)?;
    let section = frontmatter
        .series
        .as_ref()
        .ok_or(WriteError::MissingSeriesSection)?;

    match (section.field(field.as_str()), value) {
        (Some(entry), Some(value)) => Ok(replace_value(raw, entry, value)),
        (Some(entry), None) => Ok(splice(raw, entry.line_start, entry.line_next, "")),
        (None, None) => Ok(raw.to_string()),
        (None, Some(value)) => {
            let anchor = anchor_keys(field)
                .iter()
                .find_map(|key| section.field(key))
                .unwrap_or(&section.header);
            let indent = if anchor.indent == 0 {
                DEFAULT_INDENT
            } else {
                anchor.indentation(raw)
            };
            let line = format!(
                "{indent}{}: {}{}",
                field.as_str(),
                quoted(value, Quote::Double),
                frontmatter.newline
            );
            Ok(splice(raw, anchor.line_next, anchor.line_next, &line))
        }
    }
}

fn anchor_keys(field: LinkField) -> &'static [&'static str] {
    match field {
        LinkField::Previous => &["total", "part", "name"],
        LinkField::Next => &["previous", "total", "part", "name"],
    }
}

fn replace_value(raw: &str, entry: &Entry, value: &str) -> String {
    if entry.is_empty() {
        let text = format!(" {}", quoted(value, Quote::Double));
        let comment = raw[entry.colon_end..entry.line_end].trim_start().starts_with('#');
        let end = if comment { entry.colon_end } else { entry.line_end };
        return splice(raw, entry.colon_end, end, &text);
    }
    splice(
        raw,
        entry.value_start,
        entry.value_end,
        &quoted(value, entry.quote),
    )
}

fn quoted(value: &str, quote: Quote) -> String {
    match quote {
        Quote::None => value.to_string(),
        Quote::Single => format!("'{value}'"),
        Quote::Double => format!("\"{value}\""),
    }
}

fn splice(raw: &str, start: usize, end: usize, replacement: &str) -> String {
    let mut out = String::with_capacity(raw.len() + replacement.len());
    out.push_str(&raw[..start]);
    out.push_str(replacement);
    out.push_str(&raw[end..]);
    out
}

/// Adds a complete `series:` section to a block that has none: after the
/// `tags` entry, else after the last `difficulty` entry, else before
/// `description`/`image`, else at the end of the block.
pub fn insert_series_section(raw: &str, link: &SeriesLink) -> Result<String, WriteError> {
    let frontmatter = scan(raw).ok_or(WriteError::MissingMetadata)?;
    if frontmatter.has_key(SERIES_KEY) {
        return Err(WriteError::SeriesSectionExists);
    }

    let at = section_insertion_point(&frontmatter);
    let nl = frontmatter.newline;
    let mut section = format!(
        "{SERIES_KEY}:{nl}{DEFAULT_INDENT}name: {}{nl}{DEFAULT_INDENT}part: {}{nl}{DEFAULT_INDENT}total: {}{nl}",
        quoted(&link.name, Quote::Double),
        link.part,
        link.total
    );
    for field in LinkField::ALL {
        if let Some(value) = link.get(field) {
            section.push_str(&format!(
                "{DEFAULT_INDENT}{}: {}{nl}",
                field.as_str(),
                quoted(value, Quote::Double)
            ));
        }
    }
    Ok(splice(raw, at, at, &section))
}

fn section_insertion_point(frontmatter: &Frontmatter) -> usize {
    if let Some(tags) = frontmatter.entry("tags") {
        return tags.block_next;
    }
    if let Some(difficulty) = frontmatter
        .entries
        .iter()
        .rev()
        .find(|entry| entry.key == "difficulty")
    {
        return difficulty.block_next;
    }
    frontmatter
        .entries
        .iter()
        .find(|entry| entry.key == "description" || entry.key == "image")
        .map(|entry| entry.line_start)
        .unwrap_or(frontmatter.closing_start)
}

#[cfg(test)]
#[path = "writer_tests_ext.rs"]
mod tests_ext;
