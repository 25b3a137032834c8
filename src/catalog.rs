use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::series::SeriesLink;

#[derive(Debug)]
pub enum CatalogError {
    Io { path: PathBuf, source: std::io::Error },
    Json(serde_json::Error),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Io { path, source } => {
                write!(f, "cannot read catalog '{}': {}", path.display(), source)
            }
            CatalogError::Json(err) => write!(f, "catalog JSON parse error: {}", err),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CatalogError::Io { source, .. } => Some(source),
            CatalogError::Json(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(value: serde_json::Error) -> Self {
        CatalogError::Json(value)
    }
}

/// One catalog entry. Fields other than `title` and `series` are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Topic {
    pub title: String,
    #[serde(default)]
    pub series: Option<SeriesLink>,
}

impl Topic {
    pub fn slug(&self) -> String {
        slugify(&self.title)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub topics: Vec<Topic>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let topics = serde_json::from_str(raw)?;
        Ok(Self { topics })
    }

    pub fn series_topics(&self) -> impl Iterator<Item = (&Topic, &SeriesLink)> {
        self.topics
            .iter()
            .filter_map(|topic| topic.series.as_ref().map(|link| (topic, link)))
    }
}

/// Lowercases `title` and collapses every run of characters outside
/// `[a-z0-9]` into a single `-`, trimming dashes at both ends.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::{slugify, Catalog, CatalogError};

    #[test]
    fn slugify_collapses_punctuation_and_trims() {
        assert_eq!(slugify("Intro to X, Part 1"), "intro-to-x-part-1");
        assert_eq!(slugify("  C++ & Rust: FFI!  "), "c-rust-ffi");
        assert_eq!(slugify("Déjà vu 2"), "d-j-vu-2");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn catalog_parses_optional_series_and_ignores_extra_fields() {
        let catalog = Catalog::from_json(
            r#"[
                {"title": "Intro to X, Part 1", "category": "basics",
                 "series": {"name": "Intro to X", "part": 1, "total": 2, "next": "intro-to-x-part-2"}},
                {"title": "Standalone"}
            ]"#,
        )
        .expect("catalog should parse");
        assert_eq!(catalog.topics.len(), 2);
        let seeded = catalog.series_topics().collect::<Vec<_>>();
        assert_eq!(seeded.len(), 1);
        let (topic, link) = seeded[0];
        assert_eq!(topic.slug(), "intro-to-x-part-1");
        assert_eq!(link.part, 1);
        assert_eq!(link.previous, None);
        assert_eq!(link.next.as_deref(), Some("intro-to-x-part-2"));
    }

    #[test]
    fn invalid_json_is_reported() {
        assert!(matches!(
            Catalog::from_json("{not json"),
            Err(CatalogError::Json(_))
        ));
    }
}
