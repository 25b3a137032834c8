use std::fmt;

use serde::{Deserialize, Serialize};

/// Series membership of one guide. `previous`/`next` are weak references:
/// plain ids that may or may not resolve to a document in the corpus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeriesLink {
    pub name: String,
    pub part: u32,
    pub total: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl SeriesLink {
    pub fn get(&self, field: LinkField) -> Option<&str> {
        match field {
            LinkField::Previous => self.previous.as_deref(),
            LinkField::Next => self.next.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LinkField {
    Previous,
    Next,
}

impl LinkField {
    pub const ALL: [LinkField; 2] = [LinkField::Previous, LinkField::Next];

    pub fn as_str(self) -> &'static str {
        match self {
            LinkField::Previous => "previous",
            LinkField::Next => "next",
        }
    }

    /// The field on the neighbor that must point back at us.
    pub fn reciprocal(self) -> LinkField {
        match self {
            LinkField::Previous => LinkField::Next,
            LinkField::Next => LinkField::Previous,
        }
    }
}

impl fmt::Display for LinkField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
