use std::collections::{BTreeMap, HashMap, HashSet};

use crate::domain::series::SeriesLink;
use crate::frontmatter::ParsedDocument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: String,
    pub link: SeriesLink,
}

/// A named chain, members in ascending `part` with ties left in scan order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    pub name: String,
    pub members: Vec<Member>,
}

impl Series {
    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.id == id)
    }

    pub fn members_at(&self, part: u32) -> impl Iterator<Item = &Member> {
        self.members
            .iter()
            .filter(move |member| member.link.part == part)
    }

    /// The member at `part`, only when exactly one claims it.
    pub fn unique_at(&self, part: u32) -> Option<&Member> {
        let mut found = self.members_at(part);
        let first = found.next()?;
        match found.next() {
            Some(_) => None,
            None => Some(first),
        }
    }

    /// Most common declared `total`; a tie goes to the lowest-part member.
    pub fn expected_total(&self) -> u32 {
        let mut counts: HashMap<u32, usize> = HashMap::new();
        for member in &self.members {
            *counts.entry(member.link.total).or_default() += 1;
        }
        let best = counts.values().copied().max().unwrap_or(0);
        self.members
            .iter()
            .map(|member| member.link.total)
            .find(|total| counts.get(total).copied() == Some(best))
            .unwrap_or(0)
    }
}

pub fn build_series<'a, I>(documents: I) -> BTreeMap<String, Series>
where
    I: IntoIterator<Item = &'a ParsedDocument>,
{
    let mut by_name: BTreeMap<String, Series> = BTreeMap::new();
    for doc in documents {
        let Some(link) = doc.series() else {
            continue;
        };
        by_name
            .entry(link.name.clone())
            .or_insert_with(|| Series {
                name: link.name.clone(),
                members: Vec::new(),
            })
            .members
            .push(Member {
                id: doc.id.clone(),
                link: link.clone(),
            });
    }

    for series in by_name.values_mut() {
        series.members.sort_by_key(|member| member.link.part);
    }
    by_name
}

/// Every known document id, with its series link when it has one. Used to
/// resolve the weak `previous`/`next` references across all series.
#[derive(Debug, Clone, Default)]
pub struct DocumentIndex<'a> {
    links: HashMap<&'a str, Option<&'a SeriesLink>>,
    sections: HashSet<&'a str>,
}

impl<'a> DocumentIndex<'a> {
    pub fn new<I>(documents: I) -> Self
    where
        I: IntoIterator<Item = &'a ParsedDocument>,
    {
        let mut links = HashMap::new();
        let mut sections = HashSet::new();
        for doc in documents {
            links.insert(doc.id.as_str(), doc.series());
            if doc.metadata.as_ref().is_some_and(|meta| meta.has_series_key) {
                sections.insert(doc.id.as_str());
            }
        }
        Self { links, sections }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.links.contains_key(id)
    }

    pub fn link(&self, id: &str) -> Option<&'a SeriesLink> {
        self.links.get(id).copied().flatten()
    }

    /// True when the document declares a `series:` key, complete or not.
    pub fn has_series_section(&self, id: &str) -> bool {
        self.sections.contains(id)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }
}
