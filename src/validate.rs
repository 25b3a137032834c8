use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::chain::{build_series, DocumentIndex, Series};
use crate::domain::series::LinkField;
use crate::frontmatter::{ParseIssue, ParsedDocument};
use crate::store::LoadIssue;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DefectKind {
    DuplicatePart,
    PartOutOfRange,
    DanglingReference,
    AsymmetricLink,
    MissingPrevious,
    MissingNext,
    UnexpectedBoundaryLink,
}

impl DefectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DefectKind::DuplicatePart => "duplicate_part",
            DefectKind::PartOutOfRange => "part_out_of_range",
            DefectKind::DanglingReference => "dangling_reference",
            DefectKind::AsymmetricLink => "asymmetric_link",
            DefectKind::MissingPrevious => "missing_previous",
            DefectKind::MissingNext => "missing_next",
            DefectKind::UnexpectedBoundaryLink => "unexpected_boundary_link",
        }
    }

    /// Kinds that make the part order itself untrustworthy.
    pub fn is_ordering(self) -> bool {
        matches!(self, DefectKind::DuplicatePart | DefectKind::PartOutOfRange)
    }
}

impl fmt::Display for DefectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Defect {
    DuplicatePart {
        series: String,
        part: u32,
        ids: Vec<String>,
    },
    PartOutOfRange {
        series: String,
        id: String,
        part: u32,
        total: u32,
        expected_total: u32,
    },
    DanglingReference {
        series: String,
        id: String,
        part: u32,
        field: LinkField,
        target: String,
    },
    AsymmetricLink {
        series: String,
        id: String,
        part: u32,
        field: LinkField,
        target: String,
        reciprocal: Option<String>,
    },
    MissingPrevious {
        series: String,
        id: String,
        part: u32,
    },
    MissingNext {
        series: String,
        id: String,
        part: u32,
        total: u32,
    },
    UnexpectedBoundaryLink {
        series: String,
        id: String,
        part: u32,
        field: LinkField,
        target: String,
    },
}

impl Defect {
    pub fn kind(&self) -> DefectKind {
        match self {
            Defect::DuplicatePart { .. } => DefectKind::DuplicatePart,
            Defect::PartOutOfRange { .. } => DefectKind::PartOutOfRange,
            Defect::DanglingReference { .. } => DefectKind::DanglingReference,
            Defect::AsymmetricLink { .. } => DefectKind::AsymmetricLink,
            Defect::MissingPrevious { .. } => DefectKind::MissingPrevious,
            Defect::MissingNext { .. } => DefectKind::MissingNext,
            Defect::UnexpectedBoundaryLink { .. } => DefectKind::UnexpectedBoundaryLink,
        }
    }

    pub fn series(&self) -> &str {
        match self {
            Defect::DuplicatePart { series, .. }
            | Defect::PartOutOfRange { series, .. }
            | Defect::DanglingReference { series, .. }
            | Defect::AsymmetricLink { series, .. }
            | Defect::MissingPrevious { series, .. }
            | Defect::MissingNext { series, .. }
            | Defect::UnexpectedBoundaryLink { series, .. } => series,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Defect::DuplicatePart { part, ids, .. } => {
                format!("part {} is claimed by {}", part, ids.join(", "))
            }
            Defect::PartOutOfRange {
                id,
                part,
                total,
                expected_total,
                ..
            } => {
                if total != expected_total {
                    format!(
                        "{id}: part {part} declares total {total}, series total is {expected_total}"
                    )
                } else {
                    format!("{id}: part {part} is outside 1..={expected_total}")
                }
            }
            Defect::DanglingReference {
                id,
                part,
                field,
                target,
                ..
            } => format!("{id} (part {part}): {field} link \"{target}\" doesn't exist"),
            Defect::AsymmetricLink {
                id,
                part,
                field,
                target,
                reciprocal,
                ..
            } => format!(
                "{id} (part {part}): {field} is \"{target}\" but its {} is {}",
                field.reciprocal(),
                reciprocal
                    .as_deref()
                    .map(|value| format!("\"{value}\""))
                    .unwrap_or_else(|| "unset".to_string())
            ),
            Defect::MissingPrevious { id, part, .. } => {
                format!("{id}: missing previous link (part {part})")
            }
            Defect::MissingNext { id, part, total, .. } => {
                format!("{id}: missing next link (part {part} of {total})")
            }
            Defect::UnexpectedBoundaryLink {
                id,
                part,
                field,
                target,
                ..
            } => format!("{id}: boundary part {part} should not have {field} \"{target}\""),
        }
    }
}

/// Checks one chain. Read-only; `index` resolves references across every
/// series, not just this one.
pub fn validate(series: &Series, index: &DocumentIndex<'_>) -> Vec<Defect> {
    let name = series.name.as_str();
    let expected_total = series.expected_total();
    let mut defects = Vec::new();

    let mut claims: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for member in &series.members {
        claims
            .entry(member.link.part)
            .or_default()
            .push(member.id.clone());
    }
    for (part, ids) in claims {
        if ids.len() > 1 {
            defects.push(Defect::DuplicatePart {
                series: name.to_string(),
                part,
                ids,
            });
        }
    }

    for member in &series.members {
        let id = member.id.as_str();
        let part = member.link.part;

        if part == 0 || part > expected_total || member.link.total != expected_total {
            defects.push(Defect::PartOutOfRange {
                series: name.to_string(),
                id: id.to_string(),
                part,
                total: member.link.total,
                expected_total,
            });
        }

        for field in LinkField::ALL {
            let Some(target) = member.link.get(field) else {
                match field {
                    LinkField::Previous if part > 1 => defects.push(Defect::MissingPrevious {
                        series: name.to_string(),
                        id: id.to_string(),
                        part,
                    }),
                    LinkField::Next if part < expected_total => {
                        defects.push(Defect::MissingNext {
                            series: name.to_string(),
                            id: id.to_string(),
                            part,
                            total: expected_total,
                        })
                    }
                    _ => {}
                }
                continue;
            };

            let at_boundary = match field {
                LinkField::Previous => part == 1,
                LinkField::Next => part == expected_total,
            };
            if at_boundary {
                defects.push(Defect::UnexpectedBoundaryLink {
                    series: name.to_string(),
                    id: id.to_string(),
                    part,
                    field,
                    target: target.to_string(),
                });
            }

            if !index.contains(target) {
                defects.push(Defect::DanglingReference {
                    series: name.to_string(),
                    id: id.to_string(),
                    part,
                    field,
                    target: target.to_string(),
                });
                continue;
            }

            let reciprocal = index
                .link(target)
                .and_then(|link| link.get(field.reciprocal()));
            if reciprocal != Some(id) {
                defects.push(Defect::AsymmetricLink {
                    series: name.to_string(),
                    id: id.to_string(),
                    part,
                    field,
                    target: target.to_string(),
                    reciprocal: reciprocal.map(str::to_string),
                });
            }
        }
    }

    defects
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MemberSummary {
    pub id: String,
    pub part: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeriesReport {
    pub name: String,
    pub total: u32,
    pub members: Vec<MemberSummary>,
    pub defects: Vec<Defect>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationReport {
    pub documents_scanned: usize,
    pub series: Vec<SeriesReport>,
    pub parse_issues: Vec<ParseIssue>,
    pub load_issues: Vec<LoadIssue>,
}

impl ValidationReport {
    pub fn ok(&self) -> bool {
        self.defect_count() == 0
    }

    pub fn defect_count(&self) -> usize {
        self.series.iter().map(|series| series.defects.len()).sum()
    }

    pub fn defects(&self) -> impl Iterator<Item = &Defect> {
        self.series.iter().flat_map(|series| series.defects.iter())
    }
}

pub fn validate_documents<'a, I>(documents: I) -> ValidationReport
where
    I: IntoIterator<Item = &'a ParsedDocument>,
{
    let documents = documents.into_iter().collect::<Vec<_>>();
    let index = DocumentIndex::new(documents.iter().copied());
    let chains = build_series(documents.iter().copied());

    let series = chains
        .values()
        .map(|chain| SeriesReport {
            name: chain.name.clone(),
            total: chain.expected_total(),
            members: chain
                .members
                .iter()
                .map(|member| MemberSummary {
                    id: member.id.clone(),
                    part: member.link.part,
                })
                .collect(),
            defects: validate(chain, &index),
        })
        .collect();

    ValidationReport {
        documents_scanned: index.len(),
        series,
        parse_issues: documents
            .iter()
            .flat_map(|doc| doc.issues.iter().cloned())
            .collect(),
        load_issues: Vec::new(),
    }
}

#[cfg(test)]
#[path = "validate_tests_ext.rs"]
mod tests_ext;
