use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::chain::{DocumentIndex, Series};
use crate::domain::series::LinkField;
use crate::validate::{validate, Defect};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EditReason {
    RemoveDangling,
    InferNeighbor,
    PropagateLink,
    InsertNavigation,
}

/// One metadata change: `new_value: None` removes the field.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Edit {
    pub document_id: String,
    pub field: LinkField,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub reason: EditReason,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Conflict {
    pub document_id: String,
    pub field: LinkField,
    pub existing: Option<String>,
    pub proposed: Option<String>,
    pub detail: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Plan {
    pub edits: Vec<Edit>,
    pub conflicts: Vec<Conflict>,
    pub skipped: Vec<Defect>,
}

/// Collects proposals keyed by `(document, field)` so two rules touching the
/// same field either agree or turn into a conflict.
#[derive(Debug, Default)]
struct PlanBuilder {
    proposals: BTreeMap<(String, LinkField), Edit>,
    contested: BTreeSet<(String, LinkField)>,
    conflicts: Vec<Conflict>,
    skipped: Vec<Defect>,
}

impl PlanBuilder {
    fn propose(&mut self, edit: Edit) {
        let key = (edit.document_id.clone(), edit.field);
        if self.contested.contains(&key) {
            return;
        }
        let current = match self.proposals.get(&key) {
            Some(current) => current.new_value.clone(),
            None => {
                self.proposals.insert(key, edit);
                return;
            }
        };
        if current == edit.new_value {
            return;
        }
        match (&current, &edit.new_value) {
            // Both rules agree the current value is wrong; the concrete target wins.
            (None, Some(_)) => {
                self.proposals.insert(key, edit);
            }
            (Some(_), None) => {}
            _ => {
                tracing::debug!(
                    document = %edit.document_id,
                    field = %edit.field,
                    "competing edits, leaving field untouched"
                );
                self.conflicts.push(Conflict {
                    document_id: edit.document_id.clone(),
                    field: edit.field,
                    existing: edit.old_value.clone(),
                    proposed: edit.new_value.clone(),
                    detail: format!(
                        "repairs disagree: {} vs {}",
                        display_value(current.as_deref()),
                        display_value(edit.new_value.as_deref())
                    ),
                });
                self.proposals.remove(&key);
                self.contested.insert(key);
            }
        }
    }

    fn conflict(&mut self, conflict: Conflict) {
        self.conflicts.push(conflict);
    }

    fn skip(&mut self, defect: Defect) {
        self.skipped.push(defect);
    }

    fn finish(self) -> Plan {
        Plan {
            edits: self.proposals.into_values().collect(),
            conflicts: self.conflicts,
            skipped: self.skipped,
        }
    }
}

fn display_value(value: Option<&str>) -> String {
    match value {
        Some(value) => format!("\"{value}\""),
        None => "removal".to_string(),
    }
}

/// Repair mode: validates every chain and proposes the edits that restore
/// the link invariants. Ordering defects are reported, never repaired, and
/// a chain that has any gets no link inference at all.
pub fn plan_repair<'s, I>(chains: I, index: &DocumentIndex<'_>) -> Plan
where
    I: IntoIterator<Item = &'s Series>,
{
    let mut builder = PlanBuilder::default();
    for series in chains {
        let defects = validate(series, index);
        let ambiguous = defects.iter().any(|defect| defect.kind().is_ordering());
        for defect in defects {
            repair_defect(series, index, defect, ambiguous, &mut builder);
        }
    }
    builder.finish()
}

fn repair_defect(
    series: &Series,
    index: &DocumentIndex<'_>,
    defect: Defect,
    ambiguous: bool,
    builder: &mut PlanBuilder,
) {
    let repaired = match &defect {
        Defect::DanglingReference {
            id, field, target, ..
        } => {
            builder.propose(Edit {
                document_id: id.clone(),
                field: *field,
                old_value: Some(target.clone()),
                new_value: None,
                reason: EditReason::RemoveDangling,
            });
            true
        }
        Defect::DuplicatePart { .. }
        | Defect::PartOutOfRange { .. }
        | Defect::UnexpectedBoundaryLink { .. } => false,
        _ if ambiguous => false,
        Defect::MissingPrevious { id, part, .. } => infer_neighbor(
            series,
            index,
            id,
            LinkField::Previous,
            part.checked_sub(1),
            builder,
        ),
        Defect::MissingNext { id, part, .. } => infer_neighbor(
            series,
            index,
            id,
            LinkField::Next,
            part.checked_add(1),
            builder,
        ),
        Defect::AsymmetricLink {
            id,
            part,
            field,
            target,
            reciprocal,
            ..
        } => {
            propagate_link(series, id, *part, *field, target, reciprocal, builder);
            true
        }
    };
    if !repaired {
        builder.skip(defect);
    }
}

/// Fills an unset `field` on `id` from the unique member at `neighbor_part`.
/// Returns false when no such member exists so the caller can report it.
fn infer_neighbor(
    series: &Series,
    index: &DocumentIndex<'_>,
    id: &str,
    field: LinkField,
    neighbor_part: Option<u32>,
    builder: &mut PlanBuilder,
) -> bool {
    let Some(neighbor) = neighbor_part.and_then(|part| series.unique_at(part)) else {
        return false;
    };
    let back = neighbor.link.get(field.reciprocal());
    match back {
        Some(value) if value != id && index.contains(value) => {
            builder.conflict(Conflict {
                document_id: id.to_string(),
                field,
                existing: None,
                proposed: Some(neighbor.id.clone()),
                detail: format!(
                    "neighbor {} already has {} \"{}\"",
                    neighbor.id,
                    field.reciprocal(),
                    value
                ),
            });
        }
        _ => builder.propose(Edit {
            document_id: id.to_string(),
            field,
            old_value: None,
            new_value: Some(neighbor.id.clone()),
            reason: EditReason::InferNeighbor,
        }),
    }
    true
}

/// The lower member's `next` and the higher member's `previous` are
/// authoritative for a consecutive pair; the other side is corrected.
fn propagate_link(
    series: &Series,
    id: &str,
    part: u32,
    field: LinkField,
    target: &str,
    reciprocal: &Option<String>,
    builder: &mut PlanBuilder,
) {
    let Some(other) = series.member(target) else {
        builder.conflict(Conflict {
            document_id: target.to_string(),
            field: field.reciprocal(),
            existing: reciprocal.clone(),
            proposed: Some(id.to_string()),
            detail: format!(
                "{id} links to \"{target}\", which is not part of series \"{}\"",
                series.name
            ),
        });
        return;
    };

    let consecutive = match field {
        LinkField::Next => part.checked_add(1) == Some(other.link.part),
        LinkField::Previous => other.link.part.checked_add(1) == Some(part),
    };
    if !consecutive {
        builder.conflict(Conflict {
            document_id: target.to_string(),
            field: field.reciprocal(),
            existing: reciprocal.clone(),
            proposed: Some(id.to_string()),
            detail: format!(
                "{id} (part {part}) links {field} to {target} (part {}), skipping the part order",
                other.link.part
            ),
        });
        return;
    }

    builder.propose(Edit {
        document_id: target.to_string(),
        field: field.reciprocal(),
        old_value: reciprocal.clone(),
        new_value: Some(id.to_string()),
        reason: EditReason::PropagateLink,
    });
}

/// Insertion mode: point the declared neighbors of `new_id` back at it.
/// Existing different values are conflicts, never overwritten.
pub fn plan_insertion(new_id: &str, index: &DocumentIndex<'_>) -> Option<Plan> {
    let link = index.link(new_id)?;
    let mut builder = PlanBuilder::default();

    for field in LinkField::ALL {
        let Some(target) = link.get(field) else {
            continue;
        };
        let back_field = field.reciprocal();
        let conflict = |existing: Option<&str>, detail: String| Conflict {
            document_id: target.to_string(),
            field: back_field,
            existing: existing.map(str::to_string),
            proposed: Some(new_id.to_string()),
            detail,
        };

        if target == new_id {
            builder.conflict(conflict(None, format!("{new_id} references itself as {field}")));
            continue;
        }
        if !index.contains(target) {
            builder.conflict(conflict(
                None,
                format!("{field} document \"{target}\" does not exist"),
            ));
            continue;
        }
        let Some(neighbor) = index.link(target) else {
            let detail = if index.has_series_section(target) {
                format!("{field} document \"{target}\" has an incomplete series section")
            } else {
                format!("{field} document \"{target}\" has no series section")
            };
            builder.conflict(conflict(None, detail));
            continue;
        };

        match neighbor.get(back_field) {
            None => builder.propose(Edit {
                document_id: target.to_string(),
                field: back_field,
                old_value: None,
                new_value: Some(new_id.to_string()),
                reason: EditReason::InsertNavigation,
            }),
            Some(existing) if existing == new_id => {}
            Some(existing) => builder.conflict(conflict(
                Some(existing),
                format!("{target} already has {back_field} \"{existing}\""),
            )),
        }
    }

    Some(builder.finish())
}

#[cfg(test)]
#[path = "reconcile_tests_ext.rs"]
mod tests_ext;
