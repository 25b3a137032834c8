use std::error::Error;
use std::fmt;

use serde::Serialize;

use crate::catalog::{slugify, Catalog, CatalogError};
use crate::chain::{build_series, DocumentIndex};
use crate::config::{Config, ConfigError};
use crate::reconcile::{plan_insertion, plan_repair, Conflict, Edit, Plan};
use crate::store::{GuideStore, Snapshot, StoreError};
use crate::validate::{validate_documents, Defect, ValidationReport};
use crate::writer::{self, WriteError};

/// One batch run over the guides directory: load, compute, flush.
pub struct App {
    config: Config,
    store: GuideStore,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RepairReport {
    pub dry_run: bool,
    pub passes: usize,
    pub converged: bool,
    pub edits: Vec<Edit>,
    pub conflicts: Vec<Conflict>,
    pub skipped: Vec<Defect>,
    pub remaining: ValidationReport,
    pub written: Vec<String>,
}

impl RepairReport {
    pub fn ok(&self) -> bool {
        self.converged && self.conflicts.is_empty() && self.remaining.ok()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InsertionReport {
    pub id: String,
    pub dry_run: bool,
    pub edits: Vec<Edit>,
    pub conflicts: Vec<Conflict>,
    pub written: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeededGuide {
    pub id: String,
    pub series: String,
    pub part: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SeedReport {
    pub dry_run: bool,
    pub seeded: Vec<SeededGuide>,
    pub already_present: Vec<String>,
    pub not_found: Vec<String>,
    pub unparsed: Vec<String>,
    pub written: Vec<String>,
}

impl App {
    pub fn open(config: Config) -> Self {
        let store = GuideStore::new(config.guides_path(), config.extension.clone());
        Self { config, store }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn validate(&self) -> Result<ValidationReport, AppError> {
        let snapshot = self.store.load()?;
        Ok(validate_snapshot(&snapshot))
    }

    pub fn repair(&self, dry_run: bool) -> Result<RepairReport, AppError> {
        let mut snapshot = self.store.load()?;
        let mut report = repair_snapshot(&mut snapshot, self.config.max_repair_passes)?;
        report.dry_run = dry_run;
        if !dry_run {
            report.written = self.store.flush(&mut snapshot)?;
        }
        Ok(report)
    }

    pub fn insert_navigation(&self, id: &str, dry_run: bool) -> Result<InsertionReport, AppError> {
        let mut snapshot = self.store.load()?;
        let mut report = insert_into_snapshot(&mut snapshot, id)?;
        report.dry_run = dry_run;
        if !dry_run {
            report.written = self.store.flush(&mut snapshot)?;
        }
        Ok(report)
    }

    pub fn seed(&self, dry_run: bool) -> Result<SeedReport, AppError> {
        let catalog = Catalog::load(&self.config.catalog_path())?;
        let mut snapshot = self.store.load()?;
        let mut report = seed_snapshot(&mut snapshot, &catalog)?;
        report.dry_run = dry_run;
        if !dry_run {
            report.written = self.store.flush(&mut snapshot)?;
        }
        Ok(report)
    }
}

pub fn validate_snapshot(snapshot: &Snapshot) -> ValidationReport {
    let mut report = validate_documents(snapshot.parsed());
    report.load_issues = snapshot.issues.clone();
    report
}

fn plan_snapshot(snapshot: &Snapshot) -> Plan {
    let index = DocumentIndex::new(snapshot.parsed());
    let chains = build_series(snapshot.parsed());
    plan_repair(chains.values(), &index)
}

/// Plans and applies repairs in memory until a pass proposes nothing or
/// `max_passes` is spent. Conflicts and skipped defects come from the last
/// pass; `remaining` is a fresh validation of the result.
pub fn repair_snapshot(
    snapshot: &mut Snapshot,
    max_passes: usize,
) -> Result<RepairReport, AppError> {
    let mut edits = Vec::new();
    let mut passes = 0;
    let mut converged = false;
    let mut last = Plan::default();

    while passes < max_passes {
        let plan = plan_snapshot(snapshot);
        passes += 1;
        if plan.edits.is_empty() {
            converged = true;
            last = plan;
            break;
        }
        let changed = snapshot.apply_edits(&plan.edits)?;
        tracing::info!(
            pass = passes,
            edits = plan.edits.len(),
            documents = changed,
            "applied repair pass"
        );
        edits.extend(plan.edits.iter().cloned());
        last = plan;
    }
    if !converged {
        tracing::warn!(passes, "repair did not reach a fixed point");
        last = plan_snapshot(snapshot);
    }

    Ok(RepairReport {
        dry_run: false,
        passes,
        converged,
        edits,
        conflicts: last.conflicts,
        skipped: last.skipped,
        remaining: validate_snapshot(snapshot),
        written: Vec::new(),
    })
}

/// Links the neighbors named by `id` back to it. Edits that do not conflict
/// are applied even when the other side conflicts.
pub fn insert_into_snapshot(snapshot: &mut Snapshot, id: &str) -> Result<InsertionReport, AppError> {
    if snapshot.get(id).is_none() {
        return Err(AppError::NotFound(id.to_string()));
    }
    let plan = {
        let index = DocumentIndex::new(snapshot.parsed());
        plan_insertion(id, &index)
    }
    .ok_or_else(|| AppError::InvalidArgument(incomplete_series_message(snapshot, id)))?;

    snapshot.apply_edits(&plan.edits)?;
    Ok(InsertionReport {
        id: id.to_string(),
        dry_run: false,
        edits: plan.edits,
        conflicts: plan.conflicts,
        written: Vec::new(),
    })
}

fn incomplete_series_message(snapshot: &Snapshot, id: &str) -> String {
    let Some(fields) = snapshot
        .get(id)
        .and_then(|doc| doc.parsed.metadata.as_ref())
        .map(|meta| &meta.fields)
    else {
        return format!("guide '{id}' has no metadata block");
    };
    let missing = [
        ("name", fields.name.is_none()),
        ("part", fields.part.is_none()),
        ("total", fields.total.is_none()),
    ]
    .into_iter()
    .filter_map(|(key, absent)| absent.then_some(key))
    .collect::<Vec<_>>();
    if missing.len() == 3 {
        format!("guide '{id}' has no series section")
    } else {
        format!("guide '{id}' series section is missing {}", missing.join(", "))
    }
}

/// Adds catalog series sections to guides that have a metadata block but no
/// `series:` key. Guides are matched by id, then by title slug.
pub fn seed_snapshot(snapshot: &mut Snapshot, catalog: &Catalog) -> Result<SeedReport, AppError> {
    let mut report = SeedReport::default();

    for (topic, link) in catalog.series_topics() {
        let slug = topic.slug();
        let Some(id) = find_guide(snapshot, &slug) else {
            tracing::debug!(title = %topic.title, slug = %slug, "no guide for catalog topic");
            report.not_found.push(topic.title.clone());
            continue;
        };
        let Some(doc) = snapshot.get(&id) else {
            continue;
        };
        let Some(metadata) = doc.parsed.metadata.as_ref() else {
            report.unparsed.push(id);
            continue;
        };
        if metadata.has_series_key {
            report.already_present.push(id);
            continue;
        }

        let updated = writer::insert_series_section(doc.raw(), link)?;
        snapshot.replace_raw(&id, updated)?;
        report.seeded.push(SeededGuide {
            id,
            series: link.name.clone(),
            part: link.part,
            total: link.total,
        });
    }
    Ok(report)
}

fn find_guide(snapshot: &Snapshot, slug: &str) -> Option<String> {
    if snapshot.get(slug).is_some() {
        return Some(slug.to_string());
    }
    snapshot
        .parsed()
        .find(|doc| doc.title().is_some_and(|title| slugify(title) == slug))
        .map(|doc| doc.id.clone())
}

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Config(ConfigError),
    Store(StoreError),
    Write(WriteError),
    Catalog(CatalogError),
    Json(serde_json::Error),
    NotFound(String),
    InvalidArgument(String),
    Unresolved(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "I/O error: {}", err),
            AppError::Config(err) => write!(f, "{}", err),
            AppError::Store(err) => write!(f, "{}", err),
            AppError::Write(err) => write!(f, "edit error: {}", err),
            AppError::Catalog(err) => write!(f, "{}", err),
            AppError::Json(err) => write!(f, "JSON encode error: {}", err),
            AppError::NotFound(id) => write!(f, "guide '{}' not found", id),
            AppError::InvalidArgument(message) => write!(f, "{}", message),
            AppError::Unresolved(message) => write!(f, "{}", message),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Config(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Write(err) => Some(err),
            AppError::Catalog(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::NotFound(_) | AppError::InvalidArgument(_) | AppError::Unresolved(_) => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        AppError::Store(value)
    }
}

impl From<WriteError> for AppError {
    fn from(value: WriteError) -> Self {
        AppError::Write(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::Json(value)
    }
}

impl From<CatalogError> for AppError {
    fn from(value: CatalogError) -> Self {
        AppError::Catalog(value)
    }
}

#[cfg(test)]
mod tests;
