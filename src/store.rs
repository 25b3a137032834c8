use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use time::Date;
use uuid::Uuid;

use crate::frontmatter::{parse, ParsedDocument};
use crate::reconcile::Edit;
use crate::writer::{self, WriteError};

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    MissingDir(PathBuf),
    UnknownDocument(String),
    Write { id: String, source: WriteError },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(err) => write!(f, "I/O error: {}", err),
            StoreError::MissingDir(path) => {
                write!(f, "guides directory '{}' does not exist", path.display())
            }
            StoreError::UnknownDocument(id) => write!(f, "document '{}' is not loaded", id),
            StoreError::Write { id, source } => write!(f, "cannot edit '{}': {}", id, source),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Io(err) => Some(err),
            StoreError::Write { source, .. } => Some(source),
            StoreError::MissingDir(_) | StoreError::UnknownDocument(_) => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        StoreError::Io(value)
    }
}

/// A file that was seen but could not be taken into the snapshot.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LoadIssue {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub path: PathBuf,
    pub parsed: ParsedDocument,
    dirty: bool,
}

impl StoredDocument {
    pub fn id(&self) -> &str {
        &self.parsed.id
    }

    pub fn raw(&self) -> &str {
        &self.parsed.raw
    }
}

/// Every document of one batch run, in file name order.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    documents: Vec<StoredDocument>,
    by_id: HashMap<String, usize>,
    pub issues: Vec<LoadIssue>,
}

impl Snapshot {
    /// Builds an in-memory snapshot; paths are synthesized from the ids.
    pub fn from_sources<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut snapshot = Snapshot::default();
        for (id, raw) in sources {
            let id = id.into();
            let path = PathBuf::from(format!("{id}.md"));
            snapshot.push(path, parse(id, raw.into()));
        }
        snapshot
    }

    fn push(&mut self, path: PathBuf, parsed: ParsedDocument) {
        if let Some(&existing) = self.by_id.get(&parsed.id) {
            self.issues.push(LoadIssue {
                path: path.display().to_string(),
                message: format!(
                    "duplicate id '{}' (already loaded from {}); file ignored",
                    parsed.id,
                    self.documents[existing].path.display()
                ),
            });
            return;
        }
        self.by_id.insert(parsed.id.clone(), self.documents.len());
        self.documents.push(StoredDocument {
            path,
            parsed,
            dirty: false,
        });
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn parsed(&self) -> impl Iterator<Item = &ParsedDocument> {
        self.documents.iter().map(|doc| &doc.parsed)
    }

    pub fn get(&self, id: &str) -> Option<&StoredDocument> {
        self.by_id.get(id).map(|&index| &self.documents[index])
    }

    /// Swaps in new text for `id` and re-parses it. Returns whether the text
    /// actually changed.
    pub fn replace_raw(&mut self, id: &str, raw: String) -> Result<bool, StoreError> {
        let index = *self
            .by_id
            .get(id)
            .ok_or_else(|| StoreError::UnknownDocument(id.to_string()))?;
        let doc = &mut self.documents[index];
        if doc.parsed.raw == raw {
            return Ok(false);
        }
        doc.parsed = parse(id, raw);
        doc.dirty = true;
        Ok(true)
    }

    /// Applies a plan's edits grouped per document. Returns how many
    /// documents changed.
    pub fn apply_edits(&mut self, edits: &[Edit]) -> Result<usize, StoreError> {
        let mut grouped: BTreeMap<&str, Vec<Edit>> = BTreeMap::new();
        for edit in edits {
            grouped
                .entry(edit.document_id.as_str())
                .or_default()
                .push(edit.clone());
        }

        let mut changed = 0;
        for (id, doc_edits) in grouped {
            let raw = self
                .get(id)
                .ok_or_else(|| StoreError::UnknownDocument(id.to_string()))?
                .raw();
            let updated = writer::apply(raw, &doc_edits).map_err(|source| StoreError::Write {
                id: id.to_string(),
                source,
            })?;
            if self.replace_raw(id, updated)? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    pub fn changed(&self) -> impl Iterator<Item = &StoredDocument> {
        self.documents.iter().filter(|doc| doc.dirty)
    }
}

/// Flat directory of guides sharing one extension.
#[derive(Debug, Clone)]
pub struct GuideStore {
    dir: PathBuf,
    extension: String,
}

impl GuideStore {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn load(&self) -> Result<Snapshot, StoreError> {
        if !self.dir.is_dir() {
            return Err(StoreError::MissingDir(self.dir.clone()));
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == self.extension.as_str())
            {
                paths.push(path);
            }
        }
        paths.sort();

        let mut snapshot = Snapshot::default();
        for path in paths {
            let Some(id) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| document_id(name, &self.extension))
            else {
                snapshot.issues.push(LoadIssue {
                    path: path.display().to_string(),
                    message: "file name does not yield a document id".to_string(),
                });
                continue;
            };
            match fs::read_to_string(&path) {
                Ok(raw) => snapshot.push(path, parse(id, raw)),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping unreadable guide");
                    snapshot.issues.push(LoadIssue {
                        path: path.display().to_string(),
                        message: format!("unreadable: {err}"),
                    });
                }
            }
        }
        tracing::debug!(
            dir = %self.dir.display(),
            documents = snapshot.len(),
            issues = snapshot.issues.len(),
            "loaded guide snapshot"
        );
        Ok(snapshot)
    }

    /// Writes every changed document back through a temp file and a rename,
    /// then clears its dirty flag. Returns the ids written.
    pub fn flush(&self, snapshot: &mut Snapshot) -> Result<Vec<String>, StoreError> {
        tracing::debug!(pending = snapshot.changed().count(), "flushing guides");
        let mut written = Vec::new();
        for doc in snapshot.documents.iter_mut().filter(|doc| doc.dirty) {
            write_atomic(&doc.path, doc.raw().as_bytes())?;
            tracing::info!(id = %doc.id(), path = %doc.path.display(), "updated guide");
            doc.dirty = false;
            written.push(doc.id().to_string());
        }
        Ok(written)
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("guide");
    let tmp = dir.join(format!(".{name}.{}.tmp", Uuid::now_v7()));
    fs::write(&tmp, contents)?;
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    Ok(())
}

/// File name to document id: drops `.{extension}` and a leading
/// `YYYY-MM-DD-` prefix when it is a real calendar date.
pub fn document_id(file_name: &str, extension: &str) -> Option<String> {
    let stem = file_name
        .strip_suffix(extension)
        .and_then(|rest| rest.strip_suffix('.'))?;
    if stem.is_empty() || stem.starts_with('.') {
        return None;
    }
    let id = match (stem.get(..10), stem.get(10..11), stem.get(11..)) {
        (Some(date), Some("-"), Some(rest)) if !rest.is_empty() && is_date(date) => rest,
        _ => stem,
    };
    Some(id.to_string())
}

fn is_date(raw: &str) -> bool {
    let Ok(format) = time::format_description::parse("[year]-[month]-[day]") else {
        return false;
    };
    Date::parse(raw, &format).is_ok()
}

#[cfg(test)]
mod tests {
    use super::{document_id, GuideStore, Snapshot, StoreError};
    use crate::domain::series::LinkField;
    use crate::reconcile::{Edit, EditReason};
    use uuid::Uuid;

    const PART_TWO: &str = "---\nseries:\n  name: S\n  part: 2\n  total: 2\n---\nBody\n";

    #[test]
    fn document_id_strips_valid_date_prefix_and_extension() {
        assert_eq!(
            document_id("2024-03-01-intro-to-x.md", "md").as_deref(),
            Some("intro-to-x")
        );
        assert_eq!(
            document_id("2024-13-01-intro.md", "md").as_deref(),
            Some("2024-13-01-intro")
        );
        assert_eq!(document_id("plain.md", "md").as_deref(), Some("plain"));
        assert_eq!(
            document_id("2024-03-01.md", "md").as_deref(),
            Some("2024-03-01")
        );
        assert_eq!(document_id("notes.txt", "md"), None);
        assert_eq!(document_id(".md", "md"), None);
    }

    #[test]
    fn duplicate_ids_keep_first_and_record_issue() {
        let snapshot = Snapshot::from_sources([("a", "first"), ("a", "second")]);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("a").map(|doc| doc.raw()), Some("first"));
        assert_eq!(snapshot.issues.len(), 1);
    }

    #[test]
    fn apply_edits_marks_only_changed_documents() {
        let mut snapshot = Snapshot::from_sources([("a", "---\ntitle: t\n---\n"), ("b", PART_TWO)]);
        let edits = vec![Edit {
            document_id: "b".to_string(),
            field: LinkField::Previous,
            old_value: None,
            new_value: Some("a".to_string()),
            reason: EditReason::InferNeighbor,
        }];
        assert_eq!(snapshot.apply_edits(&edits).expect("apply"), 1);
        let changed = snapshot
            .changed()
            .map(|doc| doc.id().to_string())
            .collect::<Vec<_>>();
        assert_eq!(changed, vec!["b"]);
        let link = snapshot
            .get("b")
            .and_then(|doc| doc.parsed.series().cloned())
            .expect("link");
        assert_eq!(link.previous.as_deref(), Some("a"));
    }

    #[test]
    fn apply_edits_rejects_unknown_documents() {
        let mut snapshot = Snapshot::from_sources([("a", PART_TWO)]);
        let edits = vec![Edit {
            document_id: "ghost".to_string(),
            field: LinkField::Next,
            old_value: None,
            new_value: None,
            reason: EditReason::RemoveDangling,
        }];
        assert!(matches!(
            snapshot.apply_edits(&edits),
            Err(StoreError::UnknownDocument(id)) if id == "ghost"
        ));
    }

    #[test]
    fn load_and_flush_round_trip_through_directory() {
        let dir = std::env::temp_dir().join(format!("guidechain-store-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).expect("dir should be creatable");
        std::fs::write(dir.join("2024-01-02-b.md"), PART_TWO).expect("write b");
        std::fs::write(dir.join("a.md"), "---\ntitle: a\n---\n").expect("write a");
        std::fs::write(dir.join("ignored.txt"), "nope").expect("write txt");

        let store = GuideStore::new(&dir, "md");
        let mut snapshot = store.load().expect("load should work");
        let ids = snapshot
            .parsed()
            .map(|doc| doc.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(store.flush(&mut snapshot).expect("flush").is_empty());

        let updated = PART_TWO.replace("  total: 2\n", "  total: 2\n  previous: \"a\"\n");
        assert!(snapshot.replace_raw("b", updated.clone()).expect("replace"));
        assert_eq!(store.flush(&mut snapshot).expect("flush"), vec!["b"]);
        assert_eq!(
            std::fs::read_to_string(dir.join("2024-01-02-b.md")).expect("read back"),
            updated
        );
        assert_eq!(snapshot.changed().count(), 0);
        let leftovers = std::fs::read_dir(&dir)
            .expect("list")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = std::env::temp_dir().join(format!("guidechain-missing-{}", Uuid::now_v7()));
        assert!(matches!(
            GuideStore::new(&dir, "md").load(),
            Err(StoreError::MissingDir(_))
        ));
    }
}
