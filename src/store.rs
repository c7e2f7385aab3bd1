//! Durable task storage.
//!
//! The whole task collection lives in one serialized JSON document behind a
//! [`StorageBackend`]. Every mutating operation reads the full document,
//! rewrites it, and persists it again; there is no per-task access to the
//! storage medium. Failures never cross this boundary as panics: persistence
//! problems surface as `false`, missing tasks as `None`, and a malformed
//! document loads as an empty board.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::fields::Status;
use crate::task::{Task, TaskDraft, TaskPatch};

/// Persistence slot holding the serialized board document.
pub trait StorageBackend {
    /// Current payload, or `None` when nothing has been stored yet.
    fn read(&self) -> io::Result<Option<String>>;
    /// Replace the payload atomically from the caller's point of view.
    fn write(&mut self, payload: &str) -> io::Result<()>;
}

/// File-backed slot. Writes go through a temp file + rename.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: &Path) -> Self {
        FileBackend { path: path.to_path_buf() }
    }
}

impl StorageBackend for FileBackend {
    fn read(&self) -> io::Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let mut buf = String::new();
        File::open(&self.path)?.read_to_string(&mut buf)?;
        Ok(Some(buf))
    }

    fn write(&mut self, payload: &str) -> io::Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        f.write_all(payload.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory slot, used by tests and embedders that manage persistence
/// themselves.
#[derive(Default)]
pub struct MemoryBackend {
    slot: Option<String>,
}

impl StorageBackend for MemoryBackend {
    fn read(&self) -> io::Result<Option<String>> {
        Ok(self.slot.clone())
    }

    fn write(&mut self, payload: &str) -> io::Result<()> {
        self.slot = Some(payload.to_string());
        Ok(())
    }
}

/// CRUD over the task collection.
pub struct TaskStore<B: StorageBackend> {
    backend: B,
}

impl TaskStore<FileBackend> {
    /// Store backed by a JSON file on disk.
    pub fn open(path: &Path) -> Self {
        TaskStore { backend: FileBackend::new(path) }
    }
}

impl TaskStore<MemoryBackend> {
    /// Empty store with no durable backing.
    pub fn in_memory() -> Self {
        TaskStore { backend: MemoryBackend::default() }
    }

    /// In-memory store seeded with a raw payload, parseable or not.
    pub fn with_payload(payload: &str) -> Self {
        TaskStore {
            backend: MemoryBackend { slot: Some(payload.to_string()) },
        }
    }
}

impl<B: StorageBackend> TaskStore<B> {
    pub fn with_backend(backend: B) -> Self {
        TaskStore { backend }
    }

    /// Deserialize the persisted document. An absent or malformed payload
    /// yields an empty collection rather than an error.
    pub fn load_all(&self) -> Vec<Task> {
        let payload = match self.backend.read() {
            Ok(Some(payload)) => payload,
            Ok(None) => return Vec::new(),
            Err(e) => {
                eprintln!("Error reading board, starting fresh: {e}");
                return Vec::new();
            }
        };
        match serde_json::from_str(&payload) {
            Ok(tasks) => tasks,
            Err(e) => {
                eprintln!("Error parsing board, starting fresh: {e}");
                Vec::new()
            }
        }
    }

    /// Serialize and persist the full collection. Returns false on
    /// serialization or write failure instead of propagating an error.
    pub fn save_all(&mut self, tasks: &[Task]) -> bool {
        let payload = match serde_json::to_string_pretty(tasks) {
            Ok(payload) => payload,
            Err(e) => {
                eprintln!("Error serializing board: {e}");
                return false;
            }
        };
        match self.backend.write(&payload) {
            Ok(()) => true,
            Err(e) => {
                eprintln!("Error saving board: {e}");
                false
            }
        }
    }

    /// Store a new task. Assigns an id when the draft carries none, stamps
    /// both timestamps, and starts with an empty activity log; recording the
    /// CREATE entry is the recorder's job.
    pub fn create(&mut self, draft: TaskDraft) -> Task {
        let now = Utc::now();
        let task = Task {
            id: draft.id.unwrap_or_else(generate_id),
            title: draft.title,
            details: draft.details,
            start_date: draft.start_date,
            end_date: draft.end_date,
            department: draft.department,
            category: draft.category,
            status: draft.status,
            created_at: now,
            updated_at: now,
            activity: Vec::new(),
        };
        let mut tasks = self.load_all();
        tasks.push(task.clone());
        self.save_all(&tasks);
        task
    }

    /// Merge a partial update over the task with this id and re-stamp
    /// `updated_at`. The existing activity log is preserved unless the patch
    /// explicitly supplies a replacement. Returns the stored record, or
    /// `None` when the id is unknown.
    pub fn update(&mut self, id: &str, patch: TaskPatch) -> Option<Task> {
        let mut tasks = self.load_all();
        let task = tasks.iter_mut().find(|t| t.id == id)?;
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(details) = patch.details {
            task.details = details;
        }
        if let Some(start_date) = patch.start_date {
            task.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            task.end_date = end_date;
        }
        if let Some(department) = patch.department {
            task.department = department;
        }
        if let Some(category) = patch.category {
            task.category = category;
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(activity) = patch.activity {
            task.activity = activity;
        }
        task.updated_at = Utc::now();
        let updated = task.clone();
        self.save_all(&tasks);
        Some(updated)
    }

    /// Filter the task out and persist. Removing an unknown id is a no-op
    /// success; the result only reflects whether persisting worked.
    pub fn remove(&mut self, id: &str) -> bool {
        let mut tasks = self.load_all();
        tasks.retain(|t| t.id != id);
        self.save_all(&tasks)
    }

    /// Sugar for a status-only update.
    pub fn move_status(&mut self, id: &str, status: Status) -> Option<Task> {
        self.update(id, TaskPatch { status: Some(status), ..TaskPatch::default() })
    }

    pub fn find_by_id(&self, id: &str) -> Option<Task> {
        self.load_all().into_iter().find(|t| t.id == id)
    }

    pub fn find_by_status(&self, status: Status) -> Vec<Task> {
        self.load_all().into_iter().filter(|t| t.status == status).collect()
    }
}

/// System-generated task id.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn draft(title: &str) -> TaskDraft {
        TaskDraft { title: title.to_string(), ..TaskDraft::default() }
    }

    #[test]
    fn created_task_is_found_by_id() {
        let mut store = TaskStore::in_memory();
        let mut d = draft("Fix bug");
        d.department = Some("Ops".into());
        let task = store.create(d);
        assert!(!task.id.is_empty());
        assert_eq!(task.status, Status::Backlog);
        assert!(task.activity.is_empty());
        assert_eq!(task.created_at, task.updated_at);

        let found = store.find_by_id(&task.id).unwrap();
        assert_eq!(found, task);
    }

    #[test]
    fn caller_supplied_id_is_kept() {
        let mut store = TaskStore::in_memory();
        let mut d = draft("Fix bug");
        d.id = Some("abc123".into());
        let task = store.create(d);
        assert_eq!(task.id, "abc123");
        assert!(store.find_by_id("abc123").is_some());
    }

    #[test]
    fn empty_patch_restamps_updated_at_only() {
        let mut store = TaskStore::in_memory();
        let mut d = draft("Fix bug");
        d.details = Some("flaky test".into());
        let created = store.create(d);

        let updated = store.update(&created.id, TaskPatch::default()).unwrap();
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.details, created.details);
        assert_eq!(updated.status, created.status);
        assert_eq!(updated.activity, created.activity);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn update_merges_and_clears_fields() {
        let mut store = TaskStore::in_memory();
        let mut d = draft("Fix bug");
        d.details = Some("flaky test".into());
        d.end_date = NaiveDate::from_ymd_opt(2024, 4, 1);
        let created = store.create(d);

        let patch = TaskPatch {
            department: Some(Some("Ops".into())),
            end_date: Some(None),
            ..TaskPatch::default()
        };
        let updated = store.update(&created.id, patch).unwrap();
        assert_eq!(updated.department.as_deref(), Some("Ops"));
        assert_eq!(updated.end_date, None);
        // Untouched fields survive the merge.
        assert_eq!(updated.details.as_deref(), Some("flaky test"));
    }

    #[test]
    fn update_unknown_id_returns_none() {
        let mut store = TaskStore::in_memory();
        store.create(draft("Fix bug"));
        assert!(store.update("missing", TaskPatch::default()).is_none());
        assert!(store.move_status("missing", Status::Na).is_none());
    }

    #[test]
    fn move_status_changes_column() {
        let mut store = TaskStore::in_memory();
        let task = store.create(draft("Fix bug"));
        let moved = store.move_status(&task.id, Status::InProgress).unwrap();
        assert_eq!(moved.status, Status::InProgress);
        assert_eq!(store.find_by_status(Status::InProgress).len(), 1);
        assert!(store.find_by_status(Status::Backlog).is_empty());
    }

    #[test]
    fn remove_deletes_task_and_tolerates_unknown_ids() {
        let mut store = TaskStore::in_memory();
        let task = store.create(draft("Fix bug"));
        assert!(store.remove(&task.id));
        assert!(store.find_by_id(&task.id).is_none());
        assert!(store.remove("missing"));
    }

    #[test]
    fn corrupted_document_loads_as_empty_board() {
        let store = TaskStore::with_payload("{not json");
        assert!(store.load_all().is_empty());
        let store = TaskStore::with_payload("{\"wrong\": \"shape\"}");
        assert!(store.load_all().is_empty());
    }

    /// Backend whose medium is gone, e.g. a file on an unmounted disk.
    struct FailingBackend;

    impl StorageBackend for FailingBackend {
        fn read(&self) -> io::Result<Option<String>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "backend offline"))
        }
        fn write(&mut self, _payload: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "backend offline"))
        }
    }

    #[test]
    fn failed_write_reports_false() {
        let mut store = TaskStore::with_backend(FailingBackend);
        assert!(!store.save_all(&[]));
        // Mutations still hand back the record even when persisting fails.
        let task = store.create(draft("Fix bug"));
        assert_eq!(task.title, "Fix bug");
    }

    #[test]
    fn unreadable_backend_loads_as_empty_board() {
        let store = TaskStore::with_backend(FailingBackend);
        assert!(store.load_all().is_empty());
        assert!(store.find_by_id("any").is_none());
        assert!(store.find_by_status(Status::Backlog).is_empty());
    }

    #[test]
    fn file_backend_round_trips_and_leaves_no_temp_file() {
        let dir = std::env::temp_dir().join(format!("kanban-test-{}", generate_id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("kanban_tasks.json");

        let mut store = TaskStore::open(&path);
        assert!(store.load_all().is_empty());
        let task = store.create(draft("Fix bug"));

        let reopened = TaskStore::open(&path);
        assert_eq!(reopened.load_all(), vec![task]);
        assert!(!path.with_extension("json.tmp").exists());

        fs::remove_dir_all(&dir).unwrap();
    }
}
