//! Board engine: mutation paired with its activity record.
//!
//! The store and the recorder are deliberately separate primitives, but
//! leaving the "should this be logged" decision to every caller means one of
//! them eventually forgets. `Board` owns that decision: the CLI and the TUI
//! mutate tasks only through here.

use std::path::Path;

use crate::activity::{
    all_activities, detect_changes, initial_state_change, record_activity, sorted_log,
    status_change, FeedEntry,
};
use crate::fields::{EventType, Status};
use crate::store::{FileBackend, MemoryBackend, StorageBackend, TaskStore};
use crate::task::{ActivityEntry, Task, TaskDraft, TaskPatch};

pub struct Board<B: StorageBackend> {
    store: TaskStore<B>,
}

impl Board<FileBackend> {
    pub fn open(path: &Path) -> Self {
        Board { store: TaskStore::open(path) }
    }
}

impl Board<MemoryBackend> {
    pub fn in_memory() -> Self {
        Board { store: TaskStore::in_memory() }
    }
}

impl<B: StorageBackend> Board<B> {
    pub fn tasks(&self) -> Vec<Task> {
        self.store.load_all()
    }

    pub fn find(&self, id: &str) -> Option<Task> {
        self.store.find_by_id(id)
    }

    pub fn by_status(&self, status: Status) -> Vec<Task> {
        self.store.find_by_status(status)
    }

    /// A task's history, newest first by stored timestamp.
    pub fn log(&self, id: &str) -> Option<Vec<ActivityEntry>> {
        self.find(id).map(|t| sorted_log(&t))
    }

    /// The global feed across all tasks, newest first.
    pub fn feed(&self) -> Vec<FeedEntry> {
        all_activities(&self.store)
    }

    /// Store a new task and record its CREATE entry, which carries a single
    /// synthetic change naming the starting column.
    pub fn create(&mut self, draft: TaskDraft, comment: Option<String>) -> Task {
        let status = draft.status;
        let task = self.store.create(draft);
        record_activity(
            &mut self.store,
            &task.id,
            EventType::Create,
            vec![initial_state_change(status)],
            comment,
        )
        .unwrap_or(task)
    }

    /// Merge a patch over the task and record an UPDATE entry when at least
    /// one tracked field genuinely changed. A resubmit with identical values
    /// still re-stamps `updated_at` but leaves the history alone.
    pub fn edit(&mut self, id: &str, patch: TaskPatch, comment: Option<String>) -> Option<Task> {
        let old = self.store.find_by_id(id)?;
        let changes = detect_changes(&old, &patch);
        let updated = self.store.update(id, patch)?;
        if changes.is_empty() {
            return Some(updated);
        }
        record_activity(&mut self.store, id, EventType::Update, changes, comment)
    }

    /// Move the task to another column and record a MOVE entry. Dropping a
    /// task back into the column it already occupies records nothing.
    pub fn move_to(&mut self, id: &str, status: Status, comment: Option<String>) -> Option<Task> {
        let old = self.store.find_by_id(id)?;
        let moved = self.store.move_status(id, status)?;
        if old.status == status {
            return Some(moved);
        }
        record_activity(
            &mut self.store,
            id,
            EventType::Move,
            vec![status_change(old.status, status)],
            comment,
        )
    }

    /// Delete the task and its entire history. Unknown ids are a no-op
    /// success.
    pub fn remove(&mut self, id: &str) -> bool {
        self.store.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::PLACEHOLDER;

    fn draft(title: &str) -> TaskDraft {
        TaskDraft { title: title.to_string(), ..TaskDraft::default() }
    }

    #[test]
    fn create_records_initial_state_entry() {
        let mut board = Board::in_memory();
        let task = board.create(draft("Fix bug"), None);

        assert_eq!(task.activity.len(), 1);
        let entry = &task.activity[0];
        assert_eq!(entry.event_type, EventType::Create);
        assert_eq!(entry.task_title, "Fix bug");
        assert_eq!(entry.details.len(), 1);
        assert_eq!(entry.details[0].field, "initial state");
        assert_eq!(entry.details[0].old_value, None);
        assert_eq!(entry.details[0].new_value, "Tareas / Por Hacer");
    }

    #[test]
    fn move_prepends_entry_with_column_titles() {
        let mut board = Board::in_memory();
        let task = board.create(draft("Fix bug"), None);
        let moved = board.move_to(&task.id, Status::InProgress, None).unwrap();

        assert_eq!(moved.status, Status::InProgress);
        assert_eq!(moved.activity.len(), 2);
        assert_eq!(moved.activity[0].event_type, EventType::Move);
        assert_eq!(moved.activity[0].details[0].old_value.as_deref(), Some("Tareas / Por Hacer"));
        assert_eq!(moved.activity[0].details[0].new_value, "En Progreso");
        assert_eq!(moved.activity[1].event_type, EventType::Create);
    }

    #[test]
    fn move_to_same_column_records_nothing() {
        let mut board = Board::in_memory();
        let task = board.create(draft("Fix bug"), None);
        let dropped = board.move_to(&task.id, Status::Backlog, None).unwrap();
        assert_eq!(dropped.status, Status::Backlog);
        assert_eq!(dropped.activity.len(), 1);
    }

    #[test]
    fn edit_records_only_genuine_changes() {
        let mut board = Board::in_memory();
        let task = board.create(draft("Fix bug"), None);

        // Title resubmitted unchanged, department set for the first time.
        let patch = TaskPatch {
            title: Some("Fix bug".to_string()),
            department: Some(Some("Ops".to_string())),
            ..TaskPatch::default()
        };
        let edited = board.edit(&task.id, patch, None).unwrap();

        assert_eq!(edited.activity.len(), 2);
        let entry = &edited.activity[0];
        assert_eq!(entry.event_type, EventType::Update);
        assert_eq!(entry.details.len(), 1);
        assert_eq!(entry.details[0].field, "department");
        assert_eq!(entry.details[0].old_value.as_deref(), Some(PLACEHOLDER));
        assert_eq!(entry.details[0].new_value, "Ops");
    }

    #[test]
    fn noop_edit_leaves_history_alone() {
        let mut board = Board::in_memory();
        let task = board.create(draft("Fix bug"), None);
        let edited = board.edit(&task.id, TaskPatch::snapshot(&task), None).unwrap();
        assert_eq!(edited.activity.len(), 1);
        assert!(edited.updated_at >= task.updated_at);
    }

    #[test]
    fn edit_unknown_id_returns_none() {
        let mut board = Board::in_memory();
        assert!(board.edit("missing", TaskPatch::default(), None).is_none());
        assert!(board.move_to("missing", Status::Na, None).is_none());
    }

    #[test]
    fn remove_erases_task_and_its_feed_entries() {
        let mut board = Board::in_memory();
        let a = board.create(draft("Fix bug"), None);
        let b = board.create(draft("Write docs"), None);
        board.move_to(&a.id, Status::Completed, None).unwrap();

        assert!(board.remove(&a.id));
        assert!(board.find(&a.id).is_none());
        let feed = board.feed();
        assert!(feed.iter().all(|e| e.task_id == b.id));
    }

    #[test]
    fn comments_ride_along_with_entries() {
        let mut board = Board::in_memory();
        let task = board.create(draft("Fix bug"), Some("from triage".to_string()));
        assert_eq!(task.activity[0].comment.as_deref(), Some("from triage"));

        let moved = board
            .move_to(&task.id, Status::Error, Some("blocked on CI".to_string()))
            .unwrap();
        assert_eq!(moved.activity[0].comment.as_deref(), Some("blocked on CI"));
    }

    #[test]
    fn log_reads_are_timestamp_ordered() {
        let mut board = Board::in_memory();
        let task = board.create(draft("Fix bug"), None);
        board.move_to(&task.id, Status::InProgress, None);
        board.move_to(&task.id, Status::Completed, None);

        let log = board.log(&task.id).unwrap();
        assert_eq!(log.len(), 3);
        assert!(log.windows(2).all(|p| p[0].timestamp >= p[1].timestamp));
        assert!(board.log("missing").is_none());
    }
}
