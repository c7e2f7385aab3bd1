//! Change detection and the append-only activity trail.
//!
//! The recorder decides what changed between a task's stored state and an
//! incoming patch, appends immutable entries to a task's log through the
//! store's update path, and flattens every log into one globally
//! time-ordered feed.

use chrono::Utc;

use crate::fields::{find_category, EventType, Status};
use crate::store::{StorageBackend, TaskStore};
use crate::task::{clean_field, ActivityEntry, FieldChange, Task, TaskPatch};

/// Display stand-in for an empty or absent value.
pub const PLACEHOLDER: &str = "-";

/// Tracked field labels, in the fixed order changes are reported in.
pub const TRACKED_FIELDS: [&str; 7] = [
    "title",
    "details",
    "start date",
    "end date",
    "department",
    "category",
    "status",
];

/// One entry of the global feed: an activity entry tagged with its owning
/// task's id and current title.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub task_id: String,
    pub task_title: String,
    pub entry: ActivityEntry,
}

/// Diff the stored task against an incoming patch over the fixed tracked
/// field set. Fields the patch does not carry are not compared; fields
/// outside the tracked set are never reported. Equality is exact; values
/// are resolved to display strings with [`PLACEHOLDER`] standing in for
/// empty ones.
pub fn detect_changes(old: &Task, patch: &TaskPatch) -> Vec<FieldChange> {
    let [title, details, start_date, end_date, department, category, status] = TRACKED_FIELDS;
    let mut changes = Vec::new();

    if let Some(new_title) = &patch.title {
        if *new_title != old.title {
            changes.push(change(title, display_text(Some(&old.title)), display_text(Some(new_title))));
        }
    }
    if let Some(new_details) = &patch.details {
        if *new_details != old.details {
            changes.push(change(
                details,
                display_text(old.details.as_deref()),
                display_text(new_details.as_deref()),
            ));
        }
    }
    if let Some(new_start) = &patch.start_date {
        if *new_start != old.start_date {
            changes.push(change(start_date, display_date(old.start_date), display_date(*new_start)));
        }
    }
    if let Some(new_end) = &patch.end_date {
        if *new_end != old.end_date {
            changes.push(change(end_date, display_date(old.end_date), display_date(*new_end)));
        }
    }
    if let Some(new_department) = &patch.department {
        if *new_department != old.department {
            changes.push(change(
                department,
                display_text(old.department.as_deref()),
                display_text(new_department.as_deref()),
            ));
        }
    }
    if let Some(new_category) = &patch.category {
        if *new_category != old.category {
            changes.push(change(
                category,
                display_category(old.category.as_deref()),
                display_category(new_category.as_deref()),
            ));
        }
    }
    if let Some(new_status) = patch.status {
        if new_status != old.status {
            changes.push(change(status, old.status.title().to_string(), new_status.title().to_string()));
        }
    }

    changes
}

/// The synthetic change carried by a CREATE entry: no prior value, the
/// starting column's display title as the new one.
pub fn initial_state_change(status: Status) -> FieldChange {
    FieldChange {
        field: "initial state".to_string(),
        old_value: None,
        new_value: status.title().to_string(),
    }
}

/// The single change carried by a MOVE entry.
pub fn status_change(old: Status, new: Status) -> FieldChange {
    change("status", old.title().to_string(), new.title().to_string())
}

/// Build an activity entry stamped with the current instant and the task's
/// current title, insert it at the front of the task's log (newest first),
/// and persist through the store's update path. Blank comments are dropped.
/// Returns `None` when the task does not exist.
pub fn record_activity<B: StorageBackend>(
    store: &mut TaskStore<B>,
    id: &str,
    event_type: EventType,
    details: Vec<FieldChange>,
    comment: Option<String>,
) -> Option<Task> {
    let task = store.find_by_id(id)?;
    let entry = ActivityEntry {
        timestamp: Utc::now(),
        event_type,
        details,
        comment: comment.as_deref().and_then(clean_field),
        task_title: task.title.clone(),
    };
    let mut log = task.activity;
    log.insert(0, entry);
    store.update(id, TaskPatch { activity: Some(log), ..TaskPatch::default() })
}

/// Flatten every task's log into one feed sorted by timestamp descending.
/// The sort runs over the full flattened set on every call; the whole
/// collection is already in memory, so there is nothing to index.
pub fn all_activities<B: StorageBackend>(store: &TaskStore<B>) -> Vec<FeedEntry> {
    let mut feed = Vec::new();
    for task in store.load_all() {
        for entry in &task.activity {
            feed.push(FeedEntry {
                task_id: task.id.clone(),
                task_title: task.title.clone(),
                entry: entry.clone(),
            });
        }
    }
    feed.sort_by(|a, b| b.entry.timestamp.cmp(&a.entry.timestamp));
    feed
}

/// A task's log ordered by its stored timestamps rather than insertion
/// order, so presentation stays correct even if entries were written out of
/// order.
pub fn sorted_log(task: &Task) -> Vec<ActivityEntry> {
    let mut log = task.activity.clone();
    log.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    log
}

fn change(field: &str, old_value: String, new_value: String) -> FieldChange {
    FieldChange {
        field: field.to_string(),
        old_value: Some(old_value),
        new_value,
    }
}

fn display_text(value: Option<&str>) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v.to_string(),
        None => PLACEHOLDER.to_string(),
    }
}

fn display_date(value: Option<chrono::NaiveDate>) -> String {
    match value {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => PLACEHOLDER.to_string(),
    }
}

fn display_category(id: Option<&str>) -> String {
    match id {
        None => PLACEHOLDER.to_string(),
        Some(id) => match find_category(id) {
            Some(c) => c.name.to_string(),
            None => id.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskDraft;
    use chrono::{Duration, NaiveDate, Utc};

    fn stored(store: &mut TaskStore<crate::store::MemoryBackend>, title: &str) -> Task {
        store.create(TaskDraft { title: title.to_string(), ..TaskDraft::default() })
    }

    #[test]
    fn identical_fields_yield_no_changes() {
        let mut store = TaskStore::in_memory();
        let task = stored(&mut store, "Fix bug");
        let patch = TaskPatch::snapshot(&task);
        assert!(detect_changes(&task, &patch).is_empty());
    }

    #[test]
    fn untouched_fields_are_not_compared() {
        let mut store = TaskStore::in_memory();
        let task = stored(&mut store, "Fix bug");
        // Patch carries nothing, so nothing can differ.
        assert!(detect_changes(&task, &TaskPatch::default()).is_empty());
    }

    #[test]
    fn empty_to_value_uses_placeholder_for_old_side() {
        let mut store = TaskStore::in_memory();
        let task = stored(&mut store, "Fix bug");
        let patch = TaskPatch {
            title: Some("Fix bug".to_string()),
            department: Some(Some("Ops".to_string())),
            ..TaskPatch::default()
        };
        let changes = detect_changes(&task, &patch);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "department");
        assert_eq!(changes[0].old_value.as_deref(), Some(PLACEHOLDER));
        assert_eq!(changes[0].new_value, "Ops");
    }

    #[test]
    fn changes_follow_tracked_field_order() {
        let mut store = TaskStore::in_memory();
        let task = stored(&mut store, "Fix bug");
        let patch = TaskPatch {
            status: Some(Status::Completed),
            title: Some("Fix flaky test".to_string()),
            category: Some(Some("bug".to_string())),
            start_date: Some(NaiveDate::from_ymd_opt(2024, 3, 1)),
            ..TaskPatch::default()
        };
        let fields: Vec<String> = detect_changes(&task, &patch).into_iter().map(|c| c.field).collect();
        assert_eq!(fields, ["title", "start date", "category", "status"]);
        for field in &fields {
            assert!(TRACKED_FIELDS.contains(&field.as_str()));
        }
    }

    #[test]
    fn swapping_old_and_new_swaps_value_pairs() {
        let mut store = TaskStore::in_memory();
        let before = stored(&mut store, "Fix bug");
        let mut after = before.clone();
        after.title = "Fix flaky test".to_string();
        after.department = Some("Ops".to_string());
        after.status = Status::InProgress;

        let forward = detect_changes(&before, &TaskPatch::snapshot(&after));
        let backward = detect_changes(&after, &TaskPatch::snapshot(&before));

        let names = |changes: &[FieldChange]| changes.iter().map(|c| c.field.clone()).collect::<Vec<_>>();
        assert_eq!(names(&forward), names(&backward));
        for (f, b) in forward.iter().zip(&backward) {
            assert_eq!(f.old_value.as_deref(), Some(b.new_value.as_str()));
            assert_eq!(b.old_value.as_deref(), Some(f.new_value.as_str()));
        }
    }

    #[test]
    fn status_values_use_column_display_titles() {
        let change = status_change(Status::Backlog, Status::InProgress);
        assert_eq!(change.field, "status");
        assert_eq!(change.old_value.as_deref(), Some("Tareas / Por Hacer"));
        assert_eq!(change.new_value, "En Progreso");

        let initial = initial_state_change(Status::Backlog);
        assert_eq!(initial.field, "initial state");
        assert_eq!(initial.old_value, None);
        assert_eq!(initial.new_value, "Tareas / Por Hacer");
    }

    #[test]
    fn record_prepends_entries_newest_first() {
        let mut store = TaskStore::in_memory();
        let task = stored(&mut store, "Fix bug");

        record_activity(&mut store, &task.id, EventType::Create, vec![initial_state_change(Status::Backlog)], None).unwrap();
        let moved = record_activity(
            &mut store,
            &task.id,
            EventType::Move,
            vec![status_change(Status::Backlog, Status::InProgress)],
            Some("picking this up".to_string()),
        )
        .unwrap();

        assert_eq!(moved.activity.len(), 2);
        assert_eq!(moved.activity[0].event_type, EventType::Move);
        assert_eq!(moved.activity[0].comment.as_deref(), Some("picking this up"));
        assert_eq!(moved.activity[1].event_type, EventType::Create);
    }

    #[test]
    fn record_snapshots_current_title_and_drops_blank_comments() {
        let mut store = TaskStore::in_memory();
        let task = stored(&mut store, "Fix bug");
        let updated = record_activity(&mut store, &task.id, EventType::Update, Vec::new(), Some("   ".to_string())).unwrap();
        assert_eq!(updated.activity[0].task_title, "Fix bug");
        assert_eq!(updated.activity[0].comment, None);
    }

    #[test]
    fn record_on_unknown_task_returns_none() {
        let mut store = TaskStore::in_memory();
        assert!(record_activity(&mut store, "missing", EventType::Update, Vec::new(), None).is_none());
    }

    #[test]
    fn feed_is_sorted_descending_and_tagged_with_owner() {
        let mut store = TaskStore::in_memory();
        let a = stored(&mut store, "Fix bug");
        let b = stored(&mut store, "Write docs");

        // Seed logs with explicit timestamps so the ordering is observable.
        let base = Utc::now();
        let entry = |minutes: i64| ActivityEntry {
            timestamp: base + Duration::minutes(minutes),
            event_type: EventType::Update,
            details: Vec::new(),
            comment: None,
            task_title: "x".to_string(),
        };
        store.update(&a.id, TaskPatch { activity: Some(vec![entry(3), entry(0)]), ..TaskPatch::default() }).unwrap();
        store.update(&b.id, TaskPatch { activity: Some(vec![entry(2), entry(1)]), ..TaskPatch::default() }).unwrap();

        let feed = all_activities(&store);
        assert_eq!(feed.len(), 4);
        for pair in feed.windows(2) {
            assert!(pair[0].entry.timestamp > pair[1].entry.timestamp);
        }
        assert_eq!(feed[0].task_id, a.id);
        assert_eq!(feed[0].task_title, "Fix bug");
        assert_eq!(feed[1].task_id, b.id);
    }

    #[test]
    fn deleted_tasks_disappear_from_the_feed() {
        let mut store = TaskStore::in_memory();
        let a = stored(&mut store, "Fix bug");
        let b = stored(&mut store, "Write docs");
        record_activity(&mut store, &a.id, EventType::Create, vec![initial_state_change(Status::Backlog)], None).unwrap();
        record_activity(&mut store, &b.id, EventType::Create, vec![initial_state_change(Status::Backlog)], None).unwrap();

        store.remove(&a.id);
        let feed = all_activities(&store);
        assert_eq!(feed.len(), 1);
        assert!(feed.iter().all(|e| e.task_id == b.id));
    }

    #[test]
    fn sorted_log_orders_by_stored_timestamp() {
        let base = Utc::now();
        let mut store = TaskStore::in_memory();
        let task = stored(&mut store, "Fix bug");
        let entry = |minutes: i64| ActivityEntry {
            timestamp: base + Duration::minutes(minutes),
            event_type: EventType::Update,
            details: Vec::new(),
            comment: None,
            task_title: "Fix bug".to_string(),
        };
        // Out-of-order insertion, e.g. after clock skew.
        let task = store
            .update(&task.id, TaskPatch { activity: Some(vec![entry(1), entry(5), entry(3)]), ..TaskPatch::default() })
            .unwrap();
        let log = sorted_log(&task);
        assert!(log.windows(2).all(|p| p[0].timestamp >= p[1].timestamp));
    }
}
