//! Task data structures and the activity records embedded in them.
//!
//! Serialized field names are camelCase and mirror the persisted board
//! document, so documents written by earlier versions of the board load
//! unchanged.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::{EventType, Status};

/// A card on the board, with its full change history embedded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default, with = "form_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "form_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Newest first. Append-only: entries are never edited or removed
    /// individually; the log disappears only with the task.
    #[serde(default)]
    pub activity: Vec<ActivityEntry>,
}

/// One immutable event in a task's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    #[serde(default)]
    pub details: Vec<FieldChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Title snapshot taken when the event happened, so history stays
    /// meaningful after renames or (in the feed) deletion.
    pub task_title: String,
}

/// One (label, old, new) triple produced by diffing two task states.
/// Values are already resolved to display strings; `old_value` is absent
/// only for the synthetic initial-state change of a CREATE entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    pub new_value: String,
}

/// Fields supplied when creating a task. The store assigns anything absent.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    /// Caller-supplied id; the store generates one when `None`.
    pub id: Option<String>,
    pub title: String,
    pub details: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub department: Option<String>,
    pub category: Option<String>,
    pub status: Status,
}

/// Partial update merged over an existing task.
///
/// Outer `None` leaves the field untouched; `Some(None)` clears a clearable
/// field; `Some(Some(v))` sets it. `activity` is supplied only by the
/// activity recorder: when absent the store preserves the existing log.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub details: Option<Option<String>>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub department: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub status: Option<Status>,
    pub activity: Option<Vec<ActivityEntry>>,
}

impl TaskPatch {
    /// Patch carrying every tracked field of `task`, as an edit form that
    /// resubmits the whole card would.
    pub fn snapshot(task: &Task) -> Self {
        TaskPatch {
            title: Some(task.title.clone()),
            details: Some(task.details.clone()),
            start_date: Some(task.start_date),
            end_date: Some(task.end_date),
            department: Some(task.department.clone()),
            category: Some(task.category.clone()),
            status: Some(task.status),
            activity: None,
        }
    }

    /// True when no task field is supplied (activity replacement aside).
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.details.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.department.is_none()
            && self.category.is_none()
            && self.status.is_none()
    }
}

/// Trim free-form input; empty becomes absent.
pub fn clean_field(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Start/end dates as the board document stores them: a plain
/// `YYYY-MM-DD` string, empty when unset. Reads are lenient so a document
/// holding an unparseable date still loads (the date just comes back unset).
mod form_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, ser: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => ser.serialize_str(&d.format("%Y-%m-%d").to_string()),
            None => ser.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(de)?;
        Ok(raw
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_task() -> Task {
        Task {
            id: "t1".into(),
            title: "Fix bug".into(),
            details: None,
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            end_date: None,
            department: None,
            category: Some("bug".into()),
            status: Status::Backlog,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            activity: Vec::new(),
        }
    }

    #[test]
    fn dates_round_trip_as_plain_strings() {
        let task = sample_task();
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["startDate"], "2024-03-01");
        assert_eq!(json["endDate"], "");
        let back: Task = serde_json::from_value(json).unwrap();
        assert_eq!(back.start_date, task.start_date);
        assert_eq!(back.end_date, None);
    }

    #[test]
    fn unparseable_date_loads_as_unset() {
        let mut json = serde_json::to_value(sample_task()).unwrap();
        json["startDate"] = serde_json::Value::String("not-a-date".into());
        let back: Task = serde_json::from_value(json).unwrap();
        assert_eq!(back.start_date, None);
    }

    #[test]
    fn document_field_names_are_camel_case() {
        let json = serde_json::to_value(sample_task()).unwrap();
        let obj = json.as_object().unwrap();
        for key in ["id", "title", "details", "startDate", "endDate", "department", "category", "status", "createdAt", "updatedAt", "activity"] {
            assert!(obj.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn absent_comment_is_omitted_from_entries() {
        let entry = ActivityEntry {
            timestamp: Utc::now(),
            event_type: EventType::Create,
            details: Vec::new(),
            comment: None,
            task_title: "Fix bug".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("comment").is_none());
        assert_eq!(json["eventType"], "CREATE");
        assert_eq!(json["taskTitle"], "Fix bug");
    }

    #[test]
    fn clean_field_trims_and_drops_empty() {
        assert_eq!(clean_field("  Ops "), Some("Ops".into()));
        assert_eq!(clean_field("   "), None);
        assert_eq!(clean_field(""), None);
    }

    #[test]
    fn snapshot_patch_carries_all_tracked_fields() {
        let task = sample_task();
        let patch = TaskPatch::snapshot(&task);
        assert_eq!(patch.title.as_deref(), Some("Fix bug"));
        assert_eq!(patch.category, Some(Some("bug".into())));
        assert_eq!(patch.status, Some(Status::Backlog));
        assert!(patch.activity.is_none());
        assert!(!patch.is_empty());
        assert!(TaskPatch::default().is_empty());
    }
}
