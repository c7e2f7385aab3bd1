//! Enumerations and fixed board configuration.
//!
//! This module defines the workflow columns a task can occupy, the activity
//! event kinds, and the static column/category tables the presentation layer
//! enumerates. None of this is runtime state.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Workflow column a task currently occupies.
///
/// Serialized identifiers match the persisted document exactly
/// (`backlog`, `inProgress`, `error`, `completed`, `na`).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    #[default]
    Backlog,
    InProgress,
    Error,
    Completed,
    Na,
}

impl Status {
    /// All columns in board order.
    pub const ALL: [Status; 5] = [
        Status::Backlog,
        Status::InProgress,
        Status::Error,
        Status::Completed,
        Status::Na,
    ];

    /// Display title of the column.
    pub fn title(self) -> &'static str {
        match self {
            Status::Backlog => "Tareas / Por Hacer",
            Status::InProgress => "En Progreso",
            Status::Error => "Error / Bloqueado",
            Status::Completed => "Completado",
            Status::Na => "No Aplica",
        }
    }

    /// Stable identifier as stored in the document.
    pub fn id(self) -> &'static str {
        match self {
            Status::Backlog => "backlog",
            Status::InProgress => "inProgress",
            Status::Error => "error",
            Status::Completed => "completed",
            Status::Na => "na",
        }
    }
}

/// Kind of event an activity entry records.
///
/// `Other` absorbs unknown identifiers from documents written by newer
/// versions; such entries still render with a generic description.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Create,
    Move,
    Update,
    #[serde(other)]
    Other,
}

/// A fixed task category with its display name and visual class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
    pub class: &'static str,
}

/// Categories a task may be tagged with. Static configuration.
pub const CATEGORIES: [Category; 4] = [
    Category { id: "bug", name: "Bug", class: "bug" },
    Category { id: "feature", name: "New Feature", class: "feature" },
    Category { id: "design", name: "Design", class: "design" },
    Category { id: "documentation", name: "Documentation", class: "documentation" },
];

/// Look up a category by its stable id.
pub fn find_category(id: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.id == id)
}

/// Display name for an optional category id ("General" when unset or unknown).
pub fn format_category(id: Option<&str>) -> &'static str {
    id.and_then(find_category).map(|c| c.name).unwrap_or("General")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_to_document_identifiers() {
        for status in Status::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.id()));
        }
    }

    #[test]
    fn unknown_event_type_maps_to_other() {
        let parsed: EventType = serde_json::from_str("\"ARCHIVE\"").unwrap();
        assert_eq!(parsed, EventType::Other);
        let parsed: EventType = serde_json::from_str("\"MOVE\"").unwrap();
        assert_eq!(parsed, EventType::Move);
    }

    #[test]
    fn category_lookup() {
        assert_eq!(find_category("bug").unwrap().name, "Bug");
        assert!(find_category("chore").is_none());
        assert_eq!(format_category(None), "General");
        assert_eq!(format_category(Some("feature")), "New Feature");
    }
}
