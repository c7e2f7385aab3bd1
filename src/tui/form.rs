//! Card form for the board view.
//!
//! One popup form serves both creating and editing: free-text fields plus
//! two cycling selectors for category and column. Submitting hands the
//! board engine a draft (create) or a whole-card patch (edit), so what gets
//! logged is still the engine's call.

use chrono::NaiveDate;

use crate::cmd::parse_date_input;
use crate::fields::{Status, CATEGORIES};
use crate::task::{clean_field, Task, TaskDraft, TaskPatch};

/// Order constants for the form's fields.
pub const TITLE_FIELD: usize = 0;
pub const DETAILS_FIELD: usize = 1;
pub const DEPARTMENT_FIELD: usize = 2;
pub const START_FIELD: usize = 3;
pub const END_FIELD: usize = 4;
pub const CATEGORY_FIELD: usize = 5;
pub const STATUS_FIELD: usize = 6;
const FIELD_COUNT: usize = 7;

/// A text input field with cursor position and active state.
#[derive(Clone, Default)]
pub struct InputField {
    pub value: String,
    pub cursor: usize,
    pub active: bool,
}

impl InputField {
    pub fn with_value(value: &str) -> Self {
        InputField {
            value: value.to_string(),
            cursor: value.len(),
            active: false,
        }
    }

    pub fn handle_char(&mut self, c: char) {
        self.value.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn handle_backspace(&mut self) {
        if self.cursor > 0 {
            let prev = self.value[..self.cursor]
                .chars()
                .next_back()
                .map(char::len_utf8)
                .unwrap_or(1);
            self.cursor -= prev;
            self.value.remove(self.cursor);
        }
    }

    pub fn handle_delete(&mut self) {
        if self.cursor < self.value.len() {
            self.value.remove(self.cursor);
        }
    }

    pub fn move_cursor_left(&mut self) {
        if self.cursor > 0 {
            self.cursor -= self.value[..self.cursor]
                .chars()
                .next_back()
                .map(char::len_utf8)
                .unwrap_or(1);
        }
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor < self.value.len() {
            self.cursor += self.value[self.cursor..]
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(1);
        }
    }
}

/// Form state for one card.
pub struct TaskForm {
    pub title: InputField,
    pub details: InputField,
    pub department: InputField,
    pub start: InputField,
    pub end: InputField,
    /// 0 means no category, then 1-based into [`CATEGORIES`].
    pub category: usize,
    /// Index into [`Status::ALL`].
    pub status: usize,
    pub current_field: usize,
    /// Id of the task being edited; `None` while creating.
    pub editing: Option<String>,
}

impl TaskForm {
    /// Blank form for a new card, landing in the backlog by default.
    pub fn new() -> Self {
        let mut form = TaskForm {
            title: InputField::default(),
            details: InputField::default(),
            department: InputField::default(),
            start: InputField::default(),
            end: InputField::default(),
            category: 0,
            status: 0,
            current_field: TITLE_FIELD,
            editing: None,
        };
        form.update_active_field();
        form
    }

    /// Form pre-filled from an existing card.
    pub fn from_task(task: &Task) -> Self {
        let mut form = TaskForm::new();
        form.title = InputField::with_value(&task.title);
        form.details = InputField::with_value(task.details.as_deref().unwrap_or(""));
        form.department = InputField::with_value(task.department.as_deref().unwrap_or(""));
        form.start = InputField::with_value(&date_text(task.start_date));
        form.end = InputField::with_value(&date_text(task.end_date));
        form.category = task
            .category
            .as_deref()
            .and_then(|id| CATEGORIES.iter().position(|c| c.id == id))
            .map(|i| i + 1)
            .unwrap_or(0);
        form.status = Status::ALL.iter().position(|&s| s == task.status).unwrap_or(0);
        form.editing = Some(task.id.clone());
        form.update_active_field();
        form
    }

    pub fn next_field(&mut self) {
        self.current_field = (self.current_field + 1) % FIELD_COUNT;
        self.update_active_field();
    }

    pub fn prev_field(&mut self) {
        self.current_field = if self.current_field == 0 {
            FIELD_COUNT - 1
        } else {
            self.current_field - 1
        };
        self.update_active_field();
    }

    fn update_active_field(&mut self) {
        for field in [
            &mut self.title,
            &mut self.details,
            &mut self.department,
            &mut self.start,
            &mut self.end,
        ] {
            field.active = false;
        }
        if let Some(field) = self.active_input() {
            field.active = true;
        }
    }

    /// The text field the cursor sits in, `None` on a selector.
    fn active_input(&mut self) -> Option<&mut InputField> {
        match self.current_field {
            TITLE_FIELD => Some(&mut self.title),
            DETAILS_FIELD => Some(&mut self.details),
            DEPARTMENT_FIELD => Some(&mut self.department),
            START_FIELD => Some(&mut self.start),
            END_FIELD => Some(&mut self.end),
            _ => None,
        }
    }

    pub fn handle_char(&mut self, c: char) {
        if let Some(field) = self.active_input() {
            field.handle_char(c);
        }
    }

    pub fn handle_backspace(&mut self) {
        if let Some(field) = self.active_input() {
            field.handle_backspace();
        }
    }

    pub fn handle_delete(&mut self) {
        if let Some(field) = self.active_input() {
            field.handle_delete();
        }
    }

    /// Left/right: cursor movement in a text field, cycling on a selector.
    pub fn handle_left_right(&mut self, right: bool) {
        match self.current_field {
            CATEGORY_FIELD => {
                let options = CATEGORIES.len() + 1;
                self.category = if right {
                    (self.category + 1) % options
                } else if self.category == 0 {
                    options - 1
                } else {
                    self.category - 1
                };
            }
            STATUS_FIELD => {
                let options = Status::ALL.len();
                self.status = if right {
                    (self.status + 1) % options
                } else if self.status == 0 {
                    options - 1
                } else {
                    self.status - 1
                };
            }
            _ => {
                if let Some(field) = self.active_input() {
                    if right {
                        field.move_cursor_right();
                    } else {
                        field.move_cursor_left();
                    }
                }
            }
        }
    }

    pub fn selected_category(&self) -> Option<&'static str> {
        self.category.checked_sub(1).map(|i| CATEGORIES[i].id)
    }

    pub fn category_label(&self) -> &'static str {
        match self.category.checked_sub(1) {
            Some(i) => CATEGORIES[i].name,
            None => "General",
        }
    }

    pub fn selected_status(&self) -> Status {
        Status::ALL[self.status]
    }

    /// Draft for a new card. Fails with a status-bar message on a blank
    /// title or an unreadable date.
    pub fn to_draft(&self) -> Result<TaskDraft, String> {
        Ok(TaskDraft {
            id: None,
            title: self.cleaned_title()?,
            details: clean_field(&self.details.value),
            start_date: parse_form_date(&self.start.value, "start")?,
            end_date: parse_form_date(&self.end.value, "end")?,
            department: clean_field(&self.department.value),
            category: self.selected_category().map(str::to_string),
            status: self.selected_status(),
        })
    }

    /// Whole-card patch, as submitting the form resubmits every field.
    /// Unchanged values are the engine's problem, not the form's.
    pub fn to_patch(&self) -> Result<TaskPatch, String> {
        Ok(TaskPatch {
            title: Some(self.cleaned_title()?),
            details: Some(clean_field(&self.details.value)),
            start_date: Some(parse_form_date(&self.start.value, "start")?),
            end_date: Some(parse_form_date(&self.end.value, "end")?),
            department: Some(clean_field(&self.department.value)),
            category: Some(self.selected_category().map(str::to_string)),
            status: Some(self.selected_status()),
            activity: None,
        })
    }

    fn cleaned_title(&self) -> Result<String, String> {
        clean_field(&self.title.value).ok_or_else(|| "Title cannot be empty".to_string())
    }
}

fn date_text(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

/// Empty means unset; anything else must parse as a date expression.
fn parse_form_date(raw: &str, label: &str) -> Result<Option<NaiveDate>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match parse_date_input(raw) {
        Some(date) => Ok(Some(date)),
        None => Err(format!("Unrecognized {label} date '{raw}'")),
    }
}
