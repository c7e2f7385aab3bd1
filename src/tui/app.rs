//! Interactive kanban board interface.
//!
//! Renders the five fixed columns side by side and lets the user walk cards
//! with the arrow keys, move them between columns with Ctrl+arrows (each move
//! lands in the activity log through the board engine), add and edit cards
//! through a popup form, filter by category, inspect a card's history, and
//! delete with confirmation.

use std::io;
use std::time::Duration;

use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::board::Board;
use crate::cmd::{describe_entry, format_date_relative, format_relative, short_id, truncate};
use crate::fields::{format_category, Status, CATEGORIES};
use crate::store::FileBackend;
use crate::task::Task;
use crate::tui::colors::{DARK_GREEN, DARK_PURPLE, DARK_RED, GOLD};
use crate::tui::form::{InputField, TaskForm, CATEGORY_FIELD, STATUS_FIELD};

const COLUMN_COUNT: usize = Status::ALL.len();

/// Main board application state.
pub struct BoardApp {
    board: Board<FileBackend>,
    tasks: Vec<Task>,
    selected_column: usize,
    selected_card: usize,
    column_scroll_offsets: [usize; COLUMN_COUNT],
    status_message: String,
    show_task_detail: bool,
    confirm_delete: bool,
    /// Open add/edit form; takes over the keyboard while present.
    form: Option<TaskForm>,
    /// Index into CATEGORIES; None shows every card.
    category_filter: Option<usize>,

    // Task ids organized into the five status columns
    columns: [Vec<String>; COLUMN_COUNT],
}

impl BoardApp {
    pub fn new(board: Board<FileBackend>) -> Self {
        let mut app = BoardApp {
            board,
            tasks: Vec::new(),
            selected_column: 0,
            selected_card: 0,
            column_scroll_offsets: [0; COLUMN_COUNT],
            status_message: String::new(),
            show_task_detail: false,
            confirm_delete: false,
            form: None,
            category_filter: None,
            columns: Default::default(),
        };
        app.refresh();
        app
    }

    /// Reload tasks from the board and rebuild the columns.
    fn refresh(&mut self) {
        self.tasks = self.board.tasks();
        for (i, column) in self.columns.iter_mut().enumerate() {
            column.clear();
            self.column_scroll_offsets[i] = 0;
        }

        let filter_id = self.category_filter.map(|i| CATEGORIES[i].id);
        for task in &self.tasks {
            if let Some(wanted) = filter_id {
                if task.category.as_deref() != Some(wanted) {
                    continue;
                }
            }
            let column_index = Status::ALL
                .iter()
                .position(|&s| s == task.status)
                .unwrap_or(0);
            self.columns[column_index].push(task.id.clone());
        }

        self.clamp_selection();
    }

    fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn selected_task_id(&self) -> Option<String> {
        self.columns[self.selected_column].get(self.selected_card).cloned()
    }

    /// Ensure selected column and card indices are valid.
    fn clamp_selection(&mut self) {
        if self.selected_column >= COLUMN_COUNT {
            self.selected_column = 0;
        }
        let column_len = self.columns[self.selected_column].len();
        if column_len == 0 {
            self.selected_card = 0;
            self.column_scroll_offsets[self.selected_column] = 0;
        } else if self.selected_card >= column_len {
            self.selected_card = column_len - 1;
        }
    }

    fn set_status_message(&mut self, msg: String) {
        self.status_message = msg;
    }

    fn clear_status_message(&mut self) {
        self.status_message.clear();
    }

    /// Move the selected card one column left or right, recording the move.
    fn move_card(&mut self, forward: bool) {
        let Some(task_id) = self.selected_task_id() else {
            return;
        };
        let target_column = if forward {
            if self.selected_column + 1 >= COLUMN_COUNT {
                return;
            }
            self.selected_column + 1
        } else {
            if self.selected_column == 0 {
                return;
            }
            self.selected_column - 1
        };

        let target = Status::ALL[target_column];
        match self.board.move_to(&task_id, target, None) {
            Some(moved) => {
                self.refresh();
                self.selected_column = target_column;
                if let Some(position) = self.columns[target_column].iter().position(|id| *id == task_id) {
                    self.selected_card = position;
                } else {
                    self.clamp_selection();
                }
                self.set_status_message(format!("Moved '{}' to {}", truncate(&moved.title, 30), target.title()));
            }
            None => self.set_status_message("Task disappeared while moving".to_string()),
        }
    }

    /// Delete the selected card once confirmed.
    fn delete_selected(&mut self) {
        let Some(task_id) = self.selected_task_id() else {
            self.confirm_delete = false;
            return;
        };
        let title = self.task(&task_id).map(|t| t.title.clone()).unwrap_or_default();
        if self.board.remove(&task_id) {
            self.set_status_message(format!("Deleted '{}'", truncate(&title, 40)));
        } else {
            self.set_status_message("Error saving the board".to_string());
        }
        self.confirm_delete = false;
        self.refresh();
    }

    /// Keyboard handling while the card form is open.
    fn handle_form_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.form = None;
                self.set_status_message("Form closed".to_string());
            }
            KeyCode::Enter => self.submit_form(),
            code => {
                if let Some(form) = &mut self.form {
                    match code {
                        KeyCode::Tab | KeyCode::Down => form.next_field(),
                        KeyCode::BackTab | KeyCode::Up => form.prev_field(),
                        KeyCode::Left => form.handle_left_right(false),
                        KeyCode::Right => form.handle_left_right(true),
                        KeyCode::Backspace => form.handle_backspace(),
                        KeyCode::Delete => form.handle_delete(),
                        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                            form.handle_char(c)
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    /// Persist the open form through the board engine. A rejected form stays
    /// open with the reason in the status bar.
    fn submit_form(&mut self) {
        let Some(form) = self.form.take() else {
            return;
        };
        let outcome = match &form.editing {
            Some(id) => form.to_patch().map(|patch| match self.board.edit(id, patch, None) {
                Some(task) => format!("Updated '{}'", truncate(&task.title, 40)),
                None => "Task disappeared while editing".to_string(),
            }),
            None => form.to_draft().map(|draft| {
                let task = self.board.create(draft, None);
                format!("Added '{}'", truncate(&task.title, 40))
            }),
        };
        match outcome {
            Ok(message) => {
                self.set_status_message(message);
                self.refresh();
            }
            Err(message) => {
                self.set_status_message(message);
                self.form = Some(form);
            }
        }
    }

    /// Cycle the category filter: all -> bug -> feature -> design -> documentation -> all.
    fn cycle_category_filter(&mut self) {
        self.category_filter = match self.category_filter {
            None => Some(0),
            Some(i) if i + 1 < CATEGORIES.len() => Some(i + 1),
            Some(_) => None,
        };
        self.refresh();
        let label = self.category_filter.map(|i| CATEGORIES[i].name).unwrap_or("all categories");
        self.set_status_message(format!("Showing {label}"));
    }

    /// Handle keyboard input. Returns true when the app should exit.
    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                // Delete confirmation takes over the keyboard
                if self.confirm_delete {
                    match key.code {
                        KeyCode::Char('y') | KeyCode::Char('Y') => self.delete_selected(),
                        _ => {
                            self.confirm_delete = false;
                            self.set_status_message("Delete cancelled".to_string());
                        }
                    }
                    return Ok(false);
                }

                if self.show_task_detail {
                    match key.code {
                        KeyCode::Enter | KeyCode::Esc => self.show_task_detail = false,
                        _ => {}
                    }
                    return Ok(false);
                }

                if self.form.is_some() {
                    self.handle_form_input(key);
                    return Ok(false);
                }

                self.clear_status_message();

                match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(true),
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(true),

                    KeyCode::Enter => {
                        if self.selected_task_id().is_some() {
                            self.show_task_detail = true;
                        }
                    }

                    // Card movement between columns (check first, before navigation)
                    KeyCode::Left if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        self.move_card(false);
                    }
                    KeyCode::Right if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        self.move_card(true);
                    }

                    KeyCode::Left => {
                        if self.selected_column > 0 {
                            self.selected_column -= 1;
                            self.clamp_selection();
                        }
                    }
                    KeyCode::Right => {
                        if self.selected_column + 1 < COLUMN_COUNT {
                            self.selected_column += 1;
                            self.clamp_selection();
                        }
                    }
                    KeyCode::Up => {
                        if self.selected_card > 0 {
                            self.selected_card -= 1;
                        }
                    }
                    KeyCode::Down => {
                        let column_len = self.columns[self.selected_column].len();
                        if column_len > 0 && self.selected_card < column_len - 1 {
                            self.selected_card += 1;
                        }
                    }

                    KeyCode::Char('a') => {
                        self.form = Some(TaskForm::new());
                    }
                    KeyCode::Char('e') => {
                        let form = self
                            .selected_task_id()
                            .and_then(|id| self.task(&id).map(TaskForm::from_task));
                        if let Some(form) = form {
                            self.form = Some(form);
                        }
                    }

                    KeyCode::Char('d') => {
                        if self.selected_task_id().is_some() {
                            self.confirm_delete = true;
                        }
                    }

                    KeyCode::Char('f') => {
                        self.cycle_category_filter();
                    }

                    KeyCode::Char('h') => {
                        self.set_status_message(
                            "Help: Enter: Details | a: Add | e: Edit | Ctrl+Left/Right: Move card | d: Delete | f: Filter category | q: Quit".to_string(),
                        );
                    }

                    _ => {}
                }
            }
        }
        Ok(false)
    }

    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Board
                Constraint::Length(1), // Status bar
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        self.render_board(f, chunks[1]);
        self.render_status_bar(f, chunks[2]);

        if self.show_task_detail {
            self.render_task_detail_popup(f);
        }
        if let Some(form) = &self.form {
            render_form_popup(f, form);
        }
        if self.confirm_delete {
            self.render_confirm_popup(f);
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let filter_display = match self.category_filter {
            Some(i) => format!("Filter: {}", CATEGORIES[i].name),
            None => "All categories".to_string(),
        };
        let header_text = vec![Line::from(vec![
            Span::styled("KANBAN BOARD", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(filter_display, Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC)),
        ])];

        let header_block = Paragraph::new(header_text)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header_block, area);
    }

    fn render_board(&mut self, f: &mut Frame, area: Rect) {
        let constraints: Vec<Constraint> = (0..COLUMN_COUNT)
            .map(|_| Constraint::Percentage(100 / COLUMN_COUNT as u16))
            .collect();

        let columns_layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(area);

        for (i, &column_area) in columns_layout.iter().enumerate() {
            self.render_column(f, column_area, i);
        }
    }

    fn render_column(&mut self, f: &mut Frame, area: Rect, column_index: usize) {
        let is_selected = column_index == self.selected_column;
        let title = format!(
            "{} ({})",
            Status::ALL[column_index].title(),
            self.columns[column_index].len()
        );

        let border_style = if is_selected {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(border_style);

        let inner = block.inner(area);
        f.render_widget(block, area);

        let cards = &self.columns[column_index];
        if cards.is_empty() {
            return;
        }

        let card_height = 5;
        let available_height = inner.height as usize;
        let visible_cards = available_height / card_height;

        let scroll_offset = if is_selected {
            let start_visible = self.column_scroll_offsets[column_index];
            let end_visible = start_visible + visible_cards;

            if self.selected_card < start_visible {
                self.column_scroll_offsets[column_index] = self.selected_card;
                self.selected_card
            } else if self.selected_card >= end_visible && end_visible > 0 {
                let new_offset = self.selected_card - visible_cards + 1;
                self.column_scroll_offsets[column_index] = new_offset;
                new_offset
            } else {
                start_visible
            }
        } else {
            self.column_scroll_offsets[column_index]
        };

        let mut current_y = 0;
        let mut rendered_cards = 0;
        let card_ids: Vec<String> = cards.iter().skip(scroll_offset).cloned().collect();

        for (offset, task_id) in card_ids.iter().enumerate() {
            let card_index = scroll_offset + offset;
            if let Some(task) = self.task(task_id) {
                if current_y + card_height > available_height {
                    break;
                }

                let is_this_card_selected = is_selected && card_index == self.selected_card;
                let card_area = Rect {
                    x: inner.x,
                    y: inner.y + current_y as u16,
                    width: inner.width,
                    height: card_height as u16,
                };

                render_card(f, card_area, task, is_this_card_selected);
                current_y += card_height;
                rendered_cards += 1;
            }
        }

        if scroll_offset > 0 {
            let indicator = Paragraph::new(format!("▲ +{scroll_offset} above"))
                .style(Style::default().fg(Color::Cyan));
            f.render_widget(indicator, Rect { x: inner.x, y: inner.y, width: inner.width, height: 1 });
        }

        let remaining = cards.len() - scroll_offset - rendered_cards;
        if remaining > 0 {
            let indicator = Paragraph::new(format!("▼ +{remaining} below"))
                .style(Style::default().fg(Color::Cyan));
            f.render_widget(
                indicator,
                Rect { x: inner.x, y: inner.y + inner.height - 1, width: inner.width, height: 1 },
            );
        }
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let status_text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            let total_tasks: usize = self.columns.iter().map(|col| col.len()).sum();
            format!(
                "Tasks: {total_tasks} | Enter: Details | a: Add | e: Edit | Ctrl+←/→: Move | d: Delete | f: Filter | h: Help | q: Quit"
            )
        };

        let status = Paragraph::new(status_text)
            .style(Style::default().bg(Color::DarkGray).fg(Color::White))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    fn render_confirm_popup(&self, f: &mut Frame) {
        let Some(task_id) = self.selected_task_id() else {
            return;
        };
        let Some(task) = self.task(&task_id) else {
            return;
        };

        let popup_area = centered_rect(f.area(), 60, 20);
        f.render_widget(Clear, popup_area);

        let lines = vec![
            Line::from(Span::styled(
                format!("Delete '{}'?", truncate(&task.title, 40)),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("The task and its entire history will be removed."),
            Line::from("This cannot be undone."),
            Line::from(""),
            Line::from("y: Delete    any other key: Cancel"),
        ];

        let popup = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Confirm delete")
                    .title_alignment(Alignment::Center)
                    .border_style(Style::default().fg(DARK_RED).add_modifier(Modifier::BOLD)),
            )
            .wrap(Wrap { trim: true })
            .style(Style::default().bg(Color::Black));
        f.render_widget(popup, popup_area);
    }

    fn render_task_detail_popup(&self, f: &mut Frame) {
        let Some(task_id) = self.selected_task_id() else {
            return;
        };
        let Some(task) = self.task(&task_id) else {
            return;
        };

        let popup_area = centered_rect(f.area(), 80, 80);
        f.render_widget(Clear, popup_area);

        let today = Local::now().date_naive();
        let mut detail_lines = vec![
            Line::from(vec![Span::styled(
                format!("Task {}: {}", short_id(&task.id), task.title),
                Style::default().add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from(format!("Column:      {}", task.status.title())),
            Line::from(format!("Category:    {}", format_category(task.category.as_deref()))),
            Line::from(format!("Department:  {}", task.department.as_deref().unwrap_or("-"))),
            Line::from(format!("Start:       {}", task.start_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()))),
            Line::from(format!("End:         {}", format_date_relative(task.end_date, today))),
            Line::from(""),
            Line::from("Details:"),
            Line::from(task.details.as_deref().unwrap_or("-").to_string()),
            Line::from(""),
            Line::from(Span::styled("History:", Style::default().add_modifier(Modifier::BOLD))),
        ];

        match self.board.log(&task.id) {
            Some(log) if !log.is_empty() => {
                for entry in &log {
                    let mut line = format!("  {:>12}  {}", format_relative(entry.timestamp), describe_entry(entry));
                    if let Some(comment) = &entry.comment {
                        line.push_str(&format!("  \"{comment}\""));
                    }
                    detail_lines.push(Line::from(line));
                }
            }
            _ => detail_lines.push(Line::from("  (no activity)")),
        }

        let popup = Paragraph::new(detail_lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Task Details (Enter to close)")
                    .title_alignment(Alignment::Center)
                    .border_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            )
            .wrap(Wrap { trim: true })
            .style(Style::default().bg(Color::Black));
        f.render_widget(popup, popup_area);
    }

    /// Main event loop.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;
            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}

/// Render the add/edit form popup over the board.
fn render_form_popup(f: &mut Frame, form: &TaskForm) {
    let popup_area = centered_rect(f.area(), 60, 50);
    f.render_widget(Clear, popup_area);

    let title = if form.editing.is_some() { "Edit task" } else { "New task" };
    let lines = vec![
        text_field_line("Title", &form.title),
        text_field_line("Details", &form.details),
        text_field_line("Department", &form.department),
        text_field_line("Start", &form.start),
        text_field_line("End", &form.end),
        selector_line("Category", form.category_label(), form.current_field == CATEGORY_FIELD),
        selector_line("Column", form.selected_status().title(), form.current_field == STATUS_FIELD),
        Line::from(""),
        Line::from("Dates: YYYY-MM-DD, today, tomorrow, in 3d, in 2w; empty clears."),
        Line::from("Tab/↓: Next | ←/→: Cursor or cycle | Enter: Save | Esc: Cancel"),
    ];

    let popup = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .title_alignment(Alignment::Center)
                .border_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        )
        .wrap(Wrap { trim: false })
        .style(Style::default().bg(Color::Black));
    f.render_widget(popup, popup_area);
}

/// One labeled text field. The active field shows its cursor.
fn text_field_line(label: &str, field: &InputField) -> Line<'static> {
    let label_span = Span::styled(
        format!("{label:<12}"),
        Style::default().add_modifier(Modifier::BOLD),
    );
    if field.active {
        let (before, after) = field.value.split_at(field.cursor);
        Line::from(vec![
            label_span,
            Span::styled(before.to_string(), Style::default().fg(Color::Cyan)),
            Span::styled("▏", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(after.to_string(), Style::default().fg(Color::Cyan)),
        ])
    } else {
        Line::from(vec![label_span, Span::raw(field.value.clone())])
    }
}

/// One labeled cycling selector.
fn selector_line(label: &str, value: &str, active: bool) -> Line<'static> {
    let label_span = Span::styled(
        format!("{label:<12}"),
        Style::default().add_modifier(Modifier::BOLD),
    );
    let value_span = if active {
        Span::styled(
            format!("◀ {value} ▶"),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::raw(value.to_string())
    };
    Line::from(vec![label_span, value_span])
}

/// Render a single task card with its category accent.
fn render_card(f: &mut Frame, area: Rect, task: &Task, is_selected: bool) {
    let accent = category_color(task.category.as_deref());
    let style = if is_selected {
        Style::default().bg(accent).fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().bg(Color::DarkGray)
    };

    let available_width = area.width.saturating_sub(2) as usize;
    let mut card_text = Vec::new();

    // Up to two wrapped lines of title
    let mut current_line = String::new();
    let mut lines = Vec::new();
    for word in task.title.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= available_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line.clone());
            current_line = word.to_string();
            if lines.len() >= 2 {
                break;
            }
        }
    }
    if !current_line.is_empty() && lines.len() < 2 {
        lines.push(current_line);
    }
    for line in lines {
        card_text.push(Line::from(line));
    }

    let today = Local::now().date_naive();
    card_text.push(Line::from(format!(
        "{} | {}",
        format_category(task.category.as_deref()),
        task.department.as_deref().unwrap_or("-")
    )));
    card_text.push(Line::from(format_date_relative(task.end_date, today)));

    let card = Paragraph::new(card_text)
        .block(Block::default().borders(Borders::ALL))
        .style(style)
        .wrap(Wrap { trim: true });
    f.render_widget(card, area);
}

fn category_color(id: Option<&str>) -> Color {
    match id {
        Some("bug") => DARK_RED,
        Some("feature") => DARK_GREEN,
        Some("design") => DARK_PURPLE,
        Some("documentation") => GOLD,
        _ => Color::Blue,
    }
}

/// Centered popup area as a percentage of the full frame.
fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let popup_width = (area.width * percent_x) / 100;
    let popup_height = (area.height * percent_y) / 100;
    let x = (area.width.saturating_sub(popup_width)) / 2;
    let y = (area.height.saturating_sub(popup_height)) / 2;
    Rect::new(x, y, popup_width, popup_height)
}
