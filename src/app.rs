use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{Local, NaiveDate};
use tracing::{debug, warn};
use tuirealm::event::{Key, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use tuirealm::ratatui::layout::Rect;

use crate::api::{ApiClient, ApiError};
use crate::settings::Settings;
use crate::theme::{Theme, ThemePreset};
use crate::types::{Priority, Stats, Task, TaskPayload, TaskStatus};

pub const COLUMN_COUNT: usize = TaskStatus::ALL.len();

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TaskFormField {
    Title,
    Description,
    Priority,
    DueDate,
    Save,
    Cancel,
}

impl TaskFormField {
    const ORDER: [Self; 6] = [
        Self::Title,
        Self::Description,
        Self::Priority,
        Self::DueDate,
        Self::Save,
        Self::Cancel,
    ];

    fn next(self) -> Self {
        let idx = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(idx + 1) % Self::ORDER.len()]
    }

    fn previous(self) -> Self {
        let idx = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(idx + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

/// State of the single reusable create/edit form. The task being edited is
/// carried here explicitly; `None` means create mode.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TaskFormState {
    pub editing: Option<Task>,
    pub title_input: String,
    pub description_input: String,
    pub priority: Priority,
    pub due_date_input: String,
    pub focused_field: TaskFormField,
    pub error_message: Option<String>,
    pub submitting: bool,
}

impl TaskFormState {
    pub fn create() -> Self {
        Self {
            editing: None,
            title_input: String::new(),
            description_input: String::new(),
            priority: Priority::Medium,
            due_date_input: String::new(),
            focused_field: TaskFormField::Title,
            error_message: None,
            submitting: false,
        }
    }

    pub fn edit(task: Task) -> Self {
        Self {
            title_input: task.title.clone(),
            description_input: task.description.clone().unwrap_or_default(),
            priority: task.priority,
            due_date_input: task.due_date.map(|d| d.to_string()).unwrap_or_default(),
            editing: Some(task),
            focused_field: TaskFormField::Title,
            error_message: None,
            submitting: false,
        }
    }

    fn focused_input_mut(&mut self) -> Option<&mut String> {
        match self.focused_field {
            TaskFormField::Title => Some(&mut self.title_input),
            TaskFormField::Description => Some(&mut self.description_input),
            TaskFormField::DueDate => Some(&mut self.due_date_input),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DeleteTaskField {
    Delete,
    Cancel,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeleteTaskDialogState {
    pub task_id: i64,
    pub task_title: String,
    pub focused_field: DeleteTaskField,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ActiveDialog {
    None,
    TaskForm(TaskFormState),
    DeleteTask(DeleteTaskDialogState),
    Help,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Message {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Tick,
    Resize(u16, u16),
    NavigateLeft,
    NavigateRight,
    SelectUp,
    SelectDown,
    FocusColumn(usize),
    SelectTask(usize, usize),
    OpenNewTaskDialog,
    OpenEditTaskDialog,
    OpenDeleteTaskDialog,
    OpenHelp,
    MoveTaskLeft,
    MoveTaskRight,
    SubmitTaskForm,
    ConfirmDeleteTask,
    DismissDialog,
    Refresh,
    Quit,
}

/// Completed API call results, delivered from worker threads to the event
/// loop. Arrival order follows the network, not the issue order.
#[derive(Debug)]
pub enum ApiEvent {
    TasksLoaded(Result<Vec<Task>, ApiError>),
    TaskFetched(Result<Task, ApiError>),
    TaskSaved {
        created: bool,
        result: Result<(), ApiError>,
    },
    TaskDeleted(Result<(), ApiError>),
    StatusUpdated {
        task_id: i64,
        result: Result<(), ApiError>,
    },
    StatsLoaded(Result<Stats, ApiError>),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub text: String,
    pub kind: ToastKind,
    shown_at: Instant,
}

pub struct App {
    should_quit: bool,
    pub viewport: (u16, u16),
    pub theme: Theme,
    pub tasks: Vec<Task>,
    pub stats: Option<Stats>,
    pub loading: bool,
    pub focused_column: usize,
    pub selected_task_per_column: HashMap<usize, usize>,
    pub scroll_offset_per_column: HashMap<usize, usize>,
    pub active_dialog: ActiveDialog,
    pub toast: Option<Toast>,
    pub hit_test_map: Vec<(Rect, Message)>,
    api: ApiClient,
    events_tx: Sender<ApiEvent>,
    events_rx: Receiver<ApiEvent>,
    toast_duration: Duration,
    in_flight: usize,
}

impl App {
    pub fn new(api: ApiClient, settings: &Settings) -> Self {
        Self::new_with_theme(api, settings, None)
    }

    pub fn new_with_theme(
        api: ApiClient,
        settings: &Settings,
        theme_override: Option<ThemePreset>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let preset = theme_override.unwrap_or_else(|| settings.theme_preset());

        Self {
            should_quit: false,
            viewport: (80, 24),
            theme: Theme::from_preset(preset),
            tasks: Vec::new(),
            stats: None,
            loading: false,
            focused_column: 0,
            selected_task_per_column: HashMap::new(),
            scroll_offset_per_column: HashMap::new(),
            active_dialog: ActiveDialog::None,
            toast: None,
            hit_test_map: Vec::new(),
            api,
            events_tx,
            events_rx,
            toast_duration: Duration::from_millis(settings.toast_duration_ms),
            in_flight: 0,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Kick off the page-load sequence: fetch tasks, then stats.
    pub fn request_initial_load(&mut self) {
        self.load_tasks();
        self.refresh_stats();
    }

    pub fn update(&mut self, message: Message) -> Result<()> {
        match message {
            Message::Key(key) => self.handle_key(key)?,
            Message::Mouse(mouse) => self.handle_mouse(mouse)?,
            Message::Tick => {
                self.drain_api_events();
                self.expire_toast();
            }
            Message::Resize(w, h) => self.viewport = (w, h),
            Message::NavigateLeft => {
                self.focused_column = self.focused_column.saturating_sub(1);
            }
            Message::NavigateRight => {
                self.focused_column = (self.focused_column + 1).min(COLUMN_COUNT - 1);
            }
            Message::SelectUp => self.move_selection(-1),
            Message::SelectDown => self.move_selection(1),
            Message::FocusColumn(column) => {
                self.focused_column = column.min(COLUMN_COUNT - 1);
            }
            Message::SelectTask(column, index) => {
                self.focused_column = column.min(COLUMN_COUNT - 1);
                self.selected_task_per_column.insert(self.focused_column, index);
                self.clamp_selection();
            }
            Message::OpenNewTaskDialog => {
                self.active_dialog = ActiveDialog::TaskForm(TaskFormState::create());
            }
            Message::OpenEditTaskDialog => self.open_edit_dialog(),
            Message::OpenDeleteTaskDialog => self.open_delete_dialog(),
            Message::OpenHelp => self.active_dialog = ActiveDialog::Help,
            Message::MoveTaskLeft => self.move_selected_task(true),
            Message::MoveTaskRight => self.move_selected_task(false),
            Message::SubmitTaskForm => self.submit_task_form(),
            Message::ConfirmDeleteTask => self.confirm_delete_task(),
            Message::DismissDialog => self.active_dialog = ActiveDialog::None,
            Message::Refresh => {
                self.load_tasks();
                self.refresh_stats();
            }
            Message::Quit => self.should_quit = true,
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.active_dialog != ActiveDialog::None {
            return self.handle_dialog_key(key);
        }

        if key.code == Key::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return self.update(Message::Quit);
        }

        match key.code {
            Key::Char('q') => self.update(Message::Quit),
            Key::Char('n') => self.update(Message::OpenNewTaskDialog),
            Key::Char('e') | Key::Enter => self.update(Message::OpenEditTaskDialog),
            Key::Char('d') | Key::Delete => self.update(Message::OpenDeleteTaskDialog),
            Key::Char('r') => self.update(Message::Refresh),
            Key::Char('?') => self.update(Message::OpenHelp),
            Key::Char('h') | Key::Left => self.update(Message::NavigateLeft),
            Key::Char('l') | Key::Right => self.update(Message::NavigateRight),
            Key::Char('j') | Key::Down => self.update(Message::SelectDown),
            Key::Char('k') | Key::Up => self.update(Message::SelectUp),
            Key::Char('H') => self.update(Message::MoveTaskLeft),
            Key::Char('L') => self.update(Message::MoveTaskRight),
            _ => Ok(()),
        }
    }

    fn handle_dialog_key(&mut self, key: KeyEvent) -> Result<()> {
        match &self.active_dialog {
            ActiveDialog::TaskForm(_) => self.handle_task_form_key(key),
            ActiveDialog::DeleteTask(_) => self.handle_delete_dialog_key(key),
            ActiveDialog::Help => {
                if matches!(key.code, Key::Esc | Key::Enter | Key::Char('?') | Key::Char('q')) {
                    self.active_dialog = ActiveDialog::None;
                }
                Ok(())
            }
            ActiveDialog::None => Ok(()),
        }
    }

    fn handle_task_form_key(&mut self, key: KeyEvent) -> Result<()> {
        let mut submit = false;
        let mut dismiss = false;

        if let ActiveDialog::TaskForm(state) = &mut self.active_dialog {
            match key.code {
                Key::Esc => dismiss = true,
                Key::Tab | Key::Down => state.focused_field = state.focused_field.next(),
                Key::BackTab | Key::Up => state.focused_field = state.focused_field.previous(),
                Key::Enter => {
                    if state.focused_field == TaskFormField::Cancel {
                        dismiss = true;
                    } else {
                        submit = true;
                    }
                }
                Key::Left if state.focused_field == TaskFormField::Priority => {
                    state.priority = state.priority.previous();
                }
                Key::Right if state.focused_field == TaskFormField::Priority => {
                    state.priority = state.priority.next();
                }
                Key::Backspace => {
                    if let Some(input) = state.focused_input_mut() {
                        input.pop();
                    }
                }
                Key::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    if state.focused_field == TaskFormField::Priority {
                        if ch == ' ' {
                            state.priority = state.priority.next();
                        }
                    } else if let Some(input) = state.focused_input_mut() {
                        input.push(ch);
                    }
                }
                _ => {}
            }
        }

        if dismiss {
            self.active_dialog = ActiveDialog::None;
        }
        if submit {
            self.submit_task_form();
        }
        Ok(())
    }

    fn handle_delete_dialog_key(&mut self, key: KeyEvent) -> Result<()> {
        let mut confirm = false;
        let mut dismiss = false;

        if let ActiveDialog::DeleteTask(state) = &mut self.active_dialog {
            match key.code {
                Key::Esc | Key::Char('n') => dismiss = true,
                Key::Char('y') => confirm = true,
                Key::Left | Key::Right | Key::Tab | Key::BackTab => {
                    state.focused_field = match state.focused_field {
                        DeleteTaskField::Delete => DeleteTaskField::Cancel,
                        DeleteTaskField::Cancel => DeleteTaskField::Delete,
                    };
                }
                Key::Enter => {
                    if state.focused_field == DeleteTaskField::Delete {
                        confirm = true;
                    } else {
                        dismiss = true;
                    }
                }
                _ => {}
            }
        }

        // Declining leaves everything untouched; no call is issued.
        if dismiss {
            self.active_dialog = ActiveDialog::None;
        }
        if confirm {
            self.confirm_delete_task();
        }
        Ok(())
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> Result<()> {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let hit = self
                    .hit_test_map
                    .iter()
                    .find(|(rect, _)| rect_contains(*rect, mouse.column, mouse.row))
                    .map(|(_, message)| message.clone());
                if let Some(message) = hit {
                    return self.update(message);
                }
            }
            MouseEventKind::ScrollUp if self.active_dialog == ActiveDialog::None => {
                self.move_selection(-1);
            }
            MouseEventKind::ScrollDown if self.active_dialog == ActiveDialog::None => {
                self.move_selection(1);
            }
            _ => {}
        }
        Ok(())
    }

    pub fn tasks_in_column(&self, column: usize) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| task.status.column_index() == column)
            .collect()
    }

    pub fn selected_index(&self, column: usize) -> usize {
        self.selected_task_per_column.get(&column).copied().unwrap_or(0)
    }

    pub fn selected_task(&self) -> Option<&Task> {
        let index = self.selected_index(self.focused_column);
        self.tasks_in_column(self.focused_column).get(index).copied()
    }

    fn move_selection(&mut self, delta: isize) {
        let count = self.tasks_in_column(self.focused_column).len();
        if count == 0 {
            return;
        }
        let current = self.selected_index(self.focused_column) as isize;
        let next = (current + delta).clamp(0, count as isize - 1) as usize;
        self.selected_task_per_column.insert(self.focused_column, next);
    }

    fn clamp_selection(&mut self) {
        for column in 0..COLUMN_COUNT {
            let count = self.tasks_in_column(column).len();
            let entry = self.selected_task_per_column.entry(column).or_insert(0);
            *entry = (*entry).min(count.saturating_sub(1));
        }
    }

    fn spawn_api<F>(&mut self, job: F)
    where
        F: FnOnce(&ApiClient) -> ApiEvent + Send + 'static,
    {
        let api = self.api.clone();
        let tx = self.events_tx.clone();
        self.in_flight += 1;
        thread::spawn(move || {
            let _ = tx.send(job(&api));
        });
    }

    pub fn drain_api_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_api_event(event);
        }
    }

    fn load_tasks(&mut self) {
        self.loading = true;
        self.spawn_api(|api| ApiEvent::TasksLoaded(api.list_tasks()));
    }

    fn refresh_stats(&mut self) {
        self.spawn_api(|api| ApiEvent::StatsLoaded(api.stats()));
    }

    fn open_edit_dialog(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        // Edit always re-fetches the record; the board copy may be stale.
        let task_id = task.id;
        self.spawn_api(move |api| ApiEvent::TaskFetched(api.get_task(task_id)));
    }

    fn open_delete_dialog(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        self.active_dialog = ActiveDialog::DeleteTask(DeleteTaskDialogState {
            task_id: task.id,
            task_title: task.title.clone(),
            focused_field: DeleteTaskField::Cancel,
        });
    }

    /// The keyboard analog of dropping a card into a neighboring column:
    /// the move is shown immediately, the status update goes out, and a
    /// failure is recovered by reloading ground truth.
    fn move_selected_task(&mut self, to_left: bool) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let task_id = task.id;
        let from = task.status.column_index();
        let target = if to_left {
            from.checked_sub(1)
        } else {
            Some(from + 1)
        };
        let Some(new_status) = target.and_then(TaskStatus::from_column) else {
            return;
        };

        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) {
            task.status = new_status;
        }
        self.focused_column = new_status.column_index();
        let position = self
            .tasks_in_column(self.focused_column)
            .iter()
            .position(|t| t.id == task_id)
            .unwrap_or(0);
        self.selected_task_per_column.insert(self.focused_column, position);

        self.spawn_api(move |api| ApiEvent::StatusUpdated {
            task_id,
            result: api.update_task_status(task_id, new_status),
        });
    }

    fn submit_task_form(&mut self) {
        let today = Local::now().date_naive();
        let mut submission = None;

        if let ActiveDialog::TaskForm(state) = &mut self.active_dialog {
            if state.submitting {
                return;
            }

            let title = state.title_input.trim();
            if title.is_empty() {
                state.error_message = Some("Title is required".to_string());
                return;
            }
            let due_date = match parse_due_date(&state.due_date_input, today) {
                Ok(due_date) => due_date,
                Err(message) => {
                    state.error_message = Some(message);
                    return;
                }
            };

            let description = state.description_input.trim();
            let payload = TaskPayload {
                title: title.to_string(),
                description: (!description.is_empty()).then(|| description.to_string()),
                priority: state.priority,
                due_date,
                // Status is not edited through the form; edits carry the
                // loaded record's status, new tasks start in To Do.
                status: state
                    .editing
                    .as_ref()
                    .map(|task| task.status)
                    .unwrap_or(TaskStatus::Todo),
            };

            state.submitting = true;
            state.error_message = None;
            submission = Some((state.editing.as_ref().map(|task| task.id), payload));
        }

        if let Some((editing_id, payload)) = submission {
            self.spawn_api(move |api| {
                let result = match editing_id {
                    Some(id) => api.update_task(id, &payload).map(|_| ()),
                    None => api.create_task(&payload).map(|_| ()),
                };
                ApiEvent::TaskSaved {
                    created: editing_id.is_none(),
                    result,
                }
            });
        }
    }

    fn confirm_delete_task(&mut self) {
        let ActiveDialog::DeleteTask(state) = &self.active_dialog else {
            return;
        };
        let task_id = state.task_id;
        self.active_dialog = ActiveDialog::None;
        self.spawn_api(move |api| ApiEvent::TaskDeleted(api.delete_task(task_id)));
    }

    pub fn apply_api_event(&mut self, event: ApiEvent) {
        self.in_flight = self.in_flight.saturating_sub(1);

        match event {
            ApiEvent::TasksLoaded(Ok(tasks)) => {
                debug!(count = tasks.len(), "task list loaded");
                self.loading = false;
                self.tasks = tasks;
                self.clamp_selection();
            }
            ApiEvent::TasksLoaded(Err(error)) => {
                warn!(%error, "failed to load tasks");
                self.loading = false;
                self.show_toast(ToastKind::Error, "Failed to load tasks. Please try again");
            }
            ApiEvent::TaskFetched(Ok(task)) => {
                self.active_dialog = ActiveDialog::TaskForm(TaskFormState::edit(task));
            }
            ApiEvent::TaskFetched(Err(error)) => {
                warn!(%error, "failed to load task details");
                self.show_toast(ToastKind::Error, "Failed to load task details");
                self.load_tasks();
            }
            ApiEvent::TaskSaved { created, result } => match result {
                Ok(()) => {
                    self.active_dialog = ActiveDialog::None;
                    self.show_toast(
                        ToastKind::Success,
                        if created { "Task created" } else { "Task updated" },
                    );
                    self.load_tasks();
                    self.refresh_stats();
                }
                Err(error) => {
                    warn!(%error, "failed to save task");
                    let message = error
                        .server_message()
                        .unwrap_or("Failed to save task")
                        .to_string();
                    if let ActiveDialog::TaskForm(state) = &mut self.active_dialog {
                        state.submitting = false;
                        state.error_message = Some(message);
                    } else {
                        self.show_toast(ToastKind::Error, message);
                    }
                }
            },
            ApiEvent::TaskDeleted(Ok(())) => {
                self.show_toast(ToastKind::Success, "Task deleted");
                self.load_tasks();
                self.refresh_stats();
            }
            ApiEvent::TaskDeleted(Err(error)) => {
                warn!(%error, "failed to delete task");
                self.show_toast(ToastKind::Error, "Failed to delete task");
            }
            ApiEvent::StatusUpdated { task_id, result } => match result {
                Ok(()) => {
                    debug!(task_id, "task status updated");
                    self.show_toast(ToastKind::Success, "Task status updated");
                    self.refresh_stats();
                }
                Err(error) => {
                    // Reloading resets every card to its server-confirmed
                    // column; there is no finer-grained rollback.
                    warn!(task_id, %error, "failed to update task status");
                    self.show_toast(ToastKind::Error, "Failed to update task status");
                    self.load_tasks();
                }
            },
            ApiEvent::StatsLoaded(Ok(stats)) => self.stats = Some(stats),
            ApiEvent::StatsLoaded(Err(error)) => {
                // Display keeps whatever stats it had.
                debug!(%error, "failed to load stats");
            }
        }
    }

    fn show_toast(&mut self, kind: ToastKind, text: impl Into<String>) {
        self.toast = Some(Toast {
            text: text.into(),
            kind,
            shown_at: Instant::now(),
        });
    }

    fn expire_toast(&mut self) {
        if let Some(toast) = &self.toast
            && toast.shown_at.elapsed() >= self.toast_duration
        {
            self.toast = None;
        }
    }
}

fn rect_contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x
        && column < rect.x.saturating_add(rect.width)
        && row >= rect.y
        && row < rect.y.saturating_add(rect.height)
}

/// Empty input means no due date. A parseable date must not lie before
/// today, mirroring the form's minimum-selectable-date constraint.
fn parse_due_date(input: &str, today: NaiveDate) -> Result<Option<NaiveDate>, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| "Due date must be YYYY-MM-DD".to_string())?;
    if date < today {
        return Err("Due date cannot be before today".to_string());
    }
    Ok(Some(date))
}
