use chrono::Local;
use tuirealm::ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{
        Block, BorderType, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Wrap,
    },
};

use crate::app::{ActiveDialog, App, DeleteTaskField, Message, TaskFormField, TaskFormState};
use crate::types::TaskStatus;

/// Sanitizes text for contexts that treat `&`, `<`, `>`, `"` and `'` as
/// markup. Processing is per character, so `&` never double-escapes the
/// entities produced for the other four.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

fn snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{truncated}…")
}

pub fn render(frame: &mut Frame<'_>, app: &mut App) {
    app.hit_test_map.clear();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, chunks[0], app);
    render_stats(frame, chunks[1], app);
    render_columns(frame, chunks[2], app);
    render_footer(frame, chunks[3], app);

    if app.active_dialog != ActiveDialog::None {
        render_dialog(frame, app);
    }
}

fn render_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let header = Block::default()
        .borders(Borders::TOP | Borders::LEFT | Borders::RIGHT)
        .title(" taskboard ")
        .title_alignment(Alignment::Left)
        .title_style(Style::default().fg(app.theme.base.header));

    let right_label = if app.loading {
        " loading… ".to_string()
    } else {
        format!(" {} tasks ", app.tasks.len())
    };
    let header_right = Block::default()
        .title(right_label)
        .title_alignment(Alignment::Right)
        .title_style(Style::default().fg(app.theme.base.text_muted));

    frame.render_widget(header, area);
    frame.render_widget(header_right, area);
}

fn render_stats(frame: &mut Frame<'_>, area: Rect, app: &App) {
    // Stats come from their own endpoint; a failed refresh keeps the last
    // values on screen, and dashes mean no read has succeeded yet.
    let line = match &app.stats {
        Some(stats) => format!(
            " Total: {}   In Progress: {}   Completed: {}   High Priority: {} ",
            stats.total, stats.in_progress, stats.completed, stats.high_priority
        ),
        None => " Total: -   In Progress: -   Completed: -   High Priority: - ".to_string(),
    };
    frame.render_widget(
        Paragraph::new(line)
            .alignment(Alignment::Center)
            .style(Style::default().fg(app.theme.base.text_muted)),
        area,
    );
}

fn render_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let (notice, color) = match &app.toast {
        Some(toast) => (
            format!(" {} ", toast.text),
            match toast.kind {
                crate::app::ToastKind::Success => app.theme.base.success,
                crate::app::ToastKind::Error => app.theme.base.danger,
            },
        ),
        None => (
            " n: new  e/Enter: edit  d: delete  H/L: move task  h/j/k/l: navigate  r: refresh  ?: help  q: quit "
                .to_string(),
            app.theme.base.text_muted,
        ),
    };
    let footer = Block::default()
        .borders(Borders::BOTTOM | Borders::LEFT | Borders::RIGHT)
        .title(notice)
        .title_alignment(Alignment::Center)
        .title_style(Style::default().fg(color));
    frame.render_widget(footer, area);
}

fn render_columns(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let board_empty = app.tasks.is_empty();
    let column_count = TaskStatus::ALL.len();
    let constraints: Vec<Constraint> = (0..column_count)
        .map(|_| Constraint::Ratio(1, column_count as u32))
        .collect();
    let column_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    let today = Local::now().date_naive();

    for (i, status) in TaskStatus::ALL.iter().enumerate() {
        let is_focused = i == app.focused_column;
        let border_type = if is_focused {
            BorderType::Double
        } else {
            BorderType::Plain
        };
        let border_color = if is_focused {
            app.theme.board.focused_border
        } else {
            app.theme.board.border
        };

        let column_tasks: Vec<usize> = app
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.status == *status)
            .map(|(index, _)| index)
            .collect();

        let title = format!(" {} ({}) ", status.label(), column_tasks.len());
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(border_type)
            .border_style(Style::default().fg(border_color))
            .title(title)
            .title_alignment(Alignment::Center);

        let inner_area = block.inner(column_chunks[i]);
        frame.render_widget(block, column_chunks[i]);

        app.hit_test_map.push((
            Rect {
                x: column_chunks[i].x,
                y: column_chunks[i].y,
                width: column_chunks[i].width,
                height: 1,
            },
            Message::FocusColumn(i),
        ));

        // Keep the focused column's selection visible.
        let capacity = ((inner_area.height / 3).max(1)) as usize;
        let selected = app.selected_index(i);
        let offset = app.scroll_offset_per_column.entry(i).or_insert(0);
        if selected < *offset {
            *offset = selected;
        } else if selected >= *offset + capacity {
            *offset = selected + 1 - capacity;
        }
        *offset = (*offset).min(column_tasks.len().saturating_sub(1));
        let scroll_offset = *offset;

        if column_tasks.is_empty() {
            if board_empty {
                // The call-to-action lives in the first column; the rest stay bare.
                if i == 0 {
                    let text = if app.loading {
                        "Loading tasks…"
                    } else {
                        "Nothing here yet.\nPress n to create your first task.\nPress ? for keybindings."
                    };
                    frame.render_widget(
                        Paragraph::new(text)
                            .alignment(Alignment::Center)
                            .wrap(Wrap { trim: true })
                            .style(Style::default().fg(app.theme.base.text)),
                        inner_area,
                    );
                }
            } else {
                frame.render_widget(
                    Paragraph::new("No tasks")
                        .alignment(Alignment::Center)
                        .style(Style::default().fg(app.theme.base.text_muted)),
                    inner_area,
                );
            }
            continue;
        }

        let mut y_offset = 0;
        for (j, task_index) in column_tasks.iter().enumerate().skip(scroll_offset) {
            if y_offset + 2 > inner_area.height {
                break;
            }
            let task = &app.tasks[*task_index];
            let is_selected = is_focused && app.selected_task_per_column.get(&i) == Some(&j);

            let prefix = if is_selected { "▸" } else { " " };
            let bg_color = if is_selected {
                app.theme.board.selected_bg
            } else {
                tuirealm::ratatui::style::Color::Reset
            };

            let line1 = Line::from(vec![
                Span::styled(prefix, Style::default().fg(app.theme.base.accent)),
                Span::styled("●", Style::default().fg(app.theme.priority_color(task.priority))),
                Span::raw(" "),
                Span::styled(
                    escape_html(&task.title),
                    Style::default().fg(app.theme.base.text),
                ),
            ]);

            let mut detail_spans = vec![Span::raw("   ")];
            if let Some(due) = task.due_date {
                if task.is_overdue(today) {
                    detail_spans.push(Span::styled(
                        format!("OVERDUE {due}"),
                        Style::default().fg(app.theme.board.overdue),
                    ));
                } else {
                    detail_spans.push(Span::styled(
                        format!("due {due}"),
                        Style::default().fg(app.theme.board.due_date),
                    ));
                }
                detail_spans.push(Span::raw("  "));
            }
            if let Some(description) = task.description.as_deref() {
                detail_spans.push(Span::styled(
                    snippet(&escape_html(description), 40),
                    Style::default().fg(app.theme.base.text_muted),
                ));
            }
            let line2 = Line::from(detail_spans);

            let task_area = Rect {
                x: inner_area.x,
                y: inner_area.y + y_offset,
                width: inner_area.width,
                height: 2,
            };
            frame.render_widget(
                Paragraph::new(vec![line1, line2]).style(Style::default().bg(bg_color)),
                task_area,
            );
            app.hit_test_map.push((task_area, Message::SelectTask(i, j)));

            y_offset += 3;
        }

        if column_tasks.len() > capacity && column_chunks[i].width > 0 {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .track_symbol(Some("│"))
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"));
            let mut scrollbar_state =
                ScrollbarState::new(column_tasks.len()).position(scroll_offset);
            frame.render_stateful_widget(
                scrollbar,
                scrollbar_area(column_chunks[i], inner_area),
                &mut scrollbar_state,
            );
        }
    }
}

/// Single-cell-wide strip along the column's right border. Saturating so a
/// zero-width column on a cramped terminal cannot underflow.
fn scrollbar_area(column: Rect, inner: Rect) -> Rect {
    Rect {
        x: column.right().saturating_sub(1),
        y: inner.y,
        width: 1,
        height: inner.height,
    }
}

fn render_dialog(frame: &mut Frame<'_>, app: &mut App) {
    if matches!(app.active_dialog, ActiveDialog::Help) {
        render_help_overlay(frame, app);
        return;
    }

    let (percent_x, percent_y) = match &app.active_dialog {
        ActiveDialog::TaskForm(_) => (70, 70),
        ActiveDialog::DeleteTask(_) => (50, 40),
        _ => (60, 20),
    };

    let area = centered_rect(percent_x, percent_y, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(app.theme.dialog.border))
        .title(match &app.active_dialog {
            ActiveDialog::TaskForm(state) if state.editing.is_some() => " Edit Task ",
            ActiveDialog::TaskForm(_) => " New Task ",
            ActiveDialog::DeleteTask(_) => " Delete Task ",
            _ => "",
        })
        .title_alignment(Alignment::Center);

    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    // Clone the dialog state so button registration below can borrow the
    // hit-test map mutably.
    match app.active_dialog.clone() {
        ActiveDialog::TaskForm(state) => render_task_form(frame, inner_area, app, &state),
        ActiveDialog::DeleteTask(state) => render_delete_dialog(frame, inner_area, app, &state),
        _ => {}
    }
}

fn render_task_form(frame: &mut Frame<'_>, area: Rect, app: &mut App, state: &TaskFormState) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(area);

    render_input_field(
        frame,
        layout[0],
        "Title",
        &state.title_input,
        state.focused_field == TaskFormField::Title,
        app,
    );
    render_input_field(
        frame,
        layout[1],
        "Description",
        &state.description_input,
        state.focused_field == TaskFormField::Description,
        app,
    );
    render_input_field(
        frame,
        layout[2],
        "Priority (←/→ to change)",
        &format!("◂ {} ▸", state.priority.label()),
        state.focused_field == TaskFormField::Priority,
        app,
    );
    render_input_field(
        frame,
        layout[3],
        "Due Date (YYYY-MM-DD, optional)",
        &state.due_date_input,
        state.focused_field == TaskFormField::DueDate,
        app,
    );

    let button_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(layout[4]);

    render_button(
        frame,
        button_layout[0],
        if state.submitting {
            "[ Saving… ]"
        } else {
            "[ Save ]"
        },
        state.focused_field == TaskFormField::Save,
        app,
    );
    render_button(
        frame,
        button_layout[1],
        "[ Cancel ]",
        state.focused_field == TaskFormField::Cancel,
        app,
    );

    app.hit_test_map
        .push((button_layout[0], Message::SubmitTaskForm));
    app.hit_test_map
        .push((button_layout[1], Message::DismissDialog));

    if let Some(error) = state.error_message.as_deref() {
        frame.render_widget(
            Paragraph::new(error)
                .alignment(Alignment::Center)
                .style(Style::default().fg(app.theme.dialog.error)),
            layout[5],
        );
    }
}

fn render_delete_dialog(
    frame: &mut Frame<'_>,
    area: Rect,
    app: &mut App,
    state: &crate::app::DeleteTaskDialogState,
) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(2), Constraint::Length(3)])
        .split(area);

    frame.render_widget(
        Paragraph::new(format!(
            "Delete \"{}\"?\nThis cannot be undone.",
            escape_html(&state.task_title)
        ))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(app.theme.base.text)),
        layout[0],
    );

    let button_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(layout[1]);

    render_button(
        frame,
        button_layout[0],
        "[ Delete ]",
        state.focused_field == DeleteTaskField::Delete,
        app,
    );
    render_button(
        frame,
        button_layout[1],
        "[ Cancel ]",
        state.focused_field == DeleteTaskField::Cancel,
        app,
    );

    app.hit_test_map
        .push((button_layout[0], Message::ConfirmDeleteTask));
    app.hit_test_map
        .push((button_layout[1], Message::DismissDialog));
}

fn render_help_overlay(frame: &mut Frame<'_>, app: &App) {
    let area = centered_rect(70, 80, frame.area());
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(app.theme.dialog.border))
        .title(" Help ")
        .title_alignment(Alignment::Center);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let text = [
        "Navigation",
        "  h/l or arrows: switch columns",
        "  j/k or arrows: select task",
        "Task Actions",
        "  n: new task",
        "  e or Enter: edit selected task",
        "  d or Delete: delete selected task (asks confirmation)",
        "  H/L: move selected task to the previous/next column",
        "Board",
        "  r: reload tasks and stats",
        "Mouse",
        "  left click: focus column or task, press dialog buttons",
        "  scroll: move through focused column",
        "General",
        "  ?: toggle help",
        "  Esc: dismiss",
        "  q: quit",
    ]
    .join("\n");

    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(app.theme.base.text)),
        inner,
    );
}

fn render_input_field(
    frame: &mut Frame<'_>,
    area: Rect,
    label: &str,
    value: &str,
    is_focused: bool,
    app: &App,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(label)
        .style(if is_focused {
            Style::default().fg(app.theme.dialog.field_focused)
        } else {
            Style::default().fg(app.theme.base.text)
        });
    frame.render_widget(Paragraph::new(value).block(block), area);
}

fn render_button(frame: &mut Frame<'_>, area: Rect, label: &str, is_focused: bool, app: &App) {
    let (bg, fg) = if is_focused {
        (
            app.theme.dialog.button_focused_bg,
            app.theme.dialog.button_focused_fg,
        )
    } else {
        (
            tuirealm::ratatui::style::Color::Reset,
            app.theme.base.text,
        )
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(if is_focused {
            Style::default().fg(app.theme.dialog.button_focused_bg)
        } else {
            Style::default().fg(app.theme.board.border)
        })
        .style(Style::default().bg(bg).fg(fg));
    frame.render_widget(
        Paragraph::new(label)
            .alignment(Alignment::Center)
            .block(block),
        area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
