use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde_json::{Value, json};
use tracing::error;

use crate::api::{ApiClient, ApiError};
use crate::types::{Priority, Task, TaskPayload, TaskStatus};

const SCHEMA_VERSION: &str = "cli.v1";

#[derive(Debug, Clone, Subcommand)]
pub enum RootCommand {
    /// Inspect and mutate tasks on the board.
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Show the board statistics.
    Stats,
}

#[derive(Debug, Clone, Subcommand)]
pub enum TaskCommand {
    List(TaskListArgs),
    Show(TaskShowArgs),
    Create(TaskCreateArgs),
    Update(TaskUpdateArgs),
    Move(TaskMoveArgs),
    Delete(TaskDeleteArgs),
}

#[derive(Debug, Clone, Args)]
pub struct TaskListArgs {
    /// Only list tasks with this status (todo, in_progress, done).
    #[arg(long, value_name = "STATUS")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct TaskShowArgs {
    #[arg(long, value_name = "TASK_ID")]
    pub id: i64,
}

#[derive(Debug, Clone, Args)]
pub struct TaskCreateArgs {
    #[arg(long, value_name = "TEXT")]
    pub title: String,

    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    #[arg(long, value_name = "PRIORITY", default_value = "medium")]
    pub priority: String,

    #[arg(long, value_name = "YYYY-MM-DD")]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct TaskUpdateArgs {
    #[arg(long, value_name = "TASK_ID")]
    pub id: i64,

    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    #[arg(long, value_name = "PRIORITY")]
    pub priority: Option<String>,

    #[arg(long, value_name = "YYYY-MM-DD")]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct TaskMoveArgs {
    #[arg(long, value_name = "TASK_ID")]
    pub id: i64,

    /// Target status (todo, in_progress, done).
    #[arg(long, value_name = "STATUS")]
    pub status: String,
}

#[derive(Debug, Clone, Args)]
pub struct TaskDeleteArgs {
    #[arg(long, value_name = "TASK_ID")]
    pub id: i64,

    /// Skip the confirmation prompt. Deletion is refused without it.
    #[arg(long)]
    pub yes: bool,
}

pub fn run(api: &ApiClient, command: RootCommand, json_output: bool, quiet: bool) -> i32 {
    match execute(api, command) {
        Ok(output) => {
            print_success(output, json_output, quiet);
            0
        }
        Err(err) => {
            print_error(&err, json_output);
            err.exit_code
        }
    }
}

#[derive(Debug)]
struct CommandOutput {
    command: &'static str,
    data: Value,
    text: String,
}

#[derive(Debug)]
struct CliError {
    exit_code: i32,
    code: &'static str,
    message: String,
    details: Option<Value>,
}

type CliResult<T> = Result<T, CliError>;

fn execute(api: &ApiClient, command: RootCommand) -> CliResult<CommandOutput> {
    match command {
        RootCommand::Task { command } => match command {
            TaskCommand::List(args) => task_list(api, args),
            TaskCommand::Show(args) => task_show(api, args),
            TaskCommand::Create(args) => task_create(api, args),
            TaskCommand::Update(args) => task_update(api, args),
            TaskCommand::Move(args) => task_move(api, args),
            TaskCommand::Delete(args) => task_delete(api, args),
        },
        RootCommand::Stats => stats(api),
    }
}

fn task_list(api: &ApiClient, args: TaskListArgs) -> CliResult<CommandOutput> {
    let filter = args.status.as_deref().map(parse_status).transpose()?;
    let mut tasks = api.list_tasks().map_err(classify_api_error)?;
    if let Some(status) = filter {
        tasks.retain(|task| task.status == status);
    }

    let data = json!({ "tasks": tasks });
    let text = render_task_list_text(&tasks);

    Ok(CommandOutput {
        command: "task list",
        data,
        text,
    })
}

fn task_show(api: &ApiClient, args: TaskShowArgs) -> CliResult<CommandOutput> {
    let task = api.get_task(args.id).map_err(classify_api_error)?;
    let text = render_task_detail_text(&task);

    Ok(CommandOutput {
        command: "task show",
        data: json!({ "task": task }),
        text,
    })
}

fn task_create(api: &ApiClient, args: TaskCreateArgs) -> CliResult<CommandOutput> {
    let title = args.title.trim();
    if title.is_empty() {
        return Err(usage_error("TITLE_REQUIRED", "--title must not be empty"));
    }

    let payload = TaskPayload {
        title: title.to_string(),
        description: args.description.filter(|text| !text.trim().is_empty()),
        priority: parse_priority(&args.priority)?,
        due_date: args.due_date.as_deref().map(parse_date).transpose()?,
        status: TaskStatus::Todo,
    };

    let created = api.create_task(&payload).map_err(classify_api_error)?;
    Ok(CommandOutput {
        command: "task create",
        data: json!({ "task": created }),
        text: format!("created task {} ({})", created.id, created.title),
    })
}

fn task_update(api: &ApiClient, args: TaskUpdateArgs) -> CliResult<CommandOutput> {
    if args.title.is_none()
        && args.description.is_none()
        && args.priority.is_none()
        && args.due_date.is_none()
    {
        return Err(usage_error(
            "TASK_UPDATE_EMPTY",
            "provide at least one of --title, --description, --priority, or --due-date",
        ));
    }

    // Updates replace the whole record, so unset fields keep the values
    // fetched from the server.
    let current = api.get_task(args.id).map_err(classify_api_error)?;
    let title = match args.title {
        Some(title) if title.trim().is_empty() => {
            return Err(usage_error("TITLE_REQUIRED", "--title must not be empty"));
        }
        Some(title) => title.trim().to_string(),
        None => current.title,
    };

    let payload = TaskPayload {
        title,
        description: match args.description {
            Some(text) => (!text.trim().is_empty()).then(|| text.trim().to_string()),
            None => current.description,
        },
        priority: match args.priority.as_deref() {
            Some(raw) => parse_priority(raw)?,
            None => current.priority,
        },
        due_date: match args.due_date.as_deref() {
            Some(raw) => Some(parse_date(raw)?),
            None => current.due_date,
        },
        status: current.status,
    };

    let updated = api
        .update_task(args.id, &payload)
        .map_err(classify_api_error)?;
    Ok(CommandOutput {
        command: "task update",
        data: json!({ "task": updated }),
        text: format!("updated task {}", updated.id),
    })
}

fn task_move(api: &ApiClient, args: TaskMoveArgs) -> CliResult<CommandOutput> {
    let status = parse_status(&args.status)?;
    api.update_task_status(args.id, status)
        .map_err(classify_api_error)?;

    Ok(CommandOutput {
        command: "task move",
        data: json!({ "task_id": args.id, "status": status.as_str() }),
        text: format!("moved task {} to {}", args.id, status.label()),
    })
}

fn task_delete(api: &ApiClient, args: TaskDeleteArgs) -> CliResult<CommandOutput> {
    if !args.yes {
        return Err(usage_error(
            "CONFIRM_REQUIRED",
            format!("re-run with --yes to delete task {}", args.id),
        ));
    }

    api.delete_task(args.id).map_err(classify_api_error)?;
    Ok(CommandOutput {
        command: "task delete",
        data: json!({ "task_id": args.id }),
        text: format!("deleted task {}", args.id),
    })
}

fn stats(api: &ApiClient) -> CliResult<CommandOutput> {
    let stats = api.stats().map_err(classify_api_error)?;
    let text = format!(
        "total: {}\nin progress: {}\ncompleted: {}\nhigh priority: {}",
        stats.total, stats.in_progress, stats.completed, stats.high_priority
    );

    Ok(CommandOutput {
        command: "stats",
        data: json!({ "stats": stats }),
        text,
    })
}

fn render_task_list_text(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks found.".to_string();
    }

    let headers = ["ID", "Title", "Status", "Priority", "Due"];
    let rows = tasks
        .iter()
        .map(|task| {
            vec![
                task.id.to_string(),
                task.title.replace('\n', " "),
                task.status.label().to_string(),
                task.priority.label().to_string(),
                task.due_date
                    .map(|due| due.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect::<Vec<_>>();

    render_text_table(&headers, &rows)
}

fn render_task_detail_text(task: &Task) -> String {
    let mut lines = vec![
        format!("id:       {}", task.id),
        format!("title:    {}", task.title),
        format!("status:   {}", task.status.label()),
        format!("priority: {}", task.priority.label()),
    ];
    if let Some(due) = task.due_date {
        lines.push(format!("due:      {due}"));
    }
    if let Some(description) = task.description.as_deref() {
        lines.push(format!("description: {description}"));
    }
    lines.join("\n")
}

fn render_text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|header| header.chars().count())
        .collect::<Vec<_>>();

    for row in rows {
        for (index, cell) in row.iter().enumerate() {
            let width = cell.chars().count();
            if width > widths[index] {
                widths[index] = width;
            }
        }
    }

    let border = format!(
        "+{}+",
        widths
            .iter()
            .map(|width| "-".repeat(*width + 2))
            .collect::<Vec<_>>()
            .join("+")
    );

    let mut lines = Vec::new();
    lines.push(border.clone());
    lines.push(format!(
        "| {} |",
        headers
            .iter()
            .enumerate()
            .map(|(index, header)| format!("{header:<width$}", width = widths[index]))
            .collect::<Vec<_>>()
            .join(" | ")
    ));
    lines.push(border.clone());

    for row in rows {
        lines.push(format!(
            "| {} |",
            row.iter()
                .enumerate()
                .map(|(index, cell)| format!("{cell:<width$}", width = widths[index]))
                .collect::<Vec<_>>()
                .join(" | ")
        ));
    }

    lines.push(border);
    lines.join("\n")
}

/// Strict parse for CLI input; the lenient fallback used for server
/// responses would silently swallow typos here.
fn parse_status(raw: &str) -> CliResult<TaskStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "todo" => Ok(TaskStatus::Todo),
        "in_progress" | "in-progress" => Ok(TaskStatus::InProgress),
        "done" => Ok(TaskStatus::Done),
        other => Err(usage_error(
            "INVALID_STATUS",
            format!("unknown status '{other}', expected todo, in_progress, or done"),
        )),
    }
}

fn parse_priority(raw: &str) -> CliResult<Priority> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "low" => Ok(Priority::Low),
        "medium" => Ok(Priority::Medium),
        "high" => Ok(Priority::High),
        other => Err(usage_error(
            "INVALID_PRIORITY",
            format!("unknown priority '{other}', expected low, medium, or high"),
        )),
    }
}

fn parse_date(raw: &str) -> CliResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        usage_error(
            "INVALID_DATE",
            format!("'{raw}' is not a YYYY-MM-DD date"),
        )
    })
}

fn usage_error(code: &'static str, message: impl Into<String>) -> CliError {
    CliError {
        exit_code: 2,
        code,
        message: message.into(),
        details: None,
    }
}

fn classify_api_error(err: ApiError) -> CliError {
    match err {
        ApiError::Api { status: 404, message } => CliError {
            exit_code: 3,
            code: "NOT_FOUND",
            message,
            details: None,
        },
        ApiError::Api { status, message } => CliError {
            exit_code: 4,
            code: "API_ERROR",
            message,
            details: Some(json!({ "status": status })),
        },
        other => CliError {
            exit_code: 5,
            code: "RUNTIME_ERROR",
            message: other.to_string(),
            details: None,
        },
    }
}

fn print_success(output: CommandOutput, json_output: bool, quiet: bool) {
    if json_output {
        let payload = json!({
            "schema_version": SCHEMA_VERSION,
            "command": output.command,
            "data": output.data
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(value) => println!("{value}"),
            Err(_) => println!("{}", payload),
        }
        return;
    }

    if quiet {
        return;
    }

    if output.text.is_empty() {
        println!("ok");
    } else {
        println!("{}", output.text);
    }
}

fn print_error(err: &CliError, json_output: bool) {
    error!(
        code = err.code,
        message = %err.message,
        details = ?err.details,
        "cli command failed"
    );

    if json_output {
        let payload = json!({
            "schema_version": SCHEMA_VERSION,
            "error": {
                "code": err.code,
                "message": err.message,
                "details": err.details
            }
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(value) => eprintln!("{value}"),
            Err(_) => eprintln!("{}", payload),
        }
        return;
    }

    eprintln!("error[{}]: {}", err.code, err.message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_accepts_both_separators() {
        assert_eq!(parse_status("todo").unwrap(), TaskStatus::Todo);
        assert_eq!(parse_status("in_progress").unwrap(), TaskStatus::InProgress);
        assert_eq!(parse_status("in-progress").unwrap(), TaskStatus::InProgress);
        assert_eq!(parse_status(" DONE ").unwrap(), TaskStatus::Done);
    }

    #[test]
    fn test_parse_status_rejects_unknown_values() {
        let err = parse_status("wip").unwrap_err();
        assert_eq!(err.code, "INVALID_STATUS");
        assert_eq!(err.exit_code, 2);
    }

    #[test]
    fn test_parse_priority() {
        assert_eq!(parse_priority("high").unwrap(), Priority::High);
        assert_eq!(parse_priority("Medium").unwrap(), Priority::Medium);
        assert_eq!(parse_priority("urgent").unwrap_err().code, "INVALID_PRIORITY");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2026-01-02").unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 2).unwrap()
        );
        assert_eq!(parse_date("tomorrow").unwrap_err().code, "INVALID_DATE");
    }

    #[test]
    fn test_delete_requires_confirmation_flag() {
        let api = ApiClient::new("http://127.0.0.1:9/api");
        let err = task_delete(&api, TaskDeleteArgs { id: 7, yes: false }).unwrap_err();
        assert_eq!(err.code, "CONFIRM_REQUIRED");
        assert_eq!(err.exit_code, 2);
    }

    #[test]
    fn test_classify_api_error_exit_codes() {
        let not_found = classify_api_error(ApiError::Api {
            status: 404,
            message: "task not found".to_string(),
        });
        assert_eq!(not_found.exit_code, 3);
        assert_eq!(not_found.code, "NOT_FOUND");

        let server = classify_api_error(ApiError::Api {
            status: 500,
            message: "boom".to_string(),
        });
        assert_eq!(server.exit_code, 4);
        assert_eq!(server.details, Some(json!({ "status": 500 })));
    }

    #[test]
    fn test_render_text_table_pads_columns() {
        let table = render_text_table(
            &["ID", "Title"],
            &[vec!["1".to_string(), "Write the report".to_string()]],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[1].contains("| ID | Title"));
        assert!(lines[3].contains("| 1  | Write the report |"));
    }
}
