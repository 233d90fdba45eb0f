use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Column placement of a task. Anything the server sends outside the closed
/// set falls back to `Todo` so a single unexpected status never breaks the
/// whole board.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Default)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [Self; 3] = [Self::Todo, Self::InProgress, Self::Done];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }

    pub const fn column_index(self) -> usize {
        match self {
            Self::Todo => 0,
            Self::InProgress => 1,
            Self::Done => 2,
        }
    }

    pub const fn from_column(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Todo),
            1 => Some(Self::InProgress),
            2 => Some(Self::Done),
            _ => None,
        }
    }

    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "in_progress" | "in-progress" => Self::InProgress,
            "done" => Self::Done,
            _ => Self::Todo,
        }
    }
}

impl From<String> for TaskStatus {
    fn from(raw: String) -> Self {
        Self::from_raw(&raw)
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub const fn next(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High => Self::Low,
        }
    }

    pub const fn previous(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::Medium => Self::Low,
            Self::High => Self::Medium,
        }
    }
}

/// A task record as served by the API. The server owns every field; the
/// client never derives state from anything but the last fetched copy.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: TaskStatus,
}

impl Task {
    /// Overdue means strictly before the start of the given calendar day.
    /// A task with no due date is never overdue.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date.is_some_and(|due| due < today)
    }
}

/// Request body for create and update calls.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct TaskPayload {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
}

/// Server-computed aggregate counters. Display only; never mutated here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Default)]
#[serde(default)]
pub struct Stats {
    pub total: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub high_priority: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::from_raw(status.as_str()), status);
        }
    }

    #[test]
    fn test_status_fallback_to_todo() {
        assert_eq!(TaskStatus::from_raw("wip"), TaskStatus::Todo);
        assert_eq!(TaskStatus::from_raw("archived"), TaskStatus::Todo);
        assert_eq!(TaskStatus::from_raw(""), TaskStatus::Todo);
        assert_eq!(TaskStatus::from_raw("  DONE "), TaskStatus::Done);
        assert_eq!(TaskStatus::from_raw("in-progress"), TaskStatus::InProgress);
    }

    #[test]
    fn test_status_column_mapping() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::from_column(status.column_index()), Some(status));
        }
        assert_eq!(TaskStatus::from_column(3), None);
    }

    #[test]
    fn test_task_with_unknown_status_deserializes_into_todo() {
        let task: Task = serde_json::from_str(
            r#"{"id":7,"title":"Ship it","priority":"high","status":"wip"}"#,
        )
        .expect("task should deserialize");
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.description, None);
        assert_eq!(task.due_date, None);
    }

    #[test]
    fn test_task_serializes_status_as_wire_string() {
        let task = Task {
            id: 1,
            title: "t".to_string(),
            description: None,
            priority: Priority::Low,
            due_date: None,
            status: TaskStatus::InProgress,
        };
        let json = serde_json::to_value(&task).expect("task should serialize");
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["priority"], "low");
    }

    #[test]
    fn test_overdue_is_strictly_before_today() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let task = |due: Option<NaiveDate>| Task {
            id: 1,
            title: "t".to_string(),
            description: None,
            priority: Priority::Medium,
            due_date: due,
            status: TaskStatus::Todo,
        };

        assert!(task(NaiveDate::from_ymd_opt(2026, 3, 9)).is_overdue(today));
        assert!(!task(NaiveDate::from_ymd_opt(2026, 3, 10)).is_overdue(today));
        assert!(!task(NaiveDate::from_ymd_opt(2026, 3, 11)).is_overdue(today));
        assert!(!task(None).is_overdue(today));
    }

    #[test]
    fn test_payload_omits_absent_optional_fields() {
        let payload = TaskPayload {
            title: "t".to_string(),
            description: None,
            priority: Priority::Medium,
            due_date: None,
            status: TaskStatus::Todo,
        };
        let json = serde_json::to_value(&payload).expect("payload should serialize");
        assert!(json.get("description").is_none());
        assert!(json.get("due_date").is_none());
        assert_eq!(json["status"], "todo");
    }

    #[test]
    fn test_payload_due_date_is_iso_calendar_date() {
        let payload = TaskPayload {
            title: "t".to_string(),
            description: Some("d".to_string()),
            priority: Priority::High,
            due_date: NaiveDate::from_ymd_opt(2026, 12, 24),
            status: TaskStatus::Done,
        };
        let json = serde_json::to_value(&payload).expect("payload should serialize");
        assert_eq!(json["due_date"], "2026-12-24");
    }

    #[test]
    fn test_stats_fields_default_to_zero() {
        let stats: Stats = serde_json::from_str(r#"{"total":4}"#).expect("stats");
        assert_eq!(stats.total, 4);
        assert_eq!(stats.in_progress, 0);
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.high_priority, 0);
    }
}
