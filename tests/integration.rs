use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::NaiveDate;
use serde_json::json;

use taskboard::api::{ApiClient, ApiError};
use taskboard::types::{Priority, TaskPayload, TaskStatus};

#[derive(Debug, Clone)]
struct RecordedRequest {
    method: String,
    path: String,
    body: String,
}

struct CannedResponse {
    status: u16,
    body: String,
}

/// Minimal single-threaded HTTP responder backing the client tests. Routes
/// are keyed by "METHOD /path"; unknown routes answer 404.
struct TestServer {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestServer {
    fn start(routes: Vec<(&str, u16, serde_json::Value)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test listener");
        let port = listener.local_addr().expect("listener addr").port();
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));

        let table: HashMap<String, CannedResponse> = routes
            .into_iter()
            .map(|(route, status, body)| {
                (
                    route.to_string(),
                    CannedResponse {
                        status,
                        body: body.to_string(),
                    },
                )
            })
            .collect();

        let recorded = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                handle_connection(stream, &table, &recorded);
            }
        });

        Self {
            base_url: format!("http://127.0.0.1:{port}/api"),
            requests,
        }
    }

    fn start_raw(route: &str, status: u16, raw_body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test listener");
        let port = listener.local_addr().expect("listener addr").port();
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));

        let mut table = HashMap::new();
        table.insert(
            route.to_string(),
            CannedResponse {
                status,
                body: raw_body.to_string(),
            },
        );

        let recorded = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                handle_connection(stream, &table, &recorded);
            }
        });

        Self {
            base_url: format!("http://127.0.0.1:{port}/api"),
            requests,
        }
    }

    fn client(&self) -> ApiClient {
        ApiClient::new(self.base_url.clone())
    }

    fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

fn handle_connection(
    stream: TcpStream,
    table: &HashMap<String, CannedResponse>,
    recorded: &Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let raw_path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':')
            && name.eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }

    let mut body_bytes = vec![0u8; content_length];
    if content_length > 0 && reader.read_exact(&mut body_bytes).is_err() {
        return;
    }
    let body = String::from_utf8_lossy(&body_bytes).to_string();

    // The client addresses everything under its /api prefix.
    let path = raw_path.strip_prefix("/api").unwrap_or(&raw_path).to_string();
    recorded.lock().expect("requests lock").push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        body,
    });

    let (status, response_body) = match table.get(&format!("{method} {path}")) {
        Some(canned) => (canned.status, canned.body.clone()),
        None => (404, json!({ "message": "not found" }).to_string()),
    };

    let response = format!(
        "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{response_body}",
        response_body.len()
    );
    let mut stream = reader.into_inner();
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[test]
fn integration_list_tasks_unwraps_envelope_and_normalizes_status() {
    let server = TestServer::start(vec![(
        "GET /tasks",
        200,
        json!({
            "data": [
                { "id": 1, "title": "first", "priority": "high", "status": "in_progress" },
                { "id": 2, "title": "odd", "status": "wip" }
            ]
        }),
    )]);

    let tasks = server.client().list_tasks().expect("list tasks");

    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].status, TaskStatus::InProgress);
    assert_eq!(tasks[0].priority, Priority::High);
    // Unknown status strings never drop a task from the board.
    assert_eq!(tasks[1].status, TaskStatus::Todo);
    assert_eq!(tasks[1].priority, Priority::Medium);
}

#[test]
fn integration_list_tasks_accepts_bare_array_body() {
    let server = TestServer::start(vec![(
        "GET /tasks",
        200,
        json!([{ "id": 3, "title": "bare", "status": "done" }]),
    )]);

    let tasks = server.client().list_tasks().expect("list tasks");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, TaskStatus::Done);
}

#[test]
fn integration_create_task_posts_payload_with_wire_names() {
    let server = TestServer::start(vec![(
        "POST /tasks",
        201,
        json!({ "data": { "id": 10, "title": "new", "status": "todo" } }),
    )]);

    let payload = TaskPayload {
        title: "new".to_string(),
        description: None,
        priority: Priority::Low,
        due_date: NaiveDate::from_ymd_opt(2030, 5, 4),
        status: TaskStatus::Todo,
    };
    let created = server.client().create_task(&payload).expect("create task");
    assert_eq!(created.id, 10);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/tasks");

    let sent: serde_json::Value = serde_json::from_str(&requests[0].body).expect("json body");
    assert_eq!(sent["title"], "new");
    assert_eq!(sent["priority"], "low");
    assert_eq!(sent["status"], "todo");
    assert_eq!(sent["due_date"], "2030-05-04");
    // Unset optional fields are omitted rather than sent as null.
    assert!(sent.get("description").is_none());
}

#[test]
fn integration_status_update_targets_the_status_route() {
    let server = TestServer::start(vec![(
        "PUT /tasks/7/status",
        200,
        json!({ "data": null }),
    )]);

    server
        .client()
        .update_task_status(7, TaskStatus::InProgress)
        .expect("update status");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "PUT");
    assert_eq!(requests[0].path, "/tasks/7/status");

    let sent: serde_json::Value = serde_json::from_str(&requests[0].body).expect("json body");
    assert_eq!(sent, json!({ "status": "in_progress" }));
}

#[test]
fn integration_update_task_puts_full_payload() {
    let server = TestServer::start(vec![(
        "PUT /tasks/4",
        200,
        json!({ "data": { "id": 4, "title": "edited", "status": "done" } }),
    )]);

    let payload = TaskPayload {
        title: "edited".to_string(),
        description: Some("notes".to_string()),
        priority: Priority::Medium,
        due_date: None,
        status: TaskStatus::Done,
    };
    let updated = server.client().update_task(4, &payload).expect("update task");
    assert_eq!(updated.title, "edited");

    let requests = server.requests();
    let sent: serde_json::Value = serde_json::from_str(&requests[0].body).expect("json body");
    assert_eq!(sent["description"], "notes");
    assert_eq!(sent["status"], "done");
}

#[test]
fn integration_delete_task_succeeds_on_empty_body() {
    let server = TestServer::start_raw("DELETE /tasks/9", 200, "");

    server.client().delete_task(9).expect("delete task");

    let requests = server.requests();
    assert_eq!(requests[0].method, "DELETE");
    assert_eq!(requests[0].path, "/tasks/9");
}

#[test]
fn integration_stats_defaults_missing_fields_to_zero() {
    let server = TestServer::start(vec![(
        "GET /tasks/stats",
        200,
        json!({ "data": { "total": 5, "in_progress": 2 } }),
    )]);

    let stats = server.client().stats().expect("stats");
    assert_eq!(stats.total, 5);
    assert_eq!(stats.in_progress, 2);
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.high_priority, 0);
}

#[test]
fn integration_error_prefers_server_message_field() {
    let server = TestServer::start(vec![(
        "POST /tasks",
        422,
        json!({ "message": "title is required" }),
    )]);

    let payload = TaskPayload {
        title: String::new(),
        description: None,
        priority: Priority::Medium,
        due_date: None,
        status: TaskStatus::Todo,
    };
    let err = server.client().create_task(&payload).expect_err("should fail");

    match &err {
        ApiError::Api { status, message } => {
            assert_eq!(*status, 422);
            assert_eq!(message, "title is required");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.server_message(), Some("title is required"));
}

#[test]
fn integration_error_falls_back_to_error_field_then_status() {
    let server = TestServer::start(vec![(
        "GET /tasks",
        500,
        json!({ "error": "database down" }),
    )]);
    let err = server.client().list_tasks().expect_err("should fail");
    match err {
        ApiError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "database down");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let server = TestServer::start_raw("GET /tasks", 503, "<html>bad gateway</html>");
    let err = server.client().list_tasks().expect_err("should fail");
    match err {
        ApiError::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "request failed with status 503");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn integration_get_task_not_found_is_an_api_error() {
    let server = TestServer::start(Vec::new());

    let err = server.client().get_task(42).expect_err("should fail");
    match err {
        ApiError::Api { status, .. } => assert_eq!(status, 404),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn integration_transport_failure_is_not_an_api_error() {
    // Nothing listens on this port.
    let client = ApiClient::new("http://127.0.0.1:1/api");
    let err = client.list_tasks().expect_err("should fail");
    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(err.server_message(), None);
}
