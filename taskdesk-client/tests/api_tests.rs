//! API client contract tests
//!
//! The backend is stood in for by wiremock; local storage lives in a temp dir.
//! Offline behaviour is exercised against a port nothing listens on.

use serde_json::{json, Value};
use std::net::TcpListener;
use taskdesk_client::api::{ApiClient, TaskApi, LOCAL_ID_PREFIX, PLACEHOLDER_TITLE};
use taskdesk_client::cache::TaskCache;
use taskdesk_client::config::{ClientConfig, STORAGE_FILE};
use taskdesk_client::error::ClientError;
use taskdesk_client::form::{NewTask, TaskChanges};
use taskdesk_client::storage::LocalStorage;
use taskdesk_shared::models::priority::Priority;
use taskdesk_shared::models::task::TaskView;
use taskdesk_shared::models::user::UserSummary;
use tempfile::TempDir;
use uuid::Uuid;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(api_url: &str, dir: &TempDir) -> ApiClient {
    let data_dir = dir.path().display().to_string();
    let config = ClientConfig::from_lookup(|key| match key {
        "TASKDESK_API_URL" => Some(api_url.to_string()),
        "TASKDESK_DATA_DIR" => Some(data_dir.clone()),
        "TASKDESK_TIMEOUT_SECS" => Some("2".to_string()),
        _ => None,
    })
    .unwrap();

    ApiClient::new(&config, LocalStorage::open(&config.storage_path)).unwrap()
}

fn storage(dir: &TempDir) -> LocalStorage {
    LocalStorage::open(dir.path().join(STORAGE_FILE))
}

fn logged_in(dir: &TempDir) {
    storage(dir)
        .save_session(
            "stored-token",
            &UserSummary {
                id: Uuid::new_v4(),
                email: "demo@taskmanager.com".to_string(),
                name: Some("Demo User".to_string()),
            },
        )
        .unwrap();
}

fn task_json(id: &str, title: &str, completed: bool) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "",
        "priority": "high",
        "completed": completed,
        "dueDate": null,
        "createdAt": "2025-01-05T09:00:00.000Z",
        "updatedAt": "2025-01-05T09:00:00.000Z"
    })
}

fn backup_task(id: &str, title: &str) -> TaskView {
    serde_json::from_value(task_json(id, title, false)).unwrap()
}

/// Base URL of a port with no listener
fn unreachable_api() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/api", port)
}

async fn api_server() -> (MockServer, String) {
    let server = MockServer::start().await;
    let url = format!("{}/api", server.uri());
    (server, url)
}

// ────────────────────────────────────────────────────────────────────────────
// Session handling
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_stores_session() {
    let (server, url) = api_server().await;
    let dir = TempDir::new().unwrap();
    let user_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"email": "demo@taskmanager.com", "password": "demo123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Login successful",
            "token": "fresh-token",
            "user": {"id": user_id, "email": "demo@taskmanager.com", "name": "Demo User"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&url, &dir);
    let user = client.login("demo@taskmanager.com", "demo123").await.unwrap();

    assert_eq!(user.id, user_id);
    assert_eq!(storage(&dir).token().as_deref(), Some("fresh-token"));
    assert_eq!(client.current_user().await.unwrap().email, "demo@taskmanager.com");
}

#[tokio::test]
async fn test_bad_credentials_are_not_a_session_expiry() {
    let (server, url) = api_server().await;
    let dir = TempDir::new().unwrap();
    logged_in(&dir);

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "error": "Invalid credentials",
            "timestamp": "2025-01-05T09:00:00.000Z"
        })))
        .mount(&server)
        .await;

    let err = client_for(&url, &dir)
        .login("demo@taskmanager.com", "wrong123")
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Api { status: 401, .. }));
    assert_eq!(err.to_string(), "Invalid credentials");
}

#[tokio::test]
async fn test_rejected_token_clears_session() {
    let (server, url) = api_server().await;
    let dir = TempDir::new().unwrap();
    logged_in(&dir);

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "error": "Token expired",
            "code": "TOKEN_EXPIRED"
        })))
        .mount(&server)
        .await;

    let client = client_for(&url, &dir);
    let err = client.fetch_tasks().await.unwrap_err();

    assert!(matches!(err, ClientError::SessionExpired));
    assert!(storage(&dir).token().is_none());
    assert!(storage(&dir).user().is_none());
    assert!(client.current_user().await.is_none());
}

#[tokio::test]
async fn test_verify_unwraps_profile() {
    let (server, url) = api_server().await;
    let dir = TempDir::new().unwrap();
    logged_in(&dir);

    Mock::given(method("GET"))
        .and(path("/api/auth/verify"))
        .and(header("authorization", "Bearer stored-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "id": Uuid::new_v4(),
                "email": "demo@taskmanager.com",
                "name": null,
                "createdAt": "2025-01-01T00:00:00.000Z",
                "updatedAt": "2025-01-01T00:00:00.000Z"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let profile = client_for(&url, &dir).verify().await.unwrap();
    assert_eq!(profile.email, "demo@taskmanager.com");
    assert_eq!(profile.name, None);
}

#[tokio::test]
async fn test_logout_keeps_task_backup() {
    let dir = TempDir::new().unwrap();
    logged_in(&dir);
    storage(&dir).save_tasks(&[backup_task("1", "kept")]).unwrap();

    client_for(&unreachable_api(), &dir).logout().await.unwrap();

    assert!(storage(&dir).token().is_none());
    assert_eq!(storage(&dir).tasks().len(), 1);
}

// ────────────────────────────────────────────────────────────────────────────
// Online task operations
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_sends_token_and_backs_up() {
    let (server, url) = api_server().await;
    let dir = TempDir::new().unwrap();
    logged_in(&dir);

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .and(header("authorization", "Bearer stored-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [task_json("a", "Newest", false), task_json("b", "Oldest", true)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tasks = client_for(&url, &dir).fetch_tasks().await.unwrap();

    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].priority, Priority::High);
    assert_eq!(storage(&dir).tasks(), tasks);
}

#[tokio::test]
async fn test_server_errors_do_not_fall_back() {
    let (server, url) = api_server().await;
    let dir = TempDir::new().unwrap();
    logged_in(&dir);
    storage(&dir).save_tasks(&[backup_task("1", "stale")]).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "success": false,
            "error": "Error fetching tasks"
        })))
        .mount(&server)
        .await;

    let err = client_for(&url, &dir).fetch_tasks().await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "Error fetching tasks");
}

#[tokio::test]
async fn test_create_posts_camel_case_body() {
    let (server, url) = api_server().await;
    let dir = TempDir::new().unwrap();
    logged_in(&dir);

    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .and(body_json(json!({
            "title": "Write docs",
            "priority": "urgent",
            "dueDate": "2025-03-01T00:00:00.000Z"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "data": task_json("srv-1", "Write docs", false)
        })))
        .expect(1)
        .mount(&server)
        .await;

    let task = NewTask {
        priority: Priority::Urgent,
        due_date: Some("2025-03-01T00:00:00Z".parse().unwrap()),
        ..NewTask::new("Write docs")
    };
    let created = client_for(&url, &dir).create_task(task).await.unwrap();

    assert_eq!(created.id, "srv-1");
    assert_eq!(storage(&dir).tasks()[0].id, "srv-1");
}

#[tokio::test]
async fn test_update_sends_null_to_clear() {
    let (server, url) = api_server().await;
    let dir = TempDir::new().unwrap();
    logged_in(&dir);

    Mock::given(method("PUT"))
        .and(path("/api/tasks/srv-1"))
        .and(body_json(json!({"description": null, "completed": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": task_json("srv-1", "Write docs", true)
        })))
        .expect(1)
        .mount(&server)
        .await;

    let changes = TaskChanges {
        description: Some(None),
        completed: Some(true),
        ..Default::default()
    };
    let updated = client_for(&url, &dir)
        .update_task("srv-1", changes)
        .await
        .unwrap();

    assert!(updated.completed);
}

#[tokio::test]
async fn test_toggle_and_delete() {
    let (server, url) = api_server().await;
    let dir = TempDir::new().unwrap();
    logged_in(&dir);
    storage(&dir)
        .save_tasks(&[backup_task("srv-1", "one"), backup_task("srv-2", "two")])
        .unwrap();

    Mock::given(method("PATCH"))
        .and(path("/api/tasks/srv-1/toggle"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": task_json("srv-1", "one", true)
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/tasks/srv-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Task deleted successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&url, &dir);
    assert!(client.toggle_task("srv-1").await.unwrap().completed);
    client.delete_task("srv-2").await.unwrap();

    let backup = storage(&dir).tasks();
    assert_eq!(backup.len(), 1);
    assert!(backup[0].completed);
}

#[tokio::test]
async fn test_forbidden_is_reported_with_server_message() {
    let (server, url) = api_server().await;
    let dir = TempDir::new().unwrap();
    logged_in(&dir);

    Mock::given(method("DELETE"))
        .and(path("/api/tasks/theirs"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "success": false,
            "error": "You do not have permission to delete this task"
        })))
        .mount(&server)
        .await;

    let err = client_for(&url, &dir).delete_task("theirs").await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert_eq!(err.to_string(), "You do not have permission to delete this task");
}

#[tokio::test]
async fn test_backend_connection_check() {
    let (server, url) = api_server().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "status": "OK",
            "database": "connected",
            "counts": {"tasks": 5, "users": 1}
        })))
        .mount(&server)
        .await;

    let client = client_for(&url, &dir);
    assert!(client.check_backend_connection().await);
    assert_eq!(client.health().await.unwrap().counts.unwrap().tasks, 5);

    assert!(!client_for(&unreachable_api(), &dir).check_backend_connection().await);
}

// ────────────────────────────────────────────────────────────────────────────
// Offline fallback
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_offline_fetch_uses_backup() {
    let dir = TempDir::new().unwrap();
    logged_in(&dir);
    storage(&dir).save_tasks(&[backup_task("1", "from backup")]).unwrap();

    let tasks = client_for(&unreachable_api(), &dir).fetch_tasks().await.unwrap();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "from backup");
}

#[tokio::test]
async fn test_offline_fetch_without_backup_shows_placeholder() {
    let dir = TempDir::new().unwrap();
    logged_in(&dir);

    let tasks = client_for(&unreachable_api(), &dir).fetch_tasks().await.unwrap();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, PLACEHOLDER_TITLE);
    assert!(storage(&dir).tasks().is_empty());
}

#[tokio::test]
async fn test_offline_mutations_edit_backup() {
    let dir = TempDir::new().unwrap();
    logged_in(&dir);
    storage(&dir).save_tasks(&[backup_task("srv-1", "existing")]).unwrap();
    let client = client_for(&unreachable_api(), &dir);

    let created = client.create_task(NewTask::new("offline")).await.unwrap();
    assert!(created.id.starts_with(LOCAL_ID_PREFIX));

    let renamed = client
        .update_task(
            "srv-1",
            TaskChanges {
                title: Some("renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.title, "renamed");

    client.delete_task(&created.id).await.unwrap();

    let backup = storage(&dir).tasks();
    assert_eq!(backup.len(), 1);
    assert_eq!(backup[0].title, "renamed");
}

#[tokio::test]
async fn test_offline_update_of_unknown_task() {
    let dir = TempDir::new().unwrap();
    logged_in(&dir);

    let err = client_for(&unreachable_api(), &dir)
        .update_task("missing", TaskChanges::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::LocalTaskNotFound));
}

#[tokio::test]
async fn test_offline_toggle_fails() {
    let dir = TempDir::new().unwrap();
    logged_in(&dir);
    storage(&dir).save_tasks(&[backup_task("srv-1", "t")]).unwrap();

    let err = client_for(&unreachable_api(), &dir)
        .toggle_task("srv-1")
        .await
        .unwrap_err();

    assert!(err.is_network());
    assert!(!storage(&dir).tasks()[0].completed);
}

// ────────────────────────────────────────────────────────────────────────────
// Cache over the real client
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cache_rolls_back_forbidden_delete() {
    let (server, url) = api_server().await;
    let dir = TempDir::new().unwrap();
    logged_in(&dir);

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [task_json("mine", "mine", false)]
        })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/tasks/mine"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "success": false,
            "error": "You do not have permission to delete this task"
        })))
        .mount(&server)
        .await;

    let cache = TaskCache::new(client_for(&url, &dir));
    cache.tasks().await.unwrap();

    assert!(cache.delete("mine").await.is_err());
    assert_eq!(cache.snapshot().await.unwrap()[0].id, "mine");
}

#[tokio::test]
async fn test_cache_create_sends_partial_body() {
    let (server, url) = api_server().await;
    let dir = TempDir::new().unwrap();
    logged_in(&dir);

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [task_json("srv-9", "Plan sprint", false)]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .and(body_partial_json(json!({"title": "Plan sprint"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "data": task_json("srv-9", "Plan sprint", false)
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cache = TaskCache::new(client_for(&url, &dir));
    let created = cache.create(NewTask::new("Plan sprint")).await.unwrap();

    assert_eq!(created.id, "srv-9");
    assert_eq!(cache.snapshot().await.unwrap().len(), 1);
}
