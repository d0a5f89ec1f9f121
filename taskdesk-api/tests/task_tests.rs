//! Task CRUD through the full router

mod common;

use axum::http::StatusCode;
use common::{request, TestContext};
use serde_json::{json, Value};
use taskdesk_shared::store::Store;
use uuid::Uuid;

async fn create(ctx: &TestContext, body: Value) -> Value {
    let (status, body) = ctx.json(ctx.authed("POST", "/api/tasks", Some(body))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"].clone()
}

#[tokio::test]
async fn test_list_returns_seeded_tasks_newest_first() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx.json(ctx.authed("GET", "/api/tasks", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let tasks = body["data"].as_array().unwrap();
    assert_eq!(tasks.len(), 5);
    assert_eq!(tasks[0]["title"], "Documentar decisiones técnicas");
    assert_eq!(tasks[0]["priority"], "low");
    assert_eq!(tasks.iter().filter(|t| t["completed"] == true).count(), 2);

    for task in tasks {
        assert!(task["createdAt"].as_str().unwrap().ends_with('Z'));
        assert!(task["dueDate"].is_null());
        assert!(task["description"].is_string());
    }
}

#[tokio::test]
async fn test_create_task_normalizes_and_formats() {
    let ctx = TestContext::new().await.unwrap();

    let task = create(
        &ctx,
        json!({
            "title": "  Comprar pan  ",
            "priority": "alta",
            "dueDate": "2025-06-01T10:30:00.000Z"
        }),
    )
    .await;

    assert_eq!(task["title"], "Comprar pan");
    assert_eq!(task["priority"], "high");
    assert_eq!(task["description"], "");
    assert_eq!(task["completed"], false);
    assert_eq!(task["dueDate"], "2025-06-01T10:30:00.000Z");

    let (_, body) = ctx.json(ctx.authed("GET", "/api/tasks", None)).await;
    assert_eq!(body["data"][0]["id"], task["id"]);
}

#[tokio::test]
async fn test_create_without_title_persists_nothing() {
    let ctx = TestContext::new().await.unwrap();
    let before = ctx.store.count_tasks().await.unwrap();

    for body in [json!({}), json!({ "title": "   " }), json!({ "title": "" })] {
        let (status, body) = ctx.json(ctx.authed("POST", "/api/tasks", Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Title is required");
    }

    assert_eq!(ctx.store.count_tasks().await.unwrap(), before);
}

#[tokio::test]
async fn test_get_update_toggle_delete() {
    let ctx = TestContext::new().await.unwrap();
    let task = create(
        &ctx,
        json!({ "title": "Lifecycle", "description": "start", "dueDate": "2025-01-02" }),
    )
    .await;
    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());

    let (status, body) = ctx.json(ctx.authed("GET", &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Lifecycle");

    let (status, body) = ctx
        .json(ctx.authed(
            "PUT",
            &uri,
            Some(json!({ "priority": "URGENTE", "description": "", "dueDate": null, "completed": true })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let updated = &body["data"];
    assert_eq!(updated["title"], "Lifecycle");
    assert_eq!(updated["priority"], "urgent");
    assert_eq!(updated["description"], "");
    assert!(updated["dueDate"].is_null());
    assert_eq!(updated["completed"], true);

    let (status, body) = ctx
        .json(ctx.authed("PATCH", &format!("{}/toggle", uri), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completed"], false);

    let (status, body) = ctx.json(ctx.authed("DELETE", &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task deleted successfully");

    let (status, body) = ctx.json(ctx.authed("GET", &uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Task not found");
}

#[tokio::test]
async fn test_update_rejects_empty_title() {
    let ctx = TestContext::new().await.unwrap();
    let task = create(&ctx, json!({ "title": "Keep me" })).await;
    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());

    let (status, body) = ctx
        .json(ctx.authed("PUT", &uri, Some(json!({ "title": "  " }))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Title cannot be empty");

    let (status, body) = ctx
        .json(ctx.authed("PUT", &uri, Some(json!({ "title": null }))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Title cannot be empty");

    let (_, body) = ctx.json(ctx.authed("GET", &uri, None)).await;
    assert_eq!(body["data"]["title"], "Keep me");
    assert_eq!(body["data"]["updatedAt"], task["updatedAt"]);
}

#[tokio::test]
async fn test_other_users_tasks_are_forbidden() {
    let ctx = TestContext::new().await.unwrap();
    let (_, other_token) = ctx.second_user().await.unwrap();
    let other = format!("Bearer {}", other_token);

    let task = create(&ctx, json!({ "title": "Private" })).await;
    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());

    let cases = [
        ("GET", uri.clone(), None, "You do not have permission to view this task"),
        (
            "PUT",
            uri.clone(),
            Some(json!({ "title": "Hijacked" })),
            "You do not have permission to modify this task",
        ),
        (
            "PATCH",
            format!("{}/toggle", uri),
            None,
            "You do not have permission to modify this task",
        ),
        ("DELETE", uri.clone(), None, "You do not have permission to delete this task"),
    ];

    for (method, uri, body, message) in cases {
        let (status, body) = ctx.json(request(method, &uri, Some(&other), body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{} {}", method, uri);
        assert_eq!(body["error"], message);
    }

    // The other user sees none of the demo tasks
    let (_, body) = ctx.json(request("GET", "/api/tasks", Some(&other), None)).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    // Still intact for the owner
    let (_, body) = ctx.json(ctx.authed("GET", &uri, None)).await;
    assert_eq!(body["data"]["title"], "Private");
}

#[tokio::test]
async fn test_unknown_task_ids_are_not_found() {
    let ctx = TestContext::new().await.unwrap();

    for uri in [
        format!("/api/tasks/{}", Uuid::new_v4()),
        "/api/tasks/not-a-uuid".to_string(),
    ] {
        let (status, body) = ctx.json(ctx.authed("DELETE", &uri, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Task not found");
    }
}

#[tokio::test]
async fn test_tasks_require_token() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx.json(request("GET", "/api/tasks", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication token required");
}

#[tokio::test]
async fn test_store_outage_is_500_with_context() {
    let ctx = TestContext::new().await.unwrap();
    ctx.store.set_available(false);

    let (status, body) = ctx.json(ctx.authed("GET", "/api/tasks", None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Error fetching tasks");
    assert!(body.get("stack").is_none());
}
