//! The same HTTP scenarios as the in-memory suites, run against `PgRepository`.
//! Each test registers its own user, so a shared database is fine.
//! Skipped when `DATABASE_URL` is not set.

mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use chrono::{Duration, NaiveDate};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use uuid::Uuid;

use common::{bearer, create_task, get, init_app_with, postgres_state, register, register_and_login, send};
use planner::models::{today, NewUser};
use planner::AppError;

fn titles(body: &Value) -> Vec<String> {
    body["tasks"]
        .as_array()
        .expect("tasks array")
        .iter()
        .map(|task| task["title"].as_str().unwrap().to_string())
        .collect()
}

fn unique_email(prefix: &str) -> String {
    format!("{}-{}@x.com", prefix, Uuid::new_v4())
}

#[actix_rt::test]
async fn test_listing_order() {
    let Some(state) = postgres_state().await else { return };
    let app = init_app_with(state).await;
    let token = register_and_login(&app, &unique_email("order"), "secret1").await;

    create_task(&app, &token, json!({"title": "Undated old"})).await;
    create_task(&app, &token, json!({"title": "Later", "start_date": "2024-03-01"})).await;
    create_task(&app, &token, json!({"title": "Sooner", "start_date": "2024-02-01"})).await;
    let done = create_task(&app, &token, json!({"title": "Done", "start_date": "2024-01-01"})).await;
    create_task(&app, &token, json!({"title": "Undated new"})).await;

    let req = test::TestRequest::patch()
        .uri(&format!("/api/tasks/{}/toggle", done["id"].as_str().unwrap()))
        .insert_header(bearer(&token))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get(&app, &token, "/api/tasks").await;
    assert_eq!(
        titles(&body),
        vec!["Sooner", "Later", "Undated new", "Undated old", "Done"]
    );
}

#[actix_rt::test]
async fn test_pagination_covers_every_task_once() {
    let Some(state) = postgres_state().await else { return };
    let app = init_app_with(state).await;
    let token = register_and_login(&app, &unique_email("pages"), "secret1").await;

    for i in 0..7 {
        create_task(&app, &token, json!({"title": format!("Task {}", i)})).await;
    }

    let (_, all) = get(&app, &token, "/api/tasks").await;
    let expected = titles(&all);
    assert_eq!(expected.len(), 7);

    let mut collected = Vec::new();
    for skip in [0, 3, 6] {
        let (status, body) =
            get(&app, &token, &format!("/api/tasks?skip={}&limit=3", skip)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 7);
        assert_eq!(body["total_pages"], 3);
        collected.extend(titles(&body));
    }
    assert_eq!(collected, expected);

    let (status, last) = get(&app, &token, "/api/tasks?skip=9223372036854775807&limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(last["tasks"], json!([]));
    assert_eq!(last["total"], 7);
}

#[actix_rt::test]
async fn test_stats() {
    let Some(state) = postgres_state().await else { return };
    let app = init_app_with(state).await;
    let token = register_and_login(&app, &unique_email("stats"), "secret1").await;
    let today = today();
    let yesterday: NaiveDate = today - Duration::days(1);
    let two_days_ago = today - Duration::days(2);

    create_task(
        &app,
        &token,
        json!({"title": "Due today", "start_date": today, "end_date": today}),
    )
    .await;
    create_task(
        &app,
        &token,
        json!({"title": "Late", "start_date": two_days_ago, "end_date": yesterday}),
    )
    .await;
    let finished = create_task(
        &app,
        &token,
        json!({"title": "Finished", "start_date": two_days_ago, "end_date": yesterday}),
    )
    .await;
    let req = test::TestRequest::patch()
        .uri(&format!("/api/tasks/{}/toggle", finished["id"].as_str().unwrap()))
        .insert_header(bearer(&token))
        .to_request();
    send(&app, req).await;

    let (status, stats) = get(&app, &token, "/api/tasks/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        stats,
        json!({"total": 3, "completed": 1, "pending": 2, "overdue": 1, "today": 1})
    );

    let (_, stats) = get(&app, &token, "/api/tasks/stats?period=day").await;
    assert_eq!(
        stats,
        json!({"total": 1, "completed": 0, "pending": 1, "overdue": 0, "today": 1})
    );
}

#[actix_rt::test]
async fn test_search_matches_wildcards_literally() {
    let Some(state) = postgres_state().await else { return };
    let app = init_app_with(state).await;
    let token = register_and_login(&app, &unique_email("search"), "secret1").await;

    create_task(&app, &token, json!({"title": "50% off"})).await;
    create_task(&app, &token, json!({"title": "500 off"})).await;
    create_task(&app, &token, json!({"title": "a_b", "description": "Underscore"})).await;
    create_task(&app, &token, json!({"title": "axb"})).await;

    let (_, body) = get(&app, &token, "/api/tasks?search=50%25").await;
    assert_eq!(titles(&body), vec!["50% off"]);

    let (_, body) = get(&app, &token, "/api/tasks?search=A_B").await;
    assert_eq!(titles(&body), vec!["a_b"]);

    let (_, body) = get(&app, &token, "/api/tasks?search=OFF").await;
    assert_eq!(titles(&body), vec!["500 off", "50% off"]);
}

#[actix_rt::test]
async fn test_duplicate_email() {
    let Some(state) = postgres_state().await else { return };
    let users = state.users.clone();
    let app = init_app_with(state).await;
    let email = unique_email("dup");

    let (status, _) = register(&app, "Alice", &email, "secret1").await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = register(&app, "Alice", &email, "secret2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email already registered");

    // Bypasses the pre-check so the unique constraint itself rejects the row.
    let result = users
        .insert(NewUser {
            name: "Alice".to_string(),
            email,
            hashed_password: "irrelevant".to_string(),
        })
        .await;
    assert!(matches!(result, Err(AppError::DuplicateEmail)));
}

#[actix_rt::test]
async fn test_rejected_update_leaves_task_unchanged() {
    let Some(state) = postgres_state().await else { return };
    let app = init_app_with(state).await;
    let token = register_and_login(&app, &unique_email("update"), "secret1").await;

    let task = create_task(
        &app,
        &token,
        json!({"title": "Trip", "start_date": "2024-03-01", "end_date": "2024-03-05"}),
    )
    .await;
    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer(&token))
        .set_json(json!({"title": "Renamed", "end_date": "2024-02-01"}))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, stored) = get(&app, &token, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored, task);

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer(&token))
        .set_json(json!({"end_date": "2024-03-10"}))
        .to_request();
    let (status, updated) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Trip");
    assert_eq!(updated["end_date"], "2024-03-10");
}

#[actix_rt::test]
async fn test_toggle_and_delete() {
    let Some(state) = postgres_state().await else { return };
    let app = init_app_with(state).await;
    let token = register_and_login(&app, &unique_email("toggle"), "secret1").await;
    let other = register_and_login(&app, &unique_email("other"), "secret1").await;

    let task = create_task(&app, &token, json!({"title": "Flip"})).await;
    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());

    for expected in [true, false] {
        let req = test::TestRequest::patch()
            .uri(&format!("{}/toggle", uri))
            .insert_header(bearer(&token))
            .to_request();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["completed"], expected);
    }

    let (status, _) = get(&app, &other, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(bearer(&token))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = get(&app, &token, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
