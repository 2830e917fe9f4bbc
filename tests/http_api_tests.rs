#![cfg(feature = "http_api")]

use axum::{
    Router,
    body::{self, Body},
    http::{Request, StatusCode, header},
};
use scout_toolkit::{
    AccessPolicy, Activity, ActivityCatalog, InMemoryProgramStore, Language, Program,
    ProgramEntry, http_api,
};
use serde_json::{Value, json};
use tower::util::ServiceExt;

const ANA: &str = "ana@escoteiros.pt";
const RUI: &str = "rui@escoteiros.pt";
const ADMIN: &str = "chefe@escoteiros.pt";

fn new_router() -> Router {
    let mut fire = Activity::new(1, "Fogueira", 90);
    fire.name.set(Language::En, "Campfire");
    let catalog = ActivityCatalog::from_activities([fire, Activity::new(2, "Caminhada", 60)]);
    let policy = AccessPolicy::new("escoteiros.pt", [ADMIN]);
    let state = http_api::AppState::new(catalog, InMemoryProgramStore::new(), policy);
    http_api::router(state)
}

fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(http_api::USER_EMAIL_HEADER, user);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_program(app: &Router, owner: &str, is_public: bool) -> Program {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/programs",
            Some(owner),
            Some(json!({ "name": "Reunião", "start_time": "09:00:00", "is_public": is_public })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    serde_json::from_value(body).unwrap()
}

#[tokio::test]
async fn health_needs_no_identity() {
    let app = new_router();
    let (status, body) = send(&app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn identity_is_required_and_domain_restricted() {
    let app = new_router();
    let (status, body) = send(&app, request("GET", "/activities", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, body) = send(
        &app,
        request("GET", "/activities", Some("ana@gmail.com"), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn activities_are_filtered_paginated_and_localized() {
    let app = new_router();
    let (status, body) = send(
        &app,
        request(
            "GET",
            "/activities?max_duration_minutes=90&lang=en&per_page=1",
            Some(ANA),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["items"][0]["name"], "Campfire");

    let (status, body) = send(
        &app,
        request("GET", "/activities?search=caminhada", Some(ANA), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["id"], 2);

    let (status, _) = send(&app, request("GET", "/activities/9", Some(ANA), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_admins_edit_the_catalogue() {
    let app = new_router();
    let activity = json!({ "id": 3, "name": { "pt": "Nós", "en": "Knots" }, "duration_minutes": 20 });

    let (status, _) = send(
        &app,
        request("PUT", "/activities/3", Some(ANA), Some(activity.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        request("PUT", "/activities/4", Some(ADMIN), Some(activity.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request("PUT", "/activities/3", Some(ADMIN), Some(activity)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        request("GET", "/activities/3?lang=en", Some(ANA), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Knots");

    let (status, _) = send(&app, request("DELETE", "/activities/3", Some(ADMIN), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, request("DELETE", "/activities/3", Some(ADMIN), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn program_entries_schedule_summary_and_export() {
    let app = new_router();
    let program = create_program(&app, ANA, false).await;
    let base = format!("/programs/{}", program.id);

    let entries = json!([
        { "id": 1, "position": 0, "kind": "activity", "activity_id": 1 },
        { "id": 2, "position": 1, "kind": "custom", "title": "Break", "duration_minutes": 15 },
        { "id": 3, "position": 2, "kind": "activity", "activity_id": 2 }
    ]);
    let (status, body) = send(
        &app,
        request("PUT", &format!("{base}/entries"), Some(ANA), Some(entries)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let saved: Vec<ProgramEntry> = serde_json::from_value(body).unwrap();
    assert_eq!(saved.len(), 3);

    let (status, body) = send(
        &app,
        request("GET", &format!("{base}/schedule"), Some(ANA), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slots"][1]["start"], "10:30:00");
    assert_eq!(body["slots"][2]["end"], "11:45:00");

    let (status, body) = send(
        &app,
        request("GET", &format!("{base}/summary"), Some(ANA), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_duration_minutes"], 165);
    assert_eq!(body["custom_count"], 1);

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("{base}/export.csv?lang=en"),
            Some(ANA),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(csv.contains("0,09:00,10:30,90,activity,Campfire"));
}

#[tokio::test]
async fn invalid_entry_lists_are_rejected() {
    let app = new_router();
    let program = create_program(&app, ANA, false).await;
    let uri = format!("/programs/{}/entries", program.id);

    let gap = json!([{ "id": 1, "position": 1, "kind": "activity", "activity_id": 1 }]);
    let (status, body) = send(&app, request("PUT", &uri, Some(ANA), Some(gap))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    let negative = json!([
        { "id": 1, "position": 0, "kind": "custom", "title": "Break", "duration_minutes": 0 }
    ]);
    let (status, _) = send(&app, request("PUT", &uri, Some(ANA), Some(negative))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let below_zero = json!([
        { "id": 1, "position": 0, "kind": "custom", "title": "Break", "duration_minutes": -5 }
    ]);
    let (status, body) = send(&app, request("PUT", &uri, Some(ANA), Some(below_zero))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    let (status, body) = send(&app, request("GET", &uri, Some(ANA), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn private_programs_are_visible_to_owner_and_admins() {
    let app = new_router();
    let private = create_program(&app, ANA, false).await;
    let public = create_program(&app, ANA, true).await;

    let (status, _) = send(
        &app,
        request("GET", &format!("/programs/{}", private.id), Some(RUI), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        request("GET", &format!("/programs/{}", private.id), Some(ADMIN), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, request("GET", "/programs", Some(RUI), None)).await;
    assert_eq!(status, StatusCode::OK);
    let visible: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert_eq!(visible, vec![public.id]);

    let (status, _) = send(&app, request("GET", "/programs/999", Some(ANA), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_the_owner_changes_a_program() {
    let app = new_router();
    let program = create_program(&app, ANA, true).await;
    let uri = format!("/programs/{}", program.id);
    let update = json!({ "name": "Acampamento", "start_time": "14:00:00", "is_public": true });

    for user in [RUI, ADMIN] {
        let (status, _) = send(&app, request("PUT", &uri, Some(user), Some(update.clone()))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&app, request("DELETE", &uri, Some(user), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (status, body) = send(&app, request("PUT", &uri, Some(ANA), Some(update))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Acampamento");
    assert_eq!(body["start_time"], "14:00:00");

    let blank = json!({ "name": "  ", "start_time": "14:00:00" });
    let (status, _) = send(&app, request("PUT", &uri, Some(ANA), Some(blank))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, request("DELETE", &uri, Some(ANA), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, request("GET", &uri, Some(ANA), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_requests_get_json_errors() {
    let app = new_router();

    let (status, body) = send(
        &app,
        request("GET", "/activities?lang=fr", Some(ANA), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    let (status, body) = send(&app, request("GET", "/programs/abc", Some(ANA), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    let (status, body) = send(
        &app,
        request("POST", "/programs", Some(ANA), Some(json!({ "name": "Reunião" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    let (status, _) = send(&app, request("GET", "/activities?lang=fr", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
