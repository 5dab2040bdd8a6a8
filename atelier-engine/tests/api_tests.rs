//! Integration tests for the HTTP API

mod helpers;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

use atelier_engine::{build_router, AppState};
use helpers::MockProvider;

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn test_state() -> (AppState, Arc<MockProvider>) {
    let provider = Arc::new(MockProvider::happy());
    let state = helpers::degraded_state(provider.clone()).await;
    (state, provider)
}

#[tokio::test]
async fn health_reports_degraded_branching() {
    let (state, _) = test_state().await;
    let app = build_router(state);

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["module"], "atelier-engine");
    assert_eq!(body["branching"], false);
}

#[tokio::test]
async fn create_project_rejects_empty_brief() {
    let (state, _) = test_state().await;
    let app = build_router(state);

    let response = app
        .oneshot(post_json("/projects", json!({"brief": "   "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn create_project_starts_processing_and_completes() {
    let (state, _) = test_state().await;
    let app = build_router(state.clone());

    let response = app
        .oneshot(post_json(
            "/projects",
            json!({"brief": "A streaming ingestion platform"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["status"], "processing");
    let project_id: Uuid = body["project_id"].as_str().unwrap().parse().unwrap();

    // Wait for the backgrounded slot to finish, then check the status view
    state.await_project(project_id).await;
    let app = build_router(state);
    let response = app
        .oneshot(get(&format!("/projects/{}/status", project_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "completed");
}

#[tokio::test]
async fn completed_project_detail_includes_blueprints() {
    let (state, _) = test_state().await;
    let app = build_router(state.clone());

    let response = app
        .oneshot(post_json("/projects", json!({"brief": "A brief"})))
        .await
        .unwrap();
    let body = json_body(response).await;
    let project_id: Uuid = body["project_id"].as_str().unwrap().parse().unwrap();
    state.await_project(project_id).await;

    let app = build_router(state);
    let response = app
        .oneshot(get(&format!("/projects/{}", project_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["blueprints"].as_array().unwrap().len(), 1);
    assert_eq!(
        body["blueprints"][0]["name"],
        "Event-driven ingestion platform"
    );
    assert_eq!(body["blueprints"][0]["analyses"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn unknown_project_is_404() {
    let (state, _) = test_state().await;
    let app = build_router(state);

    let response = app
        .oneshot(get(&format!("/projects/{}/status", Uuid::new_v4())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn empty_search_query_is_400_without_provider_calls() {
    let (state, provider) = test_state().await;
    let app = build_router(state.clone());

    let response = app
        .oneshot(post_json("/projects", json!({"brief": "A brief"})))
        .await
        .unwrap();
    let body = json_body(response).await;
    let project_id: Uuid = body["project_id"].as_str().unwrap().parse().unwrap();
    state.await_project(project_id).await;

    let calls_before = provider.embed_calls.load(Ordering::SeqCst);
    let app = build_router(state);
    let response = app
        .oneshot(post_json(
            &format!("/projects/{}/search", project_id),
            json!({"query": ""}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(provider.embed_calls.load(Ordering::SeqCst), calls_before);
}

#[tokio::test]
async fn search_returns_matching_findings() {
    let (state, _) = test_state().await;
    let app = build_router(state.clone());

    let response = app
        .oneshot(post_json("/projects", json!({"brief": "A brief"})))
        .await
        .unwrap();
    let body = json_body(response).await;
    let project_id: Uuid = body["project_id"].as_str().unwrap().parse().unwrap();
    state.await_project(project_id).await;

    let app = build_router(state);
    let response = app
        .oneshot(post_json(
            &format!("/projects/{}/search", project_id),
            json!({"query": "token leakage"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["severity"], 9);
    assert_eq!(results[0]["persona"], "systems");
}

#[tokio::test]
async fn list_projects_filters_by_status() {
    let (state, _) = test_state().await;
    let app = build_router(state.clone());

    let response = app
        .oneshot(post_json("/projects", json!({"brief": "A brief"})))
        .await
        .unwrap();
    let body = json_body(response).await;
    let project_id: Uuid = body["project_id"].as_str().unwrap().parse().unwrap();
    state.await_project(project_id).await;

    let app = build_router(state.clone());
    let response = app
        .oneshot(get("/projects?status=completed"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let app = build_router(state);
    let response = app.oneshot(get("/projects?status=error")).await.unwrap();
    let body = json_body(response).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn delete_project_removes_it() {
    let (state, _) = test_state().await;
    let app = build_router(state.clone());

    let response = app
        .oneshot(post_json("/projects", json!({"brief": "A brief"})))
        .await
        .unwrap();
    let body = json_body(response).await;
    let project_id: Uuid = body["project_id"].as_str().unwrap().parse().unwrap();
    state.await_project(project_id).await;

    let app = build_router(state.clone());
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/projects/{}", project_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let app = build_router(state);
    let response = app
        .oneshot(get(&format!("/projects/{}", project_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
