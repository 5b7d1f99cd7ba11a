mod common;

use axum::http::StatusCode;
use common::{build, empty, json_body, request, with_json, Note};
use dogpack_core::{RecordStore, TenantId};
use serde_json::json;
use tower::ServiceExt;

const ACME: &str = "acme.example.com";
const BETA: &str = "beta.example.com";

async fn seed(app: &common::TestApp, host: &str, id: &str, body: &str) {
    let res = app
        .router
        .clone()
        .oneshot(with_json(
            request("POST", "/notes", host),
            json!({"id": id, "body": body}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_stamps_request_tenant_over_body() {
    let app = build();

    let res = app
        .router
        .oneshot(with_json(
            request("POST", "/notes", ACME),
            json!({"id": "n1", "tenantId": 7, "body": "hello"}),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        json_body(res).await,
        json!({"id": "n1", "tenantId": 42, "body": "hello"})
    );
    let stored = app.notes.fetch("n1").await.unwrap().unwrap();
    assert_eq!(stored.tenant_id, Some(TenantId(42)));
}

#[tokio::test]
async fn find_lists_only_request_tenant_records() {
    let app = build();
    seed(&app, ACME, "a1", "acme one").await;
    seed(&app, ACME, "a2", "acme two").await;
    seed(&app, BETA, "b1", "beta one").await;

    let res = app
        .router
        .clone()
        .oneshot(empty(request("GET", "/notes", ACME)))
        .await
        .unwrap();
    let ids: Vec<String> = serde_json::from_value::<Vec<Note>>(json_body(res).await)
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(ids, vec!["a1", "a2"]);

    let res = app
        .router
        .oneshot(empty(request("GET", "/notes", BETA)))
        .await
        .unwrap();
    assert_eq!(json_body(res).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn foreign_record_reads_as_not_found() {
    let app = build();
    seed(&app, ACME, "a1", "secret").await;

    let res = app
        .router
        .oneshot(empty(request("GET", "/notes/a1", BETA)))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cross_tenant_update_is_forbidden_and_leaves_record() {
    let app = build();
    seed(&app, ACME, "a1", "original").await;

    let res = app
        .router
        .oneshot(with_json(
            request("PUT", "/notes/a1", BETA),
            json!({"id": "a1", "body": "hijacked"}),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = json_body(res).await;
    assert_eq!(body["name"], json!("Forbidden"));
    assert_eq!(body["className"], json!("forbidden"));

    let stored = app.notes.fetch("a1").await.unwrap().unwrap();
    assert_eq!(stored.body, "original");
    assert_eq!(stored.tenant_id, Some(TenantId(42)));
}

#[tokio::test]
async fn cross_tenant_delete_is_forbidden_and_leaves_record() {
    let app = build();
    seed(&app, ACME, "a1", "keep me").await;

    let res = app
        .router
        .oneshot(empty(request("DELETE", "/notes/a1", BETA)))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(app.notes.fetch("a1").await.unwrap().is_some());
}

#[tokio::test]
async fn update_cannot_move_record_to_another_tenant() {
    let app = build();
    seed(&app, ACME, "a1", "mine").await;

    let res = app
        .router
        .oneshot(with_json(
            request("PUT", "/notes/a1", ACME),
            json!({"id": "a1", "tenantId": 7, "body": "moved"}),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let stored = app.notes.fetch("a1").await.unwrap().unwrap();
    assert_eq!(stored.tenant_id, Some(TenantId(42)));
    assert_eq!(stored.body, "mine");
}

#[tokio::test]
async fn owner_can_update_and_delete() {
    let app = build();
    seed(&app, ACME, "a1", "draft").await;

    let res = app
        .router
        .clone()
        .oneshot(with_json(
            request("PUT", "/notes/a1", ACME),
            json!({"id": "a1", "body": "final"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        json_body(res).await,
        json!({"id": "a1", "tenantId": 42, "body": "final"})
    );

    let res = app
        .router
        .oneshot(empty(request("DELETE", "/notes/a1", ACME)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(app.notes.fetch("a1").await.unwrap().is_none());
}

#[tokio::test]
async fn tenant_scoped_routes_reject_unbound_requests() {
    let app = build();

    let res = app
        .router
        .oneshot(with_json(
            request("POST", "/notes", "localhost:3000"),
            json!({"id": "n1", "body": "orphan"}),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(res).await["message"], json!("Tenant context required"));
    assert!(app.notes.is_empty());
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = build();

    let res = app
        .router
        .oneshot(
            request("POST", "/notes", ACME)
                .header("content-type", "application/json")
                .body(axum::body::Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = json_body(res).await;
    assert_eq!(body["name"], json!("BadRequest"));
    assert_eq!(body["code"], json!(400));
    assert!(body["data"]["_schema"].is_array());
}

#[tokio::test]
async fn path_and_body_id_must_match() {
    let app = build();
    seed(&app, ACME, "a1", "draft").await;

    let res = app
        .router
        .oneshot(with_json(
            request("PUT", "/notes/a1", ACME),
            json!({"id": "a2", "body": "x"}),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_create_is_conflict() {
    let app = build();
    seed(&app, ACME, "a1", "first").await;

    let res = app
        .router
        .oneshot(with_json(
            request("POST", "/notes", ACME),
            json!({"id": "a1", "body": "second"}),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn duplicate_create_does_not_reveal_owner() {
    let app = build();
    seed(&app, ACME, "a1", "acme secret").await;

    let mut answers = Vec::new();
    for host in [ACME, BETA] {
        let res = app
            .router
            .clone()
            .oneshot(with_json(
                request("POST", "/notes", host),
                json!({"id": "a1", "body": "mine now"}),
            ))
            .await
            .unwrap();
        answers.push((res.status(), json_body(res).await));
    }

    assert_eq!(answers[0].0, StatusCode::CONFLICT);
    assert_eq!(answers[0], answers[1]);

    let stored = app.notes.fetch("a1").await.unwrap().unwrap();
    assert_eq!(stored.body, "acme secret");
    assert_eq!(stored.tenant_id, Some(TenantId(42)));
}
