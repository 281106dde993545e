use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header};
use axum_test::TestServer;
use serde_json::{Value, json};

use quota_ledger::router::build_router;

use crate::helpers::{app_state, setup_db};

const UI_ORIGIN: &str = "http://localhost:5173";

async fn server() -> TestServer {
    let db = setup_db().await;
    TestServer::new(build_router(app_state(&db), &[UI_ORIGIN.to_owned()])).unwrap()
}

async fn create(server: &TestServer, body: Value) -> Value {
    let response = server.post("/access-codes").json(&body).await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()
}

#[tokio::test]
async fn should_answer_health_probes() {
    let server = server().await;
    assert_eq!(server.get("/healthz").await.status_code(), StatusCode::OK);
    let ready = server.get("/readyz").await;
    assert_eq!(ready.status_code(), StatusCode::OK);
    assert!(ready.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn should_serve_browser_clients_with_cors_and_security_headers() {
    let server = server().await;

    let preflight = server
        .method(Method::OPTIONS, "/access-codes/consume")
        .add_header(header::ORIGIN, HeaderValue::from_static(UI_ORIGIN))
        .add_header(
            header::ACCESS_CONTROL_REQUEST_METHOD,
            HeaderValue::from_static("POST"),
        )
        .await;
    assert_eq!(preflight.status_code(), StatusCode::OK);
    assert_eq!(
        preflight.header(header::ACCESS_CONTROL_ALLOW_ORIGIN),
        UI_ORIGIN
    );

    let response = server
        .post("/access-codes/validate")
        .add_header(header::ORIGIN, HeaderValue::from_static(UI_ORIGIN))
        .json(&json!({ "code": "ANY" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN),
        UI_ORIGIN
    );
    assert_eq!(response.header(header::X_CONTENT_TYPE_OPTIONS), "nosniff");
    assert_eq!(response.header(header::X_FRAME_OPTIONS), "DENY");
    assert!(
        response
            .headers()
            .contains_key(header::STRICT_TRANSPORT_SECURITY)
    );
}

#[tokio::test]
async fn should_create_access_code() {
    let server = server().await;
    let body = create(
        &server,
        json!({ "code": "HTTP1", "max_usage": 2, "description": "demo" }),
    )
    .await;
    assert_eq!(body["code"], "HTTP1");
    assert_eq!(body["max_usage"], 2);
    assert_eq!(body["usage_count"], 0);
    assert_eq!(body["remaining_usage"], 2);
    assert_eq!(body["status"], "active");
    assert_eq!(body["expires_at"], Value::Null);

    let generated = create(&server, json!({ "max_usage": 1 })).await;
    assert_eq!(generated["code"].as_str().unwrap().len(), 12);
}

#[tokio::test]
async fn should_reject_invalid_creation() {
    let server = server().await;
    create(&server, json!({ "code": "TAKEN", "max_usage": 1 })).await;

    let duplicate = server
        .post("/access-codes")
        .json(&json!({ "code": "TAKEN", "max_usage": 1 }))
        .await;
    assert_eq!(duplicate.status_code(), StatusCode::CONFLICT);
    assert_eq!(
        duplicate.json::<Value>()["kind"],
        "ACCESS_CODE_ALREADY_EXISTS"
    );

    let too_many = server
        .post("/access-codes")
        .json(&json!({ "code": "BIG", "max_usage": 5000 }))
        .await;
    assert_eq!(too_many.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(too_many.json::<Value>()["kind"], "INVALID_MAX_USAGE");
}

#[tokio::test]
async fn should_validate_and_consume_with_typed_outcomes() {
    let server = server().await;
    let created = create(&server, json!({ "code": "FLOW", "max_usage": 1 })).await;
    let id = created["id"].as_str().unwrap().to_owned();

    let unknown = server
        .post("/access-codes/validate")
        .json(&json!({ "code": "MISSING" }))
        .await;
    assert_eq!(unknown.status_code(), StatusCode::OK);
    let unknown = unknown.json::<Value>();
    assert_eq!(unknown["valid"], false);
    assert_eq!(unknown["reason"], "NOT_FOUND");
    assert_eq!(unknown["remaining_usage"], Value::Null);

    let consumed = server
        .post("/access-codes/consume")
        .add_header(
            HeaderName::from_static("x-forwarded-for"),
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        )
        .add_header(
            HeaderName::from_static("user-agent"),
            HeaderValue::from_static("charts-client/2.1"),
        )
        .json(&json!({ "code": "FLOW", "artifact_kind": "bar", "artifact_ref": "q3.png" }))
        .await;
    assert_eq!(consumed.status_code(), StatusCode::OK);
    let consumed = consumed.json::<Value>();
    assert_eq!(consumed["success"], true);
    assert_eq!(consumed["reason"], "OK");
    assert_eq!(consumed["remaining_usage"], 0);

    let rejected = server
        .post("/access-codes/consume")
        .json(&json!({ "code": "FLOW" }))
        .await;
    assert_eq!(rejected.status_code(), StatusCode::OK);
    let rejected = rejected.json::<Value>();
    assert_eq!(rejected["success"], false);
    assert_eq!(rejected["reason"], "EXHAUSTED");
    assert_eq!(rejected["message"], "access code usage limit reached");

    let records = server
        .get(&format!("/access-codes/{id}/usage-records"))
        .await
        .json::<Value>();
    assert_eq!(records["total"], 2);
    let oldest = &records["items"][1];
    assert_eq!(oldest["success"], true);
    assert_eq!(oldest["ip_address"], "203.0.113.7");
    assert_eq!(oldest["user_agent"], "charts-client/2.1");
    assert_eq!(oldest["artifact_kind"], "bar");
    assert_eq!(records["items"][0]["success"], false);

    let code = server
        .get(&format!("/access-codes/{id}"))
        .await
        .json::<Value>();
    assert_eq!(code["usage_count"], 1);
    assert_eq!(code["status"], "exhausted");
}

#[tokio::test]
async fn should_list_with_filters_and_paging() {
    let server = server().await;
    for name in ["L1", "L2", "L3"] {
        create(&server, json!({ "code": name, "max_usage": 1 })).await;
    }
    let off = create(&server, json!({ "code": "L4", "max_usage": 1 })).await;
    server
        .patch(&format!("/access-codes/{}", off["id"].as_str().unwrap()))
        .json(&json!({ "is_active": false }))
        .await;

    let page = server
        .get("/access-codes?is-active=true&per-page=2&page=1&sort=asc")
        .await
        .json::<Value>();
    assert_eq!(page["total"], 3);
    assert_eq!(page["per-page"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["items"][0]["code"], "L1");

    let inactive = server
        .get("/access-codes?is-active=false")
        .await
        .json::<Value>();
    assert_eq!(inactive["total"], 1);
    assert_eq!(inactive["items"][0]["status"], "inactive");
}

#[tokio::test]
async fn should_patch_and_delete_access_code() {
    let server = server().await;
    let created = create(
        &server,
        json!({
            "code": "PATCHME",
            "max_usage": 3,
            "description": "temp",
            "expires_at": "2099-01-01T00:00:00Z"
        }),
    )
    .await;
    let path = format!("/access-codes/{}", created["id"].as_str().unwrap());

    let patched = server
        .patch(&path)
        .json(&json!({ "description": null, "expires_at": null, "max_usage": 5 }))
        .await;
    assert_eq!(patched.status_code(), StatusCode::OK);
    let patched = patched.json::<Value>();
    assert_eq!(patched["description"], Value::Null);
    assert_eq!(patched["expires_at"], Value::Null);
    assert_eq!(patched["max_usage"], 5);

    let empty = server.patch(&path).json(&json!({})).await;
    assert_eq!(empty.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(empty.json::<Value>()["kind"], "MISSING_DATA");

    assert_eq!(
        server.delete(&path).await.status_code(),
        StatusCode::NO_CONTENT
    );
    let missing = server.get(&path).await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(missing.json::<Value>()["kind"], "ACCESS_CODE_NOT_FOUND");
}

#[tokio::test]
async fn should_report_statistics() {
    let server = server().await;
    create(&server, json!({ "code": "STAT", "max_usage": 4 })).await;
    for kind in ["bar", "pie"] {
        server
            .post("/access-codes/consume")
            .json(&json!({ "code": "STAT", "artifact_kind": kind }))
            .await;
    }

    let codes = server
        .get("/access-codes/statistics")
        .await
        .json::<Value>();
    assert_eq!(codes["total_codes"], 1);
    assert_eq!(codes["total_usage"], 2);
    assert_eq!(codes["remaining_usage"], 2);
    assert_eq!(codes["usage_rate"], 50.0);

    let usage = server
        .get("/usage-records/statistics?days=7")
        .await
        .json::<Value>();
    assert_eq!(usage["total_attempts"], 2);
    assert_eq!(usage["successful_attempts"], 2);
    assert_eq!(usage["period_days"], 7);
    assert_eq!(usage["artifact_kinds"]["pie"], 1);
}

#[tokio::test]
async fn should_return_not_found_for_usage_of_unknown_code() {
    let server = server().await;
    let response = server
        .get(&format!("/access-codes/{}/usage-records", uuid::Uuid::now_v7()))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
