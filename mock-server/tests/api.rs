use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with, Location, MockConfig, OsImage, Plan, Server, Task, TOKEN};
use serde_json::Value;
use tower::{Service, ServiceExt};

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::HOST, "mock.test")
        .header(http::header::CONTENT_TYPE, "application/json")
        .header(http::header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(body.to_string())
        .unwrap()
}

fn get(uri: &str) -> Request<String> {
    request("GET", uri, "")
}

async fn call(app: &mut axum::routing::RouterIntoService<String>, req: Request<String>) -> axum::response::Response {
    ServiceExt::ready(app).await.unwrap().call(req).await.unwrap()
}

// --- auth ---

#[tokio::test]
async fn login_issues_token() {
    let body = format!(r#"{{"email":"{}","password":"{}"}}"#, mock_server::EMAIL, mock_server::PASSWORD);
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = body_json(resp).await;
    assert_eq!(json["data"]["credentials"]["access_token"], TOKEN);
    assert_eq!(json["data"]["credentials"]["token_type"], "Bearer");
}

#[tokio::test]
async fn login_with_wrong_password_is_401() {
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(r#"{"email":"admin@example.com","password":"nope"}"#.to_string())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json: Value = body_json(resp).await;
    assert_eq!(json["message"], "Unauthenticated.");
}

#[tokio::test]
async fn missing_token_is_401() {
    let req = Request::builder()
        .uri("/api/v1/account")
        .body(String::new())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn account_returns_user() {
    let resp = app().oneshot(get("/api/v1/account")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = body_json(resp).await;
    assert_eq!(json["data"]["email"], mock_server::EMAIL);
}

// --- errors ---

#[tokio::test]
async fn unknown_location_uses_error_envelope() {
    let resp = app().oneshot(get("/api/v1/locations/404")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let json: Value = body_json(resp).await;
    assert_eq!(json["http_code"], 404);
    assert_eq!(json["message"], "Not found");
}

#[tokio::test]
async fn invalid_ssh_key_lists_field_errors() {
    let resp = app()
        .oneshot(request("POST", "/api/v1/ssh_keys", r#"{"name":"","body":"nope"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json: Value = body_json(resp).await;
    assert_eq!(json["errors"]["name"][0], "The name field is required.");
    assert_eq!(json["errors"]["body"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn flaky_endpoint_fails_then_recovers() {
    let mut app = app().into_service();

    for _ in 0..2 {
        let resp = call(&mut app, get("/api/v1/flaky/k?failures=2")).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
    let resp = call(&mut app, get("/api/v1/flaky/k?failures=2")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = body_json(resp).await;
    assert_eq!(json["data"]["attempts"], 3);
}

// --- locations ---

#[tokio::test]
async fn location_lifecycle_and_pagination() {
    let mut app = app().into_service();

    for name in ["ams", "fra", "lon"] {
        let body = format!(r#"{{"name":"{name}","is_visible":true}}"#);
        let resp = call(&mut app, request("POST", "/api/v1/locations", &body)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = call(&mut app, get("/api/v1/locations?per_page=2")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page: Value = body_json(resp).await;
    assert_eq!(page["data"].as_array().unwrap().len(), 2);
    assert_eq!(page["meta"]["last_page"], 2);
    assert_eq!(
        page["links"]["next"],
        "http://mock.test/api/v1/locations?page=2&per_page=2"
    );

    let resp = call(&mut app, get("/api/v1/locations?page=2&per_page=2")).await;
    let page: Value = body_json(resp).await;
    let last: Vec<Location> = serde_json::from_value(page["data"].clone()).unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].name, "lon");
    assert_eq!(page["links"]["next"], Value::Null);

    let resp = call(&mut app, get("/api/v1/locations?filter%5Bname%5D=fra")).await;
    let page: Value = body_json(resp).await;
    assert_eq!(page["meta"]["total"], 1);

    let id = last[0].id;
    let resp = call(
        &mut app,
        request("PUT", &format!("/api/v1/locations/{id}"), r#"{"name":"london"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = body_json(resp).await;
    assert_eq!(json["data"]["name"], "london");

    let resp = call(&mut app, request("DELETE", &format!("/api/v1/locations/{id}"), "")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = call(&mut app, get(&format!("/api/v1/locations/{id}"))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- plans and os images ---

#[tokio::test]
async fn plans_are_searchable_by_name() {
    let mut app = app().into_service();
    for name in ["small-20", "large-80"] {
        let body = format!(r#"{{"name":"{name}","params":{{"disk":20,"ram":1024,"vcpu":1}}}}"#);
        let resp = call(&mut app, request("POST", "/api/v1/plans", &body)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = call(&mut app, get("/api/v1/plans?filter%5Bsearch%5D=small")).await;
    let page: Value = body_json(resp).await;
    let plans: Vec<Plan> = serde_json::from_value(page["data"].clone()).unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].storage_type, "fb");
    assert_eq!(plans[0].params.disk, 20);

    let resp = call(&mut app, get(&format!("/api/v1/plans/{}", plans[0].id))).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn image_versions_are_listed_under_their_image() {
    let mut app = app().into_service();
    let resp = call(&mut app, request("POST", "/api/v1/os_images", r#"{"name":"Ubuntu"}"#)).await;
    let image: Value = body_json(resp).await;
    let id = image["data"]["id"].as_u64().unwrap();

    let resp = call(
        &mut app,
        request("POST", &format!("/api/v1/os_images/{id}/versions"), r#"{"version":"22.04"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let version: Value = body_json(resp).await;

    let resp = call(&mut app, get(&format!("/api/v1/os_images/{id}"))).await;
    let json: Value = body_json(resp).await;
    let image: OsImage = serde_json::from_value(json["data"].clone()).unwrap();
    assert_eq!(image.versions.len(), 1);
    assert_eq!(image.versions[0].version, "22.04");

    let resp = call(&mut app, get(&format!("/api/v1/os_images/{id}/versions"))).await;
    let page: Value = body_json(resp).await;
    assert_eq!(page["meta"]["total"], 1);

    let version_id = version["data"]["id"].as_u64().unwrap();
    let resp = call(&mut app, get(&format!("/api/v1/os_image_versions/{version_id}"))).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = call(&mut app, request("POST", "/api/v1/os_images/999/versions", r#"{"version":"1"}"#)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- servers and tasks ---

async fn create_server(app: &mut axum::routing::RouterIntoService<String>, name: &str) -> Server {
    let resp = call(app, request("POST", "/api/v1/locations", r#"{"name":"ams"}"#)).await;
    let location: Value = body_json(resp).await;
    let resp = call(app, request("POST", "/api/v1/projects", r#"{"name":"default"}"#)).await;
    let project: Value = body_json(resp).await;

    let body = format!(
        r#"{{"name":"{name}","plan":1,"location":{},"project":{},"ssh_keys":[]}}"#,
        location["data"]["id"], project["data"]["id"]
    );
    let resp = call(app, request("POST", "/api/v1/servers", &body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json: Value = body_json(resp).await;
    serde_json::from_value(json["data"].clone()).unwrap()
}

#[tokio::test]
async fn server_leaves_processing_after_configured_reads() {
    let mut app = app_with(MockConfig {
        processing_polls: 2,
        task_polls: 1,
    })
    .into_service();
    let server = create_server(&mut app, "web-1").await;
    assert!(server.is_processing);
    assert_eq!(server.status, "processing");
    assert_eq!(server.boot_mode, "disk");

    let uri = format!("/api/v1/servers/{}", server.id);
    let json: Value = body_json(call(&mut app, get(&uri)).await).await;
    assert_eq!(json["data"]["is_processing"], true);
    let json: Value = body_json(call(&mut app, get(&uri)).await).await;
    assert_eq!(json["data"]["is_processing"], false);
    assert_eq!(json["data"]["status"], "started");
}

#[tokio::test]
async fn server_with_unknown_location_is_422() {
    let resp = app()
        .oneshot(request("POST", "/api/v1/servers", r#"{"name":"x","location":77,"project":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json: Value = body_json(resp).await;
    assert!(json["errors"]["location"].is_array());
}

#[tokio::test]
async fn server_delete_returns_task_that_completes() {
    let mut app = app_with(MockConfig {
        processing_polls: 0,
        task_polls: 2,
    })
    .into_service();
    let server = create_server(&mut app, "web-1").await;
    assert_eq!(server.status, "started");

    let resp = call(&mut app, request("DELETE", &format!("/api/v1/servers/{}", server.id), "")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = body_json(resp).await;
    let task: Task = serde_json::from_value(json["data"].clone()).unwrap();
    assert_eq!(task.action, "vm-delete");
    assert_eq!(task.status, "pending");

    let uri = format!("/api/v1/tasks/{}", task.id);
    let json: Value = body_json(call(&mut app, get(&uri)).await).await;
    assert_eq!(json["data"]["status"], "running");
    let json: Value = body_json(call(&mut app, get(&uri)).await).await;
    assert_eq!(json["data"]["status"], "done");

    let resp = call(&mut app, get(&format!("/api/v1/servers/{}", server.id))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn doomed_server_delete_task_fails_with_output() {
    let mut app = app_with(MockConfig {
        processing_polls: 0,
        task_polls: 1,
    })
    .into_service();
    let server = create_server(&mut app, "doomed-1").await;

    let resp = call(&mut app, request("DELETE", &format!("/api/v1/servers/{}", server.id), "")).await;
    let json: Value = body_json(resp).await;
    let id = json["data"]["id"].as_u64().unwrap();

    let json: Value = body_json(call(&mut app, get(&format!("/api/v1/tasks/{id}"))).await).await;
    assert_eq!(json["data"]["status"], "failed");
    assert!(!json["data"]["output"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn power_action_returns_task() {
    let mut app = app_with(MockConfig {
        processing_polls: 0,
        task_polls: 1,
    })
    .into_service();
    let server = create_server(&mut app, "web-1").await;

    let resp = call(&mut app, request("POST", &format!("/api/v1/servers/{}/stop", server.id), "")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = body_json(resp).await;
    assert_eq!(json["data"]["action"], "vm-stop");

    let json: Value = body_json(call(&mut app, get(&format!("/api/v1/servers/{}", server.id))).await).await;
    assert_eq!(json["data"]["status"], "stopped");

    let resp = call(&mut app, request("POST", &format!("/api/v1/servers/{}/explode", server.id), "")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
