//! Integration tests for the SOAP surface.

use std::sync::OnceLock;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use base64::{Engine as _, engine::general_purpose};
use domain::Argon2Hasher;
use metrics_exporter_prometheus::PrometheusHandle;
use quick_xml::Reader;
use quick_xml::events::Event;
use serde_json::{Value, json};
use store::InMemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> Router {
    let hasher = Argon2Hasher::with_cost(1024, 1, 1).unwrap();
    let state = api::create_default_state(InMemoryStore::new(), hasher);
    api::create_app(state, get_metrics_handle())
}

fn request_envelope(operation: &str, args: &[&str]) -> String {
    let args: String = args
        .iter()
        .enumerate()
        .map(|(i, arg)| format!("<arg{i}>{arg}</arg{i}>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:api="urn:article-api">
  <soapenv:Body>
    <api:{operation}>{args}</api:{operation}>
  </soapenv:Body>
</soapenv:Envelope>"#
    )
}

/// Returns the text of the first element with the given local name.
fn element_text(xml: &str, name: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut inside = false;
    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) if e.local_name().as_ref() == name.as_bytes() => inside = true,
            Event::Text(t) if inside => return Some(t.unescape().unwrap().into_owned()),
            Event::End(_) if inside => return Some(String::new()),
            Event::Eof => return None,
            _ => {}
        }
    }
}

async fn call_raw(
    app: &Router,
    body: String,
    auth: Option<(&str, &str)>,
) -> (StatusCode, Option<String>, String) {
    let mut request = Request::builder()
        .method("POST")
        .uri("/soap")
        .header(header::CONTENT_TYPE, "text/xml; charset=utf-8");
    if let Some((username, password)) = auth {
        let encoded = general_purpose::STANDARD.encode(format!("{username}:{password}"));
        request = request.header(header::AUTHORIZATION, format!("Basic {encoded}"));
    }

    let response = app
        .clone()
        .oneshot(request.body(Body::from(body)).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Calls an operation and decodes the JSON carried in `<return>`.
async fn call(
    app: &Router,
    operation: &str,
    args: &[&str],
    auth: Option<(&str, &str)>,
) -> Value {
    let (status, content_type, xml) =
        call_raw(app, request_envelope(operation, args), auth).await;
    assert_eq!(status, StatusCode::OK, "unexpected fault: {xml}");
    assert_eq!(content_type.as_deref(), Some("text/xml; charset=utf-8"));
    assert!(xml.contains(&format!("{operation}Response")));
    let payload = element_text(&xml, "return").expect("missing <return>");
    serde_json::from_str(&payload).unwrap()
}

const ALICE: Option<(&str, &str)> = Some(("alice", "secret"));
const BOB: Option<(&str, &str)> = Some(("bob", "hunter2"));

#[tokio::test]
async fn test_register_reports_success_code() {
    let app = setup();

    let reply = call(&app, "userRegister", &["alice", "secret"], None).await;
    assert_eq!(
        reply,
        json!({ "message": "Registration successful", "code": 0 })
    );

    let reply = call(&app, "userRegister", &["alice", "secret"], None).await;
    assert_eq!(
        reply,
        json!({ "message": "Username already exists", "code": 1 })
    );
}

#[tokio::test]
async fn test_view_missing_article_is_code_not_status() {
    let app = setup();

    let reply = call(&app, "articleView", &["999"], None).await;
    assert_eq!(reply, json!({ "message": "Article not found", "code": 10 }));

    let reply = call(&app, "articleView", &[""], None).await;
    assert_eq!(reply["code"], 9);
}

#[tokio::test]
async fn test_authenticated_article_lifecycle() {
    let app = setup();
    call(&app, "userRegister", &["alice", "secret"], None).await;

    let created = call(&app, "articleCreate", &["Title", "Body &amp; more"], ALICE).await;
    assert_eq!(created["code"], 0);
    assert_eq!(created["title"], "Title");
    assert_eq!(created["content"], "Body & more");
    let id = created["articleId"].as_i64().unwrap().to_string();

    let viewed = call(&app, "articleView", &[id.as_str()], None).await;
    assert_eq!(viewed["code"], 0);
    assert_eq!(viewed["userId"], created["userId"]);

    let edited = call(&app, "articleEdit", &[id.as_str(), "", "New body"], ALICE).await;
    assert_eq!(edited["code"], 0);
    assert_eq!(edited["title"], "Title");
    assert_eq!(edited["content"], "New body");

    let listed = call(&app, "articleList", &["1", "10"], ALICE).await;
    assert_eq!(listed["code"], 0);
    assert_eq!(listed["list"].as_array().unwrap().len(), 1);

    let deleted = call(&app, "articleDelete", &[id.as_str()], ALICE).await;
    assert_eq!(deleted, json!({ "message": "Article deleted", "code": 0 }));

    let viewed = call(&app, "articleView", &[id.as_str()], None).await;
    assert_eq!(viewed["code"], 10);
}

#[tokio::test]
async fn test_login_failure_is_reported_in_envelope() {
    let app = setup();
    call(&app, "userRegister", &["alice", "secret"], None).await;

    let reply = call(&app, "articleCreate", &["T", "C"], Some(("alice", "wrong"))).await;
    assert_eq!(
        reply,
        json!({ "message": "Invalid username or password", "code": 5 })
    );

    let reply = call(&app, "articleList", &[], None).await;
    assert_eq!(reply["code"], 3);
}

#[tokio::test]
async fn test_edit_by_other_user_is_permission_denied() {
    let app = setup();
    call(&app, "userRegister", &["alice", "secret"], None).await;
    call(&app, "userRegister", &["bob", "hunter2"], None).await;
    let created = call(&app, "articleCreate", &["T", "C"], ALICE).await;
    let id = created["articleId"].as_i64().unwrap().to_string();

    let reply = call(&app, "articleEdit", &[id.as_str(), "Mine", "Now"], BOB).await;
    assert_eq!(reply, json!({ "message": "Permission denied", "code": 11 }));

    let reply = call(&app, "articleDelete", &[id.as_str()], BOB).await;
    assert_eq!(reply["code"], 11);
}

#[tokio::test]
async fn test_list_defaults_and_page_size_limit() {
    let app = setup();
    call(&app, "userRegister", &["alice", "secret"], None).await;
    for i in 0..12 {
        call(&app, "articleCreate", &[format!("T{i}").as_str(), "C"], ALICE).await;
    }

    let reply = call(&app, "articleList", &[], ALICE).await;
    assert_eq!(reply["list"].as_array().unwrap().len(), 10);

    let reply = call(&app, "articleList", &["2"], ALICE).await;
    assert_eq!(reply["list"].as_array().unwrap().len(), 2);

    let reply = call(&app, "articleList", &["1", "101"], ALICE).await;
    assert_eq!(reply["code"], 14);
}

#[tokio::test]
async fn test_unknown_operation_is_fault() {
    let app = setup();

    let (status, content_type, xml) =
        call_raw(&app, request_envelope("articlePublish", &["1"]), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(content_type.as_deref(), Some("text/xml; charset=utf-8"));
    assert_eq!(
        element_text(&xml, "faultcode").as_deref(),
        Some("SOAP-ENV:Client")
    );
    assert_eq!(
        element_text(&xml, "faultstring").as_deref(),
        Some("Unknown operation: articlePublish")
    );
}

#[tokio::test]
async fn test_wrong_argument_count_is_fault() {
    let app = setup();

    let (status, _, xml) = call_raw(&app, request_envelope("articleView", &[]), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(element_text(&xml, "faultstring").unwrap().contains("articleView"));
}

#[tokio::test]
async fn test_malformed_envelope_is_fault() {
    let app = setup();

    let (status, _, xml) = call_raw(&app, "not xml at all".to_string(), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        element_text(&xml, "faultcode").as_deref(),
        Some("SOAP-ENV:Client")
    );
}
